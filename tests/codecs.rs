//! Codec listing tests against the linked FFmpeg.

use std::collections::HashSet;

use mediakit::{Manager, MediaFlag};

#[test]
fn every_codec_is_an_encoder_or_decoder_of_one_category() {
    let codecs = Manager::new().codecs().expect("list codecs");
    assert!(!codecs.is_empty());

    let allowed = MediaFlag::ALL_CATEGORIES | MediaFlag::ENCODER | MediaFlag::DECODER;
    for codec in &codecs {
        let flags = codec.flags();
        assert!(!codec.name().is_empty());
        assert!(allowed.is(flags), "{codec} carries {flags:?}");
        assert!(codec.is_encoder() || codec.is_decoder(), "{codec}");

        let categories = MediaFlag::CATEGORIES
            .iter()
            .filter(|category| flags.is(**category))
            .count();
        assert!(categories <= 1, "{codec} spans {categories} categories");
    }
}

#[test]
fn codec_names_are_unique_and_sorted() {
    let codecs = Manager::new().codecs().expect("list codecs");

    let names: Vec<&str> = codecs.iter().map(|codec| codec.name()).collect();
    let unique: HashSet<&str> = names.iter().copied().collect();
    assert_eq!(unique.len(), names.len());
    assert!(names.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn pcm_s16le_encodes_and_decodes_audio() {
    let codecs = Manager::new().codecs().expect("list codecs");
    let pcm = codecs
        .iter()
        .find(|codec| codec.name() == "pcm_s16le")
        .expect("pcm_s16le is always built");

    assert_eq!(
        pcm.flags(),
        MediaFlag::AUDIO | MediaFlag::ENCODER | MediaFlag::DECODER
    );
    assert!(!pcm.description().is_empty());
    assert!(pcm.to_string().starts_with("pcm_s16le ("));
}
