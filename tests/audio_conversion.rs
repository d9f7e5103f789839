//! Audio conversion tests.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use mediakit::{
    AudioFormat, AudioFrame, ChannelLayout, MediaError, OperationType, ProgressCallback,
    ProgressInfo, Resampler, SampleFormat,
};

fn collect(frame: &AudioFrame, target: AudioFormat) -> Vec<AudioFrame> {
    let mut out = Vec::new();
    mediakit::convert(frame, target, |converted| {
        out.push(converted.clone());
        Ok(())
    })
    .expect("convert");
    out
}

/// Concatenate the bytes of a packed or planar sequence, plane by plane.
fn concat_plane(frames: &[AudioFrame], plane: usize) -> Vec<u8> {
    frames
        .iter()
        .flat_map(|frame| frame.bytes(plane).expect("plane").to_vec())
        .collect()
}

fn s16_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|sample| sample.to_le_bytes()).collect()
}

fn f32_sine(samples: usize, rate: u32) -> Vec<u8> {
    (0..samples)
        .map(|n| (n as f32 * 440.0 * std::f32::consts::TAU / rate as f32).sin() * 0.5)
        .flat_map(f32::to_le_bytes)
        .collect()
}

#[test]
fn u8_survives_round_trip_through_double() {
    let source = AudioFormat::new(8_000, SampleFormat::U8, ChannelLayout::Mono);
    let original: Vec<u8> = (0..=255).collect();
    let frame = AudioFrame::from_packed(source, original.clone()).expect("frame");

    let doubles = collect(&frame, AudioFormat::new(0, SampleFormat::Dbl, ChannelLayout::None));
    assert_eq!(doubles.iter().map(AudioFrame::samples).sum::<usize>(), 256);
    assert!(doubles.iter().all(|f| f.format().format == SampleFormat::Dbl));

    let dbl_format = AudioFormat::new(8_000, SampleFormat::Dbl, ChannelLayout::Mono);
    let intermediate = AudioFrame::from_packed(dbl_format, concat_plane(&doubles, 0)).expect("dbl");
    let back = collect(&intermediate, AudioFormat::new(0, SampleFormat::U8, ChannelLayout::None));

    assert_eq!(concat_plane(&back, 0), original);
}

#[test]
fn s16_survives_round_trip_through_float() {
    let source = AudioFormat::new(16_000, SampleFormat::S16, ChannelLayout::Mono);
    let original = s16_bytes(&[i16::MIN, -12_345, -1, 0, 1, 12_345, i16::MAX]);
    let frame = AudioFrame::from_packed(source, original.clone()).expect("frame");

    let floats = collect(&frame, AudioFormat::new(0, SampleFormat::Flt, ChannelLayout::None));
    let flt_format = AudioFormat::new(16_000, SampleFormat::Flt, ChannelLayout::Mono);
    let intermediate = AudioFrame::from_packed(flt_format, concat_plane(&floats, 0)).expect("flt");
    let back = collect(&intermediate, AudioFormat::new(0, SampleFormat::S16, ChannelLayout::None));

    assert_eq!(concat_plane(&back, 0), original);
}

#[test]
fn float_to_s16_saturates_and_rounds_to_nearest() {
    let source = AudioFormat::new(16_000, SampleFormat::Flt, ChannelLayout::Mono);
    let scale = 32_768.0_f32;
    let input: Vec<u8> = [
        1.5,
        -1.5,
        1.0,
        -1.0,
        0.5,
        100.4 / scale,
        100.6 / scale,
        -100.6 / scale,
        0.25 / scale,
        0.75 / scale,
    ]
    .into_iter()
    .flat_map(f32::to_le_bytes)
    .collect();
    let frame = AudioFrame::from_packed(source, input).expect("frame");

    let converted = collect(&frame, AudioFormat::new(0, SampleFormat::S16, ChannelLayout::None));
    assert_eq!(
        concat_plane(&converted, 0),
        s16_bytes(&[i16::MAX, i16::MIN, i16::MAX, i16::MIN, 16_384, 100, 101, -101, 0, 1])
    );
}

#[test]
fn packed_to_planar_preserves_channel_order() {
    let source = AudioFormat::new(44_100, SampleFormat::S16, ChannelLayout::Stereo);
    // L0 R0 L1 R1 L2 R2
    let interleaved = s16_bytes(&[100, -100, 200, -200, 300, -300]);
    let frame = AudioFrame::from_packed(source, interleaved.clone()).expect("frame");

    let planar = collect(&frame, AudioFormat::new(0, SampleFormat::S16P, ChannelLayout::None));
    assert!(planar.iter().all(AudioFrame::is_planar));
    assert_eq!(concat_plane(&planar, 0), s16_bytes(&[100, 200, 300]));
    assert_eq!(concat_plane(&planar, 1), s16_bytes(&[-100, -200, -300]));

    let planar_format = AudioFormat::new(44_100, SampleFormat::S16P, ChannelLayout::Stereo);
    let planar_frame = AudioFrame::from_planes(
        planar_format,
        3,
        vec![concat_plane(&planar, 0), concat_plane(&planar, 1)],
    )
    .expect("planar frame");
    let packed = collect(&planar_frame, AudioFormat::new(0, SampleFormat::S16, ChannelLayout::None));
    assert_eq!(concat_plane(&packed, 0), interleaved);
}

#[test]
fn rate_conversion_scales_sample_count() {
    let source = AudioFormat::new(48_000, SampleFormat::Flt, ChannelLayout::Mono);
    let frame = AudioFrame::from_packed(source, f32_sine(4_800, 48_000)).expect("frame");

    let out = collect(&frame, AudioFormat::new(44_100, SampleFormat::None, ChannelLayout::None));
    let total: usize = out.iter().map(AudioFrame::samples).sum();
    assert!((4_365..=4_455).contains(&total), "got {total} samples");
    assert!(out.iter().all(|f| f.format().rate == 44_100));
}

#[test]
fn streaming_resampler_carries_state_across_buffers() {
    let source = AudioFormat::new(48_000, SampleFormat::Flt, ChannelLayout::Mono);
    let data = f32_sine(4_800, 48_000);
    let mut resampler = Resampler::new(AudioFormat::new(
        44_100,
        SampleFormat::S16,
        ChannelLayout::Stereo,
    ));

    let mut total = 0;
    let mut count = |frame: &AudioFrame| -> Result<(), MediaError> {
        assert_eq!(frame.channels(), 2);
        assert_eq!(frame.linesize(), frame.samples() * 4);
        total += frame.samples();
        Ok(())
    };
    for chunk in data.chunks(480 * 4) {
        let frame = AudioFrame::from_packed(source, chunk.to_vec()).expect("chunk");
        resampler.convert(&frame, &mut count).expect("convert");
    }
    resampler.flush(&mut count).expect("flush");

    assert!((4_365..=4_455).contains(&total), "got {total} samples");
}

#[test]
fn frame_size_splits_output_with_continuous_timestamps() {
    let source = AudioFormat::new(32_000, SampleFormat::S16, ChannelLayout::Mono);
    let frame = AudioFrame::from_packed(source, vec![0u8; 2_000 * 2])
        .expect("frame")
        .with_timestamp(Duration::from_secs(1));

    let mut resampler = Resampler::new(AudioFormat::new(0, SampleFormat::FltP, ChannelLayout::None))
        .with_frame_size(256);
    let mut out = Vec::new();
    let mut push = |frame: &AudioFrame| -> Result<(), MediaError> {
        out.push(frame.clone());
        Ok(())
    };
    resampler.convert(&frame, &mut push).expect("convert");
    resampler.flush(&mut push).expect("flush");

    assert!(out.iter().all(|f| f.samples() <= 256));
    assert_eq!(out.iter().map(AudioFrame::samples).sum::<usize>(), 2_000);
    assert_eq!(out[0].timestamp(), Some(Duration::from_secs(1)));

    let mut expected = Duration::from_secs(1);
    for piece in &out {
        assert_eq!(piece.timestamp(), Some(expected));
        expected += piece.duration();
    }
}

#[test]
fn callback_error_aborts_conversion() {
    let source = AudioFormat::new(8_000, SampleFormat::U8, ChannelLayout::Mono);
    let frame = AudioFrame::from_packed(source, vec![0x80; 1_000]).expect("frame");

    let mut resampler =
        Resampler::new(AudioFormat::new(0, SampleFormat::S16, ChannelLayout::None)).with_frame_size(100);
    let mut calls = 0;
    let error = resampler
        .convert(&frame, |_| {
            calls += 1;
            Err(MediaError::handler("stop"))
        })
        .unwrap_err();

    assert_eq!(calls, 1);
    assert!(matches!(error, MediaError::Handler(_)));
}

#[test]
fn identical_target_passes_input_through() {
    let source = AudioFormat::new(22_050, SampleFormat::S32P, ChannelLayout::Stereo);
    let frame = AudioFrame::from_planes(source, 2, vec![vec![1, 2, 3, 4, 5, 6, 7, 8]; 2])
        .expect("frame")
        .with_timestamp(Duration::from_millis(250));

    let out = collect(&frame, AudioFormat::default());
    assert_eq!(out, vec![frame.clone()]);

    let explicit = collect(&frame, source);
    assert_eq!(explicit, vec![frame]);
}

#[test]
fn empty_input_produces_no_output() {
    let source = AudioFormat::new(48_000, SampleFormat::S16, ChannelLayout::Stereo);
    let empty = AudioFrame::new(source, 0).expect("frame");

    assert!(collect(&empty, AudioFormat::default()).is_empty());
    assert!(collect(&empty, AudioFormat::new(0, SampleFormat::Flt, ChannelLayout::None)).is_empty());
}

#[test]
fn incomplete_frame_format_is_rejected() {
    let format = AudioFormat::new(0, SampleFormat::S16, ChannelLayout::Mono);
    assert!(matches!(
        AudioFrame::new(format, 16),
        Err(MediaError::InvalidAudioFrame(_))
    ));
}

struct BufferCounter(AtomicU64);

impl ProgressCallback for BufferCounter {
    fn on_progress(&self, info: &ProgressInfo) {
        assert_eq!(info.operation, OperationType::AudioConversion);
        self.0.store(info.current, Ordering::SeqCst);
    }
}

#[test]
fn resampler_reports_delivered_buffers() {
    let source = AudioFormat::new(8_000, SampleFormat::S16, ChannelLayout::Mono);
    let frame = AudioFrame::from_packed(source, vec![0u8; 500 * 2]).expect("frame");
    let counter = Arc::new(BufferCounter(AtomicU64::new(0)));

    let mut resampler = Resampler::new(AudioFormat::new(0, SampleFormat::Dbl, ChannelLayout::None))
        .with_frame_size(100)
        .with_progress(counter.clone());
    let mut delivered = 0;
    let mut count = |_: &AudioFrame| -> Result<(), MediaError> {
        delivered += 1;
        Ok(())
    };
    resampler.convert(&frame, &mut count).expect("convert");
    resampler.flush(&mut count).expect("flush");

    assert_eq!(delivered, 5);
    assert_eq!(counter.0.load(Ordering::SeqCst), 5);
}
