//! Codecs available to FFmpeg.
//!
//! A [`Codec`] describes one encoder and/or decoder by name. FFmpeg
//! registers encoders and decoders separately; entries sharing a name are
//! merged, so `flac` appears once with both [`MediaFlag::ENCODER`] and
//! [`MediaFlag::DECODER`] set.
//!
//! ```no_run
//! use mediakit::{Manager, MediaError, MediaFlag};
//!
//! let manager = Manager::new();
//! for codec in manager.codecs()? {
//!     if codec.flags().is(MediaFlag::AUDIO | MediaFlag::ENCODER) {
//!         println!("{codec}");
//!     }
//! }
//! # Ok::<(), MediaError>(())
//! ```

use std::{
    collections::BTreeMap,
    ffi::{CStr, c_char, c_void},
    fmt::{Display, Formatter, Result as FmtResult},
    ptr,
};

use ffmpeg_next::media::Type as MediaType;
use ffmpeg_sys_next::{AVCodec, av_codec_is_decoder, av_codec_is_encoder, av_codec_iterate};

use crate::{conversion::medium_to_flag, error::MediaError, flags::MediaFlag};

/// An encoder or decoder for one media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codec {
    name: String,
    description: String,
    flags: MediaFlag,
}

impl Codec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, flags: MediaFlag) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            flags,
        }
    }

    /// Unique short name, e.g. `pcm_s16le`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Long, human-readable name. Empty when FFmpeg has none.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Media category plus [`MediaFlag::ENCODER`] and/or
    /// [`MediaFlag::DECODER`].
    pub fn flags(&self) -> MediaFlag {
        self.flags
    }

    pub fn is_encoder(&self) -> bool {
        self.flags.is(MediaFlag::ENCODER)
    }

    pub fn is_decoder(&self) -> bool {
        self.flags.is(MediaFlag::DECODER)
    }
}

impl Display for Codec {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.description.is_empty() {
            write!(f, "{} [{}]", self.name, self.flags)
        } else {
            write!(f, "{} ({}) [{}]", self.name, self.description, self.flags)
        }
    }
}

/// Every codec compiled into the linked FFmpeg, sorted by name.
pub(crate) fn registered() -> Result<Vec<Codec>, MediaError> {
    ffmpeg_next::init()?;

    let mut entries = Vec::new();
    let mut opaque: *mut c_void = ptr::null_mut();
    loop {
        // Iteration state lives in `opaque`; a null codec ends the list.
        let codec = unsafe { av_codec_iterate(&mut opaque) };
        if codec.is_null() {
            break;
        }
        entries.push(unsafe { describe(codec) });
    }

    log::debug!("FFmpeg registers {} encoders and decoders", entries.len());
    Ok(merge(entries))
}

/// # Safety
///
/// `codec` must point to a registered, statically allocated `AVCodec`.
unsafe fn describe(codec: *const AVCodec) -> Codec {
    let raw = unsafe { &*codec };

    let mut flags = medium_to_flag(MediaType::from(raw.type_));
    if unsafe { av_codec_is_encoder(codec) } != 0 {
        flags |= MediaFlag::ENCODER;
    }
    if unsafe { av_codec_is_decoder(codec) } != 0 {
        flags |= MediaFlag::DECODER;
    }

    Codec::new(unsafe { text(raw.name) }, unsafe { text(raw.long_name) }, flags)
}

unsafe fn text(value: *const c_char) -> String {
    if value.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(value) }.to_string_lossy().into_owned()
    }
}

/// Fold entries sharing a name into one, uniting their flags. The first
/// non-empty description wins.
fn merge(entries: impl IntoIterator<Item = Codec>) -> Vec<Codec> {
    let mut by_name: BTreeMap<String, Codec> = BTreeMap::new();
    for entry in entries {
        match by_name.get_mut(&entry.name) {
            Some(existing) => {
                existing.flags |= entry.flags;
                if existing.description.is_empty() {
                    existing.description = entry.description;
                }
            }
            None => {
                by_name.insert(entry.name.clone(), entry);
            }
        }
    }
    by_name.into_values().collect()
}
