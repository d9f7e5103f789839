//! Streams multiplexed in a media container.

use std::sync::Arc;

use image::DynamicImage;

use crate::{error::MediaError, flags::MediaFlag, metadata::Metadata};

/// One logical stream of a media container.
///
/// A `Stream` is an immutable snapshot taken when its media is opened and
/// is identified by its zero-based index within that media. Cloning is
/// cheap: artwork bytes are shared.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    index: usize,
    flags: MediaFlag,
    codec: Option<String>,
    time_base: Option<(i32, i32)>,
    metadata: Metadata,
    artwork: Option<Arc<[u8]>>,
}

impl Stream {
    /// A stream with the given index and flags.
    pub fn new(index: usize, flags: MediaFlag) -> Self {
        Self {
            index,
            flags,
            codec: None,
            time_base: None,
            metadata: Metadata::new(),
            artwork: None,
        }
    }

    /// Attach the codec name.
    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = Some(codec.into());
        self
    }

    /// Attach the stream time base as numerator / denominator.
    pub fn with_time_base(mut self, numerator: i32, denominator: i32) -> Self {
        self.time_base = Some((numerator, denominator));
        self
    }

    /// Attach per-stream metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Attach artwork bytes. Sets [`MediaFlag::ARTWORK`].
    pub fn with_artwork(mut self, artwork: impl Into<Arc<[u8]>>) -> Self {
        self.artwork = Some(artwork.into());
        self.flags |= MediaFlag::ARTWORK;
        self
    }

    /// Zero-based index of the stream in its media.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Kind and properties of the stream.
    pub fn flags(&self) -> MediaFlag {
        self.flags
    }

    /// The stream category (video, audio, subtitle, data, attachment), or
    /// [`MediaFlag::NONE`] for streams of unknown kind.
    pub fn category(&self) -> MediaFlag {
        MediaFlag::CATEGORIES
            .into_iter()
            .find(|category| self.flags.is(*category))
            .unwrap_or(MediaFlag::NONE)
    }

    /// Codec name, if known.
    pub fn codec(&self) -> Option<&str> {
        self.codec.as_deref()
    }

    /// Stream time base as numerator / denominator, if known.
    pub fn time_base(&self) -> Option<(i32, i32)> {
        self.time_base
    }

    /// Per-stream metadata (language, title, ...).
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Raw artwork bytes. `None` unless [`MediaFlag::ARTWORK`] is set.
    pub fn artwork(&self) -> Option<&[u8]> {
        if self.flags.is(MediaFlag::ARTWORK) {
            self.artwork.as_deref()
        } else {
            None
        }
    }

    /// Decode the artwork into an image.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::InvalidParameter`] if the stream has no artwork
    /// and [`MediaError::Image`] if the bytes cannot be decoded.
    pub fn artwork_image(&self) -> Result<DynamicImage, MediaError> {
        let bytes = self
            .artwork()
            .ok_or(MediaError::InvalidParameter("artwork"))?;
        Ok(image::load_from_memory(bytes)?)
    }
}
