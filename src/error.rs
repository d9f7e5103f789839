//! Error types for the `mediakit` crate.
//!
//! This module defines [`MediaError`], the unified error type returned by all
//! fallible operations in the crate, and [`ErrorList`], the aggregate used
//! wherever several independent steps may each fail (closing every open
//! media, or a failed read followed by a failed session close).

use std::{
    error::Error as StdError,
    fmt::{Display, Formatter, Result as FmtResult},
    io::Error as IoError,
    path::PathBuf,
    slice::{Iter, from_ref},
    vec::IntoIter,
};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

use crate::{
    audio::{ChannelLayout, SampleFormat},
    progress::CancelReason,
};

/// Boxed error returned from caller-supplied handlers.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// The unified error type for all `mediakit` operations.
///
/// Every public method that can fail returns `Result<T, MediaError>`.
/// Variants carry enough context (operation, path) to diagnose the problem
/// without additional logging at the call site.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MediaError {
    /// A media container could not be opened or probed for reading.
    #[error("Failed to open media at {path}: {reason}")]
    OpenFailed {
        /// Path or URL that was passed to [`crate::Manager::open_file`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// A media container could not be created for writing.
    #[error("Failed to create media at {path}: {reason}")]
    CreateFailed {
        /// Path that was passed to [`crate::Manager::create_file`].
        path: PathBuf,
        /// Underlying reason the creation failed.
        reason: String,
    },

    /// A required parameter was missing or could not be resolved.
    #[error("Bad parameter: {0}")]
    InvalidParameter(&'static str),

    /// The media handle has already been closed.
    #[error("Media is closed: {0}")]
    Closed(String),

    /// Another decode session is already reading from this media.
    #[error("Media is already being decoded: {0}")]
    Busy(String),

    /// Reading the next packet from the container failed.
    #[error("Failed to read packet from {url}: {reason}")]
    ReadFailed {
        /// URL of the media being read.
        url: String,
        /// Underlying reason the read failed.
        reason: String,
    },

    /// A caller-supplied handler or callback asked to stop.
    #[error("Handler error: {0}")]
    Handler(#[source] BoxError),

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled: {0}")]
    Cancelled(CancelReason),

    /// The sample format cannot be used for conversion.
    #[error("Unsupported sample format: {0}")]
    UnsupportedSampleFormat(SampleFormat),

    /// The channel layout cannot be used for conversion.
    #[error("Unsupported channel layout: {0}")]
    UnsupportedChannelLayout(ChannelLayout),

    /// An audio buffer does not match its declared format.
    #[error("Invalid audio frame: {0}")]
    InvalidAudioFrame(String),

    /// The software resampler failed.
    #[error("Resample error: {0}")]
    Resample(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Embedded artwork could not be decoded.
    #[error("Image processing error: {0}")]
    Image(#[from] ImageError),

    /// Several independent steps failed.
    #[error("{0}")]
    Multiple(ErrorList),
}

impl From<FfmpegError> for MediaError {
    fn from(error: FfmpegError) -> Self {
        MediaError::Ffmpeg(error.to_string())
    }
}

impl From<ErrorList> for MediaError {
    fn from(list: ErrorList) -> Self {
        MediaError::Multiple(list)
    }
}

impl MediaError {
    /// Wrap any error (or message) returned from a handler.
    ///
    /// ```
    /// use mediakit::MediaError;
    ///
    /// let error = MediaError::handler("stop here");
    /// assert_eq!(error.to_string(), "Handler error: stop here");
    /// ```
    pub fn handler<E: Into<BoxError>>(error: E) -> Self {
        MediaError::Handler(error.into())
    }

    /// The individual errors behind this one.
    ///
    /// For [`MediaError::Multiple`] these are the aggregated errors; for any
    /// other variant it is a one-element slice containing `self`.
    pub fn errors(&self) -> &[MediaError] {
        match self {
            MediaError::Multiple(list) => list.as_slice(),
            other => from_ref(other),
        }
    }

    /// The cancellation reason, if this error (or any aggregated error)
    /// reports a cancellation.
    pub fn cancel_reason(&self) -> Option<CancelReason> {
        self.errors().iter().find_map(|error| match error {
            MediaError::Cancelled(reason) => Some(*reason),
            _ => None,
        })
    }

    /// Whether this error (or any aggregated error) is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_reason().is_some()
    }
}

/// An ordered collection of errors from independent steps.
///
/// Pushing a [`MediaError::Multiple`] flattens it, so an `ErrorList` never
/// contains nested aggregates and every contributing error stays
/// individually inspectable.
#[derive(Debug, Default)]
pub struct ErrorList {
    errors: Vec<MediaError>,
}

impl ErrorList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error.
    pub fn push(&mut self, error: MediaError) {
        match error {
            MediaError::Multiple(list) => self.errors.extend(list.errors),
            other => self.errors.push(other),
        }
    }

    /// Record the error of `result`, if any.
    pub fn record(&mut self, result: Result<(), MediaError>) {
        if let Err(error) = result {
            self.push(error);
        }
    }

    /// Number of recorded errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether no error was recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterate over the recorded errors in the order they occurred.
    pub fn iter(&self) -> Iter<'_, MediaError> {
        self.errors.iter()
    }

    /// The recorded errors as a slice.
    pub fn as_slice(&self) -> &[MediaError] {
        &self.errors
    }

    /// `Ok(())` when empty, otherwise the whole list as
    /// [`MediaError::Multiple`].
    pub fn into_result(self) -> Result<(), MediaError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(MediaError::Multiple(self))
        }
    }
}

impl Display for ErrorList {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.errors.len() {
            1 => write!(f, "1 error occurred:")?,
            count => write!(f, "{count} errors occurred:")?,
        }
        for error in &self.errors {
            write!(f, "\n\t* {error}")?;
        }
        Ok(())
    }
}

impl IntoIterator for ErrorList {
    type Item = MediaError;
    type IntoIter = IntoIter<MediaError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ErrorList {
    type Item = &'a MediaError;
    type IntoIter = Iter<'a, MediaError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}
