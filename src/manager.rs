//! The media manager.
//!
//! A [`Manager`] is the entry point of the crate: it opens and creates
//! media, builds stream maps, runs decode sessions and keeps track of every
//! handle it produced until that handle is closed.
//!
//! # Example
//!
//! ```no_run
//! use mediakit::{CancellationToken, Manager, Media, MediaError, MediaFlag};
//!
//! let manager = Manager::new();
//! let media = manager.open_file("input.mp4")?;
//! println!("{} streams, flags {}", media.streams().len(), media.flags());
//!
//! let map = manager.map(&media, MediaFlag::NONE)?;
//! let mut bytes = 0;
//! manager.decode(&CancellationToken::new(), map, |_, packet| {
//!     bytes += packet.size();
//!     Ok(())
//! })?;
//!
//! manager.close()?;
//! # Ok::<(), MediaError>(())
//! ```

use std::{
    collections::HashMap,
    fmt::{Debug, Formatter, Result as FmtResult},
    path::Path,
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use parking_lot::Mutex;

use crate::{
    codec::{self, Codec},
    config::DecodeOptions,
    decode,
    demuxer::FfmpegDemuxer,
    error::{ErrorList, MediaError},
    ffmpeg::{LogLevel, set_log_level},
    flags::MediaFlag,
    map::StreamMap,
    media::{InputMedia, Media, MediaId, OutputMedia, ReleaseFn},
    packet::Packet,
    progress::CancellationToken,
    source::Demuxer,
};

/// Media currently open through one manager.
#[derive(Default)]
struct Registry {
    open: Mutex<HashMap<MediaId, Arc<dyn Media>>>,
    next_id: AtomicU64,
}

impl Registry {
    fn next_id(&self) -> MediaId {
        MediaId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn insert(&self, media: Arc<dyn Media>) {
        self.open.lock().insert(media.id(), media);
    }

    fn snapshot(&self) -> Vec<Arc<dyn Media>> {
        let mut media: Vec<Arc<dyn Media>> = self.open.lock().values().cloned().collect();
        media.sort_by_key(|media| media.id());
        media
    }
}

/// A release callback that removes the media from `registry`.
fn deregister(registry: &Arc<Registry>) -> ReleaseFn {
    let registry: Weak<Registry> = Arc::downgrade(registry);
    Box::new(move |id| {
        if let Some(registry) = registry.upgrade() {
            registry.open.lock().remove(&id);
        }
        Ok(())
    })
}

/// Opens media and runs decode sessions.
///
/// Every handle returned by [`open_file`](Manager::open_file),
/// [`open_source`](Manager::open_source) and
/// [`create_file`](Manager::create_file) stays registered until it is
/// closed, either on its own or through [`Manager::close`]. Dropping the
/// manager closes whatever is still open.
///
/// `Manager` is `Send + Sync`; independent decode sessions may run on
/// different threads.
pub struct Manager {
    registry: Arc<Registry>,
    debug: AtomicBool,
}

impl Debug for Manager {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Manager")
            .field("open", &self.len())
            .field("debug", &self.is_debug())
            .finish()
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl Manager {
    /// A manager with nothing open.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry::default()),
            debug: AtomicBool::new(false),
        }
    }

    /// Open a media file (or URL) for reading with FFmpeg.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::OpenFailed`] if the file cannot be opened or
    /// probed.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use mediakit::{Manager, Media, MediaError};
    ///
    /// let manager = Manager::new();
    /// let media = manager.open_file("song.m4a")?;
    /// for stream in media.streams() {
    ///     println!("#{} {} {:?}", stream.index(), stream.flags(), stream.codec());
    /// }
    /// # Ok::<(), MediaError>(())
    /// ```
    pub fn open_file<P: AsRef<Path>>(&self, path: P) -> Result<Arc<InputMedia>, MediaError> {
        let path = path.as_ref();
        log::debug!("Opening media file: {}", path.display());

        let demuxer = FfmpegDemuxer::open(path)?;
        self.open_source(path.display().to_string(), Box::new(demuxer))
    }

    /// Open media read through any [`Demuxer`].
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::OpenFailed`] if probing fails.
    pub fn open_source(
        &self,
        url: impl Into<String>,
        demuxer: Box<dyn Demuxer>,
    ) -> Result<Arc<InputMedia>, MediaError> {
        let url = url.into();
        let id = self.registry.next_id();

        let media = InputMedia::open(id, url.clone(), demuxer, deregister(&self.registry))
            .map_err(|error| match error {
                MediaError::OpenFailed { .. } => error,
                other => MediaError::OpenFailed {
                    path: url.clone().into(),
                    reason: other.to_string(),
                },
            })?;
        let media = Arc::new(media);

        log::info!(
            "Opened {} {}: {} streams, flags {}",
            url,
            id,
            media.streams().len(),
            media.flags()
        );

        self.registry.insert(media.clone());
        Ok(media)
    }

    /// Create a media file for writing. The container format is chosen
    /// from the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::CreateFailed`] if the file cannot be created.
    pub fn create_file<P: AsRef<Path>>(&self, path: P) -> Result<Arc<OutputMedia>, MediaError> {
        let path = path.as_ref();
        log::debug!("Creating media file: {}", path.display());

        let id = self.registry.next_id();
        let media = Arc::new(OutputMedia::create(id, path, deregister(&self.registry))?);
        self.registry.insert(media.clone());
        Ok(media)
    }

    /// Select streams of `media` for decoding.
    ///
    /// With [`MediaFlag::NONE`] the first video, audio, subtitle, data and
    /// attachment stream (by index) are selected; otherwise only the
    /// categories present in `flags`. Selecting nothing is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Closed`] if `media` has been closed.
    pub fn map(&self, media: &Arc<InputMedia>, flags: MediaFlag) -> Result<StreamMap, MediaError> {
        StreamMap::build(media, flags)
    }

    /// Read every packet of the mapped media and call `handler` for those
    /// of selected streams, in container order.
    ///
    /// The session runs on the calling thread and returns once the
    /// container is exhausted, the handler fails, a read fails or `token`
    /// is cancelled. The token is checked before every read.
    ///
    /// # Errors
    ///
    /// Validation failures ([`MediaError::InvalidParameter`] for a dropped
    /// or closed media, [`MediaError::Busy`] when another session is
    /// reading the same media) are returned directly. Anything that goes
    /// wrong once reading has started is returned as
    /// [`MediaError::Multiple`]; use [`MediaError::errors`] and
    /// [`MediaError::is_cancelled`] to inspect it.
    pub fn decode<F>(
        &self,
        token: &CancellationToken,
        map: StreamMap,
        handler: F,
    ) -> Result<(), MediaError>
    where
        F: FnMut(&CancellationToken, &Packet<'_>) -> Result<(), MediaError>,
    {
        decode::run(token, map, &DecodeOptions::default(), handler)
    }

    /// [`decode`](Manager::decode) with progress reporting.
    pub fn decode_with_options<F>(
        &self,
        token: &CancellationToken,
        map: StreamMap,
        options: &DecodeOptions,
        handler: F,
    ) -> Result<(), MediaError>
    where
        F: FnMut(&CancellationToken, &Packet<'_>) -> Result<(), MediaError>,
    {
        decode::run(token, map, options, handler)
    }

    /// Every encoder and decoder in the linked FFmpeg, one entry per codec
    /// name, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Ffmpeg`] if FFmpeg fails to initialise.
    pub fn codecs(&self) -> Result<Vec<Codec>, MediaError> {
        codec::registered()
    }

    /// Switch FFmpeg's console output between debug verbosity and silence.
    ///
    /// FFmpeg's log level is process-wide, so this affects every manager.
    pub fn set_debug(&self, debug: bool) {
        self.debug.store(debug, Ordering::Relaxed);
        set_log_level(if debug { LogLevel::Debug } else { LogLevel::Quiet });
    }

    /// Whether [`set_debug(true)`](Manager::set_debug) was called last.
    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    /// Handles currently open, in creation order.
    pub fn open_media(&self) -> Vec<Arc<dyn Media>> {
        self.registry.snapshot()
    }

    /// Number of open handles.
    pub fn len(&self) -> usize {
        self.registry.open.lock().len()
    }

    /// Whether no handle is open.
    pub fn is_empty(&self) -> bool {
        self.registry.open.lock().is_empty()
    }

    /// Close every open handle.
    ///
    /// Every handle is attempted even if an earlier one fails.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Multiple`] holding each failure.
    pub fn close(&self) -> Result<(), MediaError> {
        let media = self.registry.snapshot();
        log::debug!("Closing {} open media", media.len());

        let mut errors = ErrorList::new();
        for media in media {
            if let Err(error) = media.close() {
                log::debug!("Closing {} failed: {}", media.url(), error);
                self.registry.open.lock().remove(&media.id());
                errors.push(error);
            }
        }
        errors.into_result()
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            log::warn!("Failed to close media on drop: {error}");
        }
    }
}
