//! Media handles.
//!
//! [`Media`] is the capability set shared by every open container: URL,
//! streams, flags, metadata and an explicit [`close`](Media::close).
//! [`InputMedia`] is a container opened for reading and [`OutputMedia`] one
//! created for writing; neither takes on the other's responsibilities.
//!
//! Handles are created by a [`Manager`](crate::Manager), which tracks them
//! until they are closed.

use std::{
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    path::Path,
    sync::atomic::{AtomicBool, Ordering},
};

use ffmpeg_next::format::context::Output;
use parking_lot::Mutex;

use crate::{
    error::{ErrorList, MediaError},
    flags::MediaFlag,
    metadata::Metadata,
    packet::PacketBuffer,
    source::{Demuxer, ReadStatus},
    stream::Stream,
};

/// Identifies a media handle within its manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaId(pub(crate) u64);

impl Display for MediaId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "#{}", self.0)
    }
}

/// Callback run once when a media handle is closed.
pub(crate) type ReleaseFn = Box<dyn FnOnce(MediaId) -> Result<(), MediaError> + Send>;

/// A source or destination of media.
pub trait Media: Send + Sync + Debug {
    /// Identifier assigned by the manager.
    fn id(&self) -> MediaId;

    /// Path or URL of the backing store.
    fn url(&self) -> &str;

    /// Streams in index order.
    fn streams(&self) -> &[Stream];

    /// Aggregate flags of the media.
    fn flags(&self) -> MediaFlag;

    /// Container-level metadata.
    fn metadata(&self) -> &Metadata;

    /// Whether the handle has not been closed yet.
    fn is_open(&self) -> bool;

    /// Release the underlying container.
    ///
    /// Closing an already closed handle is a no-op returning `Ok(())`.
    fn close(&self) -> Result<(), MediaError>;
}

/// A container opened for reading.
///
/// Streams and metadata are probed once, when the handle is created, and
/// are immutable afterwards. Packets are read through a
/// [`StreamMap`](crate::StreamMap) by [`Manager::decode`](crate::Manager::decode);
/// at most one decode session reads a handle at a time.
pub struct InputMedia {
    id: MediaId,
    url: String,
    streams: Vec<Stream>,
    flags: MediaFlag,
    metadata: Metadata,
    source: Mutex<Option<Box<dyn Demuxer>>>,
    release: Mutex<Option<ReleaseFn>>,
    reading: AtomicBool,
}

impl Debug for InputMedia {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("InputMedia")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("streams", &self.streams)
            .field("flags", &self.flags)
            .field("metadata", &self.metadata)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl InputMedia {
    /// Probe `demuxer` and wrap it in a handle.
    ///
    /// Stream indices must match their position in the probed list.
    pub(crate) fn open(
        id: MediaId,
        url: String,
        mut demuxer: Box<dyn Demuxer>,
        release: ReleaseFn,
    ) -> Result<Self, MediaError> {
        let info = demuxer.probe()?;

        if let Some((position, stream)) = info
            .streams
            .iter()
            .enumerate()
            .find(|(position, stream)| stream.index() != *position)
        {
            return Err(MediaError::OpenFailed {
                path: url.into(),
                reason: format!(
                    "stream at position {position} reports index {}",
                    stream.index()
                ),
            });
        }

        let mut flags = info.flags | info.metadata.flags();
        for stream in &info.streams {
            flags |= stream.flags();
        }

        Ok(Self {
            id,
            url,
            streams: info.streams,
            flags,
            metadata: info.metadata,
            source: Mutex::new(Some(demuxer)),
            release: Mutex::new(Some(release)),
            reading: AtomicBool::new(false),
        })
    }

    /// The stream with `index`, if any.
    pub fn stream(&self, index: usize) -> Option<&Stream> {
        self.streams.get(index)
    }

    /// Streams of the given category, in index order.
    pub fn streams_by_category(&self, category: MediaFlag) -> impl Iterator<Item = &Stream> {
        self.streams
            .iter()
            .filter(move |stream| stream.flags().is(category))
    }

    /// Read the next packet from the container.
    pub(crate) fn read_packet(&self, packet: &mut PacketBuffer) -> Result<ReadStatus, MediaError> {
        let mut source = self.source.lock();
        let demuxer = source
            .as_mut()
            .ok_or_else(|| MediaError::Closed(self.url.clone()))?;
        demuxer.read_packet(packet)
    }

    /// Take the reader lease for a decode session.
    pub(crate) fn begin_read(&self) -> Result<(), MediaError> {
        self.reading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| MediaError::Busy(self.url.clone()))
    }

    /// Give the reader lease back.
    pub(crate) fn end_read(&self) -> Result<(), MediaError> {
        if self.reading.swap(false, Ordering::AcqRel) {
            Ok(())
        } else {
            Err(MediaError::InvalidParameter("reader lease"))
        }
    }
}

impl Media for InputMedia {
    fn id(&self) -> MediaId {
        self.id
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn streams(&self) -> &[Stream] {
        &self.streams
    }

    fn flags(&self) -> MediaFlag {
        self.flags
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn is_open(&self) -> bool {
        self.source.lock().is_some()
    }

    fn close(&self) -> Result<(), MediaError> {
        let Some(mut demuxer) = self.source.lock().take() else {
            return Ok(());
        };
        log::debug!("Closing input media {} ({})", self.id, self.url);

        let mut errors = ErrorList::new();
        errors.record(demuxer.close());
        drop(demuxer);

        if let Some(release) = self.release.lock().take() {
            errors.record(release(self.id));
        }
        errors.into_result()
    }
}

/// A container created for writing.
///
/// Streams are added explicitly by the writer; this handle covers creation
/// and release of the output context.
pub struct OutputMedia {
    id: MediaId,
    url: String,
    format: String,
    metadata: Metadata,
    context: Mutex<Option<Output>>,
    release: Mutex<Option<ReleaseFn>>,
}

impl Debug for OutputMedia {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("OutputMedia")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("format", &self.format)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl OutputMedia {
    /// Create `path` for writing. The container format is guessed from the
    /// file extension.
    pub(crate) fn create(id: MediaId, path: &Path, release: ReleaseFn) -> Result<Self, MediaError> {
        ffmpeg_next::init().map_err(|error| MediaError::CreateFailed {
            path: path.to_path_buf(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let context = ffmpeg_next::format::output(&path).map_err(|error| {
            MediaError::CreateFailed {
                path: path.to_path_buf(),
                reason: error.to_string(),
            }
        })?;
        let format = context.format().name().to_string();

        log::debug!("Created output media {} (format={})", path.display(), format);

        Ok(Self {
            id,
            url: path.display().to_string(),
            format,
            metadata: Metadata::new(),
            context: Mutex::new(Some(context)),
            release: Mutex::new(Some(release)),
        })
    }

    /// Name of the container format chosen for the output.
    pub fn format_name(&self) -> &str {
        &self.format
    }
}

impl Media for OutputMedia {
    fn id(&self) -> MediaId {
        self.id
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn streams(&self) -> &[Stream] {
        &[]
    }

    fn flags(&self) -> MediaFlag {
        MediaFlag::FILE
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn is_open(&self) -> bool {
        self.context.lock().is_some()
    }

    fn close(&self) -> Result<(), MediaError> {
        let Some(context) = self.context.lock().take() else {
            return Ok(());
        };
        log::debug!("Closing output media {} ({})", self.id, self.url);
        drop(context);

        match self.release.lock().take() {
            Some(release) => release(self.id),
            None => Ok(()),
        }
    }
}
