//! The container library boundary.
//!
//! [`Demuxer`] is the collaborator interface the decode pipeline is built
//! on: probe a container once, then read packets one at a time until a
//! distinct end-of-stream signal. [`FfmpegDemuxer`](crate::FfmpegDemuxer)
//! implements it on top of FFmpeg; any other implementation can be opened
//! through [`Manager::open_source`](crate::Manager::open_source).

use crate::{error::MediaError, flags::MediaFlag, metadata::Metadata, packet::PacketBuffer, stream::Stream};

/// Outcome of a successful [`Demuxer::read_packet`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// A packet was read into the buffer.
    Packet,
    /// The container has no more packets. Not an error.
    EndOfStream,
}

/// What a container declares about itself when probed.
#[derive(Debug, Clone, Default)]
pub struct ContainerInfo {
    /// Streams in index order.
    pub streams: Vec<Stream>,
    /// Container-level metadata.
    pub metadata: Metadata,
    /// Flags describing the backing store itself, such as
    /// [`MediaFlag::FILE`]. Stream and metadata flags are derived by the
    /// media handle and need not be repeated here.
    pub flags: MediaFlag,
}

/// A readable media container.
///
/// All calls are synchronous and blocking. Implementations are driven by a
/// single decode session at a time and need not be thread-safe beyond
/// [`Send`].
pub trait Demuxer: Send {
    /// Enumerate streams and metadata. Called once, when the media is opened.
    fn probe(&mut self) -> Result<ContainerInfo, MediaError>;

    /// Read the next packet into `packet`, overwriting its contents.
    ///
    /// Returns [`ReadStatus::EndOfStream`] once the container is exhausted;
    /// any other failure is an error.
    fn read_packet(&mut self, packet: &mut PacketBuffer) -> Result<ReadStatus, MediaError>;

    /// Release the container. Called at most once.
    fn close(&mut self) -> Result<(), MediaError> {
        Ok(())
    }
}
