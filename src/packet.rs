//! Demuxed packets.
//!
//! A decode session owns exactly one [`PacketBuffer`] and reads every
//! packet of the container into it, so no allocation happens per packet
//! once the buffer has grown to the largest payload. Handlers receive a
//! [`Packet`] view that borrows the buffer for the duration of the call:
//! the borrow checker rejects any attempt to keep it past the handler's
//! return. Copy the bytes out with [`Packet::to_vec`] if they are needed
//! later.
//!
//! # Example
//!
//! ```no_run
//! use mediakit::{CancellationToken, Manager, MediaError, MediaFlag};
//!
//! let manager = Manager::new();
//! let media = manager.open_file("input.mp4")?;
//! let map = manager.map(&media, MediaFlag::VIDEO)?;
//!
//! let mut keyframes = Vec::new();
//! manager.decode(&CancellationToken::new(), map, |_, packet| {
//!     if packet.is_key_frame() {
//!         keyframes.push((packet.position(), packet.to_vec()));
//!     }
//!     Ok(())
//! })?;
//! # Ok::<(), MediaError>(())
//! ```

use std::time::Duration;

use crate::{flags::MediaFlag, stream::Stream};

/// Reusable storage a [`Demuxer`](crate::Demuxer) reads packets into.
///
/// Fields are public so demuxer implementations can fill them directly.
/// [`release`](PacketBuffer::release) clears the contents between reads
/// while keeping the allocation.
#[derive(Debug, Clone, Default)]
pub struct PacketBuffer {
    /// Index of the stream the packet belongs to.
    pub stream_index: usize,
    /// Whether the packet holds a key frame / sync point.
    pub key_frame: bool,
    /// Byte position in the container, if known.
    pub position: Option<u64>,
    /// Presentation timestamp in the stream's time base.
    pub pts: Option<i64>,
    /// Decoding timestamp in the stream's time base.
    pub dts: Option<i64>,
    /// Presentation timestamp as a duration from the start of the stream.
    pub timestamp: Option<Duration>,
    /// Duration of the packet's content.
    pub duration: Duration,
    /// Packet payload.
    pub data: Vec<u8>,
}

impl PacketBuffer {
    /// An empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty buffer with room for `capacity` payload bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Clear the packet so the next read does not see stale data.
    pub fn release(&mut self) {
        self.stream_index = 0;
        self.key_frame = false;
        self.position = None;
        self.pts = None;
        self.dts = None;
        self.timestamp = None;
        self.duration = Duration::ZERO;
        self.data.clear();
    }
}

/// A packet belonging to one stream, valid for one handler call.
///
/// The `'a` lifetime ties the view to both the session's packet buffer and
/// the media's stream list, so a `Packet` can neither outlive the next read
/// nor the media it came from.
#[derive(Debug, Clone, Copy)]
pub struct Packet<'a> {
    buffer: &'a PacketBuffer,
    stream: &'a Stream,
}

impl<'a> Packet<'a> {
    pub(crate) fn new(buffer: &'a PacketBuffer, stream: &'a Stream) -> Self {
        Self { buffer, stream }
    }

    /// Flags of the stream this packet belongs to.
    pub fn flags(&self) -> MediaFlag {
        self.stream.flags()
    }

    /// The stream this packet belongs to.
    pub fn stream(&self) -> &'a Stream {
        self.stream
    }

    /// Whether the packet holds a key frame.
    pub fn is_key_frame(&self) -> bool {
        self.buffer.key_frame
    }

    /// Byte position in the container, if known.
    pub fn position(&self) -> Option<u64> {
        self.buffer.position
    }

    /// Presentation timestamp in the stream's time base.
    pub fn pts(&self) -> Option<i64> {
        self.buffer.pts
    }

    /// Decoding timestamp in the stream's time base.
    pub fn dts(&self) -> Option<i64> {
        self.buffer.dts
    }

    /// Presentation timestamp as a duration.
    pub fn timestamp(&self) -> Option<Duration> {
        self.buffer.timestamp
    }

    /// Duration of the packet's content.
    pub fn duration(&self) -> Duration {
        self.buffer.duration
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.buffer.data.len()
    }

    /// Payload bytes, valid until the handler returns.
    pub fn bytes(&self) -> &'a [u8] {
        &self.buffer.data
    }

    /// Copy the payload out of the shared buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        self.buffer.data.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_keeps_capacity() {
        let mut buffer = PacketBuffer::with_capacity(16);
        buffer.data.extend_from_slice(&[0u8; 64]);
        buffer.key_frame = true;
        buffer.position = Some(42);
        let capacity = buffer.data.capacity();

        buffer.release();

        assert!(buffer.data.is_empty());
        assert_eq!(buffer.data.capacity(), capacity);
        assert!(!buffer.key_frame);
        assert_eq!(buffer.position, None);
    }

    #[test]
    fn view_reports_stream_flags() {
        let stream = Stream::new(3, MediaFlag::AUDIO);
        let mut buffer = PacketBuffer::new();
        buffer.stream_index = 3;
        buffer.data.extend_from_slice(b"abc");

        let packet = Packet::new(&buffer, &stream);
        assert_eq!(packet.flags(), MediaFlag::AUDIO);
        assert_eq!(packet.stream().index(), 3);
        assert_eq!(packet.size(), 3);
        assert_eq!(packet.bytes(), b"abc");
    }
}
