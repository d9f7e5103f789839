//! Scripted in-memory demuxer shared by the integration tests.

#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use mediakit::{
    ContainerInfo, Demuxer, MediaError, MediaFlag, Metadata, PacketBuffer, ReadStatus, Stream,
};

/// One packet the demuxer will produce.
#[derive(Debug, Clone)]
pub struct ScriptedPacket {
    pub stream_index: usize,
    pub key_frame: bool,
    pub data: Vec<u8>,
}

/// A [`Demuxer`] that replays a fixed packet list.
///
/// Byte positions grow with the payload sizes, and every packet lasts
/// 10 ms on a 1/1000 time base.
pub struct ScriptedDemuxer {
    info: ContainerInfo,
    packets: VecDeque<ScriptedPacket>,
    position: u64,
    clock: i64,
    fail_probe: bool,
    fail_close: bool,
    fail_read_at: Option<usize>,
    reads: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl ScriptedDemuxer {
    pub fn new(streams: Vec<Stream>) -> Self {
        Self {
            info: ContainerInfo {
                streams,
                metadata: Metadata::new(),
                flags: MediaFlag::NONE,
            },
            packets: VecDeque::new(),
            position: 0,
            clock: 0,
            fail_probe: false,
            fail_close: false,
            fail_read_at: None,
            reads: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue one packet per stream index, in order, each with a payload of
    /// `size` bytes. Every first packet of a stream is a key frame.
    pub fn with_packets(mut self, stream_indices: &[usize], size: usize) -> Self {
        let mut seen = Vec::new();
        for (n, &stream_index) in stream_indices.iter().enumerate() {
            let key_frame = !seen.contains(&stream_index);
            seen.push(stream_index);
            self.packets.push_back(ScriptedPacket {
                stream_index,
                key_frame,
                data: vec![n as u8; size],
            });
        }
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.info.metadata = metadata;
        self
    }

    pub fn with_flags(mut self, flags: MediaFlag) -> Self {
        self.info.flags = flags;
        self
    }

    pub fn failing_probe(mut self) -> Self {
        self.fail_probe = true;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Fail the read with this zero-based number.
    pub fn failing_read_at(mut self, read: usize) -> Self {
        self.fail_read_at = Some(read);
        self
    }

    /// Counts `read_packet` calls, including the end-of-stream one.
    pub fn read_counter(&self) -> Arc<AtomicUsize> {
        self.reads.clone()
    }

    /// Counts `close` calls.
    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        self.closes.clone()
    }

    pub fn boxed(self) -> Box<dyn Demuxer> {
        Box::new(self)
    }
}

impl Demuxer for ScriptedDemuxer {
    fn probe(&mut self) -> Result<ContainerInfo, MediaError> {
        if self.fail_probe {
            return Err(MediaError::InvalidParameter("probe"));
        }
        Ok(self.info.clone())
    }

    fn read_packet(&mut self, packet: &mut PacketBuffer) -> Result<ReadStatus, MediaError> {
        let read = self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_read_at == Some(read) {
            return Err(MediaError::ReadFailed {
                url: "scripted".to_string(),
                reason: format!("read {read} failed"),
            });
        }

        let Some(next) = self.packets.pop_front() else {
            return Ok(ReadStatus::EndOfStream);
        };

        packet.stream_index = next.stream_index;
        packet.key_frame = next.key_frame;
        packet.position = Some(self.position);
        packet.pts = Some(self.clock);
        packet.dts = Some(self.clock);
        packet.timestamp = Some(Duration::from_millis(self.clock as u64));
        packet.duration = Duration::from_millis(10);
        packet.data.clear();
        packet.data.extend_from_slice(&next.data);

        self.position += next.data.len() as u64;
        self.clock += 10;
        Ok(ReadStatus::Packet)
    }

    fn close(&mut self) -> Result<(), MediaError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            Err(MediaError::Io(std::io::Error::other("close failed")))
        } else {
            Ok(())
        }
    }
}

/// Streams: video, audio, video, subtitle, audio, data.
pub fn mixed_streams() -> Vec<Stream> {
    vec![
        Stream::new(0, MediaFlag::VIDEO).with_codec("h264"),
        Stream::new(1, MediaFlag::AUDIO).with_codec("aac"),
        Stream::new(2, MediaFlag::VIDEO).with_codec("mjpeg"),
        Stream::new(3, MediaFlag::SUBTITLE).with_codec("mov_text"),
        Stream::new(4, MediaFlag::AUDIO).with_codec("ac3"),
        Stream::new(5, MediaFlag::DATA),
    ]
}

/// Indices of the selected streams of a map.
pub fn selected(map: &mediakit::StreamMap) -> Vec<usize> {
    map.streams().iter().map(Stream::index).collect()
}
