//! Stream selection.
//!
//! A [`StreamMap`] picks which streams of an [`InputMedia`] a decode
//! session dispatches to its handler. Build one with
//! [`Manager::map`](crate::Manager::map) and hand it to
//! [`Manager::decode`](crate::Manager::decode), which consumes it.

use std::sync::{Arc, Weak};

use crate::{
    error::MediaError,
    flags::MediaFlag,
    media::{InputMedia, Media},
    packet::PacketBuffer,
    stream::Stream,
};

/// Initial payload capacity of a session's packet buffer.
const PACKET_CAPACITY: usize = 64 * 1024;

/// The streams of one input media selected for decoding.
///
/// The map does not keep its media alive; if every handle to the media is
/// dropped, decoding the map fails validation.
#[derive(Debug)]
pub struct StreamMap {
    input: Weak<InputMedia>,
    url: String,
    streams: Vec<Stream>,
    pub(crate) packet: Option<PacketBuffer>,
}

impl StreamMap {
    /// Select streams of `input`.
    ///
    /// With [`MediaFlag::NONE`] one stream per category is picked;
    /// otherwise only the categories present in `flags` are considered.
    /// Within a category the first stream by index wins, and a stream is
    /// counted only for the first category it matches.
    pub(crate) fn build(input: &Arc<InputMedia>, flags: MediaFlag) -> Result<Self, MediaError> {
        if !input.is_open() {
            return Err(MediaError::Closed(input.url().to_string()));
        }

        let mut wanted = if flags.is_none() {
            MediaFlag::ALL_CATEGORIES
        } else {
            flags & MediaFlag::ALL_CATEGORIES
        };

        let mut streams = Vec::new();
        for stream in input.streams() {
            if wanted.is_none() {
                break;
            }
            if let Some(category) = MediaFlag::CATEGORIES
                .into_iter()
                .find(|category| wanted.is(*category) && stream.flags().is(*category))
            {
                wanted.remove(category);
                streams.push(stream.clone());
            }
        }

        log::debug!(
            "Mapped {} of {} streams from {} (selector={})",
            streams.len(),
            input.streams().len(),
            input.url(),
            flags
        );

        Ok(Self {
            input: Arc::downgrade(input),
            url: input.url().to_string(),
            streams,
            packet: Some(PacketBuffer::with_capacity(PACKET_CAPACITY)),
        })
    }

    /// The mapped media, if it is still alive.
    pub fn input(&self) -> Option<Arc<InputMedia>> {
        self.input.upgrade()
    }

    /// URL of the mapped media.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Selected streams, in index order.
    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    /// Whether the stream with `index` is selected.
    pub fn is_selected(&self, index: usize) -> bool {
        self.streams.iter().any(|stream| stream.index() == index)
    }

    /// Whether no stream was selected.
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// End a decode session: drop the packet buffer and give back the
    /// reader lease on `input`.
    pub(crate) fn close(&mut self, input: &InputMedia) -> Result<(), MediaError> {
        self.packet = None;
        input.end_read()
    }
}
