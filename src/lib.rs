//! # mediakit
//!
//! Open media containers, select their streams, dispatch demuxed packets to
//! a handler, and convert raw audio between sample formats, rates and
//! channel layouts. Container access and resampling are powered by FFmpeg
//! via the [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate.
//!
//! ## Quick Start
//!
//! ### Inspect a File
//!
//! ```no_run
//! use mediakit::{Manager, Media};
//!
//! let manager = Manager::new();
//! let media = manager.open_file("input.mp4").unwrap();
//! println!("{}: {}", media.url(), media.flags());
//! for stream in media.streams() {
//!     println!("  #{} {} {:?}", stream.index(), stream.flags(), stream.codec());
//! }
//! ```
//!
//! ### Read Packets
//!
//! ```no_run
//! use mediakit::{CancellationToken, Manager, MediaFlag};
//!
//! let manager = Manager::new();
//! let media = manager.open_file("input.mp4").unwrap();
//! let map = manager.map(&media, MediaFlag::VIDEO | MediaFlag::AUDIO).unwrap();
//!
//! manager
//!     .decode(&CancellationToken::new(), map, |_, packet| {
//!         println!("{} {:?} {} bytes", packet.flags(), packet.timestamp(), packet.size());
//!         Ok(())
//!     })
//!     .unwrap();
//! ```
//!
//! ### Convert Audio
//!
//! ```no_run
//! use mediakit::{AudioFormat, AudioFrame, ChannelLayout, SampleFormat};
//!
//! let source = AudioFormat::new(48_000, SampleFormat::FltP, ChannelLayout::Stereo);
//! let frame = AudioFrame::new(source, 1_024).unwrap();
//! let target = AudioFormat::new(44_100, SampleFormat::S16, ChannelLayout::Mono);
//!
//! mediakit::convert(&frame, target, |out| {
//!     println!("{} samples at {:?}", out.samples(), out.timestamp());
//!     Ok(())
//! })
//! .unwrap();
//! ```
//!
//! ## Features
//!
//! - **Media handles** — open files and URLs for reading, create files for
//!   writing, close them individually or all at once
//! - **Stream maps** — select one stream per category (video, audio,
//!   subtitle, data, attachment)
//! - **Packet dispatch** — a single sequential session per media with a
//!   reused packet buffer
//! - **Progress & cancellation** — progress callbacks and a
//!   `CancellationToken` with optional deadline
//! - **Typed metadata** — well-known keys parsed as text, integers, booleans
//!   or timestamps
//! - **Audio conversion** — one-shot or streaming resampling with optional
//!   fixed output buffer sizes
//! - **Codec listing** — every encoder and decoder FFmpeg provides, tagged
//!   with its media category
//! - **Pluggable sources** — anything implementing [`Demuxer`] can be opened
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod audio;
pub mod codec;
pub mod config;
mod conversion;
mod decode;
pub mod demuxer;
pub mod error;
pub mod ffmpeg;
pub mod flags;
pub mod manager;
pub mod map;
pub mod media;
pub mod metadata;
pub mod packet;
pub mod progress;
pub mod resample;
pub mod source;
pub mod stream;

pub use audio::{AudioFormat, AudioFrame, ChannelLayout, ParseAudioError, SampleFormat};
pub use codec::Codec;
pub use config::DecodeOptions;
pub use demuxer::FfmpegDemuxer;
pub use error::{BoxError, ErrorList, MediaError};
pub use ffmpeg::{LogLevel, ParseLogLevelError, log_level, set_log_level};
pub use flags::{MediaFlag, ParseMediaFlagError};
pub use manager::Manager;
pub use map::StreamMap;
pub use media::{InputMedia, Media, MediaId, OutputMedia};
pub use metadata::{MediaKey, Metadata, MetadataValue, ValueType};
pub use packet::{Packet, PacketBuffer};
pub use progress::{CancelReason, CancellationToken, OperationType, ProgressCallback, ProgressInfo};
pub use resample::{Resampler, convert};
pub use source::{ContainerInfo, Demuxer, ReadStatus};
pub use stream::Stream;
