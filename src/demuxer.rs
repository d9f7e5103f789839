//! FFmpeg-backed [`Demuxer`].

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::Path,
    slice,
    time::Duration,
};

use ffmpeg_next::{
    Error as FfmpegError, Packet as FfmpegPacket, Rational, format::context::Input,
    format::stream::Disposition,
};
use ffmpeg_sys_next::AVPacket;

use crate::{
    conversion::{medium_to_flag, pts_to_duration},
    error::MediaError,
    flags::MediaFlag,
    metadata::{MediaKey, Metadata},
    packet::PacketBuffer,
    source::{ContainerInfo, Demuxer, ReadStatus},
    stream::Stream,
};

/// Time base assumed for streams that do not declare one.
const FALLBACK_TIME_BASE: Rational = Rational(1, 90_000);

/// Reads packets from any container FFmpeg can open.
pub struct FfmpegDemuxer {
    input: Input,
    url: String,
    local: bool,
    time_bases: Vec<Rational>,
}

impl Debug for FfmpegDemuxer {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FfmpegDemuxer")
            .field("url", &self.url)
            .field("format", &self.input.format().name())
            .field("streams", &self.time_bases.len())
            .finish_non_exhaustive()
    }
}

impl FfmpegDemuxer {
    /// Open `path` (a file path or a URL FFmpeg understands).
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::OpenFailed`] if FFmpeg cannot open or probe the
    /// container.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MediaError> {
        let path = path.as_ref();

        ffmpeg_next::init().map_err(|error| MediaError::OpenFailed {
            path: path.to_path_buf(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input = ffmpeg_next::format::input(&path).map_err(|error| MediaError::OpenFailed {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;

        let time_bases = input
            .streams()
            .map(|stream| stream.time_base())
            .map(|time_base| {
                if time_base.denominator() > 0 {
                    time_base
                } else {
                    FALLBACK_TIME_BASE
                }
            })
            .collect();
        let url = path.display().to_string();

        Ok(Self {
            local: !url.contains("://"),
            input,
            url,
            time_bases,
        })
    }

    /// Name of the container format, e.g. `mov,mp4,m4a,3gp,3g2,mj2`.
    pub fn format_name(&self) -> &str {
        self.input.format().name()
    }

    /// Container duration, if FFmpeg knows it.
    pub fn duration(&self) -> Option<Duration> {
        let microseconds = self.input.duration();
        (microseconds > 0).then(|| Duration::from_micros(microseconds as u64))
    }

    fn time_base(&self, index: usize) -> Rational {
        self.time_bases
            .get(index)
            .copied()
            .unwrap_or(FALLBACK_TIME_BASE)
    }
}

impl Demuxer for FfmpegDemuxer {
    fn probe(&mut self) -> Result<ContainerInfo, MediaError> {
        let mut metadata = Metadata::new();
        for (key, value) in self.input.metadata().iter() {
            metadata.insert_raw(MediaKey::new(key), value);
        }

        let mut streams = Vec::with_capacity(self.time_bases.len());
        for stream in self.input.streams() {
            let parameters = stream.parameters();
            let mut flags = medium_to_flag(parameters.medium());
            let disposition = stream.disposition();
            if disposition.contains(Disposition::CAPTIONS) {
                flags |= MediaFlag::CAPTIONS;
            }

            let time_base = self.time_base(stream.index());
            let mut stream_metadata = Metadata::new();
            for (key, value) in stream.metadata().iter() {
                stream_metadata.insert_raw(MediaKey::new(key), value);
            }

            let mut entry = Stream::new(stream.index(), flags)
                .with_codec(parameters.id().name())
                .with_time_base(time_base.numerator(), time_base.denominator())
                .with_metadata(stream_metadata);

            if disposition.contains(Disposition::ATTACHED_PIC) {
                // The attached picture packet is owned by the stream and
                // lives as long as the input context.
                let artwork = unsafe {
                    let picture: &AVPacket = &(*stream.as_ptr()).attached_pic;
                    if picture.data.is_null() || picture.size <= 0 {
                        None
                    } else {
                        Some(slice::from_raw_parts(picture.data, picture.size as usize).to_vec())
                    }
                };
                if let Some(artwork) = artwork {
                    entry = entry.with_artwork(artwork);
                }
            }

            streams.push(entry);
        }

        Ok(ContainerInfo {
            streams,
            metadata,
            flags: if self.local {
                MediaFlag::FILE
            } else {
                MediaFlag::NONE
            },
        })
    }

    fn read_packet(&mut self, packet: &mut PacketBuffer) -> Result<ReadStatus, MediaError> {
        let mut source = FfmpegPacket::empty();
        match source.read(&mut self.input) {
            Ok(()) => {}
            Err(FfmpegError::Eof) => return Ok(ReadStatus::EndOfStream),
            Err(error) => {
                return Err(MediaError::ReadFailed {
                    url: self.url.clone(),
                    reason: error.to_string(),
                });
            }
        }

        let time_base = self.time_base(source.stream());
        packet.stream_index = source.stream();
        packet.key_frame = source.is_key();
        packet.position = u64::try_from(source.position()).ok();
        packet.pts = source.pts();
        packet.dts = source.dts();
        packet.timestamp = source.pts().map(|pts| pts_to_duration(pts, time_base));
        packet.duration = pts_to_duration(source.duration(), time_base);
        packet.data.clear();
        if let Some(data) = source.data() {
            packet.data.extend_from_slice(data);
        }
        Ok(ReadStatus::Packet)
    }

    fn close(&mut self) -> Result<(), MediaError> {
        log::debug!("Closing demuxer for {}", self.url);
        Ok(())
    }
}
