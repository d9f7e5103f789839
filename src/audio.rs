//! Raw audio buffers and their formats.
//!
//! An [`AudioFrame`] holds uncompressed samples described by an
//! [`AudioFormat`]: sample rate, [`SampleFormat`] and [`ChannelLayout`].
//! Packed formats store every channel interleaved in a single plane; planar
//! formats store one plane per channel.
//!
//! ```
//! use mediakit::{AudioFormat, AudioFrame, ChannelLayout, SampleFormat};
//!
//! let format = AudioFormat::new(48_000, SampleFormat::S16P, ChannelLayout::Stereo);
//! let frame = AudioFrame::new(format, 480)?;
//! assert_eq!(frame.channels(), 2);
//! assert_eq!(frame.linesize(), 960);
//! assert_eq!(frame.bytes(1).map(<[u8]>::len), Some(960));
//! # Ok::<(), mediakit::MediaError>(())
//! ```

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
    time::Duration,
};

use crate::error::MediaError;

/// Representation of a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleFormat {
    /// Unspecified.
    #[default]
    None,
    /// Unsigned 8-bit, packed.
    U8,
    /// Signed 16-bit, packed.
    S16,
    /// Signed 32-bit, packed.
    S32,
    /// 32-bit float, packed.
    Flt,
    /// 64-bit float, packed.
    Dbl,
    /// Unsigned 8-bit, planar.
    U8P,
    /// Signed 16-bit, planar.
    S16P,
    /// Signed 32-bit, planar.
    S32P,
    /// 32-bit float, planar.
    FltP,
    /// 64-bit float, planar.
    DblP,
    /// Signed 64-bit, packed.
    S64,
    /// Signed 64-bit, planar.
    S64P,
}

const SAMPLE_FORMAT_NAMES: [(SampleFormat, &str); 13] = [
    (SampleFormat::None, "none"),
    (SampleFormat::U8, "u8"),
    (SampleFormat::S16, "s16"),
    (SampleFormat::S32, "s32"),
    (SampleFormat::Flt, "flt"),
    (SampleFormat::Dbl, "dbl"),
    (SampleFormat::U8P, "u8p"),
    (SampleFormat::S16P, "s16p"),
    (SampleFormat::S32P, "s32p"),
    (SampleFormat::FltP, "fltp"),
    (SampleFormat::DblP, "dblp"),
    (SampleFormat::S64, "s64"),
    (SampleFormat::S64P, "s64p"),
];

impl SampleFormat {
    /// Whether each channel has its own plane.
    pub fn is_planar(self) -> bool {
        matches!(
            self,
            SampleFormat::U8P
                | SampleFormat::S16P
                | SampleFormat::S32P
                | SampleFormat::FltP
                | SampleFormat::DblP
                | SampleFormat::S64P
        )
    }

    /// Size of one sample of one channel, zero for [`SampleFormat::None`].
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::None => 0,
            SampleFormat::U8 | SampleFormat::U8P => 1,
            SampleFormat::S16 | SampleFormat::S16P => 2,
            SampleFormat::S32 | SampleFormat::S32P | SampleFormat::Flt | SampleFormat::FltP => 4,
            SampleFormat::Dbl | SampleFormat::DblP | SampleFormat::S64 | SampleFormat::S64P => 8,
        }
    }

    /// The packed counterpart of this format.
    pub fn packed(self) -> SampleFormat {
        match self {
            SampleFormat::U8P => SampleFormat::U8,
            SampleFormat::S16P => SampleFormat::S16,
            SampleFormat::S32P => SampleFormat::S32,
            SampleFormat::FltP => SampleFormat::Flt,
            SampleFormat::DblP => SampleFormat::Dbl,
            SampleFormat::S64P => SampleFormat::S64,
            other => other,
        }
    }

    /// The planar counterpart of this format.
    pub fn planar(self) -> SampleFormat {
        match self {
            SampleFormat::U8 => SampleFormat::U8P,
            SampleFormat::S16 => SampleFormat::S16P,
            SampleFormat::S32 => SampleFormat::S32P,
            SampleFormat::Flt => SampleFormat::FltP,
            SampleFormat::Dbl => SampleFormat::DblP,
            SampleFormat::S64 => SampleFormat::S64P,
            other => other,
        }
    }

    /// The byte pattern of a silent sample.
    fn silence(self) -> u8 {
        match self {
            SampleFormat::U8 | SampleFormat::U8P => 0x80,
            _ => 0,
        }
    }
}

impl Display for SampleFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = SAMPLE_FORMAT_NAMES
            .iter()
            .find(|(format, _)| format == self)
            .map_or("none", |(_, name)| name);
        f.write_str(name)
    }
}

impl FromStr for SampleFormat {
    type Err = ParseAudioError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        SAMPLE_FORMAT_NAMES
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(value.trim()))
            .map(|(format, _)| *format)
            .ok_or_else(|| ParseAudioError(format!("unknown sample format `{value}`")))
    }
}

/// Speaker arrangement of an audio stream.
///
/// Names follow FFmpeg's: `5.1` is the back-surround arrangement and
/// `5.1(side)` the side-surround one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelLayout {
    /// Unspecified.
    #[default]
    None,
    Mono,
    Stereo,
    TwoPointOne,
    /// Left, right and back centre.
    TwoOne,
    /// Left, right and front centre.
    Surround,
    ThreePointOne,
    FourPointZero,
    FourPointOne,
    /// Left, right and two side channels.
    TwoTwo,
    Quad,
    FivePointZero,
    FivePointOne,
    FivePointZeroBack,
    FivePointOneBack,
    SixPointZero,
    SixPointZeroFront,
    Hexagonal,
    SixPointOne,
    SixPointOneBack,
    SixPointOneFront,
    SevenPointZero,
    SevenPointZeroFront,
    SevenPointOne,
    SevenPointOneWide,
    SevenPointOneWideBack,
    Octagonal,
    /// Stereo downmix of a surround source.
    StereoDownmix,
}

const CHANNEL_LAYOUTS: [(ChannelLayout, &str, usize); 28] = [
    (ChannelLayout::None, "none", 0),
    (ChannelLayout::Mono, "mono", 1),
    (ChannelLayout::Stereo, "stereo", 2),
    (ChannelLayout::TwoPointOne, "2.1", 3),
    (ChannelLayout::TwoOne, "3.0(back)", 3),
    (ChannelLayout::Surround, "3.0", 3),
    (ChannelLayout::ThreePointOne, "3.1", 4),
    (ChannelLayout::FourPointZero, "4.0", 4),
    (ChannelLayout::FourPointOne, "4.1", 5),
    (ChannelLayout::TwoTwo, "quad(side)", 4),
    (ChannelLayout::Quad, "quad", 4),
    (ChannelLayout::FivePointZero, "5.0(side)", 5),
    (ChannelLayout::FivePointOne, "5.1(side)", 6),
    (ChannelLayout::FivePointZeroBack, "5.0", 5),
    (ChannelLayout::FivePointOneBack, "5.1", 6),
    (ChannelLayout::SixPointZero, "6.0", 6),
    (ChannelLayout::SixPointZeroFront, "6.0(front)", 6),
    (ChannelLayout::Hexagonal, "hexagonal", 6),
    (ChannelLayout::SixPointOne, "6.1", 7),
    (ChannelLayout::SixPointOneBack, "6.1(back)", 7),
    (ChannelLayout::SixPointOneFront, "6.1(front)", 7),
    (ChannelLayout::SevenPointZero, "7.0", 7),
    (ChannelLayout::SevenPointZeroFront, "7.0(front)", 7),
    (ChannelLayout::SevenPointOne, "7.1", 8),
    (ChannelLayout::SevenPointOneWide, "7.1(wide-side)", 8),
    (ChannelLayout::SevenPointOneWideBack, "7.1(wide)", 8),
    (ChannelLayout::Octagonal, "octagonal", 8),
    (ChannelLayout::StereoDownmix, "downmix", 2),
];

impl ChannelLayout {
    /// Number of channels, zero for [`ChannelLayout::None`].
    pub fn channels(self) -> usize {
        CHANNEL_LAYOUTS
            .iter()
            .find(|(layout, _, _)| *layout == self)
            .map_or(0, |(_, _, channels)| *channels)
    }

    /// The conventional layout for a channel count: mono, stereo, 5.1 and
    /// so on.
    pub fn default_for(channels: usize) -> ChannelLayout {
        match channels {
            1 => ChannelLayout::Mono,
            2 => ChannelLayout::Stereo,
            3 => ChannelLayout::Surround,
            4 => ChannelLayout::Quad,
            5 => ChannelLayout::FivePointZeroBack,
            6 => ChannelLayout::FivePointOneBack,
            7 => ChannelLayout::SixPointOne,
            8 => ChannelLayout::SevenPointOne,
            _ => ChannelLayout::None,
        }
    }
}

impl Display for ChannelLayout {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = CHANNEL_LAYOUTS
            .iter()
            .find(|(layout, _, _)| layout == self)
            .map_or("none", |(_, name, _)| name);
        f.write_str(name)
    }
}

impl FromStr for ChannelLayout {
    type Err = ParseAudioError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        CHANNEL_LAYOUTS
            .iter()
            .find(|(_, name, _)| name.eq_ignore_ascii_case(value.trim()))
            .map(|(layout, _, _)| *layout)
            .ok_or_else(|| ParseAudioError(format!("unknown channel layout `{value}`")))
    }
}

/// Error returned when parsing an audio format description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAudioError(String);

impl Display for ParseAudioError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ParseAudioError {}

/// Sample rate, sample format and channel layout of an audio buffer.
///
/// Zero / `None` fields mean "unspecified"; a conversion target inherits
/// them from the source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AudioFormat {
    /// Samples per second, per channel.
    pub rate: u32,
    /// Representation of one sample.
    pub format: SampleFormat,
    /// Speaker arrangement.
    pub layout: ChannelLayout,
}

impl AudioFormat {
    pub fn new(rate: u32, format: SampleFormat, layout: ChannelLayout) -> Self {
        Self {
            rate,
            format,
            layout,
        }
    }

    /// Fill every unspecified field from `source`.
    pub fn inherit(self, source: AudioFormat) -> AudioFormat {
        AudioFormat {
            rate: if self.rate == 0 { source.rate } else { self.rate },
            format: if self.format == SampleFormat::None {
                source.format
            } else {
                self.format
            },
            layout: if self.layout == ChannelLayout::None {
                source.layout
            } else {
                self.layout
            },
        }
    }

    /// Whether every field is specified.
    pub fn is_complete(&self) -> bool {
        self.rate > 0 && self.format != SampleFormat::None && self.layout != ChannelLayout::None
    }

    /// Number of channels of the layout.
    pub fn channels(&self) -> usize {
        self.layout.channels()
    }

    /// Number of planes a buffer of this format has.
    pub fn planes(&self) -> usize {
        if self.format.is_planar() {
            self.channels()
        } else {
            1
        }
    }

    /// Bytes one plane needs for `samples` samples per channel.
    pub fn plane_size(&self, samples: usize) -> usize {
        let per_sample = self.format.bytes_per_sample();
        if self.format.is_planar() {
            samples * per_sample
        } else {
            samples * per_sample * self.channels()
        }
    }
}

impl Display for AudioFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} Hz {} {}", self.rate, self.format, self.layout)
    }
}

impl FromStr for AudioFormat {
    type Err = ParseAudioError;

    /// Parse `rate:format:layout`, e.g. `44100:s16:stereo`. Empty fields
    /// and trailing omitted fields are unspecified.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut parts = value.split(':').map(str::trim);
        let mut format = AudioFormat::default();

        if let Some(rate) = parts.next().filter(|part| !part.is_empty()) {
            format.rate = rate
                .parse()
                .map_err(|_| ParseAudioError(format!("invalid sample rate `{rate}`")))?;
        }
        if let Some(sample) = parts.next().filter(|part| !part.is_empty()) {
            format.format = sample.parse()?;
        }
        if let Some(layout) = parts.next().filter(|part| !part.is_empty()) {
            format.layout = layout.parse()?;
        }
        if parts.next().is_some() {
            return Err(ParseAudioError(format!(
                "expected rate:format:layout, got `{value}`"
            )));
        }
        Ok(format)
    }
}

/// A buffer of uncompressed audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    format: AudioFormat,
    samples: usize,
    planes: Vec<Vec<u8>>,
    timestamp: Option<Duration>,
}

impl AudioFrame {
    /// A silent buffer of `samples` samples per channel.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::InvalidAudioFrame`] if any field of `format`
    /// is unspecified.
    pub fn new(format: AudioFormat, samples: usize) -> Result<Self, MediaError> {
        check_format(&format)?;
        let plane = vec![format.format.silence(); format.plane_size(samples)];
        Ok(Self {
            format,
            samples,
            planes: vec![plane; format.planes()],
            timestamp: None,
        })
    }

    /// A silent buffer lasting `duration`, rounded to the nearest whole
    /// sample.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::InvalidAudioFrame`] if any field of `format`
    /// is unspecified or the sample count does not fit in memory.
    pub fn with_duration(format: AudioFormat, duration: Duration) -> Result<Self, MediaError> {
        check_format(&format)?;
        let samples = (duration.as_nanos() * format.rate as u128 + 500_000_000) / 1_000_000_000;
        let samples = usize::try_from(samples).map_err(|_| {
            MediaError::InvalidAudioFrame(format!("{duration:?} at {format} is too long"))
        })?;
        Self::new(format, samples)
    }

    /// Wrap existing sample data.
    ///
    /// Packed formats take a single plane holding interleaved samples;
    /// planar formats take one plane per channel. Every plane must be
    /// exactly [`linesize`](AudioFrame::linesize) bytes long.
    pub fn from_planes(
        format: AudioFormat,
        samples: usize,
        planes: Vec<Vec<u8>>,
    ) -> Result<Self, MediaError> {
        check_format(&format)?;
        if planes.len() != format.planes() {
            return Err(MediaError::InvalidAudioFrame(format!(
                "{} expects {} planes, got {}",
                format,
                format.planes(),
                planes.len()
            )));
        }
        let linesize = format.plane_size(samples);
        if let Some((index, plane)) = planes
            .iter()
            .enumerate()
            .find(|(_, plane)| plane.len() != linesize)
        {
            return Err(MediaError::InvalidAudioFrame(format!(
                "plane {index} holds {} bytes, expected {linesize}",
                plane.len()
            )));
        }
        Ok(Self {
            format,
            samples,
            planes,
            timestamp: None,
        })
    }

    /// Wrap interleaved samples of a packed format.
    ///
    /// The sample count is derived from the buffer length.
    pub fn from_packed(format: AudioFormat, data: Vec<u8>) -> Result<Self, MediaError> {
        check_format(&format)?;
        if format.format.is_planar() {
            return Err(MediaError::InvalidAudioFrame(format!(
                "{} is planar",
                format.format
            )));
        }
        let frame_size = format.plane_size(1);
        if data.len() % frame_size != 0 {
            return Err(MediaError::InvalidAudioFrame(format!(
                "{} bytes is not a whole number of {frame_size}-byte samples",
                data.len()
            )));
        }
        let samples = data.len() / frame_size;
        Self::from_planes(format, samples, vec![data])
    }

    /// Attach a presentation timestamp.
    pub fn with_timestamp(mut self, timestamp: Duration) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Samples per channel.
    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn channels(&self) -> usize {
        self.format.channels()
    }

    pub fn is_planar(&self) -> bool {
        self.format.format.is_planar()
    }

    /// Bytes per plane.
    pub fn linesize(&self) -> usize {
        self.format.plane_size(self.samples)
    }

    /// Bytes of one channel's plane. Packed buffers only have channel 0,
    /// which holds every channel interleaved.
    pub fn bytes(&self, channel: usize) -> Option<&[u8]> {
        self.planes.get(channel).map(Vec::as_slice)
    }

    /// Mutable bytes of one channel's plane.
    pub fn bytes_mut(&mut self, channel: usize) -> Option<&mut [u8]> {
        self.planes.get_mut(channel).map(Vec::as_mut_slice)
    }

    /// All planes in channel order.
    pub fn planes(&self) -> &[Vec<u8>] {
        &self.planes
    }

    pub fn into_planes(self) -> Vec<Vec<u8>> {
        self.planes
    }

    /// Playback duration of the buffer.
    pub fn duration(&self) -> Duration {
        samples_to_duration(self.samples, self.format.rate)
    }

    pub fn timestamp(&self) -> Option<Duration> {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: Option<Duration>) {
        self.timestamp = timestamp;
    }

    /// Copy `len` samples starting at `start` into a new buffer. The range
    /// is clamped to the buffer.
    ///
    /// The copy's timestamp is offset by `start` samples.
    pub fn slice(&self, start: usize, len: usize) -> AudioFrame {
        let start = start.min(self.samples);
        let len = len.min(self.samples - start);
        let offset = self.format.plane_size(start);
        let size = self.format.plane_size(len);

        AudioFrame {
            format: self.format,
            samples: len,
            planes: self
                .planes
                .iter()
                .map(|plane| plane[offset..offset + size].to_vec())
                .collect(),
            timestamp: self
                .timestamp
                .map(|timestamp| timestamp + samples_to_duration(start, self.format.rate)),
        }
    }
}

fn check_format(format: &AudioFormat) -> Result<(), MediaError> {
    if format.is_complete() {
        Ok(())
    } else {
        Err(MediaError::InvalidAudioFrame(format!(
            "format {format} is not fully specified"
        )))
    }
}

pub(crate) fn samples_to_duration(samples: usize, rate: u32) -> Duration {
    if rate == 0 {
        return Duration::ZERO;
    }
    let nanos = samples as u128 * 1_000_000_000 / rate as u128;
    Duration::from_nanos(nanos as u64)
}
