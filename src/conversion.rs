//! Internal conversions between crate types and FFmpeg's.
//!
//! Timestamp rescaling and media-type mapping for the demuxer and codec
//! listing, sample-format / channel-layout mapping for the resampler.

use std::time::Duration;

use ffmpeg_next::{
    ChannelLayout as FfmpegChannelLayout, Rational,
    format::{Sample, sample::Type as SampleType},
    frame::Audio as FfmpegAudioFrame,
    media::Type as MediaType,
};

use crate::{
    audio::{AudioFormat, AudioFrame, ChannelLayout, SampleFormat},
    error::MediaError,
    flags::MediaFlag,
};

/// The category flag of an FFmpeg media type.
pub(crate) fn medium_to_flag(medium: MediaType) -> MediaFlag {
    match medium {
        MediaType::Video => MediaFlag::VIDEO,
        MediaType::Audio => MediaFlag::AUDIO,
        MediaType::Subtitle => MediaFlag::SUBTITLE,
        MediaType::Data => MediaFlag::DATA,
        MediaType::Attachment => MediaFlag::ATTACHMENT,
        MediaType::Unknown => MediaFlag::NONE,
    }
}

/// Rescale a PTS value from stream time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator().max(1) as f64
}

/// Rescale a stream timestamp to a [`Duration`], clamping negatives to zero.
pub(crate) fn pts_to_duration(pts: i64, time_base: Rational) -> Duration {
    Duration::from_secs_f64(pts_to_seconds(pts, time_base).max(0.0))
}

pub(crate) fn sample_to_ffmpeg(format: SampleFormat) -> Result<Sample, MediaError> {
    Ok(match format {
        SampleFormat::U8 => Sample::U8(SampleType::Packed),
        SampleFormat::S16 => Sample::I16(SampleType::Packed),
        SampleFormat::S32 => Sample::I32(SampleType::Packed),
        SampleFormat::S64 => Sample::I64(SampleType::Packed),
        SampleFormat::Flt => Sample::F32(SampleType::Packed),
        SampleFormat::Dbl => Sample::F64(SampleType::Packed),
        SampleFormat::U8P => Sample::U8(SampleType::Planar),
        SampleFormat::S16P => Sample::I16(SampleType::Planar),
        SampleFormat::S32P => Sample::I32(SampleType::Planar),
        SampleFormat::S64P => Sample::I64(SampleType::Planar),
        SampleFormat::FltP => Sample::F32(SampleType::Planar),
        SampleFormat::DblP => Sample::F64(SampleType::Planar),
        SampleFormat::None => return Err(MediaError::UnsupportedSampleFormat(format)),
    })
}

pub(crate) fn layout_to_ffmpeg(layout: ChannelLayout) -> Result<FfmpegChannelLayout, MediaError> {
    Ok(match layout {
        ChannelLayout::Mono => FfmpegChannelLayout::MONO,
        ChannelLayout::Stereo => FfmpegChannelLayout::STEREO,
        ChannelLayout::TwoPointOne => FfmpegChannelLayout::_2POINT1,
        ChannelLayout::TwoOne => FfmpegChannelLayout::_2_1,
        ChannelLayout::Surround => FfmpegChannelLayout::SURROUND,
        ChannelLayout::ThreePointOne => FfmpegChannelLayout::_3POINT1,
        ChannelLayout::FourPointZero => FfmpegChannelLayout::_4POINT0,
        ChannelLayout::FourPointOne => FfmpegChannelLayout::_4POINT1,
        ChannelLayout::TwoTwo => FfmpegChannelLayout::_2_2,
        ChannelLayout::Quad => FfmpegChannelLayout::QUAD,
        ChannelLayout::FivePointZero => FfmpegChannelLayout::_5POINT0,
        ChannelLayout::FivePointOne => FfmpegChannelLayout::_5POINT1,
        ChannelLayout::FivePointZeroBack => FfmpegChannelLayout::_5POINT0_BACK,
        ChannelLayout::FivePointOneBack => FfmpegChannelLayout::_5POINT1_BACK,
        ChannelLayout::SixPointZero => FfmpegChannelLayout::_6POINT0,
        ChannelLayout::SixPointZeroFront => FfmpegChannelLayout::_6POINT0_FRONT,
        ChannelLayout::Hexagonal => FfmpegChannelLayout::HEXAGONAL,
        ChannelLayout::SixPointOne => FfmpegChannelLayout::_6POINT1,
        ChannelLayout::SixPointOneBack => FfmpegChannelLayout::_6POINT1_BACK,
        ChannelLayout::SixPointOneFront => FfmpegChannelLayout::_6POINT1_FRONT,
        ChannelLayout::SevenPointZero => FfmpegChannelLayout::_7POINT0,
        ChannelLayout::SevenPointZeroFront => FfmpegChannelLayout::_7POINT0_FRONT,
        ChannelLayout::SevenPointOne => FfmpegChannelLayout::_7POINT1,
        ChannelLayout::SevenPointOneWide => FfmpegChannelLayout::_7POINT1_WIDE,
        ChannelLayout::SevenPointOneWideBack => FfmpegChannelLayout::_7POINT1_WIDE_BACK,
        ChannelLayout::Octagonal => FfmpegChannelLayout::OCTAGONAL,
        ChannelLayout::StereoDownmix => FfmpegChannelLayout::STEREO_DOWNMIX,
        ChannelLayout::None => return Err(MediaError::UnsupportedChannelLayout(layout)),
    })
}

/// Copy a buffer into a newly allocated FFmpeg frame.
pub(crate) fn frame_to_ffmpeg(frame: &AudioFrame) -> Result<FfmpegAudioFrame, MediaError> {
    let format = frame.format();
    let mut target = FfmpegAudioFrame::new(
        sample_to_ffmpeg(format.format)?,
        frame.samples(),
        layout_to_ffmpeg(format.layout)?,
    );
    target.set_rate(format.rate);

    let linesize = frame.linesize();
    for (index, plane) in frame.planes().iter().enumerate() {
        let data = target.data_mut(index);
        if data.len() < linesize {
            return Err(MediaError::Resample(format!(
                "FFmpeg plane {index} holds {} bytes, need {linesize}",
                data.len()
            )));
        }
        data[..linesize].copy_from_slice(plane);
    }
    Ok(target)
}

/// Allocate an FFmpeg frame able to hold `capacity` samples of `format`.
pub(crate) fn ffmpeg_frame(
    format: AudioFormat,
    capacity: usize,
) -> Result<FfmpegAudioFrame, MediaError> {
    let mut frame = FfmpegAudioFrame::new(
        sample_to_ffmpeg(format.format)?,
        capacity,
        layout_to_ffmpeg(format.layout)?,
    );
    frame.set_rate(format.rate);
    Ok(frame)
}

/// Copy the samples an FFmpeg frame holds into a new buffer.
///
/// Plane padding beyond the sample count is not copied.
pub(crate) fn frame_from_ffmpeg(
    source: &FfmpegAudioFrame,
    format: AudioFormat,
) -> Result<AudioFrame, MediaError> {
    let samples = source.samples();
    let linesize = format.plane_size(samples);
    let planes = (0..format.planes())
        .map(|index| {
            let data = source.data(index);
            data.get(..linesize).map(<[u8]>::to_vec).ok_or_else(|| {
                MediaError::Resample(format!(
                    "FFmpeg plane {index} holds {} bytes, need {linesize}",
                    data.len()
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    AudioFrame::from_planes(format, samples, planes)
}
