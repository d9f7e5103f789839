//! Audio conversion.
//!
//! [`convert`] turns one [`AudioFrame`] into another sample format, rate
//! and channel layout. [`Resampler`] does the same for a sequence of
//! buffers, carrying resampler state (and therefore filter history) from
//! one buffer to the next; call [`Resampler::flush`] after the last one.
//!
//! Results are delivered through a callback, one call per produced buffer,
//! in chronological order. A conversion may legitimately produce nothing
//! for a short input; the samples come out of a later call or the flush.
//! An error returned by the callback aborts the conversion and is returned
//! unchanged.
//!
//! # Example
//!
//! ```no_run
//! use mediakit::{AudioFormat, AudioFrame, ChannelLayout, MediaError, SampleFormat};
//!
//! let source = AudioFormat::new(48_000, SampleFormat::S16, ChannelLayout::Stereo);
//! let frame = AudioFrame::new(source, 1_024)?;
//!
//! // Keep rate and layout, switch to planar float.
//! let target = AudioFormat::new(0, SampleFormat::FltP, ChannelLayout::None);
//! let mut converted = Vec::new();
//! mediakit::convert(&frame, target, |out| {
//!     converted.push(out.clone());
//!     Ok(())
//! })?;
//! # Ok::<(), MediaError>(())
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
    time::Duration,
};

use ffmpeg_next::software::resampling::Context as ResamplingContext;

use crate::{
    audio::{AudioFormat, AudioFrame, samples_to_duration},
    conversion::{ffmpeg_frame, frame_from_ffmpeg, frame_to_ffmpeg, layout_to_ffmpeg, sample_to_ffmpeg},
    error::MediaError,
    progress::{OperationType, ProgressCallback, ProgressTracker},
};

/// Extra output room on top of the rate-scaled input size.
const OUTPUT_HEADROOM: usize = 256;

/// Output room per flush call.
const FLUSH_CAPACITY: usize = 4_096;

struct ResamplerState {
    context: ResamplingContext,
    source: AudioFormat,
    output: AudioFormat,
}

/// A stateful audio converter.
///
/// The target format is resolved against the first buffer: unspecified
/// fields are inherited from it. When the resolved target equals the
/// source, buffers are passed through without touching FFmpeg. A change of
/// source format mid-stream flushes the pending samples and starts over.
pub struct Resampler {
    target: AudioFormat,
    frame_size: Option<usize>,
    state: Option<ResamplerState>,
    origin: Option<Duration>,
    emitted: usize,
    tracker: Option<ProgressTracker>,
}

impl Debug for Resampler {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Resampler")
            .field("target", &self.target)
            .field("frame_size", &self.frame_size)
            .field("active", &self.state.is_some())
            .field("emitted", &self.emitted)
            .finish_non_exhaustive()
    }
}

impl Resampler {
    /// A converter to `target`.
    pub fn new(target: AudioFormat) -> Self {
        Self {
            target,
            frame_size: None,
            state: None,
            origin: None,
            emitted: 0,
            tracker: None,
        }
    }

    /// Deliver output in buffers of at most `samples` samples per channel.
    /// Zero disables splitting.
    pub fn with_frame_size(mut self, samples: usize) -> Self {
        self.frame_size = (samples > 0).then_some(samples);
        self
    }

    /// Report every delivered buffer to `callback`.
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.tracker = Some(ProgressTracker::new(
            callback,
            OperationType::AudioConversion,
            None,
            1,
        ));
        self
    }

    /// The requested target, before inheritance.
    pub fn target(&self) -> AudioFormat {
        self.target
    }

    /// Convert one buffer.
    pub fn convert<F>(&mut self, frame: &AudioFrame, mut callback: F) -> Result<(), MediaError>
    where
        F: FnMut(&AudioFrame) -> Result<(), MediaError>,
    {
        let source = frame.format();
        let output = self.target.inherit(source);

        if self
            .state
            .as_ref()
            .is_some_and(|state| state.source != source)
        {
            log::debug!("Audio source format changed to {source}, flushing");
            self.flush(&mut callback)?;
        }

        if self.state.is_none() && output == source {
            return self.deliver(frame.clone(), false, &mut callback);
        }

        if self.state.is_none() {
            self.state = Some(open_context(source, output)?);
            self.origin = frame.timestamp();
            self.emitted = 0;
        }
        if frame.samples() == 0 {
            return Ok(());
        }

        let input = frame_to_ffmpeg(frame)?;
        let capacity =
            frame.samples() * output.rate as usize / source.rate as usize + OUTPUT_HEADROOM;
        let mut converted = ffmpeg_frame(output, capacity)?;

        let Some(state) = self.state.as_mut() else {
            return Ok(());
        };
        state
            .context
            .run(&input, &mut converted)
            .map_err(|error| MediaError::Resample(format!("conversion failed: {error}")))?;

        let converted = frame_from_ffmpeg(&converted, output)?;
        self.deliver(converted, true, &mut callback)
    }

    /// Drain samples still buffered in the resampler and reset it for a
    /// new stream.
    pub fn flush<F>(&mut self, mut callback: F) -> Result<(), MediaError>
    where
        F: FnMut(&AudioFrame) -> Result<(), MediaError>,
    {
        if let Some(mut state) = self.state.take() {
            loop {
                let mut drained = ffmpeg_frame(state.output, FLUSH_CAPACITY)?;
                state
                    .context
                    .flush(&mut drained)
                    .map_err(|error| MediaError::Resample(format!("flush failed: {error}")))?;
                if drained.samples() == 0 {
                    break;
                }
                let drained = frame_from_ffmpeg(&drained, state.output)?;
                self.deliver(drained, true, &mut callback)?;
            }
        }

        self.origin = None;
        self.emitted = 0;
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.finish();
        }
        Ok(())
    }

    /// Hand `frame` to the callback, split by the configured frame size.
    /// With `restamp`, the frame is first stamped with its position in the
    /// output stream.
    fn deliver<F>(
        &mut self,
        mut frame: AudioFrame,
        restamp: bool,
        callback: &mut F,
    ) -> Result<(), MediaError>
    where
        F: FnMut(&AudioFrame) -> Result<(), MediaError>,
    {
        if frame.samples() == 0 {
            return Ok(());
        }

        if restamp {
            let rate = frame.format().rate;
            if let Some(origin) = self.origin {
                frame.set_timestamp(Some(origin + samples_to_duration(self.emitted, rate)));
            }
            self.emitted += frame.samples();
        }

        match self.frame_size {
            Some(size) if frame.samples() > size => {
                let mut start = 0;
                while start < frame.samples() {
                    let chunk = frame.slice(start, size);
                    start += chunk.samples();
                    callback(&chunk)?;
                    self.report(chunk.timestamp());
                }
            }
            _ => {
                callback(&frame)?;
                self.report(frame.timestamp());
            }
        }
        Ok(())
    }

    fn report(&mut self, timestamp: Option<Duration>) {
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.advance(timestamp);
        }
    }
}

fn open_context(source: AudioFormat, output: AudioFormat) -> Result<ResamplerState, MediaError> {
    let context = ResamplingContext::get(
        sample_to_ffmpeg(source.format)?,
        layout_to_ffmpeg(source.layout)?,
        source.rate,
        sample_to_ffmpeg(output.format)?,
        layout_to_ffmpeg(output.layout)?,
        output.rate,
    )
    .map_err(|error| MediaError::Resample(format!("failed to create resampler: {error}")))?;

    log::debug!("Resampling {source} -> {output}");

    Ok(ResamplerState {
        context,
        source,
        output,
    })
}

/// Convert a single buffer to `target`, flushing the resampler afterwards.
///
/// Unspecified target fields are inherited from `frame`; an identical
/// target delivers `frame` itself.
pub fn convert<F>(frame: &AudioFrame, target: AudioFormat, mut callback: F) -> Result<(), MediaError>
where
    F: FnMut(&AudioFrame) -> Result<(), MediaError>,
{
    let mut resampler = Resampler::new(target);
    resampler.convert(frame, &mut callback)?;
    resampler.flush(&mut callback)
}
