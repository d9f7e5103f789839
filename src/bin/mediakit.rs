use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use mediakit::{
    AudioFormat, AudioFrame, CancellationToken, Codec, DecodeOptions, LogLevel, Manager, Media,
    MediaError, MediaFlag, Metadata, ProgressCallback, ProgressInfo, Resampler, Stream,
};
use serde_json::{Value, json};

const CLI_AFTER_HELP: &str = "Examples:\n  mediakit info input.mp4 --json\n  mediakit packets input.mkv --select audio --limit 20\n  mediakit convert in.raw out.raw --from 48000:s16:stereo --to 44100:flt:mono\n  mediakit codecs --select audio,encoder\n  mediakit completions zsh > _mediakit";

/// Raw samples per channel read per conversion step.
const CONVERT_CHUNK: usize = 4_096;

#[derive(Debug, Parser)]
#[command(
    name = "mediakit",
    version,
    about = "Inspect media containers, dump packets, and convert raw audio",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Turn on FFmpeg debug output.
    #[arg(long)]
    verbose: bool,

    /// Show a progress spinner where supported.
    #[arg(long)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print streams and metadata of a media file.
    #[command(
        about = "Print streams and metadata",
        visible_alias = "probe",
        after_help = "Examples:\n  mediakit info input.mp4\n  mediakit info input.mp4 --json"
    )]
    Info {
        /// Input media path or URL.
        input: String,

        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Dump the packets of the selected streams.
    #[command(
        about = "Dump demuxed packets",
        after_help = "Examples:\n  mediakit packets input.mp4\n  mediakit packets input.mkv --select video,subtitle --timeout 5"
    )]
    Packets {
        /// Input media path or URL.
        input: String,

        /// Stream categories to select (video, audio, subtitle, data, attachment).
        /// Defaults to one stream of each.
        #[arg(long)]
        select: Option<String>,

        /// Stop after this many packets.
        #[arg(long)]
        limit: Option<u64>,

        /// Give up after this long (seconds, MM:SS or HH:MM:SS).
        #[arg(long)]
        timeout: Option<String>,

        /// Print one JSON object per packet.
        #[arg(long)]
        json: bool,
    },

    /// Convert raw interleaved PCM between audio formats.
    #[command(
        about = "Convert raw PCM audio",
        after_help = "Formats are rate:format:layout, e.g. 48000:s16:stereo. Empty target fields keep the source value.\nPlanar output is written plane after plane for every buffer."
    )]
    Convert {
        /// Input file of packed samples.
        input: PathBuf,
        /// Output file.
        out: PathBuf,
        /// Source format.
        #[arg(long)]
        from: String,
        /// Target format.
        #[arg(long)]
        to: String,
        /// Samples per channel per output buffer.
        #[arg(long)]
        frame_size: Option<usize>,
    },

    /// List the encoders and decoders FFmpeg provides.
    #[command(
        about = "List available codecs",
        after_help = "Examples:\n  mediakit codecs\n  mediakit codecs --select video,decoder --json"
    )]
    Codecs {
        /// Only list codecs carrying all of these flags, e.g. audio,encoder.
        #[arg(long)]
        select: Option<String>,

        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_timecode(value: &str) -> Result<Duration, Box<dyn std::error::Error>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("time value cannot be empty".into());
    }

    if let Ok(seconds) = trimmed.parse::<f64>() {
        return seconds_to_duration(seconds);
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [minutes, seconds] => (0_u64, minutes.parse::<u64>()?, seconds.parse::<f64>()?),
        [hours, minutes, seconds] => (
            hours.parse::<u64>()?,
            minutes.parse::<u64>()?,
            seconds.parse::<f64>()?,
        ),
        _ => return Err(format!("invalid time format: {trimmed}").into()),
    };

    let total_seconds = (hours as f64 * 3600.0) + (minutes as f64 * 60.0) + seconds;
    seconds_to_duration(total_seconds)
}

/// Negative values clamp to zero; NaN, infinities and overflow are errors.
fn seconds_to_duration(seconds: f64) -> Result<Duration, Box<dyn std::error::Error>> {
    let seconds = if seconds < 0.0 { 0.0 } else { seconds };
    Ok(Duration::try_from_secs_f64(seconds)?)
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn apply_global_options(
    manager: &Manager,
    global: &GlobalOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    if global.verbose {
        manager.set_debug(true);
    }
    if let Some(level) = &global.log_level {
        mediakit::set_log_level(level.parse::<LogLevel>()?);
    }
    Ok(())
}

fn spinner(message: &'static str) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template("{spinner:.green} {pos} {msg} [{elapsed}]")?);
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    Ok(bar)
}

/// Forwards progress reports to a terminal spinner.
struct SpinnerProgress(ProgressBar);

impl ProgressCallback for SpinnerProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.0.set_position(info.current);
    }
}

fn metadata_json(metadata: &Metadata) -> Value {
    let entries: serde_json::Map<String, Value> = metadata
        .keys()
        .into_iter()
        .filter_map(|key| {
            metadata
                .get(key)
                .map(|value| (key.to_string(), Value::String(value.to_string())))
        })
        .collect();
    Value::Object(entries)
}

fn stream_json(stream: &Stream) -> Value {
    json!({
        "index": stream.index(),
        "flags": stream.flags().to_string(),
        "codec": stream.codec(),
        "time_base": stream.time_base().map(|(num, den)| format!("{num}/{den}")),
        "artwork_bytes": stream.artwork().map(<[u8]>::len),
        "metadata": metadata_json(stream.metadata()),
    })
}

fn codec_json(codec: &Codec) -> Value {
    json!({
        "name": codec.name(),
        "description": codec.description(),
        "flags": codec.flags().to_string(),
        "encoder": codec.is_encoder(),
        "decoder": codec.is_decoder(),
    })
}

fn print_metadata(metadata: &Metadata, indent: &str) {
    for key in metadata.keys() {
        if let Some(value) = metadata.get(key) {
            println!("{indent}{}: {}", key.as_str().dimmed(), value);
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let manager = Manager::new();
    apply_global_options(&manager, &cli.global)?;

    match cli.command {
        Commands::Info { input, json } => {
            let media = manager.open_file(&input)?;
            if json {
                let payload = json!({
                    "url": media.url(),
                    "flags": media.flags().to_string(),
                    "metadata": metadata_json(media.metadata()),
                    "streams": media.streams().iter().map(stream_json).collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("{} {}", "Media:".bold(), media.url());
                println!("{} {}", "Flags:".bold(), media.flags());
                print_metadata(media.metadata(), "  ");
                for stream in media.streams() {
                    println!(
                        "{} #{} {} [{}]",
                        "Stream".cyan().bold(),
                        stream.index(),
                        stream.flags(),
                        stream.codec().unwrap_or("unknown")
                    );
                    print_metadata(stream.metadata(), "    ");
                }
            }
        }
        Commands::Packets {
            input,
            select,
            limit,
            timeout,
            json,
        } => {
            let selector = match &select {
                Some(select) => select.parse::<MediaFlag>()?,
                None => MediaFlag::NONE,
            };
            let token = match &timeout {
                Some(timeout) => CancellationToken::with_timeout(parse_timecode(timeout)?),
                None => CancellationToken::new(),
            };

            let media = manager.open_file(&input)?;
            let map = manager.map(&media, selector)?;
            if map.is_empty() {
                eprintln!(
                    "{} {}",
                    "warning:".yellow().bold(),
                    format!("no stream matches {selector}").yellow()
                );
            }

            let progress_bar = if cli.global.progress {
                Some(spinner("packets")?)
            } else {
                None
            };
            let mut options = DecodeOptions::new();
            if let Some(bar) = &progress_bar {
                options = options
                    .with_progress(Arc::new(SpinnerProgress(bar.clone())))
                    .with_batch_size(64);
            }

            let mut count = 0_u64;
            let result = manager.decode_with_options(&token, map, &options, |token, packet| {
                if json {
                    let line = json!({
                        "stream": packet.stream().index(),
                        "flags": packet.flags().to_string(),
                        "key": packet.is_key_frame(),
                        "position": packet.position(),
                        "pts": packet.pts(),
                        "dts": packet.dts(),
                        "timestamp": packet.timestamp().map(|t| t.as_secs_f64()),
                        "duration": packet.duration().as_secs_f64(),
                        "size": packet.size(),
                    });
                    println!("{line}");
                } else {
                    println!(
                        "#{:<2} {:>10} {:>12} {:>8} B {}",
                        packet.stream().index(),
                        packet
                            .timestamp()
                            .map_or_else(|| "-".to_string(), |t| format!("{:.3}s", t.as_secs_f64())),
                        packet
                            .position()
                            .map_or_else(|| "-".to_string(), |p| p.to_string()),
                        packet.size(),
                        if packet.is_key_frame() { "K".green() } else { "".normal() }
                    );
                }
                count += 1;
                if limit.is_some_and(|limit| count >= limit) {
                    token.cancel();
                }
                Ok(())
            });

            if let Some(bar) = &progress_bar {
                bar.finish_and_clear();
            }

            match result {
                Err(error) if limit.is_some_and(|limit| count >= limit) && only_cancelled(&error) => {}
                other => other?,
            }
            if cli.global.verbose {
                eprintln!("{} {} packets", "done:".green().bold(), count);
            }
        }
        Commands::Convert {
            input,
            out,
            from,
            to,
            frame_size,
        } => {
            ensure_writable_path(&out, cli.global.overwrite)?;
            let source: AudioFormat = from.parse()?;
            let target: AudioFormat = to.parse()?;
            if !source.is_complete() || source.format.is_planar() {
                return Err("--from must be a complete packed format, e.g. 48000:s16:stereo".into());
            }

            let data = fs::read(&input)?;
            let stride = source.plane_size(1);
            if data.len() % stride != 0 {
                return Err(format!(
                    "{} is not a whole number of {stride}-byte samples",
                    input.display()
                )
                .into());
            }

            let mut resampler = Resampler::new(target);
            if let Some(frame_size) = frame_size {
                resampler = resampler.with_frame_size(frame_size);
            }
            let progress_bar = if cli.global.progress {
                let bar = spinner("buffers")?;
                resampler = resampler.with_progress(Arc::new(SpinnerProgress(bar.clone())));
                Some(bar)
            } else {
                None
            };

            let mut writer = BufWriter::new(fs::File::create(&out)?);
            let mut written = 0_usize;
            let mut write = |frame: &AudioFrame| -> Result<(), MediaError> {
                for plane in frame.planes() {
                    writer.write_all(plane)?;
                }
                written += frame.samples();
                Ok(())
            };

            for chunk in data.chunks(CONVERT_CHUNK * stride) {
                let frame = AudioFrame::from_packed(source, chunk.to_vec())?;
                resampler.convert(&frame, &mut write)?;
            }
            resampler.flush(&mut write)?;
            writer.flush()?;

            if let Some(bar) = &progress_bar {
                bar.finish_and_clear();
            }
            println!(
                "{} {} samples -> {}",
                "converted".green().bold(),
                written,
                out.display()
            );
        }
        Commands::Codecs { select, json } => {
            let wanted = match &select {
                Some(select) => select.parse::<MediaFlag>()?,
                None => MediaFlag::NONE,
            };
            let codecs: Vec<Codec> = manager
                .codecs()?
                .into_iter()
                .filter(|codec| codec.flags().is(wanted))
                .collect();

            if json {
                let payload: Vec<Value> = codecs.iter().map(codec_json).collect();
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                for codec in &codecs {
                    println!(
                        "{}{} {:<24} {}",
                        if codec.is_decoder() { "D".green() } else { ".".dimmed() },
                        if codec.is_encoder() { "E".green() } else { ".".dimmed() },
                        codec.name().bold(),
                        codec.description()
                    );
                }
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "mediakit", &mut std::io::stdout());
        }
    }

    manager.close()?;
    Ok(())
}

fn only_cancelled(error: &MediaError) -> bool {
    error
        .errors()
        .iter()
        .all(|error| matches!(error, MediaError::Cancelled(_)))
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use mediakit::{LogLevel, Manager};

    use super::{Cli, apply_global_options, parse_timecode};

    #[test]
    fn parse_timecode_formats() {
        assert_eq!(parse_timecode("75").unwrap().as_secs(), 75);
        assert_eq!(parse_timecode("01:15").unwrap().as_secs(), 75);
        assert_eq!(parse_timecode("00:01:15.5").unwrap().as_secs(), 75);
        assert!(parse_timecode("1:2:3:4").is_err());
    }

    #[test]
    fn parse_timecode_rejects_non_finite_seconds() {
        assert!(parse_timecode("inf").is_err());
        assert!(parse_timecode("NaN").is_err());
        assert!(parse_timecode("00:01:inf").is_err());
        assert!(parse_timecode("1e300").is_err());
        assert_eq!(parse_timecode("-5").unwrap().as_secs(), 0);
    }

    #[test]
    fn log_level_is_kept_without_verbose() {
        let manager = Manager::new();
        let cli = Cli::parse_from(["mediakit", "--log-level", "warn", "codecs"]);
        apply_global_options(&manager, &cli.global).unwrap();
        assert!(!manager.is_debug());
        assert_eq!(mediakit::log_level(), Some(LogLevel::Warning));

        let cli = Cli::parse_from(["mediakit", "--log-level", "loud", "codecs"]);
        assert!(apply_global_options(&manager, &cli.global).is_err());
        assert_eq!(mediakit::log_level(), Some(LogLevel::Warning));
    }
}
