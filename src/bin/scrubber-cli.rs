use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use scrubber::{
    ExtractionOptions, FrameBatchExtractor, GestureToIndexMapper, ImageSequenceSource,
    PlaybackSource, ProgressCallback, ProgressInfo, ScrubSession, SessionSettings,
    target_schedule,
};

#[cfg(feature = "ffmpeg")]
use scrubber::VideoFileSource;

const CLI_AFTER_HELP: &str = "Examples:\n  scrubber schedule --duration 9 --frames 10\n  scrubber extract frames/ --out stills --frames 90 --progress\n  scrubber scrub frames/ --openness readings.txt --json\n  scrubber completions zsh > _scrubber";

#[derive(Debug, Parser)]
#[command(
    name = "scrubber",
    version,
    about = "Extract evenly spaced stills from a clip and scrub them by hand openness",
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
    /// Show additional logging output.
    #[arg(long)]
    verbose: bool,

    /// Show a progress bar during extraction.
    #[arg(long)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long)]
    overwrite: bool,

    /// Session settings file (JSON). Command-line flags take precedence.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the seek targets an extraction would use.
    #[command(
        about = "Print the extraction target schedule",
        after_help = "Examples:\n  scrubber schedule --duration 9 --frames 10\n  scrubber schedule --duration 12.5 --frames 90 --json"
    )]
    Schedule {
        /// Clip duration in seconds.
        #[arg(long)]
        duration: f64,
        /// Number of frames to extract.
        #[arg(long)]
        frames: Option<u32>,
        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Extract stills and write them as JPEG files.
    #[command(
        about = "Extract evenly spaced stills",
        after_help = "Examples:\n  scrubber extract frames/ --out stills --frames 30 --fps 24\n  scrubber extract clip.mp4 --out stills --quality 90 --progress"
    )]
    Extract {
        /// Image directory (or video file with the `ffmpeg` feature).
        input: PathBuf,
        /// Output directory for the extracted stills.
        #[arg(long)]
        out: PathBuf,
        /// Number of frames to extract.
        #[arg(long)]
        frames: Option<u32>,
        /// Delay between captures in milliseconds.
        #[arg(long)]
        delay_ms: Option<u64>,
        /// JPEG quality (1-100).
        #[arg(long)]
        quality: Option<u8>,
        /// Playback rate for image directories.
        #[arg(long, default_value_t = 30.0)]
        fps: f64,
    },

    /// Extract, then map openness readings to frame indices.
    #[command(
        about = "Replay openness readings against extracted stills",
        after_help = "Examples:\n  scrubber scrub frames/ --openness readings.txt\n  scrubber scrub clip.mp4 --openness readings.txt --json"
    )]
    Scrub {
        /// Image directory (or video file with the `ffmpeg` feature).
        input: PathBuf,
        /// File of whitespace-separated openness values in [0, 1].
        #[arg(long)]
        openness: PathBuf,
        /// Playback rate for image directories.
        #[arg(long, default_value_t = 30.0)]
        fps: f64,
        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

struct BarProgress {
    bar: ProgressBar,
}

impl ProgressCallback for BarProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.bar.set_length(info.total);
        self.bar.set_position(info.current);
        if let Some(target) = info.current_target {
            self.bar.set_message(format!("{target:.3}s"));
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn load_settings(global: &GlobalOptions) -> Result<SessionSettings, Box<dyn std::error::Error>> {
    match &global.config {
        Some(path) => Ok(SessionSettings::from_path(path)?),
        None => Ok(SessionSettings::default()),
    }
}

fn open_source(
    input: &Path,
    frames_per_second: f64,
) -> Result<Box<dyn PlaybackSource>, Box<dyn std::error::Error>> {
    if input.is_dir() {
        return Ok(Box::new(ImageSequenceSource::from_directory(
            input,
            frames_per_second,
        )?));
    }

    #[cfg(feature = "ffmpeg")]
    {
        Ok(Box::new(VideoFileSource::open(input)?))
    }

    #[cfg(not(feature = "ffmpeg"))]
    {
        Err(format!(
            "{} is not a directory; video files require building with the `ffmpeg` feature",
            input.display()
        )
        .into())
    }
}

fn parse_openness_values(text: &str) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
    text.split_whitespace()
        .map(|token| -> Result<f32, Box<dyn std::error::Error>> {
            let value: f32 = token
                .parse()
                .map_err(|_| format!("invalid openness value: {token}"))?;
            if !value.is_finite() {
                return Err(format!("invalid openness value: {token}").into());
            }
            Ok(value)
        })
        .collect()
}

fn ensure_writable_dir(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        let occupied = fs::read_dir(path)?.next().is_some();
        if occupied && !overwrite {
            return Err(format!(
                "output directory is not empty: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
        if occupied {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("writing into existing directory {}", path.display()).yellow()
            );
        }
    } else {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

fn progress_bar(enabled: bool) -> Result<Option<ProgressBar>, Box<dyn std::error::Error>> {
    if !enabled {
        return Ok(None);
    }
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
    bar.set_style(style.progress_chars("##-"));
    Ok(Some(bar))
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    match cli.command {
        Commands::Schedule {
            duration,
            frames,
            json,
        } => {
            if !duration.is_finite() || duration <= 0.0 {
                return Err(format!("--duration must be a positive number, got {duration}").into());
            }
            let settings = load_settings(&cli.global)?;
            let frame_count = frames.unwrap_or(settings.frame_count);
            let targets = target_schedule(duration, frame_count);

            if json {
                let payload = json!({
                    "duration_seconds": duration,
                    "frame_count": targets.len(),
                    "targets": targets,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                for (index, target) in targets.iter().enumerate() {
                    println!("{index:>4}  {target:.3}s");
                }
            }
        }
        Commands::Extract {
            input,
            out,
            frames,
            delay_ms,
            quality,
            fps,
        } => {
            let mut settings = load_settings(&cli.global)?;
            if let Some(frames) = frames {
                settings.frame_count = frames;
            }
            if let Some(delay_ms) = delay_ms {
                settings.inter_frame_delay_ms = delay_ms;
            }
            if let Some(quality) = quality {
                settings.encode_quality = quality;
            }
            settings.validate()?;

            ensure_writable_dir(&out, cli.global.overwrite)?;
            let mut source = open_source(&input, fps)?;

            let bar = progress_bar(cli.global.progress)?;
            let mut options: ExtractionOptions = settings.to_options();
            if let Some(bar) = &bar {
                options = options.with_progress(Arc::new(BarProgress { bar: bar.clone() }));
            }

            let mut extractor = FrameBatchExtractor::new(options);
            let store =
                runtime.block_on(extractor.extract(&mut *source, &settings.to_request()))?;

            if let Some(bar) = bar {
                bar.finish_with_message("done");
            }

            let written = store.save_all(&out)?;
            if cli.global.verbose {
                for frame in &store {
                    eprintln!(
                        "frame {} target {:.3}s position {:.3}s",
                        frame.index(),
                        frame.target_seconds(),
                        frame.position_seconds()
                    );
                }
            }

            println!(
                "{} {}",
                "success:".green().bold(),
                format!("Extracted {written} frame(s) to {}", out.display()).green()
            );
        }
        Commands::Scrub {
            input,
            openness,
            fps,
            json,
        } => {
            let settings = load_settings(&cli.global)?;
            let readings = parse_openness_values(&fs::read_to_string(&openness)?)?;
            let mut source = open_source(&input, fps)?;

            let bar = progress_bar(cli.global.progress)?;
            let mut options = settings.to_options();
            if let Some(bar) = &bar {
                options = options.with_progress(Arc::new(BarProgress { bar: bar.clone() }));
            }

            let mut session = ScrubSession::with_parts(
                options,
                GestureToIndexMapper::new(settings.smoothing_factor),
            );
            let loaded = runtime.block_on(session.load(&mut *source, &settings.to_request()))?;
            if let Some(bar) = bar {
                bar.finish_and_clear();
            }

            let mut selections = Vec::with_capacity(readings.len());
            for raw in readings {
                let index = session.update_openness(raw);
                selections.push((raw, session.mapper().smoothed(), index));
            }

            if json {
                let payload = json!({
                    "frames": loaded,
                    "selections": selections
                        .iter()
                        .map(|(raw, smoothed, index)| json!({
                            "openness": raw,
                            "smoothed": smoothed,
                            "index": index,
                        }))
                        .collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                for (raw, smoothed, index) in selections {
                    match index {
                        Some(index) => println!("{raw:.3} -> {smoothed:.3} -> frame {index}"),
                        None => println!("{raw:.3} -> {smoothed:.3} -> (none)"),
                    }
                }
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "scrubber", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
