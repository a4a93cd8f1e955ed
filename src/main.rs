use clap::{Parser, Subcommand};
use midi2riff::config::{load_config, validate_config};
use midi2riff::{export_report, BoundaryPolicy, Config, MidiToRiff};
use std::path::{Path, PathBuf};

/// MIDI-to-Riff Importer
#[derive(Parser)]
#[command(name = "midi2riff")]
#[command(about = "Quantize Standard MIDI Files into one-bar step sequencer patterns")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a MIDI file and write the pattern report
    Import {
        /// Input MIDI file (.mid)
        input: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Custom configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Steps per bar
        #[arg(long)]
        steps: Option<u32>,

        /// Beats per bar
        #[arg(long)]
        beats: Option<u32>,

        /// Only import notes on this channel (0-15)
        #[arg(long)]
        channel: Option<u8>,

        /// Wrap out-of-bar steps instead of clamping
        #[arg(long)]
        wrap: bool,

        /// Allow notes of one pitch to overlap
        #[arg(long)]
        no_clamp: bool,

        /// Keep notes sharing a step and pitch
        #[arg(long)]
        no_dedupe: bool,

        /// Root pitch written to the pattern header
        #[arg(long)]
        root: Option<u8>,

        /// Pattern id (defaults to the input file name)
        #[arg(long)]
        id: Option<String>,

        /// Also write a MIDI preview of the quantized pattern
        #[arg(long)]
        preview: bool,
    },
    /// Show header, track and anomaly information without quantizing
    Inspect {
        /// Input MIDI file (.mid)
        input: PathBuf,

        /// Only count notes on this channel (0-15)
        #[arg(long)]
        channel: Option<u8>,
    },
    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config: PathBuf,
    },
    /// Show default configuration
    ShowConfig,
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose && cli.quiet {
        anyhow::bail!("Cannot specify both --verbose and --quiet");
    }
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Import {
            input,
            output,
            config,
            steps,
            beats,
            channel,
            wrap,
            no_clamp,
            no_dedupe,
            root,
            id,
            preview,
        } => {
            // Load configuration
            let mut config = match config {
                Some(config_path) => load_config(config_path)?,
                None => {
                    let mut config = Config::default();
                    config.pattern.pattern_id = default_pattern_id(&input);
                    config
                }
            };

            // Command-line overrides
            if let Some(steps) = steps {
                config.grid.steps_per_bar = steps;
            }
            if let Some(beats) = beats {
                config.grid.beats_per_bar = beats;
            }
            if channel.is_some() {
                config.filter.channel = channel;
            }
            if wrap {
                config.quantize.boundary_policy = BoundaryPolicy::Wrap;
            }
            if no_clamp {
                config.resolve.clamp_duration_to_next_onset = false;
            }
            if no_dedupe {
                config.resolve.dedupe_same_step_same_pitch = false;
            }
            if let Some(root) = root {
                config.pattern.root_pitch = root;
            }
            if let Some(id) = id {
                config.pattern.pattern_id = id;
            }
            validate_config(&config)?;

            let importer = MidiToRiff::new(config);
            let report = importer.import_file(&input)?;
            let report_path = export_report(&report, &output)?;

            if preview {
                midi2riff::midi::export_midi(
                    &report.pattern,
                    &importer.config().grid,
                    report.header.ticks_per_quarter,
                    &output,
                )?;
            }

            if !cli.quiet {
                println!(
                    "Imported {} events into pattern \"{}\" ({} steps)",
                    report.pattern.events.len(),
                    report.pattern.id,
                    report.pattern.steps_per_loop
                );
                println!("Results saved to {}", report_path.display());
            }
        }
        Commands::Inspect { input, channel } => {
            let mut config = Config::default();
            config.filter.channel = channel;
            let data = std::fs::read(&input)?;
            let state = MidiToRiff::new(config).inspect(&data)?;

            if let Some(header) = state.header {
                println!(
                    "Format {}, {} tracks, {} ticks per quarter",
                    header.format, header.track_count, header.ticks_per_quarter
                );
            }
            for track in &state.tracks {
                println!(
                    "  Track {}: {} bytes, {} notes, channels {:?}{}",
                    track.index,
                    track.declared_length,
                    track.note_count,
                    track.channels,
                    if track.truncated { " (truncated)" } else { "" }
                );
            }
            println!("{} raw events", state.raw_events.len());
            println!("{}", serde_json::to_string_pretty(&state.diagnostics)?);
        }
        Commands::ValidateConfig { config } => {
            let config = load_config(config)?;
            println!("Configuration is valid");
            if let Ok(json) = serde_json::to_string_pretty(&config) {
                println!("{}", json);
            }
        }
        Commands::ShowConfig => {
            let config = Config::default();
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn default_pattern_id(input: &Path) -> String {
    input
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Config::default().pattern.pattern_id)
}
