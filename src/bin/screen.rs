//! Screen CLI - Command-line interface for Behavior Screen
//!
//! Commands:
//! - summarize: Replay a recorded session and print its feature document (batch mode)
//! - run: Process recorded frames streamed on stdin (streaming mode)
//! - validate: Check a recording's schema and timestamps
//! - config: Print the default screening configuration

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use behavior_screen::{
    FeatureEncoder, FrameReplay, RecordedFrame, ScreenError, ScreeningConfig, SessionOrchestrator,
    SCHEMA_VERSION, VERSION,
};

/// Screen - behavioral feature extraction for interaction-video screening
#[derive(Parser)]
#[command(name = "screen")]
#[command(version = VERSION)]
#[command(about = "Turn recorded landmark frames into behavioral screening features", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recording (NDJSON or JSON array) and print the feature document
    Summarize {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Session duration in seconds (defaults to the span of the recording)
        #[arg(long)]
        duration: Option<f64>,

        /// Screening configuration JSON (partial overrides allowed)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Session id recorded in the output document
        #[arg(long)]
        session_id: Option<String>,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// Process NDJSON frames from stdin and print the document at end of input
    Run {
        /// Screening configuration JSON
        #[arg(long)]
        config: Option<PathBuf>,

        /// Echo per-frame diagnostics as NDJSON
        #[arg(long)]
        diagnostics: bool,

        /// Session duration in seconds (defaults to the span of the stream)
        #[arg(long)]
        duration: Option<f64>,
    },

    /// Validate a recording's schema and timestamps
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default screening configuration
    Config,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), ScreenCliError> {
    match cli.command {
        Commands::Summarize {
            input,
            duration,
            config,
            session_id,
            pretty,
        } => cmd_summarize(&input, duration, config.as_deref(), session_id.as_deref(), pretty),

        Commands::Run {
            config,
            diagnostics,
            duration,
        } => cmd_run(config.as_deref(), diagnostics, duration),

        Commands::Validate { input, json } => cmd_validate(&input, json),

        Commands::Config => {
            println!("{}", ScreeningConfig::default().to_json()?);
            Ok(())
        }
    }
}

fn read_input(input: &Path) -> Result<String, ScreenCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn load_config(path: Option<&Path>) -> Result<ScreeningConfig, ScreenCliError> {
    match path {
        Some(path) => Ok(ScreeningConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(ScreeningConfig::default()),
    }
}

fn cmd_summarize(
    input: &Path,
    duration: Option<f64>,
    config: Option<&Path>,
    session_id: Option<&str>,
    pretty: bool,
) -> Result<(), ScreenCliError> {
    let config = load_config(config)?;
    let frames = FrameReplay::parse(&read_input(input)?)?;
    if frames.is_empty() {
        return Err(ScreenCliError::NoFrames);
    }

    info!(frames = frames.len(), "replaying recording");
    let summary = FrameReplay::summarize(frames, config, duration)?;
    let json = FeatureEncoder::new().encode_to_json(&summary, session_id, pretty)?;
    println!("{json}");
    Ok(())
}

fn cmd_run(
    config: Option<&Path>,
    diagnostics: bool,
    duration: Option<f64>,
) -> Result<(), ScreenCliError> {
    if atty::is(atty::Stream::Stdin) {
        warn!("reading frames from an interactive terminal; end input with Ctrl-D");
    }

    let mut session = SessionOrchestrator::new(load_config(config)?);
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for (line_num, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let frame: RecordedFrame = serde_json::from_str(trimmed).map_err(|e| {
            ScreenCliError::ParseError(format!("Failed to parse line {}: {}", line_num + 1, e))
        })?;
        let record = session.process_observation(frame)?;

        if diagnostics {
            writeln!(stdout, "{}", serde_json::to_string(&record)?)?;
            stdout.flush()?;
        }
    }

    if session.frame_count() == 0 {
        return Err(ScreenCliError::NoFrames);
    }

    let duration = duration.unwrap_or_else(|| session.observed_duration());
    let summary = session.end_session(duration);
    let json = FeatureEncoder::new().encode_to_json(&summary, None, false)?;
    writeln!(stdout, "{json}")?;
    stdout.flush()?;
    Ok(())
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), ScreenCliError> {
    let frames = FrameReplay::parse(&read_input(input)?)?;
    let issues = FrameReplay::validate_frames(&frames);

    let report = ValidationReport {
        schema: SCHEMA_VERSION.to_string(),
        total_frames: frames.len(),
        invalid_frames: issues.len(),
        errors: issues
            .iter()
            .map(|issue| ValidationErrorDetail {
                index: issue.index,
                error: issue.message.clone(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report ({})", report.schema);
        println!("==================");
        println!("Total frames:   {}", report.total_frames);
        println!("Invalid frames: {}", report.invalid_frames);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Frame {}: {}", err.index, err.error);
            }
        }
    }

    if report.invalid_frames > 0 {
        Err(ScreenCliError::ValidationFailed(report.invalid_frames))
    } else {
        Ok(())
    }
}

// Error handling

#[derive(Debug)]
enum ScreenCliError {
    Io(io::Error),
    Screen(ScreenError),
    Json(serde_json::Error),
    NoFrames,
    ValidationFailed(usize),
    ParseError(String),
}

impl From<io::Error> for ScreenCliError {
    fn from(e: io::Error) -> Self {
        ScreenCliError::Io(e)
    }
}

impl From<ScreenError> for ScreenCliError {
    fn from(e: ScreenError) -> Self {
        ScreenCliError::Screen(e)
    }
}

impl From<serde_json::Error> for ScreenCliError {
    fn from(e: serde_json::Error) -> Self {
        ScreenCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ScreenCliError> for CliError {
    fn from(e: ScreenCliError) -> Self {
        match e {
            ScreenCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ScreenCliError::Screen(e) => {
                let (code, hint) = match &e {
                    ScreenError::InvalidConfig(_) => {
                        ("CONFIG_ERROR", "Run 'screen config' to see valid settings")
                    }
                    ScreenError::MissingTimestamp
                    | ScreenError::InvalidTimestamp(_)
                    | ScreenError::NonMonotonicTimestamp { .. } => {
                        ("TIMESTAMP_ERROR", "Run 'screen validate' for details")
                    }
                    _ => (
                        "PARSE_ERROR",
                        "Ensure input matches the screen.recorded_frame.v1 schema",
                    ),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            ScreenCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            ScreenCliError::NoFrames => CliError {
                code: "NO_FRAMES".to_string(),
                message: "No frames found in input".to_string(),
                hint: Some("Ensure input is not empty".to_string()),
            },
            ScreenCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} frames failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            ScreenCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Check input format".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    schema: String,
    total_frames: usize,
    invalid_frames: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    error: String,
}
