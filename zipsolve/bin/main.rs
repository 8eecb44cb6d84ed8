use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;
use zipsolve::{
    synthesize_traced, Coordinate, DetectConfig, Grid, GridReconstructor, LogTrace, PixelBuffer,
    TraceEvent, TraceSink,
};

#[derive(Parser)]
#[command(author, version, about = "Solve zip grid puzzles from screenshots", long_about = None)]
struct Cli {
    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the board in a screenshot and solve it
    Solve {
        /// Screenshot in any format the image crate decodes
        image: PathBuf,
        /// JSON file overriding detector thresholds
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print a JSON response instead of text
        #[arg(long)]
        json: bool,
        /// Include the detector and search trace in the JSON response
        #[arg(long, requires = "json")]
        trace: bool,
    },
    /// Solve a board written in text form, `.` empty, `#` blocked, numbers for waypoints
    Path {
        grid: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Print the default detector config as JSON
    Config,
}

#[derive(Serialize, Default)]
struct Response<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    grid: Option<&'a Grid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a [Coordinate]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace: Option<&'a [TraceEvent]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Logs every event and keeps a copy when `keep` is set
struct CliTrace {
    keep: bool,
    events: Vec<TraceEvent>,
}

impl TraceSink for CliTrace {
    fn record(&mut self, event: TraceEvent) {
        if self.keep {
            self.events.push(event.clone());
        }
        LogTrace.record(event);
    }
}

fn solve_image(
    file: &Path,
    config: Option<&Path>,
    trace: &mut CliTrace,
) -> Result<(Grid, Vec<Coordinate>), anyhow::Error> {
    let config = match config {
        Some(path) => DetectConfig::load(path)?,
        None => DetectConfig::default(),
    };
    let reconstructor = GridReconstructor::new(config)?;

    let img = image::open(file).with_context(|| format!("failed to open {}", file.display()))?;
    let pixels = PixelBuffer::from_image(&img);
    info!("loaded {} ({}x{})", file.display(), pixels.width(), pixels.height());

    let grid = reconstructor.reconstruct_traced(&pixels, &mut *trace)?;
    let path = synthesize_traced(&grid, &mut *trace);

    Ok((grid, path))
}

fn solve_text(file: &Path, trace: &mut CliTrace) -> Result<(Grid, Vec<Coordinate>), anyhow::Error> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let grid: Grid = text
        .parse()
        .with_context(|| format!("invalid grid in {}", file.display()))?;
    let path = synthesize_traced(&grid, &mut *trace);

    Ok((grid, path))
}

fn print_text(grid: &Grid, path: &[Coordinate]) {
    print!("{}", grid);
    println!();
    let points: Vec<String> = path.iter().map(Coordinate::to_string).collect();
    println!("{}", points.join(" -> "));
}

fn report(
    result: Result<(Grid, Vec<Coordinate>), anyhow::Error>,
    json: bool,
    trace: &CliTrace,
) -> Result<(), anyhow::Error> {
    if !json {
        let (grid, path) = result?;
        print_text(&grid, &path);
        return Ok(());
    }

    let trace = trace.keep.then_some(trace.events.as_slice());
    match result {
        Ok((grid, path)) => {
            let response = Response {
                success: true,
                grid: Some(&grid),
                path: Some(path.as_slice()),
                trace,
                ..Default::default()
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(e) => {
            let response = Response {
                error: Some(format!("{:#}", e)),
                trace,
                ..Default::default()
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
            std::process::exit(1);
        }
    }
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Commands::Solve {
            image,
            config,
            json,
            trace,
        } => {
            let mut sink = CliTrace {
                keep: trace,
                events: Vec::new(),
            };
            let result = solve_image(&image, config.as_deref(), &mut sink);
            report(result, json, &sink)
        }
        Commands::Path { grid, json } => {
            let mut sink = CliTrace {
                keep: false,
                events: Vec::new(),
            };
            let result = solve_text(&grid, &mut sink);
            report(result, json, &sink)
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&DetectConfig::default())?);
            Ok(())
        }
    }
}
