use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nolash::config::LashConfig;
use nolash::runtime::{self, RunSummary};

/// Insert backlash compensation moves into a G-code program
#[derive(Parser, Debug)]
#[command(name = "nolash", version, about, long_about = None)]
struct Cli {
    /// X backlash
    #[arg(short = 'x', long = "x-lash", allow_negative_numbers = true, required_unless_present = "config")]
    x_lash: Option<f64>,

    /// Y backlash
    #[arg(short = 'y', long = "y-lash", allow_negative_numbers = true, required_unless_present = "config")]
    y_lash: Option<f64>,

    /// Z backlash
    #[arg(short = 'z', long = "z-lash", allow_negative_numbers = true, required_unless_present = "config")]
    z_lash: Option<f64>,

    /// A (rotary) backlash
    #[arg(short = 'a', long = "a-lash", allow_negative_numbers = true, required_unless_present = "config")]
    a_lash: Option<f64>,

    /// JSON file with lash values ({"x": .., "y": .., "z": .., "a": ..}); flags override it
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Input file path (default: stdin)
    #[arg(short = 'i', long)]
    input: Option<PathBuf>,

    /// Output file path (default: stdout)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Write a JSON summary of the run to this path
    #[arg(long)]
    summary: Option<PathBuf>,
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn main() {
    // Logs go to stderr (set RUST_LOG=debug to see every inserted nudge);
    // stdout may be carrying G-code
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("nolash error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), BoxError> {
    let lash = match &cli.config {
        Some(path) => LashConfig::from_file(path)?,
        None => LashConfig::default(),
    }
    .with_overrides(cli.x_lash, cli.y_lash, cli.z_lash, cli.a_lash);

    // Open both ends before transforming anything
    let input: Box<dyn io::BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(open(path)?)),
        None => Box::new(io::stdin().lock()),
    };
    let output: Box<dyn io::Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let summary = runtime::run(&lash, input, output)?;
    info!(
        "Done: {} lines, {} nudges inserted, {} resets",
        summary.lines, summary.nudges, summary.resets
    );

    if let Some(path) = &cli.summary {
        write_summary(path, &summary)?;
    }
    Ok(())
}

fn open(path: &Path) -> Result<File, BoxError> {
    File::open(path).map_err(|e| format!("cannot open input {}: {}", path.display(), e).into())
}

fn create(path: &Path) -> Result<File, BoxError> {
    File::create(path).map_err(|e| format!("cannot create output {}: {}", path.display(), e).into())
}

fn write_summary(path: &Path, summary: &RunSummary) -> Result<(), BoxError> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json)?;
    info!("Summary written to {}", path.display());
    Ok(())
}
