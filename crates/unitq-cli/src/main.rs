//! unitq - quantity arithmetic on the command line
//!
//! Usage:
//!   unitq mul "12 s" "3 1/s"          # Single operation
//!   unitq normalize "c*b/a*b"          # Canonical unit
//!   echo "div 100 km | 2 h" | unitq    # Pipe mode
//!   unitq -f operations.txt            # File mode

mod commands;

use std::io::{self, BufRead, IsTerminal};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use commands::{Operation, Outcome};

#[derive(Parser, Debug)]
#[command(name = "unitq")]
#[command(about = "Decimal arithmetic with symbolic units", long_about = None)]
struct Args {
    #[command(subcommand)]
    operation: Option<Operation>,

    /// Read operations from file, one per line
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Some(op) = args.operation {
        let outcome = commands::run(op)?;
        print_outcome(&outcome, args.json)?;
    } else if let Some(path) = &args.file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        run_lines(content.lines().map(str::to_string), args.json)?;
    } else if !io::stdin().is_terminal() {
        let lines = io::stdin().lock().lines().collect::<io::Result<Vec<_>>>()?;
        run_lines(lines, args.json)?;
    } else {
        eprintln!("Usage: unitq <operation> <args>...");
        eprintln!("       unitq -f <file>");
        eprintln!("       echo \"mul 12 s | 3 1/s\" | unitq");
        std::process::exit(1);
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Evaluate every line, reporting failures without stopping
fn run_lines(lines: impl IntoIterator<Item = String>, json: bool) -> Result<()> {
    let mut failed = 0;
    for (number, line) in lines.into_iter().enumerate() {
        let result = commands::parse_line(&line)
            .and_then(|op| op.map(commands::run).transpose());
        match result {
            Ok(Some(outcome)) => print_outcome(&outcome, json)?,
            Ok(None) => {}
            Err(e) => {
                failed += 1;
                eprintln!("line {}: {e:#}", number + 1);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} line(s) failed");
    }
    Ok(())
}

fn print_outcome(outcome: &Outcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(outcome)?);
    } else {
        println!("{outcome}");
    }
    Ok(())
}
