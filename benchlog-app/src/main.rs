//! Benchlog
//!
//! Reads the log written by the training benchmark and prints what it holds:
//! - Shape of every table entry (default)
//! - Mean metrics of the last iteration per camera split (`--stats`)
//! - The whole table as JSON for further analysis (`--json`)

mod report;

use benchlog_data::ParseError;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

/// Exit code for a log file that does not exist (`EX_NOINPUT`).
const EXIT_NO_INPUT: u8 = 66;
/// Exit code for a log that exists but cannot be parsed (`EX_DATAERR`).
const EXIT_DATA_ERROR: u8 = 65;

/// Benchlog - Training Benchmark Log Reader
#[derive(Parser, Debug)]
#[command(name = "benchlog")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the benchmark log (log.txt)
    log_path: PathBuf,

    /// Print the table as JSON instead of the summary
    #[arg(long)]
    json: bool,

    /// Also report mean metrics of the last iteration
    #[arg(long)]
    stats: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

/// Logging configuration.
pub struct LoggingConfig {
    pub level: String,
}

impl LoggingConfig {
    fn init(&self) {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&self.level)),
            )
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    LoggingConfig {
        level: args.log_level.clone(),
    }
    .init();

    let table = match benchlog_data::read(&args.log_path) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Reading log failed.");
            return ExitCode::from(exit_code(&e));
        }
    };

    debug!(
        eval_only = table.is_eval_only(),
        iterations = table.iterations.len(),
        "Log table ready"
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let written = if args.json {
        report::write_json(&mut out, &table, args.stats)
    } else {
        report::write_summary(&mut out, &table).and_then(|()| {
            if args.stats {
                report::write_stats(&mut out, &table)
            } else {
                Ok(())
            }
        })
    };

    match written {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Failed to write output: {e}");
            ExitCode::FAILURE
        }
    }
}

fn exit_code(err: &ParseError) -> u8 {
    match err {
        ParseError::FileNotFound(_) => EXIT_NO_INPUT,
        _ => EXIT_DATA_ERROR,
    }
}
