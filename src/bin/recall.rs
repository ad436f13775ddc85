//! CLI shell: reads newline-delimited JSON records from a file (or stdin),
//! runs them through the pipeline in order, and writes one JSON output
//! record per line.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use clap::Parser;
use log::{error, info};

use recall::llm::NullDecider;
use recall::pipeline::Pipeline;
use recall::settings::RecallConfig;
use recall_common::{RecallError, Record};

#[derive(Parser)]
#[command(
    name = "recall",
    version = env!("CARGO_PKG_VERSION"),
    about = "Online log-anomaly RECALL core: streaming entity extraction, graph retrieval, and LLM-assisted triage"
)]
struct Cli {
    /// Path to a JSONL file of records; defaults to stdin
    #[arg(long, short = 'i')]
    input: Option<PathBuf>,

    /// Path to a TOML file overriding the default configuration
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}

/// Opens the input/output streams and drives the pipeline over every line,
/// propagating file I/O failures as `RecallError::Io` rather than handling
/// each one inline (malformed individual records are still skipped with a
/// logged warning, since those are per-record, not stream-level, failures).
fn run(cli: Cli) -> Result<(), RecallError> {
    let cfg = RecallConfig::load(cli.config.as_deref())?;

    let mut pipeline = Pipeline::new(cfg);
    let decider = NullDecider;

    let stdin;
    let reader: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => {
            stdin = io::stdin();
            Box::new(BufReader::new(stdin))
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut processed = 0usize;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: Record = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                error!("skipping malformed record: {}", e);
                continue;
            }
        };
        let output = pipeline.process(&record, &decider);
        match serde_json::to_string(&output) {
            Ok(json) => writeln!(out, "{}", json)?,
            Err(e) => error!("failed to serialize output record: {}", e),
        }
        processed += 1;
    }

    info!("processed {} records", processed);
    Ok(())
}
