//! # Marginalia Sync Host
//!
//! Runs a simulation script against the sync host and prints every outbound
//! message on stdout.

use clap::Parser;
use margind::{run_script, HostConfig};
use std::fs;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "margind", version, about = "Margin notes sync host")]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulation script to run
    #[arg(short, long)]
    script: PathBuf,

    /// Override the content request timeout
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Print outbound messages with legacy names
    #[arg(long)]
    legacy_names: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => HostConfig::load(path).unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            process::exit(1);
        }),
        None => HostConfig::default(),
    };
    if let Some(timeout_ms) = args.timeout_ms {
        if timeout_ms == 0 {
            eprintln!("Error: --timeout-ms must be greater than zero");
            process::exit(1);
        }
        config.request_timeout_ms = timeout_ms;
    }
    if args.legacy_names {
        config.legacy_names = true;
    }

    init_tracing(&config, args.verbose);

    let script_text = fs::read_to_string(&args.script).unwrap_or_else(|e| {
        eprintln!("Failed to read script file: {}", e);
        process::exit(1);
    });

    let stdout = std::io::stdout();
    match run_script(config, &script_text, stdout.lock()).await {
        Ok(summary) => {
            tracing::info!(
                steps = summary.steps,
                messages = summary.messages_sent,
                responses = summary.responses.len(),
                "margind.finished"
            );
        }
        Err(e) => {
            eprintln!("Runtime error: {}", e);
            process::exit(1);
        }
    }
}

fn init_tracing(config: &HostConfig, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
