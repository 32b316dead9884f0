use clap::Parser;
use ragline::cli::{self, Cli, Commands};
use ragline::config::Config;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse();
    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            return ExitCode::FAILURE;
        }
    };
    cli.apply(&mut config);
    let rag_tag = cli.rag_tag.clone();

    let result = match cli.command {
        Some(Commands::Tags) => cli::run_tags(&config).await,
        Some(Commands::Sessions) => cli::run_sessions(&config).await,
        None => cli::run_repl(&config, rag_tag).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Write logs to a file when RAGLINE_LOG is set (the REPL owns stdout),
/// otherwise honor RUST_LOG on stderr.
fn init_logging() {
    if std::env::var("RAGLINE_LOG").is_ok() {
        use tracing_subscriber::prelude::*;
        match std::fs::File::create("ragline.log") {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false);
                let filter = tracing_subscriber::EnvFilter::new("ragline=debug");
                let _ = tracing_subscriber::registry()
                    .with(file_layer.with_filter(filter))
                    .try_init();
            }
            Err(err) => {
                eprintln!("Failed to create log file: {err}");
            }
        }
    } else if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .try_init();
    }
}
