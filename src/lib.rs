pub mod cli;
pub mod config;
pub mod models;
pub mod pipeline;

use std::io::Write;
use std::process::ExitCode;

use serde_json::Value;
use tracing_subscriber::EnvFilter;

use cli::{parse_args, Parsed};
use pipeline::processor::Analyzer;

/// CLI entry point: parse arguments, run one analysis, print one JSON document.
pub fn run() -> ExitCode {
    // Stdout carries only the JSON document; all diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match parse_args(std::env::args_os()) {
        Parsed::Run(cli) => cli,
        Parsed::Info(text) => return print_text(&text),
        Parsed::Invalid(doc) => return print_document(&doc),
    };

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = cli.apply(config::AnalyzerConfig::from_env());
    let analyzer = Analyzer::new(config);
    let doc = analyzer.run(cli.mode, &cli.input, cli.sub_mode.as_deref());
    print_document(&doc)
}

fn print_document(doc: &Value) -> ExitCode {
    print_text(&format!("{doc}\n"))
}

fn print_text(text: &str) -> ExitCode {
    let mut stdout = std::io::stdout().lock();
    match stdout.write_all(text.as_bytes()).and_then(|()| stdout.flush()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Failed to write result");
            ExitCode::FAILURE
        }
    }
}
