//! Command-line surface.

use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::Parser;
use serde_json::{json, Value};

use crate::config::AnalyzerConfig;
use crate::pipeline::processor::AnalysisMode;

#[derive(Parser, Debug)]
#[command(name = "rubbersense", version)]
#[command(about = "Rubber tree leaf, trunk and latex image analysis")]
pub struct Cli {
    /// Analysis to run
    #[arg(value_enum)]
    pub mode: AnalysisMode,

    /// Image path or http(s) URL; a JSON detection object for ai_suggestions
    pub input: String,

    /// Part hint for tree mode (`leaf` or `trunk`)
    pub sub_mode: Option<String>,

    /// Directory of ONNX weights (overrides RUBBERSENSE_MODELS_DIR)
    #[arg(long)]
    pub models_dir: Option<PathBuf>,

    /// Directory for annotated images (overrides RUBBERSENSE_OUTPUT_DIR)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Skip LLM enrichment
    #[arg(long)]
    pub no_llm: bool,

    /// Attach the aiInsights digest to the result
    #[arg(long)]
    pub summary: bool,
}

impl Cli {
    /// Apply flag overrides on top of an environment-derived config.
    pub fn apply(&self, mut config: AnalyzerConfig) -> AnalyzerConfig {
        if let Some(dir) = &self.models_dir {
            config.models_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if self.no_llm {
            config = config.without_llm();
        }
        config.summary = self.summary;
        config
    }
}

/// Outcome of argument parsing.
#[derive(Debug)]
pub enum Parsed {
    Run(Cli),
    /// Help or version text to print as-is.
    Info(String),
    /// Argument error rendered as a JSON document.
    Invalid(Value),
}

/// Parse `args` (including the program name).
pub fn parse_args<I, T>(args: I) -> Parsed
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Parsed::Run(cli),
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => Parsed::Info(e.to_string()),
            ErrorKind::MissingRequiredArgument
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                Parsed::Invalid(json!({ "error": "Missing arguments" }))
            }
            _ => Parsed::Invalid(json!({ "error": first_line(&e.to_string()) })),
        },
    }
}

/// Clap errors carry usage text after the first line.
fn first_line(message: &str) -> String {
    message
        .lines()
        .next()
        .unwrap_or_default()
        .trim_start_matches("error: ")
        .to_string()
}
