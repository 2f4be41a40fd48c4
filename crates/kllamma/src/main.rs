mod api;
mod config;
mod server;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use kllamma_core::MissingReferencePolicy;
use kllamma_logging::{init_tracing, LogFormat};
use kllamma_refiner::RefinerType;

use crate::config::{AppConfig, FileConfig, Overrides, API_KEY_ENV};

#[derive(Parser, Debug)]
#[command(
    name = "kllamma",
    about = "Refines LLM prompts and collects feedback on the results",
    version,
    author
)]
struct Cli {
    /// Database connection string (sqlite://<path>, a file path or :memory:)
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Address to listen on (default: 0.0.0.0)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (default: 8000)
    #[arg(short, long)]
    port: Option<u16>,

    /// Path to config file (default: ./kllamma.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Refiner backend (default: openai when OPENAI_API_KEY is set, else template)
    #[arg(short, long, value_enum)]
    refiner: Option<RefinerChoice>,

    /// Model to use (if the refiner supports it)
    #[arg(short, long)]
    model: Option<String>,

    /// What to do with feedback for an unknown refinement
    #[arg(long, value_enum)]
    missing_reference: Option<PolicyChoice>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormatChoice,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RefinerChoice {
    Openai,
    Template,
}

impl From<RefinerChoice> for RefinerType {
    fn from(choice: RefinerChoice) -> Self {
        match choice {
            RefinerChoice::Openai => RefinerType::OpenAi,
            RefinerChoice::Template => RefinerType::Template,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyChoice {
    Reject,
    Allow,
}

impl From<PolicyChoice> for MissingReferencePolicy {
    fn from(choice: PolicyChoice) -> Self {
        match choice {
            PolicyChoice::Reject => MissingReferencePolicy::Reject,
            PolicyChoice::Allow => MissingReferencePolicy::Allow,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.log_format.into());

    let file_config = load_file_config(&cli)?;

    let overrides = Overrides {
        database_url: cli.database_url,
        host: cli.host,
        port: cli.port,
        refiner: cli.refiner.map(Into::into),
        model: cli.model,
        missing_reference: cli.missing_reference.map(Into::into),
        api_key: std::env::var(API_KEY_ENV).ok().filter(|key| !key.is_empty()),
    };

    let config = AppConfig::resolve(overrides, file_config)?;

    server::run(config).await
}

fn load_file_config(cli: &Cli) -> Result<FileConfig> {
    // An explicit path must exist; a discovered one is optional.
    if let Some(ref path) = cli.config {
        return FileConfig::load(path)?
            .with_context(|| format!("Config file {} not found", path.display()));
    }

    let working_dir = std::env::current_dir().context("Failed to get current directory")?;
    match FileConfig::discover(&working_dir) {
        Some(path) => Ok(FileConfig::load(&path)?.unwrap_or_default()),
        None => Ok(FileConfig::default()),
    }
}
