//! Deep Researcher CLI: multi-round arXiv research from the terminal.
//!
//! Provides both single-question and interactive modes.

mod repl;

use clap::{Parser, ValueEnum};
use deepresearch_core::config::StrategyKind;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Deep Researcher: iterative arXiv research with cited reports
#[derive(Parser, Debug)]
#[command(name = "deepresearch", version, about, long_about = None)]
struct Cli {
    /// Question to research (starts interactive mode if omitted)
    question: Option<String>,

    /// Maximum search rounds
    #[arg(short = 'r', long)]
    max_rounds: Option<usize>,

    /// LLM model to use
    #[arg(short, long)]
    model: Option<String>,

    /// How the model's next-step decisions are read
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Write the report to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Show example questions and exit
    #[arg(short, long)]
    examples: bool,

    /// Workspace directory
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StrategyArg {
    /// `Next queries: a||b` lines
    Marker,
    /// `arxiv_search` tool calls
    ToolCall,
}

impl From<StrategyArg> for StrategyKind {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Marker => StrategyKind::Marker,
            StrategyArg::ToolCall => StrategyKind::ToolCall,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if cli.examples {
        repl::print_examples();
        return Ok(());
    }

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        );

    let log_dir = directories::ProjectDirs::from("dev", "deepresearch", "deepresearch")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "deepresearch.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let mut config =
        deepresearch_core::config::load_config(Some(&workspace), cli.config.as_deref())?;

    // Apply CLI overrides
    if let Some(rounds) = cli.max_rounds {
        config.research.max_rounds = rounds;
    }
    if let Some(model) = &cli.model {
        config.llm.model = model.clone();
    }
    if let Some(strategy) = cli.strategy {
        config.research.strategy = strategy.into();
    }

    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }

    let options = repl::RunOptions {
        output: cli.output,
        quiet: cli.quiet,
    };

    match cli.question {
        Some(question) => repl::run_single(&question, config, options).await,
        None => repl::run_interactive(config, options).await,
    }
}
