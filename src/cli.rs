//! Command-line interface.

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(version, about = "Campus lecture timetable aggregator")]
pub struct Args {
    /// Log output format
    #[arg(long, value_enum, default_value_t = default_tracing_format(), global = true)]
    pub tracing: TracingFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Serve the lecture API over HTTP (default)
    Serve,
    /// Run a single lecture query and print the records as JSON
    Fetch(FetchArgs),
}

#[derive(Debug, Clone, clap::Args)]
pub struct FetchArgs {
    /// First day to fetch (YYYY-MM-DD)
    #[arg(long)]
    pub date: String,
    /// Number of days to fetch
    #[arg(long)]
    pub limit: Option<String>,
    /// Only keep lectures serving a batch containing this text
    #[arg(long)]
    pub batch: Option<String>,
    /// Only fetch this branch (SOC, NIC, SOB, KD, KIC)
    #[arg(long)]
    pub branch: Option<String>,
    /// Group records under per-day headings
    #[arg(long)]
    pub by_day: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    Pretty,
    Json,
}

fn default_tracing_format() -> TracingFormat {
    if cfg!(debug_assertions) {
        TracingFormat::Pretty
    } else {
        TracingFormat::Json
    }
}
