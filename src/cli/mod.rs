//! CLI module for vidya
//!
//! Command-line parsing with clap; colored terminal output lives in
//! [`output`].

pub mod output;

use crate::types::SearchMode;
use clap::Parser;
use std::path::PathBuf;

/// Query researched when none is given.
pub const DEFAULT_QUERY: &str = "What are the recent advancements in quantum computing?";

/// vidya - multi-agent research pipeline
///
/// Routes a question to a research category, plans and runs searches,
/// writes a cited report and refines it until it passes the quality gate.
#[derive(Parser, Debug)]
#[command(
    name = "vidya",
    author = "Dirmacs <build@dirmacs.com>",
    version,
    about = "vidya - multi-agent research reports with a quality gate",
    after_help = "EXAMPLES:\n    \
                  vidya \"How do solid-state batteries work?\"\n    \
                  vidya -s web_and_file -f notes.md \"Summarize my notes\"\n    \
                  vidya -i 3 -t 9 -o report.md \"History of the printing press\"\n    \
                  vidya --json \"Rust async runtimes\" > run.json"
)]
pub struct Cli {
    /// Research query
    pub query: Option<String>,

    /// Research query (alternative to the positional argument)
    #[arg(short = 'q', long = "query", conflicts_with = "query")]
    pub query_flag: Option<String>,

    /// Sources to search
    #[arg(short, long, value_enum, default_value_t = SearchMode::Web)]
    pub search_mode: SearchMode,

    /// Local files to search (repeatable)
    #[arg(short, long = "file")]
    pub files: Vec<PathBuf>,

    /// Maximum refinement iterations
    #[arg(short = 'i', long)]
    pub max_iterations: Option<usize>,

    /// Quality score (0-10) at which a report is accepted
    #[arg(short = 't', long = "threshold")]
    pub min_score: Option<f64>,

    /// Path to the configuration file
    #[arg(short, long, env = "VIDYA_CONFIG", default_value = "vidya.toml")]
    pub config: PathBuf,

    /// Where to write the markdown report
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Print the finished run as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The query to research, falling back to [`DEFAULT_QUERY`].
    pub fn research_query(&self) -> String {
        self.query
            .as_deref()
            .or(self.query_flag.as_deref())
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .unwrap_or(DEFAULT_QUERY)
            .to_string()
    }
}
