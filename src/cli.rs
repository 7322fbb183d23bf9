use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Browse, index and search a library of PDF equipment manuals.
#[derive(Debug, Parser)]
#[command(name = "folio", version, about)]
pub struct Cli {
    /// Config file (defaults to `folio.toml` in the platform config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Increase log verbosity (`-v` debug, `-vv` trace); `RUST_LOG` wins
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Index every folder in the library
    Index {
        /// Only keep documents whose file name contains this model
        #[arg(long)]
        model: Option<String>,
        /// Read from the offline cache instead of the blob store
        #[arg(long)]
        offline: bool,
        /// Only show folders and files matching this text
        #[arg(long)]
        filter: Option<String>,
        /// Print folders as they finish instead of all at the end
        #[arg(long, conflicts_with = "filter")]
        progress: bool,
        /// Print the index as JSON
        #[arg(long, conflicts_with = "progress")]
        json: bool,
    },
    /// List the top-level folders
    Folders {
        #[arg(long)]
        offline: bool,
    },
    /// List the user manuals for a model, grouped by category
    Manuals {
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        offline: bool,
    },
    /// Search the text of a document description (JSON) and print highlights
    Search {
        /// `{"pages": [["text", ...], ...], "outline": [...]}`
        document: PathBuf,
        query: String,
    },
}

impl Cli {
    /// Default `tracing` filter for the requested verbosity.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
