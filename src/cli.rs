use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Overrides;
use crate::source::SourceKind;

#[derive(Parser, Debug)]
#[command(name = "eve-sde-index")]
#[command(version, about = "Load the EVE Online SDE, correct it and build lookup indices")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a source and print table and view sizes
    Load {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print one type with its taxonomy, market path, variants and dependants
    Inspect {
        /// Type ID to look up
        type_id: i32,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// List the queries run against the relational export
    ListQueries,
}

/// Arguments shared by every command that loads data
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Relational export (SQLite file)
    #[arg(long, conflicts_with = "yaml")]
    pub sqlite: Option<PathBuf>,

    /// Hierarchical export (zip archive or extracted directory)
    #[arg(long)]
    pub yaml: Option<PathBuf>,

    /// JSON table mapping name IDs to English text, needed with --yaml
    #[arg(short, long)]
    pub localization: Option<PathBuf>,

    /// Skip corrections and freeze the tables as read
    #[arg(long)]
    pub raw: bool,

    /// Worker threads for the hierarchical reader
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl SourceArgs {
    pub fn overrides(&self) -> Overrides {
        let (source, path) = match (&self.sqlite, &self.yaml) {
            (Some(path), _) => (Some(SourceKind::Sqlite), Some(path.clone())),
            (None, Some(path)) => (Some(SourceKind::Yaml), Some(path.clone())),
            (None, None) => (None, None),
        };
        Overrides {
            source,
            path,
            localization: self.localization.clone(),
            patch: self.raw.then_some(false),
            workers: self.workers,
            config: self.config.clone(),
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
