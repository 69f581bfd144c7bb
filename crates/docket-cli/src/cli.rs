use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use docket_core::RecordType;

#[derive(Parser)]
#[command(name = "docket")]
#[command(about = "Sync case and summons records between the remote workspace and a local store")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, value_name = "PATH", global = true)]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pull cases, then summonses, from the remote workspace
    Sync {
        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Pull a single record type
    Pull {
        #[arg(value_enum)]
        kind: RecordKind,
        /// Output the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Push one local record to the remote workspace
    Push {
        #[arg(value_enum)]
        kind: RecordKind,
        /// Local or canonical record id
        id: String,
        /// Output the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// List local records
    List {
        #[arg(value_enum)]
        kind: RecordKind,
        /// Number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum RecordKind {
    #[value(alias = "cases")]
    Case,
    #[value(alias = "summon")]
    Summons,
}

impl From<RecordKind> for RecordType {
    fn from(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Case => Self::Case,
            RecordKind::Summons => Self::Summons,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
