//! Docket CLI - pull and push case and summons records from the terminal

mod cli;
mod commands;
mod error;

use clap::{CommandFactory, Parser};

use crate::cli::{Cli, Commands};
use crate::commands::common::resolve_db_path;
use crate::commands::completions::run_completions;
use crate::commands::list::run_list;
use crate::commands::push::run_push;
use crate::commands::sync::{run_pull, run_sync};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "docket=info".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Some(Commands::Sync { json }) => run_sync(json, &db_path).await?,
        Some(Commands::Pull { kind, json }) => run_pull(kind.into(), json, &db_path).await?,
        Some(Commands::Push { kind, id, json }) => {
            run_push(kind.into(), &id, json, &db_path).await?;
        }
        Some(Commands::List { kind, limit, json }) => {
            run_list(kind.into(), limit, json, &db_path).await?;
        }
        Some(Commands::Completions { shell, output }) => {
            run_completions(shell, output.as_deref())?;
        }
        None => {
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
