use std::io::{self, Read};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use chatlens_core::StoreError;
use chatlens_core::commands::{Commands, DeleteOutcome, ensure_initialized};

#[derive(Parser)]
#[command(
    name = "chatlens",
    about = "Record chat classification results and report statistics over them"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Initialize the data root ($CHATLENS_ROOT or ./.chatlens)
    Init,
    /// Store a classification result for a chat transcript
    Submit {
        /// Chat transcript text, or '-' to read from stdin
        #[arg(long)]
        input: String,
        /// Classification text returned by the analysis service, or '-' for stdin
        #[arg(long)]
        result: String,
    },
    /// Print stored records, newest first
    History,
    /// Delete one record by id
    Delete { id: String },
    /// Delete every record
    Clear,
    /// Print sentiment, intent, daily and keyword statistics
    Stats,
    /// Print a liveness report
    Health,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            let caller_error = e
                .downcast_ref::<StoreError>()
                .map(StoreError::is_caller_error)
                .unwrap_or(false);
            if caller_error { ExitCode::from(2) } else { ExitCode::FAILURE }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.cmd {
        Cmd::Init => {
            let report = ensure_initialized()?;
            print_json(&json!({
                "root": report.root.display().to_string(),
                "created": report.created,
                "existed": report.existed,
            }))
        }
        Cmd::Submit { input, result } => {
            anyhow::ensure!(
                !(input == "-" && result == "-"),
                "only one of --input/--result can read from stdin"
            );
            let input = read_arg(input)?;
            let result = read_arg(result)?;
            let cmds = Commands::new()?;
            let record = cmds.submit(&input, &result)?;
            print_json(&json!({ "success": true, "record": record }))
        }
        Cmd::History => {
            let cmds = Commands::new()?;
            print_json(&json!({ "success": true, "history": cmds.history() }))
        }
        Cmd::Delete { id } => {
            let cmds = Commands::new()?;
            let outcome = cmds.delete(&id)?;
            print_json(&json!({
                "success": outcome == DeleteOutcome::Deleted,
                "outcome": outcome,
            }))
        }
        Cmd::Clear => {
            let cmds = Commands::new()?;
            cmds.clear()?;
            print_json(&json!({ "success": true }))
        }
        Cmd::Stats => {
            let cmds = Commands::new()?;
            print_json(&json!({ "success": true, "statistics": cmds.statistics() }))
        }
        Cmd::Health => {
            let cmds = Commands::new()?;
            print_json(&cmds.health())
        }
    }
}

fn read_arg(value: String) -> Result<String> {
    if value != "-" {
        return Ok(value);
    }
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("reading stdin")?;
    Ok(buf)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
