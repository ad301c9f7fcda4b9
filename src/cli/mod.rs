//! CLI argument parsing and command dispatch

mod keys;
mod report;
mod run;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

pub use keys::KeysCommand;
pub use report::ReportArgs;
pub use run::RunArgs;

/// chatload - concurrent conversation load testing for chat-completion APIs
#[derive(Parser, Debug)]
#[command(name = "chatload")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (per-exchange logging)
    #[arg(short, long, global = true, env = "CHATLOAD_VERBOSE")]
    pub verbose: bool,

    /// Path to the credential store
    #[arg(
        long,
        global = true,
        env = "CHATLOAD_KEY_STORE",
        default_value = "api_keys.json"
    )]
    pub key_store: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a load test against a chat-completion endpoint
    Run(RunArgs),
    /// Re-aggregate an existing run and regenerate its report
    Report(ReportArgs),
    /// Inspect or extend the credential store
    #[command(subcommand)]
    Keys(KeysCommand),
}

impl Cli {
    /// Execute the selected command
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Run(args) => {
                let completed = run::execute(args, &self.key_store, self.verbose).await?;
                tracing::debug!(
                    run_dir = %completed.run_dir.display(),
                    exchanges = completed.summary.overall.total,
                    "Run complete"
                );
            }
            Commands::Report(args) => {
                report::execute(args).await?;
            }
            Commands::Keys(command) => keys::execute(command, &self.key_store).await?,
        }
        Ok(())
    }
}

/// Print a horizontal rule
fn rule() {
    println!("{}", "=".repeat(70));
}
