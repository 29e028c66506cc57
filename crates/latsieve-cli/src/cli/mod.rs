//! CLI for the latsieve batch sieving driver.

mod commands;

use anyhow::Result;
use clap::builder::RangedU64ValueParser;
use clap::{ArgGroup, Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use latsieve_core::config::{self, Side};
use std::path::PathBuf;

use commands::{run_clean, run_completions, run_man, run_sieve, run_status};

/// Top-level CLI for latsieve.
#[derive(Debug, Parser)]
#[command(name = "latsieve", version)]
#[command(
    about = "latsieve: run a lattice siever over a range of special-q on several cores, with resume",
    long_about = None
)]
pub struct Cli {
    /// Show debug messages on the console.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Sieve a range of special-q, resuming from the checkpoint if one exists.
    Run(RunArgs),

    /// Show the checkpoint of a run.
    Status {
        /// Unique name the run was started with.
        #[arg(short = 's', long = "unique-name", value_name = "NAME")]
        unique_name: String,
    },

    /// Delete the checkpoint of a run so it starts over.
    Clean {
        /// Unique name the run was started with.
        #[arg(short = 's', long = "unique-name", value_name = "NAME")]
        unique_name: String,
    },

    /// Print a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print the man page.
    Man,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("side").required(true).args(["algebraic", "rational"])))]
pub struct RunArgs {
    /// Starting value of q.
    #[arg(short = 'f', value_name = "Q0")]
    pub q_start: u64,

    /// Length of the range to sieve.
    #[arg(short = 'c', value_name = "LEN", value_parser = clap::value_parser!(u64).range(1..))]
    pub q_length: u64,

    /// Maximum number of siever processes per batch.
    #[arg(
        short = 't',
        long = "threads",
        value_name = "N",
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub threads: usize,

    /// Sieve on the algebraic side.
    #[arg(short = 'a', long)]
    pub algebraic: bool,

    /// Sieve on the rational side.
    #[arg(short = 'r', long)]
    pub rational: bool,

    /// Unique name used for the relations, checkpoint, log and temporary files.
    #[arg(short = 's', long = "unique-name", value_name = "NAME")]
    pub unique_name: String,

    /// Lattice siever to use (e.g. lasieve4I14e); the configured prefix is prepended.
    #[arg(short = 'l', long = "lattice-siever", value_name = "SIEVER")]
    pub lattice_siever: String,

    /// Size of the range processed before a checkpoint is saved (default from config).
    #[arg(
        short = 'd',
        long = "saving-delta",
        value_name = "DELTA",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub saving_delta: Option<u64>,

    /// Factor-base program run once before sieving (overrides config).
    #[arg(long = "factor-base", value_name = "PROG")]
    pub factor_base: Option<String>,

    /// Polynomial file handed to every siever.
    pub poly: PathBuf,
}

impl RunArgs {
    pub fn side(&self) -> Side {
        if self.rational {
            Side::Rational
        } else {
            Side::Algebraic
        }
    }
}

impl Cli {
    /// Per-run log file in the working directory; only `run` writes one.
    pub fn log_file(&self) -> Option<PathBuf> {
        match &self.command {
            CliCommand::Run(args) => Some(PathBuf::from(format!("{}.log", args.unique_name))),
            _ => None,
        }
    }

    pub async fn run(self) -> Result<()> {
        match self.command {
            CliCommand::Run(args) => {
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                run_sieve(&cfg, &args).await?;
            }
            CliCommand::Status { unique_name } => run_status(&unique_name)?,
            CliCommand::Clean { unique_name } => run_clean(&unique_name)?,
            CliCommand::Completions { shell } => run_completions(shell, &mut Cli::command()),
            CliCommand::Man => run_man(Cli::command())?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
