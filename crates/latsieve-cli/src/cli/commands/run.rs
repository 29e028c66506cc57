//! `latsieve run` – sieve a range of special-q with resume.

use anyhow::{Context, Result};
use latsieve_core::config::{FactorBaseStep, ProgramSpec, RunConfig, SieveConfig};
use latsieve_core::controller::{format_dhms, RunOutcome, SieveController};
use std::path::PathBuf;

use crate::cli::RunArgs;

/// Fold command-line flags over the config file defaults.
pub fn build_run_config(cfg: &SieveConfig, args: &RunArgs, work_dir: PathBuf) -> RunConfig {
    let fb_mode = cfg
        .factor_base
        .as_ref()
        .map(|fb| fb.mode.clone())
        .unwrap_or_else(|| "F".to_string());
    let factor_base = args
        .factor_base
        .clone()
        .or_else(|| cfg.factor_base.as_ref().map(|fb| fb.program.clone()))
        .map(|program| FactorBaseStep {
            program: ProgramSpec::new(program),
            mode: fb_mode,
        });

    RunConfig {
        q_start: args.q_start,
        q_length: args.q_length,
        workers: args.threads,
        side: args.side(),
        unique_name: args.unique_name.clone(),
        siever: ProgramSpec::new(format!("{}{}", cfg.siever_prefix, args.lattice_siever)),
        save_delta: args.saving_delta.unwrap_or(cfg.save_delta),
        poly: args.poly.clone(),
        work_dir,
        niceness: cfg.niceness,
        compress_results: cfg.compress_results,
        clear_on_completion: cfg.clear_on_completion,
        factor_base,
    }
}

pub async fn run_sieve(cfg: &SieveConfig, args: &RunArgs) -> Result<()> {
    let work_dir = std::env::current_dir().context("current directory")?;
    let run_cfg = build_run_config(cfg, args, work_dir);
    tracing::debug!("run config: {:?}", run_cfg);

    let report = SieveController::new(&run_cfg).run().await?;
    match report.outcome {
        RunOutcome::NothingToDo { .. } => {}
        RunOutcome::Completed => tracing::info!(
            "{} batch(es), {} relation(s) this run in {}.",
            report.batches,
            report.records_this_run,
            format_dhms(report.elapsed_secs as u64)
        ),
    }
    println!("Relations in {}", run_cfg.results_path().display());
    Ok(())
}
