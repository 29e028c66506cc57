//! One-time factor-base preparation before sieving starts.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::config::FactorBaseStep;
use crate::error::SieveError;
use crate::worker::resolve_program;

/// Run `<program> -<mode> <poly>` and require exit code 0. Not retried.
pub async fn prepare_factor_base(step: &FactorBaseStep, poly: &Path) -> Result<()> {
    let program = resolve_program(&step.program.program)?;
    let mode = format!("-{}", step.mode);
    tracing::info!(
        "Preparing factor base: {} {} {}",
        program.display(),
        mode,
        poly.display()
    );
    let status = Command::new(&program)
        .args(&step.program.leading_args)
        .arg(&mode)
        .arg(poly)
        .stdin(Stdio::null())
        .status()
        .await
        .with_context(|| format!("spawn {}", program.display()))?;
    if !status.success() {
        return Err(SieveError::FactorBasePrep {
            program: program.display().to_string(),
            status: status.to_string(),
        }
        .into());
    }
    tracing::debug!("factor base preparation finished");
    Ok(())
}
