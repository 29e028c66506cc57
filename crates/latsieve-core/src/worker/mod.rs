//! One external siever invocation per work unit.
//!
//! A `WorkerHandle` owns the child process for a single sub-range: it copies
//! the polynomial file for its slot, starts the siever at lowered priority and
//! waits for it. Exit status is data, never an error: the batch decides what a
//! failure means.

mod locate;
mod priority;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};

use crate::config::{ProgramSpec, Side};
use crate::segmenter::Range;

pub use locate::resolve_program;
#[cfg(windows)]
pub use priority::IdlePriorityClass;
#[cfg(unix)]
pub use priority::Niceness;
pub use priority::{platform_priority, LowerPriority};

/// One partition element bound to an execution slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    pub range: Range,
    /// Position within the batch; merge order follows it.
    pub slot: usize,
    /// Relations written by the siever.
    pub output_path: PathBuf,
    /// Private copy of the polynomial file handed to the siever.
    pub poly_path: PathBuf,
}

/// How a worker ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerStatus {
    /// Exit code 0.
    Success,
    /// Non-zero exit; `code` is `None` when killed by a signal.
    Failed { code: Option<i32> },
    /// Never ran (spawn or polynomial copy failed) or could not be waited on.
    Lost { reason: String },
}

impl WorkerStatus {
    pub fn success(&self) -> bool {
        matches!(self, WorkerStatus::Success)
    }
}

/// Result of one worker, returned to the batch after it terminates.
#[derive(Debug, Clone)]
pub struct WorkerExit {
    pub unit: WorkUnit,
    pub status: WorkerStatus,
    /// Wall-clock time the process ran.
    pub elapsed: Duration,
}

/// Arguments for one siever invocation after the program's leading args:
/// `-k -v -o <out> -n<slot> -f <start> -c <length> -<side> -R <poly>`.
pub fn siever_args(unit: &WorkUnit, side: Side) -> Vec<String> {
    vec![
        "-k".to_string(),
        "-v".to_string(),
        "-o".to_string(),
        unit.output_path.display().to_string(),
        format!("-n{}", unit.slot),
        "-f".to_string(),
        unit.range.start.to_string(),
        "-c".to_string(),
        unit.range.length.to_string(),
        format!("-{}", side.flag()),
        "-R".to_string(),
        unit.poly_path.display().to_string(),
    ]
}

/// A running siever process.
pub struct WorkerHandle {
    unit: WorkUnit,
    child: Child,
    pid: Option<u32>,
    started: Instant,
}

impl WorkerHandle {
    /// Copy the shared polynomial file for this slot and start the siever.
    pub async fn launch(
        unit: WorkUnit,
        siever: &ProgramSpec,
        side: Side,
        shared_poly: &Path,
        priority: &dyn LowerPriority,
    ) -> Result<Self> {
        tokio::fs::copy(shared_poly, &unit.poly_path)
            .await
            .with_context(|| {
                format!(
                    "copy {} to {}",
                    shared_poly.display(),
                    unit.poly_path.display()
                )
            })?;

        let args = siever_args(&unit, side);
        let mut cmd = Command::new(&siever.program);
        // A handle dropped before `wait` (aborted batch task) takes its siever with it.
        cmd.args(&siever.leading_args)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        priority.apply(&mut cmd);

        let child = cmd
            .spawn()
            .with_context(|| format!("spawn {}", siever.display_name()))?;
        let pid = child.id();
        tracing::debug!(
            slot = unit.slot,
            pid = pid.unwrap_or_default(),
            "{} {} {}",
            siever.display_name(),
            siever.leading_args.join(" "),
            args.join(" ")
        );
        Ok(Self {
            unit,
            child,
            pid,
            started: Instant::now(),
        })
    }

    /// Block until the process terminates and record its status.
    pub async fn wait(mut self) -> WorkerExit {
        let status = match self.child.wait().await {
            Ok(s) if s.success() => WorkerStatus::Success,
            Ok(s) => WorkerStatus::Failed { code: s.code() },
            Err(e) => WorkerStatus::Lost {
                reason: format!("wait failed: {}", e),
            },
        };
        let elapsed = self.started.elapsed();
        tracing::debug!(
            slot = self.unit.slot,
            pid = self.pid.unwrap_or_default(),
            "process exited with {:?} after {:.1}s",
            status,
            elapsed.as_secs_f64()
        );
        WorkerExit {
            unit: self.unit,
            status,
            elapsed,
        }
    }
}

/// Launch and wait for one unit, folding launch failures into `WorkerStatus::Lost`.
pub async fn run_unit(
    unit: WorkUnit,
    siever: &ProgramSpec,
    side: Side,
    shared_poly: &Path,
    priority: &dyn LowerPriority,
) -> WorkerExit {
    match WorkerHandle::launch(unit.clone(), siever, side, shared_poly, priority).await {
        Ok(handle) => handle.wait().await,
        Err(e) => WorkerExit {
            unit,
            status: WorkerStatus::Lost {
                reason: format!("{:#}", e),
            },
            elapsed: Duration::ZERO,
        },
    }
}
