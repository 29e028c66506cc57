//! Top-level sieving driver.
//!
//! Reads the checkpoint, works out where to resume, runs the factor-base
//! step, then walks the remaining range one save-batch at a time:
//! batch → merge → checkpoint. Batches never overlap; each one starts from
//! the checkpoint the previous one left.

mod prep;
mod progress;

use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;

use crate::batch::BatchRunner;
use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::config::RunConfig;
use crate::segmenter::{self, Range};
use crate::storage::ResultStore;
use crate::worker::{platform_priority, resolve_program, LowerPriority};

pub use prep::prepare_factor_base;
pub use progress::{format_dhms, RunProgress};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A previous run already sieved past the requested end.
    NothingToDo { cursor: u64 },
    /// The requested range is now fully sieved.
    Completed,
}

/// Summary returned by `SieveController::run`.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Save-batches run by this invocation.
    pub batches: usize,
    /// Relations appended by this invocation.
    pub records_this_run: u64,
    /// Checkpoint state at the end of the run.
    pub checkpoint: Checkpoint,
    pub elapsed_secs: f64,
}

pub struct SieveController<'a> {
    cfg: &'a RunConfig,
    priority: Arc<dyn LowerPriority>,
}

impl<'a> SieveController<'a> {
    /// Controller using the host's priority lowering at `cfg.niceness`.
    pub fn new(cfg: &'a RunConfig) -> Self {
        Self::with_priority(cfg, platform_priority(cfg.niceness))
    }

    pub fn with_priority(cfg: &'a RunConfig, priority: Arc<dyn LowerPriority>) -> Self {
        Self { cfg, priority }
    }

    /// Sieve `[q_start, q_start + q_length)`, resuming from the checkpoint.
    pub async fn run(&self) -> Result<RunReport> {
        let cfg = self.cfg;
        let q_end = cfg.requested_range()?.end();
        let started = Instant::now();

        let siever_path = resolve_program(&cfg.siever.program)?;
        tracing::debug!(
            "using siever {} at {}",
            siever_path.display(),
            self.priority.describe()
        );

        let mut checkpoints = CheckpointStore::new(&cfg.checkpoint_path());
        let loaded = checkpoints.load()?;
        if loaded.cursor >= q_end {
            tracing::info!(
                "No more work to do, a previous run sieved to q={}",
                loaded.cursor
            );
            return Ok(RunReport {
                outcome: RunOutcome::NothingToDo {
                    cursor: loaded.cursor,
                },
                batches: 0,
                records_this_run: 0,
                checkpoint: loaded,
                elapsed_secs: started.elapsed().as_secs_f64(),
            });
        }

        let q0 = if loaded.is_fresh() {
            cfg.q_start
        } else {
            if loaded.cursor != cfg.q_start {
                tracing::info!("Resuming at q={}.", loaded.cursor);
            }
            loaded.cursor
        };

        if let Some(step) = &cfg.factor_base {
            prepare_factor_base(step, &cfg.poly).await?;
        }

        let mut store = ResultStore::open(&cfg.results_path(), cfg.compress_results)?;
        self.align_store(&mut store, &mut checkpoints, loaded, q0)?;

        let batches = segmenter::save_batches(Range::from_bounds(q0, q_end)?, cfg.save_delta)?;
        let runner = BatchRunner::new(cfg, Arc::clone(&self.priority));
        let sieve_start = Instant::now();
        let mut records_this_run = 0u64;

        for batch in &batches {
            let outcome = runner.run(&mut store, *batch, cfg.workers).await?;
            // The store was synced by the runner; record its length with the new cursor.
            let result_bytes = store.len()?;
            let checkpoint = checkpoints.update(
                batch.end(),
                outcome.records_appended,
                outcome.compute_seconds / 3600.0,
                result_bytes,
            )?;
            records_this_run += outcome.records_appended;

            RunProgress {
                q_done: batch.end() - q0,
                q_remaining: q_end - batch.end(),
                elapsed_secs: sieve_start.elapsed().as_secs_f64(),
                records_this_run,
                checkpoint,
            }
            .log();
        }

        let final_checkpoint = checkpoints.current();
        if cfg.clear_on_completion {
            checkpoints.clear()?;
        } else {
            checkpoints.retire_backup()?;
        }
        tracing::info!(
            "Sieving of q in [{}, {}) done: {} relations, {:.3} compute-hours in total.",
            cfg.q_start,
            q_end,
            final_checkpoint.cumulative_results,
            final_checkpoint.cumulative_compute_hours
        );

        Ok(RunReport {
            outcome: RunOutcome::Completed,
            batches: batches.len(),
            records_this_run,
            checkpoint: final_checkpoint,
            elapsed_secs: started.elapsed().as_secs_f64(),
        })
    }

    /// Make the relations file agree with the checkpoint before appending.
    ///
    /// A fresh run records the current length as its baseline, keeping any
    /// totals already loaded. A resumed run
    /// cuts off anything merged after the last checkpoint, so that batch is
    /// redone exactly once.
    fn align_store(
        &self,
        store: &mut ResultStore,
        checkpoints: &mut CheckpointStore,
        loaded: Checkpoint,
        q0: u64,
    ) -> Result<()> {
        let len = store.len()?;
        match loaded.result_bytes {
            None if loaded.is_fresh() => {
                // Totals from a legacy file at cursor 0 carry over.
                checkpoints.write(Checkpoint {
                    cursor: q0,
                    result_bytes: Some(len),
                    ..loaded
                })?;
            }
            None => {
                tracing::debug!("checkpoint has no relations length, appending as is");
            }
            Some(recorded) if len > recorded => {
                tracing::info!(
                    "discarding {} byte(s) of {} merged after the last checkpoint",
                    len - recorded,
                    store.path().display()
                );
                store.truncate(recorded)?;
            }
            Some(recorded) if len < recorded => {
                tracing::warn!(
                    "{} is shorter than the checkpoint records ({} < {} bytes)",
                    store.path().display(),
                    len,
                    recorded
                );
            }
            Some(_) => {}
        }
        Ok(())
    }
}
