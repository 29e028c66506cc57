//! Run one batch: partition a range across the worker budget, run every
//! siever concurrently, then merge their output in slot order.
//!
//! Workers are joined as a group; a failing siever never cancels its
//! siblings and never fails the batch. Only I/O on the relations file is fatal.

mod cleanup;

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::config::RunConfig;
use crate::segmenter::{self, Range};
use crate::storage::{ResultStore, TrailingRecord};
use crate::worker::{self, LowerPriority, WorkUnit, WorkerExit, WorkerStatus};

/// What one batch produced.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Relations appended to the store by this batch.
    pub records_appended: u64,
    /// Wall-clock time of the whole batch.
    pub elapsed_seconds: f64,
    /// Sum of per-worker run times.
    pub compute_seconds: f64,
    /// Number of work units launched.
    pub units: usize,
    /// Slots whose siever did not exit successfully.
    pub failed_slots: Vec<usize>,
}

/// Runs batches for one run configuration.
pub struct BatchRunner<'a> {
    cfg: &'a RunConfig,
    priority: Arc<dyn LowerPriority>,
}

impl<'a> BatchRunner<'a> {
    pub fn new(cfg: &'a RunConfig, priority: Arc<dyn LowerPriority>) -> Self {
        Self { cfg, priority }
    }

    /// One work unit per partition element. When the range is shorter than
    /// the worker budget, fewer workers are used so no unit is empty.
    pub fn plan_units(&self, parent: Range, workers: usize) -> Result<Vec<WorkUnit>> {
        let effective = usize::try_from(parent.length).map_or(workers, |len| workers.min(len));
        if effective < workers {
            tracing::warn!(
                "range {} is shorter than the worker budget, using {} of {} workers",
                parent,
                effective,
                workers
            );
        }
        let plan = segmenter::partition(parent, effective)?;
        Ok(plan
            .into_iter()
            .enumerate()
            .map(|(slot, range)| WorkUnit {
                range,
                slot,
                output_path: self.cfg.unit_output_path(range.start, range.length),
                poly_path: self.cfg.slot_poly_path(slot),
            })
            .collect())
    }

    /// Sieve `parent` with `workers` concurrent sievers and append their
    /// relations to `store`. The store is synced before returning.
    pub async fn run(
        &self,
        store: &mut ResultStore,
        parent: Range,
        workers: usize,
    ) -> Result<BatchOutcome> {
        tracing::info!(
            "Lattice sieving {} q from {} to {} using {} thread(s).",
            self.cfg.side.name(),
            parent.start,
            parent.end(),
            workers
        );
        let started = Instant::now();
        let units = self.plan_units(parent, workers)?;
        let exits = self.run_units(units).await?;

        let failed_slots: Vec<usize> = exits
            .iter()
            .filter(|e| !e.status.success())
            .map(|e| e.unit.slot)
            .collect();
        let merged = merge_in_slot_order(store, &exits);
        cleanup::remove_unit_files(&exits).await;
        let records_appended = merged?;

        tracing::info!("Found {} relations.", records_appended);
        Ok(BatchOutcome {
            records_appended,
            elapsed_seconds: started.elapsed().as_secs_f64(),
            compute_seconds: exits.iter().map(|e| e.elapsed.as_secs_f64()).sum(),
            units: exits.len(),
            failed_slots,
        })
    }

    /// Launch every unit at once and wait for all of them. Result is indexed by slot.
    async fn run_units(&self, units: Vec<WorkUnit>) -> Result<Vec<WorkerExit>> {
        let count = units.len();
        let mut join_set = tokio::task::JoinSet::new();
        for unit in units {
            let siever = self.cfg.siever.clone();
            let side = self.cfg.side;
            let poly = self.cfg.poly.clone();
            let priority = Arc::clone(&self.priority);
            join_set.spawn(async move {
                worker::run_unit(unit, &siever, side, &poly, priority.as_ref()).await
            });
        }

        // Every task is joined before returning, even after a join error.
        let mut by_slot: Vec<Option<WorkerExit>> = vec![None; count];
        let mut join_error = None;
        while let Some(res) = join_set.join_next().await {
            match res {
                Ok(exit) => {
                    report_exit(&exit);
                    let slot = exit.unit.slot;
                    by_slot[slot] = Some(exit);
                }
                Err(e) => {
                    tracing::error!("worker task failed: {}", e);
                    join_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = join_error {
            return Err(anyhow::anyhow!("worker task join: {}", e));
        }
        Ok(by_slot.into_iter().flatten().collect())
    }
}

fn report_exit(exit: &WorkerExit) {
    let unit = &exit.unit;
    match &exit.status {
        WorkerStatus::Success => {}
        WorkerStatus::Failed { code } => tracing::warn!(
            slot = unit.slot,
            code = code.unwrap_or(-1),
            "siever for q in {} exited with {}",
            unit.range,
            code.map_or_else(|| "a signal".to_string(), |c| format!("code {}", c))
        ),
        WorkerStatus::Lost { reason } => tracing::warn!(
            slot = unit.slot,
            "siever for q in {} did not run: {}",
            unit.range,
            reason
        ),
    }
}

/// Append every existing unit output, slot 0 first, as one batch.
/// Output of failed sievers is merged up to its last complete record; an
/// unreadable output counts as whatever was read before the failure.
fn merge_in_slot_order(store: &mut ResultStore, exits: &[WorkerExit]) -> Result<u64> {
    let store_path = store.path().display().to_string();
    let mut batch = store.begin_batch();
    for exit in exits {
        let path: &Path = &exit.unit.output_path;
        if !path.exists() {
            if exit.status.success() {
                tracing::warn!(slot = exit.unit.slot, path = %path.display(), "siever produced no output file");
            }
            continue;
        }
        tracing::debug!("Appending file {} to file {}", path.display(), store_path);
        let trailing = if exit.status.success() {
            TrailingRecord::Keep
        } else {
            TrailingRecord::Drop
        };
        let appended = batch.append_file(path, trailing)?;
        if let Some(e) = appended.read_error {
            tracing::warn!(
                slot = exit.unit.slot,
                path = %path.display(),
                "could not read siever output, kept {} complete record(s): {}",
                appended.records,
                e
            );
        }
    }
    let records = batch.finish()?;
    store.sync()?;
    Ok(records)
}
