//! Progress reporting after each save-batch (relations, elapsed time, ETA).

use crate::checkpoint::Checkpoint;

/// Snapshot of run progress after a save-batch.
#[derive(Debug, Clone)]
pub struct RunProgress {
    /// q values sieved by this invocation.
    pub q_done: u64,
    /// q values left until the requested end.
    pub q_remaining: u64,
    /// Wall-clock seconds since this invocation started sieving.
    pub elapsed_secs: f64,
    /// Relations found by this invocation.
    pub records_this_run: u64,
    /// Checkpoint just written (totals across all invocations).
    pub checkpoint: Checkpoint,
}

impl RunProgress {
    /// Linear extrapolation of the remaining time; `None` when done or when
    /// nothing has been measured yet.
    pub fn eta_secs(&self) -> Option<f64> {
        if self.q_remaining == 0 || self.q_done == 0 {
            return None;
        }
        Some(self.q_remaining as f64 / self.q_done as f64 * self.elapsed_secs)
    }

    pub fn elapsed_days(&self) -> f64 {
        self.elapsed_secs / 86_400.0
    }

    /// Fraction of the work this invocation set out to do, in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        let total = self.q_done + self.q_remaining;
        if total == 0 {
            return 1.0;
        }
        self.q_done as f64 / total as f64
    }

    pub(crate) fn log(&self) {
        tracing::info!("Overall relations found: {}", self.records_this_run);
        tracing::info!(
            "Elapsed time: {}s ({:.3} day(s)).",
            self.elapsed_secs as u64,
            self.elapsed_days()
        );
        tracing::debug!(
            cursor = self.checkpoint.cursor,
            "cumulative: {} relations, {:.3} compute-hours, {:.1}% of this run",
            self.checkpoint.cumulative_results,
            self.checkpoint.cumulative_compute_hours,
            self.fraction() * 100.0
        );
        if let Some(eta) = self.eta_secs() {
            tracing::info!("ETA: {}", format_dhms(eta as u64));
        }
    }
}

/// Format seconds as `%dd %dh %dm %ds`.
pub fn format_dhms(seconds: u64) -> String {
    format!(
        "{}d {}h {}m {}s",
        seconds / 86_400,
        (seconds % 86_400) / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}
