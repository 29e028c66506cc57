//! Resume checkpoint for a sieving run.
//!
//! Stored as one value per line in `<name>.resume`:
//!
//! ```text
//! <cursor>
//! <cumulative relations>
//! <cumulative compute hours>
//! <relations file length in bytes>
//! ```
//!
//! Shorter files written by older drivers (cursor only, or cursor and
//! relations) are accepted; missing fields read as zero / unknown.

mod durable;

use anyhow::Result;
use std::path::Path;

use crate::error::SieveError;

pub use durable::DurableFile;

/// Authoritative resume point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Checkpoint {
    /// Every q below this value has been sieved and merged.
    pub cursor: u64,
    pub cumulative_results: u64,
    pub cumulative_compute_hours: f64,
    /// Length of the relations file when this checkpoint was taken; `None`
    /// for legacy checkpoints that did not record it.
    pub result_bytes: Option<u64>,
}

impl Checkpoint {
    /// Zero state used when nothing is persisted.
    pub fn fresh() -> Self {
        Self::default()
    }

    /// No run has recorded anything yet (absent file, or a legacy file at 0).
    pub fn is_fresh(&self) -> bool {
        self.cursor == 0 && self.result_bytes.is_none()
    }

    fn to_file_string(self) -> String {
        let mut s = format!(
            "{}\n{}\n{}\n",
            self.cursor, self.cumulative_results, self.cumulative_compute_hours
        );
        if let Some(bytes) = self.result_bytes {
            s.push_str(&format!("{}\n", bytes));
        }
        s
    }

    fn parse(text: &str) -> Result<Self, String> {
        let mut fields = text.lines().map(str::trim).filter(|l| !l.is_empty());
        let cursor = fields
            .next()
            .ok_or_else(|| "empty checkpoint".to_string())?
            .parse::<u64>()
            .map_err(|e| format!("cursor: {}", e))?;
        let cumulative_results = match fields.next() {
            Some(v) => v.parse::<u64>().map_err(|e| format!("relations: {}", e))?,
            None => 0,
        };
        let cumulative_compute_hours = match fields.next() {
            Some(v) => v.parse::<f64>().map_err(|e| format!("compute hours: {}", e))?,
            None => 0.0,
        };
        if !cumulative_compute_hours.is_finite() || cumulative_compute_hours < 0.0 {
            return Err(format!("compute hours out of range: {}", cumulative_compute_hours));
        }
        let result_bytes = match fields.next() {
            Some(v) => Some(v.parse::<u64>().map_err(|e| format!("relations bytes: {}", e))?),
            None => None,
        };
        Ok(Self {
            cursor,
            cumulative_results,
            cumulative_compute_hours,
            result_bytes,
        })
    }
}

/// Durable store for the run's `Checkpoint`. Single writer: the controller.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    file: DurableFile,
    current: Checkpoint,
}

impl CheckpointStore {
    pub fn new(path: &Path) -> Self {
        Self {
            file: DurableFile::new(path),
            current: Checkpoint::fresh(),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Last checkpoint loaded or written by this store.
    pub fn current(&self) -> Checkpoint {
        self.current
    }

    /// Read the persisted checkpoint. Falls back to the `.old` copy when the
    /// current file is missing or unreadable; returns the zero checkpoint when
    /// neither exists.
    pub fn load(&mut self) -> Result<Checkpoint> {
        let current_error = match self.file.read_current()? {
            Some(text) => match Checkpoint::parse(&text) {
                Ok(c) => {
                    self.current = c;
                    return Ok(c);
                }
                Err(reason) => Some(reason),
            },
            None => None,
        };

        let checkpoint = match (self.file.read_backup()?, current_error) {
            (None, None) => Checkpoint::fresh(),
            (None, Some(reason)) => return Err(self.invalid(self.file.path(), reason)),
            (Some(text), current_error) => {
                let c = Checkpoint::parse(&text)
                    .map_err(|reason| self.invalid(&self.file.backup_path(), reason))?;
                match current_error {
                    Some(reason) => tracing::warn!(
                        path = %self.file.path().display(),
                        "checkpoint unreadable ({}), using previous copy",
                        reason
                    ),
                    None => tracing::warn!(
                        path = %self.file.path().display(),
                        "checkpoint missing, recovering from previous copy"
                    ),
                }
                c
            }
        };
        self.current = checkpoint;
        Ok(checkpoint)
    }

    fn invalid(&self, path: &Path, reason: String) -> anyhow::Error {
        SieveError::InvalidCheckpoint {
            path: path.to_path_buf(),
            reason,
        }
        .into()
    }

    /// Persist `checkpoint` as the new resume point.
    pub fn write(&mut self, checkpoint: Checkpoint) -> Result<()> {
        self.file.replace(&checkpoint.to_file_string())?;
        self.current = checkpoint;
        Ok(())
    }

    /// Advance to `new_cursor`, adding one batch's relations and compute time.
    /// `result_bytes` is the synced relations file length after that batch.
    pub fn update(
        &mut self,
        new_cursor: u64,
        delta_results: u64,
        delta_compute_hours: f64,
        result_bytes: u64,
    ) -> Result<Checkpoint> {
        let next = Checkpoint {
            cursor: new_cursor,
            cumulative_results: self.current.cumulative_results + delta_results,
            cumulative_compute_hours: self.current.cumulative_compute_hours + delta_compute_hours,
            result_bytes: Some(result_bytes),
        };
        self.write(next)?;
        Ok(next)
    }

    /// Drop the `.old` backup once the final checkpoint is written.
    pub fn retire_backup(&self) -> Result<()> {
        self.file.discard_backup()
    }

    /// Remove every checkpoint artifact; the next run starts fresh.
    pub fn clear(&mut self) -> Result<()> {
        self.file.remove_all()?;
        self.current = Checkpoint::fresh();
        Ok(())
    }
}
