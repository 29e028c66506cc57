//! Best-effort removal of per-unit temporaries after a merge.

use std::path::Path;

use crate::worker::WorkerExit;

/// Delete each unit's output file and polynomial copy. Failures are logged
/// and otherwise ignored; a missing file is not a failure.
pub(super) async fn remove_unit_files(exits: &[WorkerExit]) {
    for exit in exits {
        remove_quietly(&exit.unit.output_path).await;
        remove_quietly(&exit.unit.poly_path).await;
    }
}

async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to delete file `{}': {}", path.display(), e),
    }
}
