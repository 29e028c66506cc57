//! `latsieve clean` – delete a run's checkpoint so it starts over.

use anyhow::{Context, Result};
use latsieve_core::checkpoint::CheckpointStore;
use latsieve_core::config::checkpoint_path_for;

pub fn run_clean(unique_name: &str) -> Result<()> {
    let work_dir = std::env::current_dir().context("current directory")?;
    let path = checkpoint_path_for(&work_dir, unique_name);
    let mut store = CheckpointStore::new(&path);
    store.clear()?;
    println!("Removed checkpoint {}", path.display());
    Ok(())
}
