//! `latsieve status` – show the checkpoint of a run.

use anyhow::{Context, Result};
use latsieve_core::checkpoint::CheckpointStore;
use latsieve_core::config::checkpoint_path_for;

pub fn run_status(unique_name: &str) -> Result<()> {
    let work_dir = std::env::current_dir().context("current directory")?;
    let path = checkpoint_path_for(&work_dir, unique_name);
    let mut store = CheckpointStore::new(&path);
    let cp = store.load()?;
    if cp.is_fresh() {
        println!("No checkpoint for {}.", unique_name);
        return Ok(());
    }
    println!("{:<14} {}", "NAME", unique_name);
    println!("{:<14} {}", "NEXT Q", cp.cursor);
    println!("{:<14} {}", "RELATIONS", cp.cumulative_results);
    println!("{:<14} {:.3}", "CPU HOURS", cp.cumulative_compute_hours);
    println!(
        "{:<14} {}",
        "RELS BYTES",
        cp.result_bytes
            .map(|b| b.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    Ok(())
}
