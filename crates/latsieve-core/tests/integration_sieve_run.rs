//! Integration test: full runs, repeats and crash recovery against a fake
//! siever script, checking the relations file byte for byte.

#![cfg(unix)]

mod common;

use common::fake_siever::{expected_relations, run_config, FakeSiever};
use flate2::read::MultiGzDecoder;
use latsieve_core::batch::BatchRunner;
use latsieve_core::checkpoint::{Checkpoint, CheckpointStore};
use latsieve_core::config::ProgramSpec;
use latsieve_core::controller::{RunOutcome, SieveController};
use latsieve_core::error::SieveError;
use latsieve_core::segmenter::Range;
use latsieve_core::storage::ResultStore;
use latsieve_core::worker::platform_priority;
use std::io::Read;
use tempfile::tempdir;

#[tokio::test]
async fn full_run_merges_every_batch_in_order() {
    let dir = tempdir().unwrap();
    let cfg = run_config(dir.path(), FakeSiever::default().install(dir.path()));

    let report = SieveController::new(&cfg).run().await.expect("run");
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.batches, 2);
    assert_eq!(report.records_this_run, 200);
    assert_eq!(report.checkpoint.cursor, 1200);
    assert_eq!(report.checkpoint.cumulative_results, 200);

    let content = std::fs::read_to_string(cfg.results_path()).unwrap();
    assert_eq!(content, expected_relations(1000, 1200, 100, 2));
    assert!(cfg.checkpoint_path().exists(), "final checkpoint is kept");
    assert!(!dir.path().join("c95.resume.old").exists());
    assert!(!dir.path().join("c95_1000_50.out").exists());
}

#[tokio::test]
async fn repeating_a_finished_run_does_nothing() {
    let dir = tempdir().unwrap();
    let cfg = run_config(dir.path(), FakeSiever::default().install(dir.path()));

    SieveController::new(&cfg).run().await.expect("first run");
    let after_first = std::fs::read(cfg.results_path()).unwrap();

    let report = SieveController::new(&cfg).run().await.expect("second run");
    assert_eq!(report.outcome, RunOutcome::NothingToDo { cursor: 1200 });
    assert_eq!(report.batches, 0);
    assert_eq!(std::fs::read(cfg.results_path()).unwrap(), after_first);
}

/// Runs the first batch by hand and checkpoints it, like a run killed later on.
async fn first_batch_checkpointed(cfg: &latsieve_core::config::RunConfig) -> ResultStore {
    let mut store = ResultStore::open(&cfg.results_path(), false).unwrap();
    let mut checkpoints = CheckpointStore::new(&cfg.checkpoint_path());
    checkpoints
        .write(Checkpoint {
            cursor: 1000,
            result_bytes: Some(0),
            ..Checkpoint::fresh()
        })
        .unwrap();
    let runner = BatchRunner::new(cfg, platform_priority(0));
    let outcome = runner.run(&mut store, Range::new(1000, 100), 2).await.unwrap();
    checkpoints
        .update(1100, outcome.records_appended, 0.0, store.len().unwrap())
        .unwrap();
    store
}

#[tokio::test]
async fn crash_after_merge_before_checkpoint_redoes_that_batch_once() {
    let dir = tempdir().unwrap();
    let cfg = run_config(dir.path(), FakeSiever::default().install(dir.path()));

    let mut store = first_batch_checkpointed(&cfg).await;
    // Second batch merged, process dies before the checkpoint update.
    let runner = BatchRunner::new(&cfg, platform_priority(0));
    runner.run(&mut store, Range::new(1100, 100), 2).await.unwrap();
    drop(store);

    let report = SieveController::new(&cfg).run().await.expect("resumed run");
    assert_eq!(report.batches, 1, "only the uncheckpointed batch is redone");
    assert_eq!(report.checkpoint.cumulative_results, 200);
    let content = std::fs::read_to_string(cfg.results_path()).unwrap();
    assert_eq!(content, expected_relations(1000, 1200, 100, 2));
}

#[tokio::test]
async fn crash_after_checkpoint_does_not_redo_the_batch() {
    let dir = tempdir().unwrap();
    let cfg = run_config(dir.path(), FakeSiever::default().install(dir.path()));

    drop(first_batch_checkpointed(&cfg).await);

    let report = SieveController::new(&cfg).run().await.expect("resumed run");
    assert_eq!(report.batches, 1);
    assert_eq!(report.records_this_run, 100);
    let content = std::fs::read_to_string(cfg.results_path()).unwrap();
    assert_eq!(content, expected_relations(1000, 1200, 100, 2));
}

#[tokio::test]
async fn crash_inside_first_batch_rolls_back_to_baseline() {
    let dir = tempdir().unwrap();
    let cfg = run_config(dir.path(), FakeSiever::default().install(dir.path()));
    std::fs::write(cfg.results_path(), "earlier:rels\n").unwrap();

    // Baseline recorded, then half a batch merged before the crash.
    let mut checkpoints = CheckpointStore::new(&cfg.checkpoint_path());
    checkpoints
        .write(Checkpoint {
            cursor: 1000,
            result_bytes: Some(13),
            ..Checkpoint::fresh()
        })
        .unwrap();
    let mut f = std::fs::OpenOptions::new().append(true).open(cfg.results_path()).unwrap();
    std::io::Write::write_all(&mut f, b"1000:a:0\n1001:a:0\n").unwrap();
    drop(f);

    SieveController::new(&cfg).run().await.expect("run");
    let content = std::fs::read_to_string(cfg.results_path()).unwrap();
    assert_eq!(
        content,
        format!("earlier:rels\n{}", expected_relations(1000, 1200, 100, 2))
    );
}

#[tokio::test]
async fn failing_worker_does_not_stop_the_run() {
    let dir = tempdir().unwrap();
    let siever = FakeSiever { fail_at: Some(1050) }.install(dir.path());
    let cfg = run_config(dir.path(), siever);

    let report = SieveController::new(&cfg).run().await.expect("run");
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.batches, 2);
    assert_eq!(report.records_this_run, 150);
    let content = std::fs::read_to_string(cfg.results_path()).unwrap();
    assert!(!content.contains("1050:a:1"));
    assert!(content.contains("1049:a:0"));
    assert!(content.contains("1199:a:1"));
}

#[tokio::test]
async fn legacy_cursor_only_checkpoint_resumes() {
    let dir = tempdir().unwrap();
    let cfg = run_config(dir.path(), FakeSiever::default().install(dir.path()));
    std::fs::write(cfg.checkpoint_path(), "1100").unwrap();

    let report = SieveController::new(&cfg).run().await.expect("run");
    assert_eq!(report.batches, 1);
    let content = std::fs::read_to_string(cfg.results_path()).unwrap();
    assert_eq!(content, expected_relations(1100, 1200, 100, 2));
}

#[tokio::test]
async fn missing_siever_aborts_without_checkpoint() {
    let dir = tempdir().unwrap();
    let cfg = run_config(dir.path(), ProgramSpec::new("gnfs-lasieve-not-installed"));

    let err = SieveController::new(&cfg).run().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SieveError>(),
        Some(SieveError::SieverNotFound { .. })
    ));
    assert!(!cfg.checkpoint_path().exists());
    assert!(!cfg.results_path().exists());
}

#[tokio::test]
async fn compressed_store_decodes_to_the_same_relations() {
    let dir = tempdir().unwrap();
    let mut cfg = run_config(dir.path(), FakeSiever::default().install(dir.path()));
    cfg.compress_results = true;

    SieveController::new(&cfg).run().await.expect("run");
    assert!(cfg.results_path().to_string_lossy().ends_with(".rels.gz"));
    let mut text = String::new();
    MultiGzDecoder::new(std::fs::File::open(cfg.results_path()).unwrap())
        .read_to_string(&mut text)
        .unwrap();
    assert_eq!(text, expected_relations(1000, 1200, 100, 2));
}

#[tokio::test]
async fn clear_on_completion_removes_checkpoint() {
    let dir = tempdir().unwrap();
    let mut cfg = run_config(dir.path(), FakeSiever::default().install(dir.path()));
    cfg.clear_on_completion = true;

    let report = SieveController::new(&cfg).run().await.expect("run");
    assert_eq!(report.checkpoint.cursor, 1200);
    assert!(!cfg.checkpoint_path().exists());
    assert!(!dir.path().join("c95.resume.old").exists());
}
