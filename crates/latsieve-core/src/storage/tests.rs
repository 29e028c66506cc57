use super::*;
use flate2::read::MultiGzDecoder;
use std::io::Read;
use std::path::Path;

fn write(path: &Path, content: &[u8]) {
    std::fs::write(path, content).unwrap();
}

#[test]
fn appends_in_given_order_and_counts_records() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.out");
    let b = dir.path().join("b.out");
    write(&a, b"1,2:3\n4,5:6\n");
    write(&b, b"7,8:9\n");

    let rels = dir.path().join("c95.rels");
    let mut store = ResultStore::open(&rels, false).unwrap();
    let mut batch = store.begin_batch();
    assert_eq!(batch.append_file(&b, TrailingRecord::Keep).unwrap().records, 1);
    assert_eq!(batch.append_file(&a, TrailingRecord::Keep).unwrap().records, 2);
    assert_eq!(batch.finish().unwrap(), 3);
    store.sync().unwrap();

    assert_eq!(std::fs::read(&rels).unwrap(), b"7,8:9\n1,2:3\n4,5:6\n");
    assert_eq!(store.len().unwrap(), 18);
}

#[test]
fn existing_content_is_kept_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let rels = dir.path().join("c95.rels");
    write(&rels, b"old\n");
    let unit = dir.path().join("u.out");
    write(&unit, b"new\n");

    let mut store = ResultStore::open(&rels, false).unwrap();
    let mut batch = store.begin_batch();
    batch.append_file(&unit, TrailingRecord::Keep).unwrap();
    batch.finish().unwrap();

    assert_eq!(std::fs::read(&rels).unwrap(), b"old\nnew\n");
}

#[test]
fn trailing_partial_record_kept_or_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let unit = dir.path().join("u.out");
    write(&unit, b"r1\nr2\nr3-cut");

    let kept = dir.path().join("kept.rels");
    let mut store = ResultStore::open(&kept, false).unwrap();
    let mut batch = store.begin_batch();
    assert_eq!(batch.append_file(&unit, TrailingRecord::Keep).unwrap().records, 3);
    batch.finish().unwrap();
    assert_eq!(std::fs::read(&kept).unwrap(), b"r1\nr2\nr3-cut");

    let dropped = dir.path().join("dropped.rels");
    let mut store = ResultStore::open(&dropped, false).unwrap();
    let mut batch = store.begin_batch();
    assert_eq!(batch.append_file(&unit, TrailingRecord::Drop).unwrap().records, 2);
    batch.finish().unwrap();
    assert_eq!(std::fs::read(&dropped).unwrap(), b"r1\nr2\n");
}

#[test]
fn truncate_discards_uncheckpointed_tail() {
    let dir = tempfile::tempdir().unwrap();
    let rels = dir.path().join("c95.rels");
    write(&rels, b"batch0\nbatch1\n");
    let mut store = ResultStore::open(&rels, false).unwrap();
    store.truncate(7).unwrap();
    assert_eq!(store.len().unwrap(), 7);

    let unit = dir.path().join("u.out");
    write(&unit, b"batch1\n");
    let mut batch = store.begin_batch();
    batch.append_file(&unit, TrailingRecord::Keep).unwrap();
    batch.finish().unwrap();
    assert_eq!(std::fs::read(&rels).unwrap(), b"batch0\nbatch1\n");
}

#[test]
fn gzip_store_holds_one_member_per_batch() {
    let dir = tempfile::tempdir().unwrap();
    let rels = dir.path().join("c95.rels.gz");
    let unit = dir.path().join("u.out");
    let mut store = ResultStore::open(&rels, true).unwrap();
    assert!(store.is_compressed());

    write(&unit, b"a\nb\n");
    let mut batch = store.begin_batch();
    batch.append_file(&unit, TrailingRecord::Keep).unwrap();
    batch.finish().unwrap();
    let after_first = store.len().unwrap();

    write(&unit, b"c\n");
    let mut batch = store.begin_batch();
    batch.append_file(&unit, TrailingRecord::Keep).unwrap();
    batch.finish().unwrap();
    assert!(store.len().unwrap() > after_first);

    let mut text = String::new();
    MultiGzDecoder::new(std::fs::File::open(&rels).unwrap())
        .read_to_string(&mut text)
        .unwrap();
    assert_eq!(text, "a\nb\nc\n");

    // Cutting back to a member boundary leaves a valid stream.
    store.truncate(after_first).unwrap();
    let mut text = String::new();
    MultiGzDecoder::new(std::fs::File::open(&rels).unwrap())
        .read_to_string(&mut text)
        .unwrap();
    assert_eq!(text, "a\nb\n");
}

#[test]
fn unreadable_source_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let rels = dir.path().join("c95.rels");
    let missing = dir.path().join("missing.out");
    let as_dir = dir.path().join("dir.out");
    std::fs::create_dir(&as_dir).unwrap();
    let good = dir.path().join("good.out");
    write(&good, b"ok\n");

    let mut store = ResultStore::open(&rels, false).unwrap();
    let mut batch = store.begin_batch();
    let a = batch.append_file(&missing, TrailingRecord::Keep).unwrap();
    assert_eq!(a.records, 0);
    assert!(a.read_error.is_some());
    let a = batch.append_file(&as_dir, TrailingRecord::Drop).unwrap();
    assert_eq!(a.records, 0);
    assert!(a.read_error.is_some());
    let a = batch.append_file(&good, TrailingRecord::Keep).unwrap();
    assert_eq!(a.records, 1);
    assert!(a.read_error.is_none());
    assert_eq!(batch.finish().unwrap(), 1);

    assert_eq!(std::fs::read(&rels).unwrap(), b"ok\n");
}
