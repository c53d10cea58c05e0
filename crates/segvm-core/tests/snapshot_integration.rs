//! Integration tests for heap snapshots
//!
//! Tests cover:
//! - Loading snapshot files from disk
//! - Capturing a VM after collection
//! - Error reporting for unreadable input

use segvm_core::{Address, GcOptions, HeapSnapshot, Object, SegmentId, SegmentKind, SnapshotError};
use std::io::Write;
use tempfile::NamedTempFile;

const UNLOCKED_SCRIPT: &str = r#"{
    "segments": [
        { "kind": "stack", "id": 1, "size": 32 },
        { "kind": "script", "id": 2, "number": 7, "lockers": 0,
          "objects": [{ "offset": 0, "variables": ["0003:0000"] }] },
        { "kind": "strings", "id": 3, "strings": [{ "offset": 0, "text": "label" }] }
    ],
    "state": {
        "stack_segment": 1,
        "frames": [{ "kind": "normal", "sp": 0 }]
    }
}"#;

fn write_snapshot(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_from_file_and_collect() {
    let file = write_snapshot(UNLOCKED_SCRIPT);
    let mut vm = HeapSnapshot::load(file.path())
        .unwrap()
        .into_vm(GcOptions::default())
        .unwrap();

    let report = vm.collect_garbage().unwrap();

    assert_eq!(report.freed_of(SegmentKind::Script), 1);
    assert_eq!(report.freed_of(SegmentKind::Strings), 1);
}

#[test]
fn test_capture_after_collection() {
    let mut vm = HeapSnapshot::from_json(UNLOCKED_SCRIPT)
        .unwrap()
        .into_vm(GcOptions::default())
        .unwrap();
    vm.heap_mut().script_mut(SegmentId(2)).unwrap().lock();
    let clones = vm.heap_mut().new_clone_table().unwrap();
    vm.heap_mut().alloc_clone(clones, Object::default()).unwrap();
    vm.collect_garbage().unwrap();

    let json = HeapSnapshot::of_vm(&vm).to_json().unwrap();
    let reloaded = HeapSnapshot::from_json(&json).unwrap();
    let (heap, _) = reloaded.into_parts().unwrap();

    assert!(heap.object(Address::new(SegmentId(2), 0)).is_some());
    assert_eq!(heap.get(clones).unwrap().live_count(), 0);
    assert_eq!(heap.get(SegmentId(3)).unwrap().live_count(), 1);
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = HeapSnapshot::load(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, SnapshotError::Io(_)));
}

#[test]
fn test_unknown_segment_kind() {
    let file = write_snapshot(
        r#"{ "segments": [{ "kind": "hunks", "id": 1 }], "state": { "stack_segment": 1 } }"#,
    );
    let err = HeapSnapshot::load(file.path()).unwrap_err();
    assert!(matches!(err, SnapshotError::Json(_)));
    assert!(err.to_string().starts_with("Invalid snapshot"));
}

#[test]
fn test_reserved_segment_id() {
    let err = HeapSnapshot::from_json(
        r#"{ "segments": [{ "kind": "clones", "id": 0 }], "state": { "stack_segment": 1 } }"#,
    )
    .unwrap()
    .into_parts()
    .unwrap_err();
    assert_eq!(err.to_string(), "Segment id 0 is reserved");
}
