use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;
use wordbench::archive::{ArchiveError, DurableStorage, FailureArchive, FsStorage, MemoryStorage};

#[test]
fn test_identical_content_gets_distinct_keys() {
    let archive = FailureArchive::new(Arc::new(MemoryStorage::new()));

    let first = archive.save("same text").unwrap();
    let second = archive.save("same text").unwrap();

    assert_ne!(first, second);
    assert_eq!(archive.keys().unwrap().len(), 2);
    assert_eq!(archive.load(&first).unwrap(), "same text");
    assert_eq!(archive.load(&second).unwrap(), "same text");
}

#[test]
fn test_fs_archive_preserves_content_byte_for_byte() {
    let dir = tempdir().unwrap();
    let archive = FailureArchive::in_dir(dir.path().join("parse-errors"));
    let text = "Line one\r\n\tclue_id : c1  \n\nanswer → ‘drill’\n";

    let key = archive.save(text).unwrap();

    assert!(key.ends_with(".txt"));
    let on_disk = std::fs::read(dir.path().join("parse-errors").join(&key)).unwrap();
    assert_eq!(on_disk, text.as_bytes());
    assert_eq!(archive.load(&key).unwrap(), text);
}

#[test]
fn test_fs_storage_never_overwrites() {
    let dir = tempdir().unwrap();
    let storage = FsStorage::new(dir.path());

    storage.write("sample.txt", b"first").unwrap();
    let err = storage.write("sample.txt", b"second").unwrap_err();

    assert!(matches!(err, ArchiveError::AlreadyExists(ref key) if key == "sample.txt"));
    assert_eq!(storage.read("sample.txt").unwrap(), b"first");
}

#[test]
fn test_storage_rejects_keys_escaping_root() {
    let dir = tempdir().unwrap();
    let storage = FsStorage::new(dir.path().join("inner"));

    for key in ["", "..", "../escape.txt", "nested/key.txt"] {
        assert!(
            matches!(storage.write(key, b"x"), Err(ArchiveError::InvalidKey(_))),
            "key {:?} should be refused",
            key
        );
    }
    assert!(!dir.path().join("escape.txt").exists());
}

#[test]
fn test_missing_directory_lists_no_keys() {
    let dir = tempdir().unwrap();
    let archive = FailureArchive::in_dir(dir.path().join("never-created"));
    assert!(archive.keys().unwrap().is_empty());
    assert!(matches!(
        archive.load("nope.txt"),
        Err(ArchiveError::NotFound(_))
    ));
}

#[test]
fn test_keys_skip_foreign_files() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("README.md"), "not a sample").unwrap();
    let archive = FailureArchive::in_dir(dir.path());
    let key = archive.save("sample").unwrap();

    assert_eq!(archive.keys().unwrap(), vec![key]);
}

#[test]
fn test_concurrent_writers_never_collide() {
    let dir = tempdir().unwrap();
    let archive = FailureArchive::in_dir(dir.path());

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let archive = archive.clone();
            thread::spawn(move || {
                (0..25)
                    .map(|i| archive.save(&format!("worker {} sample {}", worker, i)).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut keys = HashSet::new();
    for handle in handles {
        for key in handle.join().unwrap() {
            assert!(keys.insert(key), "duplicate key");
        }
    }
    assert_eq!(keys.len(), 200);
    assert_eq!(archive.keys().unwrap().len(), 200);
}

#[test]
fn test_write_failure_is_swallowed() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("occupied");
    std::fs::write(&file, "a file where the directory should be").unwrap();

    let archive = FailureArchive::in_dir(&file);

    assert_eq!(archive.save("lost sample"), None);
}

#[test]
fn test_non_utf8_sample_is_reported() {
    let storage = Arc::new(MemoryStorage::new());
    storage.write("bad.txt", &[0xff, 0xfe, 0x00]).unwrap();
    let archive = FailureArchive::new(storage);

    assert!(matches!(archive.load("bad.txt"), Err(ArchiveError::NotUtf8(_))));
}
