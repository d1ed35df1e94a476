#![forbid(unsafe_code)]

use certflow_storage::blob::{BlobError, BlobStorage, FsBlobStorage};

const KEY: &str = "certificates/co_1/cert_1/r1.pdf";

#[test]
fn at_blob_db_01_fs_round_trip_creates_parents() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsBlobStorage::new(dir.path());

    assert!(!store.exists(KEY));
    store.write_bytes(KEY, b"%PDF-1.5 one").unwrap();
    assert!(store.exists(KEY));
    assert_eq!(store.read_bytes(KEY).unwrap(), b"%PDF-1.5 one");
    assert!(dir.path().join("certificates/co_1/cert_1").is_dir());
}

#[test]
fn at_blob_db_02_fs_overwrite_leaves_no_partial_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsBlobStorage::new(dir.path());

    store.write_bytes(KEY, b"first").unwrap();
    store.write_bytes(KEY, b"second").unwrap();
    assert_eq!(store.read_bytes(KEY).unwrap(), b"second");

    let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("certificates/co_1/cert_1"))
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .filter(|name| name.ends_with(".partial"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn at_blob_db_03_fs_missing_and_invalid_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsBlobStorage::new(dir.path());

    assert!(matches!(
        store.read_bytes("certificates/none.pdf"),
        Err(BlobError::NotFound { .. })
    ));
    assert!(matches!(
        store.write_bytes("../escape.pdf", b"x"),
        Err(BlobError::InvalidKey { .. })
    ));
    assert!(!store.exists("../escape.pdf"));
    assert!(!dir.path().parent().unwrap().join("escape.pdf").exists());
}

#[test]
fn at_blob_db_04_fs_store_is_shareable_as_trait_object() {
    let dir = tempfile::tempdir().unwrap();
    let store: Box<dyn BlobStorage> = Box::new(FsBlobStorage::new(dir.path()));
    store.write_bytes("a/b.pdf", b"bytes").unwrap();
    assert_eq!(store.read_bytes("a/b.pdf").unwrap(), b"bytes");
}
