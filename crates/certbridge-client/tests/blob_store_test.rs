//! File system and in-memory blob store behaviour.

use certbridge_client::memory::InMemoryBlobStore;
use certbridge_client::{BlobStore, FileSystemBlobStore};
use certbridge_core::error::ClientError;
use certbridge_core::types::Metadata;
use certbridge_core::CertBridgeError;
use tempfile::TempDir;

fn metadata() -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("CommonName", "site.local");
    metadata.insert("Thumbprint", "AF8355");
    metadata
}

#[tokio::test]
async fn test_upload_and_download_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = FileSystemBlobStore::new(dir.path());

    store
        .upload_bytes("certificates", "site.privkey.pfx", &[1, 2, 3], &metadata())
        .await
        .unwrap();

    let blob = store
        .download("certificates", "site.privkey.pfx")
        .await
        .unwrap();

    assert_eq!(blob.bytes, vec![1, 2, 3]);
    assert_eq!(blob.name, "site.privkey.pfx");
    assert_eq!(blob.metadata.get("commonname"), Some("site.local"));
    assert!(dir
        .path()
        .join("certificates")
        .join("site.privkey.pfx.metadata.json")
        .exists());
}

#[tokio::test]
async fn test_upload_text_replaces_existing_blob() {
    let dir = TempDir::new().unwrap();
    let store = FileSystemBlobStore::new(dir.path());

    store
        .upload_text("certificates", "site.cert.pem", "first", &Metadata::new())
        .await
        .unwrap();
    store
        .upload_text("certificates", "site.cert.pem", "second", &metadata())
        .await
        .unwrap();

    let blob = store.download("certificates", "site.cert.pem").await.unwrap();
    assert_eq!(blob.bytes, b"second");
    assert_eq!(blob.metadata.len(), 2);
}

#[tokio::test]
async fn test_download_missing_blob() {
    let dir = TempDir::new().unwrap();
    let store = FileSystemBlobStore::new(dir.path());

    let err = store.download("certificates", "missing.pfx").await.unwrap_err();
    assert!(matches!(
        err,
        CertBridgeError::Client(ClientError::BlobNotFound { .. })
    ));
}

#[tokio::test]
async fn test_rejects_path_traversal() {
    let dir = TempDir::new().unwrap();
    let store = FileSystemBlobStore::new(dir.path());

    for name in ["../escape.pem", "nested/name.pem", "", "..\\escape.pem"] {
        let err = store
            .upload_bytes("certificates", name, b"x", &Metadata::new())
            .await
            .unwrap_err();
        assert!(
            matches!(err, CertBridgeError::Client(ClientError::InvalidArgument { .. })),
            "accepted {:?}",
            name
        );
    }
}

#[tokio::test]
async fn test_in_memory_store_records_order() {
    let store = InMemoryBlobStore::new();

    store
        .upload_text("certificates", "b.pem", "b", &Metadata::new())
        .await
        .unwrap();
    store
        .upload_bytes("certificates", "a.pfx", b"a", &metadata())
        .await
        .unwrap();

    assert_eq!(store.upload_order(), vec!["b.pem", "a.pfx"]);
    assert_eq!(store.len(), 2);

    let blob = store.download("certificates", "a.pfx").await.unwrap();
    assert_eq!(blob.metadata.get("Thumbprint"), Some("AF8355"));
    assert!(store.download("other", "a.pfx").await.is_err());
}
