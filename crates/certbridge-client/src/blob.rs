//! File system blob store.
//!
//! Layout under the root directory:
//!
//! ```text
//! {root}/{container}/{name}
//! {root}/{container}/{name}.metadata.json
//! ```

use crate::client::BlobStore;
use async_trait::async_trait;
use certbridge_core::error::{ClientError, IoError, Result};
use certbridge_core::types::{Blob, Metadata};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const METADATA_SUFFIX: &str = ".metadata.json";

/// Blob store keeping each container as a directory.
#[derive(Debug, Clone)]
pub struct FileSystemBlobStore {
    root: PathBuf,
}

impl FileSystemBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, container: &str, name: &str) -> Result<PathBuf> {
        validate_segment("container", container)?;
        validate_segment("blob name", name)?;
        Ok(self.root.join(container).join(name))
    }
}

fn metadata_path(blob_path: &Path) -> PathBuf {
    let mut path = blob_path.as_os_str().to_owned();
    path.push(METADATA_SUFFIX);
    PathBuf::from(path)
}

fn validate_segment(kind: &str, value: &str) -> Result<()> {
    if value.is_empty()
        || value == "."
        || value.contains("..")
        || value.contains('/')
        || value.contains('\\')
    {
        return Err(ClientError::invalid_argument(format!("invalid {}: '{}'", kind, value)).into());
    }
    Ok(())
}

#[async_trait]
impl BlobStore for FileSystemBlobStore {
    async fn upload_bytes(
        &self,
        container: &str,
        name: &str,
        bytes: &[u8],
        metadata: &Metadata,
    ) -> Result<()> {
        let path = self.blob_path(container, name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let metadata_json = serde_json::to_vec_pretty(metadata)
            .map_err(|e| ClientError::invalid_argument(format!("invalid metadata: {}", e)))?;

        fs::write(&path, bytes).await?;
        fs::write(metadata_path(&path), metadata_json).await?;

        info!(
            container = %container,
            blob = %name,
            bytes = bytes.len(),
            "Uploaded blob"
        );

        Ok(())
    }

    async fn download(&self, container: &str, name: &str) -> Result<Blob> {
        let path = self.blob_path(container, name)?;

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ClientError::BlobNotFound {
                    container: container.to_string(),
                    name: name.to_string(),
                }
                .into())
            }
            Err(e) => return Err(IoError::from(e).into()),
        };

        let metadata = match fs::read(metadata_path(&path)).await {
            Ok(json) => serde_json::from_slice(&json).map_err(|e| {
                ClientError::invalid_response(path.display().to_string(), e.to_string())
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => Metadata::new(),
            Err(e) => return Err(IoError::from(e).into()),
        };

        debug!(container = %container, blob = %name, bytes = bytes.len(), "Downloaded blob");

        Ok(Blob {
            container: container.to_string(),
            name: name.to_string(),
            bytes,
            metadata,
        })
    }
}
