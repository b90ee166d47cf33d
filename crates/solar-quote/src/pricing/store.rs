use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use super::catalog::CatalogDocument;

/// Backing storage for the pricing document so the service can be exercised
/// against fixtures in isolation.
pub trait CatalogStore: Send + Sync {
    fn load(&self) -> Result<CatalogDocument, StoreError>;
    fn save(&self, document: &CatalogDocument) -> Result<(), StoreError>;
}

/// Error enumeration for catalog storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("catalog file {} not found", .path.display())]
    Missing { path: PathBuf },
    #[error("failed to read catalog {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("catalog {} is not a valid pricing document: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode catalog: {0}")]
    Encode(serde_json::Error),
    #[error("failed to write catalog {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("catalog storage unavailable: {0}")]
    Unavailable(String),
}

/// Pricing document kept as a single pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct FileCatalogStore {
    path: PathBuf,
}

impl FileCatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogStore for FileCatalogStore {
    fn load(&self) -> Result<CatalogDocument, StoreError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                StoreError::Missing {
                    path: self.path.clone(),
                }
            } else {
                StoreError::Read {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;

        let document = serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = %self.path.display(), bytes = raw.len(), "parsed pricing catalog");
        Ok(document)
    }

    fn save(&self, document: &CatalogDocument) -> Result<(), StoreError> {
        let mut encoded = serde_json::to_string_pretty(document).map_err(StoreError::Encode)?;
        encoded.push('\n');

        atomic_write(&self.path, encoded.as_bytes()).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = %self.path.display(), bytes = encoded.len(), "rewrote pricing catalog");
        Ok(())
    }
}

/// Write through a sibling temp file and rename over the target.
fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "catalog.json".to_string());
    let temp_path = parent.join(format!(".{file_name}.tmp-{}", Uuid::new_v4()));

    fs::write(&temp_path, content)?;
    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }
    Ok(())
}
