//! JSON document persistence
//!
//! Each store keeps its whole collection in one JSON document. Writes go to a
//! sibling temporary file which is then renamed over the document, so a crash
//! mid-write leaves the previous snapshot intact.

use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};
use tokio::fs;
use tracing::{debug, warn};

use super::error::{StorageError, StorageResult};

#[derive(Debug, Clone)]
pub struct JsonDocument {
    path: PathBuf,
}

impl JsonDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document. `Ok(None)` if it does not exist yet.
    pub async fn load<T: DeserializeOwned>(&self) -> StorageResult<Option<T>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Read the document, falling back to the default when it is absent or unreadable
    pub async fn load_or_default<T: DeserializeOwned + Default>(&self) -> T {
        match self.load().await {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!("{}: no document yet, starting empty", self.path.display());
                T::default()
            }
            Err(e) => {
                warn!(
                    "{}: could not load document, starting empty: {e}",
                    self.path.display()
                );
                T::default()
            }
        }
    }

    pub async fn save<T: Serialize + ?Sized>(&self, value: &T) -> StorageResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_vec_pretty(value)?;
        let tmp_path = self.tmp_path()?;

        fs::write(&tmp_path, content).await?;
        fs::rename(&tmp_path, &self.path).await?;

        Ok(())
    }

    fn tmp_path(&self) -> StorageResult<PathBuf> {
        let file_name = self.path.file_name().ok_or_else(|| {
            StorageError::InvalidConfig(format!(
                "document path {} has no file name",
                self.path.display()
            ))
        })?;

        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".tmp");
        Ok(self.path.with_file_name(tmp_name))
    }
}
