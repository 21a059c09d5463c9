//! File-backed envelope store: one JSON record per resource.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::EnvelopeStore;
use crate::cache::Envelope;
use crate::error::StoreError;
use crate::resource::ResourceId;

// == File Store ==
/// Stores each resource as `<dir>/<id>.json`, with `:` and other
/// non file-safe characters of the id replaced by `_`.
///
/// Saves write a sibling `.tmp` file, sync it and rename it over the record,
/// so readers never see a partial record. Saves of the same resource are
/// serialized; different resources write concurrently.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    write_locks: Mutex<HashMap<ResourceId, Arc<tokio::sync::Mutex<()>>>>,
}

impl FileStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            write_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record holding `id`.
    pub fn record_path(&self, id: &ResourceId) -> PathBuf {
        let stem: String = id
            .as_str()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{stem}.json"))
    }

    fn write_lock(&self, id: &ResourceId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .write_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(id.clone()).or_default().clone()
    }

    async fn write_atomically(path: &Path, tmp: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let mut file = fs::File::create(tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl EnvelopeStore for FileStore {
    async fn load(&self, id: &ResourceId) -> Result<Option<Envelope>, StoreError> {
        let path = self.record_path(id);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, envelope: &Envelope) -> Result<(), StoreError> {
        let id = envelope.resource_id();
        let path = self.record_path(id);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(envelope)?;

        let lock = self.write_lock(id);
        let _guard = lock.lock().await;

        if let Err(err) = Self::write_atomically(&path, &tmp, &bytes).await {
            // Leave no stray temp file behind
            let _ = fs::remove_file(&tmp).await;
            return Err(err);
        }

        debug!(resource = %id, path = %path.display(), bytes = bytes.len(), "Envelope saved");
        Ok(())
    }
}
