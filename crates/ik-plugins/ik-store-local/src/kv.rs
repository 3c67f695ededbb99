//! Key/value documents on the local filesystem.
//!
//! Each key is one JSON file under the root directory. Reads go through a
//! `DashMap` cache; writes land in a temp file first and are renamed in place.

use std::io::ErrorKind;
use std::path::PathBuf;

use dashmap::DashMap;
use ik_core::{AppError, Result};
use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tracing::{debug, error};

pub struct LocalKv {
    /// `None` keeps everything in the cache only.
    root: Option<PathBuf>,
    cache: DashMap<String, String>,
}

impl LocalKv {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| AppError::Internal(format!("{}: {e}", root.display())))?;
        debug!(root = %root.display(), "Opened local store");
        Ok(Self {
            root: Some(root),
            cache: DashMap::new(),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            root: None,
            cache: DashMap::new(),
        }
    }

    fn file_path(&self, key: &str) -> Option<PathBuf> {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
            .collect();
        self.root.as_ref().map(|root| root.join(format!("{name}.json")))
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        if let Some(hit) = self.cache.get(key).map(|v| v.value().clone()) {
            return Ok(Some(hit));
        }
        let Some(path) = self.file_path(key) else {
            return Ok(None);
        };
        match fs::read_to_string(&path).await {
            Ok(raw) => {
                self.cache.insert(key.to_string(), raw.clone());
                Ok(Some(raw))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Internal(format!("{}: {e}", path.display()))),
        }
    }

    /// `Ok(None)` when the key was never written. A document that no longer
    /// parses is an error, not an empty value.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.get_raw(key).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw).map(Some).map_err(|e| {
            error!(key, error = %e, "Stored document is corrupt");
            AppError::Internal(format!("corrupt document `{key}`: {e}"))
        })
    }

    pub async fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string_pretty(value)?;
        if let Some(path) = self.file_path(key) {
            let tmp = path.with_extension("json.tmp");
            fs::write(&tmp, raw.as_bytes())
                .await
                .map_err(|e| AppError::Internal(format!("{}: {e}", tmp.display())))?;
            fs::rename(&tmp, &path)
                .await
                .map_err(|e| AppError::Internal(format!("{}: {e}", path.display())))?;
        }
        self.cache.insert(key.to_string(), raw);
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        self.cache.remove(key);
        if let Some(path) = self.file_path(key) {
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(AppError::Internal(format!("{}: {e}", path.display()))),
            }
        }
        Ok(())
    }
}
