//! File-based storage implementation for native platforms.

use super::{BoxFuture, ChartKey, DrawingSet, Storage, StorageError, StorageResult};
use crate::shapes::Shape;
use std::fs;
use std::path::{Path, PathBuf};

/// File-based storage for native platforms.
///
/// Stores one JSON [`DrawingSet`] per chart in a directory.
pub struct FileStorage {
    /// Base directory for drawing files.
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new file storage with the given base directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create file storage in the default location.
    ///
    /// On Linux: `~/.local/share/chartmark/drawings/`
    /// On Windows: `%LOCALAPPDATA%\chartmark\drawings\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;

        Self::new(base.join("chartmark").join("drawings"))
    }

    /// File path for a chart.
    fn chart_path(&self, key: &ChartKey) -> PathBuf {
        self.base_path.join(format!("{}.json", key.file_stem()))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn read_set(path: &Path) -> StorageResult<DrawingSet> {
        let json = fs::read_to_string(path)
            .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        DrawingSet::from_json(&json).map_err(|e| {
            StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// The drawings stored for `key`, if the file at its path holds them.
    fn read_own(path: &Path, key: &ChartKey) -> StorageResult<Option<DrawingSet>> {
        if !path.exists() {
            return Ok(None);
        }
        let set = Self::read_set(path)?;
        if set.key != *key {
            log::warn!("{} holds drawings for {}, not {}", path.display(), set.key, key);
            return Ok(None);
        }
        Ok(Some(set))
    }
}

impl Storage for FileStorage {
    fn save(&self, key: &ChartKey, shapes: &[Shape]) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.chart_path(key);
        let json = match DrawingSet::new(key.clone(), shapes.to_vec()).to_json() {
            Ok(j) => j,
            Err(e) => return Box::pin(async move { Err(e) }),
        };

        Box::pin(async move {
            fs::write(&path, json).map_err(|e| {
                StorageError::Io(format!("Failed to write {}: {}", path.display(), e))
            })?;
            log::debug!("Saved drawings to {}", path.display());
            Ok(())
        })
    }

    fn load(&self, key: &ChartKey) -> BoxFuture<'_, StorageResult<Vec<Shape>>> {
        let path = self.chart_path(key);
        let key = key.clone();

        Box::pin(async move {
            match Self::read_own(&path, &key)? {
                Some(set) => Ok(set.shapes),
                None => Err(StorageError::NotFound(key.storage_id())),
            }
        })
    }

    fn delete(&self, key: &ChartKey) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.chart_path(key);

        Box::pin(async move {
            if path.exists() {
                fs::remove_file(&path).map_err(|e| {
                    StorageError::Io(format!("Failed to delete {}: {}", path.display(), e))
                })?;
            }
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<ChartKey>>> {
        let base = self.base_path.clone();

        Box::pin(async move {
            if !base.exists() {
                return Ok(vec![]);
            }

            let entries = fs::read_dir(&base)
                .map_err(|e| StorageError::Io(format!("Failed to read directory: {}", e)))?;

            // The key comes from the file body, not the encoded name.
            let mut keys = Vec::new();
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_none_or(|e| e != "json") {
                    continue;
                }
                match Self::read_set(&path) {
                    Ok(set) => keys.push(set.key),
                    Err(e) => log::warn!("Ignoring {}: {}", path.display(), e),
                }
            }
            keys.sort();
            Ok(keys)
        })
    }

    fn exists(&self, key: &ChartKey) -> BoxFuture<'_, StorageResult<bool>> {
        let path = self.chart_path(key);
        let key = key.clone();
        Box::pin(async move { Ok(Self::read_own(&path, &key)?.is_some()) })
    }
}
