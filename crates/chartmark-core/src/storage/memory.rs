//! In-memory storage implementation.

use super::{BoxFuture, ChartKey, Storage, StorageError, StorageResult};
use crate::shapes::Shape;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for testing and ephemeral use.
#[derive(Default)]
pub struct MemoryStorage {
    charts: RwLock<HashMap<ChartKey, Vec<Shape>>>,
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn save(&self, key: &ChartKey, shapes: &[Shape]) -> BoxFuture<'_, StorageResult<()>> {
        let key = key.clone();
        let shapes = shapes.to_vec();
        Box::pin(async move {
            let mut charts = self.charts.write().map_err(lock_error)?;
            charts.insert(key, shapes);
            Ok(())
        })
    }

    fn load(&self, key: &ChartKey) -> BoxFuture<'_, StorageResult<Vec<Shape>>> {
        let key = key.clone();
        Box::pin(async move {
            let charts = self.charts.read().map_err(lock_error)?;
            charts
                .get(&key)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(key.storage_id()))
        })
    }

    fn delete(&self, key: &ChartKey) -> BoxFuture<'_, StorageResult<()>> {
        let key = key.clone();
        Box::pin(async move {
            let mut charts = self.charts.write().map_err(lock_error)?;
            charts.remove(&key);
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<ChartKey>>> {
        Box::pin(async move {
            let charts = self.charts.read().map_err(lock_error)?;
            let mut keys: Vec<ChartKey> = charts.keys().cloned().collect();
            keys.sort();
            Ok(keys)
        })
    }

    fn exists(&self, key: &ChartKey) -> BoxFuture<'_, StorageResult<bool>> {
        let key = key.clone();
        Box::pin(async move {
            let charts = self.charts.read().map_err(lock_error)?;
            Ok(charts.contains_key(&key))
        })
    }
}
