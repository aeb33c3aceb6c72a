//! Save-on-change for chart drawings.
//!
//! The host marks the manager dirty when the engine reports a shape change
//! and polls it; a save happens once changes have settled for the debounce
//! interval. The storage I/O itself runs as an owned [`SaveJob`] or
//! [`LoadJob`], so hosts without a blocking executor can spawn it.

use crate::config::DEFAULT_AUTOSAVE_INTERVAL_MS;
use crate::events::EngineEvent;
use crate::shapes::Shape;
use crate::storage::{retain_valid, ChartKey, Storage, StorageError, StorageResult};
use std::sync::Arc;

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// Manages automatic persistence of one chart at a time.
pub struct AutoSaveManager<S: Storage> {
    /// Storage backend.
    storage: Arc<S>,
    /// Quiet period after the last change before saving.
    interval: Duration,
    /// Last change timestamp.
    last_change: Option<Instant>,
    /// Last save timestamp.
    last_save: Option<Instant>,
    /// Whether the chart has unsaved changes.
    dirty: bool,
    /// Chart currently being edited.
    key: Option<ChartKey>,
}

impl<S: Storage> AutoSaveManager<S> {
    /// Create a new auto-save manager with the given storage backend.
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            interval: Duration::from_millis(DEFAULT_AUTOSAVE_INTERVAL_MS),
            last_change: None,
            last_save: None,
            dirty: false,
            key: None,
        }
    }

    /// Set the debounce interval.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Record a change to the current chart.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        self.last_change = Some(Instant::now());
    }

    /// Mark dirty if any of the engine's events changed shapes.
    pub fn observe(&mut self, events: &[EngineEvent]) {
        if events.iter().any(EngineEvent::is_shape_change) {
            self.mark_dirty();
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Switch to another chart. Unsaved changes of the previous one are dropped.
    pub fn set_chart(&mut self, key: Option<ChartKey>) {
        if self.dirty {
            log::warn!("Switching chart with unsaved drawings");
        }
        self.key = key;
        self.dirty = false;
        self.last_change = None;
    }

    pub fn chart(&self) -> Option<&ChartKey> {
        self.key.as_ref()
    }

    /// When the last save was started.
    pub fn last_save(&self) -> Option<Instant> {
        self.last_save
    }

    /// Whether there are changes that have been quiet for the interval.
    pub fn should_save(&self) -> bool {
        if !self.dirty || self.key.is_none() {
            return false;
        }
        match self.last_change {
            Some(last) => last.elapsed() >= self.interval,
            None => true,
        }
    }

    /// Take a save job if changes have settled. The chart counts as saved
    /// from here on; callers re-mark it dirty if the job fails.
    pub fn due(&mut self, shapes: &[Shape]) -> Option<SaveJob<S>> {
        if !self.should_save() {
            return None;
        }
        self.begin_save(shapes).ok()
    }

    /// Take a save job for the current chart regardless of the debounce.
    pub fn begin_save(&mut self, shapes: &[Shape]) -> StorageResult<SaveJob<S>> {
        let key = self
            .key
            .clone()
            .ok_or_else(|| StorageError::Other("No chart selected".to_string()))?;
        self.last_save = Some(Instant::now());
        self.dirty = false;
        Ok(SaveJob {
            storage: self.storage.clone(),
            key,
            shapes: shapes.to_vec(),
        })
    }

    /// Save if needed (dirty + debounce elapsed). Returns true if a save happened.
    pub async fn maybe_save(&mut self, shapes: &[Shape]) -> StorageResult<bool> {
        let Some(job) = self.due(shapes) else {
            return Ok(false);
        };
        self.finish(job).await?;
        Ok(true)
    }

    /// Save the current chart immediately.
    pub async fn save(&mut self, shapes: &[Shape]) -> StorageResult<()> {
        let job = self.begin_save(shapes)?;
        self.finish(job).await
    }

    async fn finish(&mut self, job: SaveJob<S>) -> StorageResult<()> {
        let result = job.run().await;
        if result.is_err() {
            self.mark_dirty();
        }
        result
    }

    /// Make `key` the current chart and return the job that loads it.
    pub fn open(&mut self, key: ChartKey) -> LoadJob<S> {
        self.set_chart(Some(key.clone()));
        self.last_save = Some(Instant::now());
        LoadJob {
            storage: self.storage.clone(),
            key,
        }
    }

    /// Load a chart's drawings and make it current.
    ///
    /// A chart with nothing saved yields an empty list. Invalid shapes are
    /// skipped.
    pub async fn load(&mut self, key: &ChartKey) -> StorageResult<Vec<Shape>> {
        self.open(key.clone()).run().await
    }

    /// Delete a chart's drawings.
    pub async fn delete(&self, key: &ChartKey) -> StorageResult<()> {
        self.storage.delete(key).await
    }

    /// List all charts with saved drawings.
    pub async fn list_charts(&self) -> StorageResult<Vec<ChartKey>> {
        self.storage.list().await
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }
}

/// Pending write of one chart's drawings.
pub struct SaveJob<S: Storage> {
    storage: Arc<S>,
    key: ChartKey,
    shapes: Vec<Shape>,
}

impl<S: Storage> SaveJob<S> {
    pub fn key(&self) -> &ChartKey {
        &self.key
    }

    pub async fn run(self) -> StorageResult<()> {
        self.storage.save(&self.key, &self.shapes).await?;
        log::info!("Saved {} drawing(s) for {}", self.shapes.len(), self.key);
        Ok(())
    }
}

/// Pending read of one chart's drawings.
pub struct LoadJob<S: Storage> {
    storage: Arc<S>,
    key: ChartKey,
}

impl<S: Storage> LoadJob<S> {
    pub fn key(&self) -> &ChartKey {
        &self.key
    }

    /// Valid shapes of the chart; empty when nothing is saved yet.
    pub async fn run(self) -> StorageResult<Vec<Shape>> {
        match self.storage.load(&self.key).await {
            Ok(shapes) => Ok(retain_valid(shapes)),
            Err(StorageError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

/// Storage in the platform's default location.
#[cfg(not(target_arch = "wasm32"))]
pub fn create_default_storage() -> StorageResult<Arc<crate::storage::FileStorage>> {
    Ok(Arc::new(crate::storage::FileStorage::default_location()?))
}
