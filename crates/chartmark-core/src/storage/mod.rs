//! Persistence port for chart drawings.
//!
//! Drawings are stored per chart, keyed by symbol and timeframe. The engine
//! only loads on mount and saves on change; the medium is up to the
//! implementation.

mod autosave;
mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;

pub use autosave::{AutoSaveManager, LoadJob, SaveJob};

#[cfg(not(target_arch = "wasm32"))]
pub use autosave::create_default_storage;
pub use memory::MemoryStorage;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;

use crate::shapes::{now_millis, Shape};
use crate::tools::ToolRegistry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("No drawings saved for {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Invalid chart key: {0}")]
    InvalidKey(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Identifies the chart a set of drawings belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChartKey {
    pub symbol: String,
    pub timeframe: String,
}

impl ChartKey {
    pub fn new(symbol: impl Into<String>, timeframe: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe: timeframe.into(),
        }
    }

    /// Stable storage id, `SYMBOL@timeframe`.
    pub fn storage_id(&self) -> String {
        format!("{}@{}", self.symbol, self.timeframe)
    }

    /// Storage id with every byte outside `[A-Za-z0-9_-]` percent-encoded,
    /// safe as a file name. Distinct keys give distinct stems.
    pub fn file_stem(&self) -> String {
        format!("{}@{}", escape_part(&self.symbol), escape_part(&self.timeframe))
    }

    /// Parse a storage id produced by [`ChartKey::storage_id`].
    pub fn parse(id: &str) -> StorageResult<Self> {
        match id.rsplit_once('@') {
            Some((symbol, timeframe)) if !symbol.is_empty() && !timeframe.is_empty() => {
                Ok(Self::new(symbol, timeframe))
            }
            _ => Err(StorageError::InvalidKey(id.to_string())),
        }
    }
}

fn escape_part(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for byte in part.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

impl fmt::Display for ChartKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.symbol, self.timeframe)
    }
}

/// Serialized form of one chart's drawings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingSet {
    #[serde(default = "default_version")]
    pub version: u32,
    pub key: ChartKey,
    #[serde(default)]
    pub saved_at: i64,
    #[serde(default)]
    pub shapes: Vec<Shape>,
}

fn default_version() -> u32 {
    FORMAT_VERSION
}

impl DrawingSet {
    pub fn new(key: ChartKey, shapes: Vec<Shape>) -> Self {
        Self {
            version: FORMAT_VERSION,
            key,
            saved_at: now_millis(),
            shapes,
        }
    }

    pub fn to_json(&self) -> StorageResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> StorageResult<Self> {
        serde_json::from_str(json).map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

/// Keep only shapes that pass registry validation, logging the rest.
pub fn retain_valid(shapes: Vec<Shape>) -> Vec<Shape> {
    let total = shapes.len();
    let valid: Vec<Shape> = shapes
        .into_iter()
        .filter(|shape| match ToolRegistry::revalidate(shape) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Skipping stored shape {}: {}", shape.id(), e);
                false
            }
        })
        .collect();
    if valid.len() != total {
        log::warn!("Dropped {} of {} stored shapes", total - valid.len(), total);
    }
    valid
}

/// Trait for drawing storage backends.
///
/// Note: On native platforms, implementations must be Send + Sync.
/// On WASM, these bounds are relaxed since it's single-threaded.
#[cfg(not(target_arch = "wasm32"))]
pub trait Storage: Send + Sync {
    /// Save a chart's drawings, replacing what was there.
    fn save(&self, key: &ChartKey, shapes: &[Shape]) -> BoxFuture<'_, StorageResult<()>>;

    /// Load a chart's drawings.
    fn load(&self, key: &ChartKey) -> BoxFuture<'_, StorageResult<Vec<Shape>>>;

    /// Delete a chart's drawings.
    fn delete(&self, key: &ChartKey) -> BoxFuture<'_, StorageResult<()>>;

    /// List all charts with saved drawings.
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<ChartKey>>>;

    /// Check if a chart has saved drawings.
    fn exists(&self, key: &ChartKey) -> BoxFuture<'_, StorageResult<bool>>;
}

/// Trait for drawing storage backends (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait Storage {
    /// Save a chart's drawings, replacing what was there.
    fn save(&self, key: &ChartKey, shapes: &[Shape]) -> BoxFuture<'_, StorageResult<()>>;

    /// Load a chart's drawings.
    fn load(&self, key: &ChartKey) -> BoxFuture<'_, StorageResult<Vec<Shape>>>;

    /// Delete a chart's drawings.
    fn delete(&self, key: &ChartKey) -> BoxFuture<'_, StorageResult<()>>;

    /// List all charts with saved drawings.
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<ChartKey>>>;

    /// Check if a chart has saved drawings.
    fn exists(&self, key: &ChartKey) -> BoxFuture<'_, StorageResult<bool>>;
}
