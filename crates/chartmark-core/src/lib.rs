//! ChartMark Core Library
//!
//! Platform-agnostic annotation engine for price charts: trendlines,
//! horizontal and vertical rays and Fibonacci retracements, drawn and
//! edited with the pointer, with full undo/redo.

pub mod bridge;
pub mod commands;
pub mod config;
pub mod engine;
pub mod events;
pub mod geometry;
pub mod input;
pub mod interaction;
pub mod selection;
pub mod series;
pub mod shapes;
pub mod storage;
pub mod store;
pub mod tools;

pub use bridge::{ChartRenderer, CoordinateBridge, DataCoord, GridBounds, LinearScale};
pub use commands::{
    BatchCommand, Command, CommandError, CommandHistory, CommandId, CommandOutcome, CreateCommand,
    DeleteCommand, ShapeUpdate, UpdateCommand,
};
pub use config::{ConfigError, EngineConfig};
pub use engine::{ChartEngine, MenuAction};
pub use events::{EngineEvent, EventFilter, EventKind, SubscriptionId};
pub use geometry::HandleKind;
pub use input::{InputEvent, Key, KeyEvent, Modifiers, MouseButton, PointerEvent};
pub use interaction::{DrawState, Gesture, Interaction, Preview};
pub use series::{Bar, DataSeries};
pub use shapes::{ChartPoint, Shape, ShapeId, ShapeKind, ShapeStyle, StylePatch};
pub use storage::{ChartKey, MemoryStorage, Storage, StorageError};
pub use store::ShapeStore;
pub use tools::{ToolRegistry, ValidationError};

#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileStorage;
