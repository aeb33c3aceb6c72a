//! ChartMark Application
//!
//! Shells around the annotation engine: a native session replayer and
//! JavaScript bindings for the browser.

mod config;
mod error;
mod session;
mod shortcuts;

pub use config::AppConfig;
pub use error::AppError;
pub use session::{describe, Replay, Session, SessionEvent, Viewport};
pub use shortcuts::{is_engine_key, Shortcut, ShortcutAction, ShortcutRegistry};

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::WebChartEngine;
