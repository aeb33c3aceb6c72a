//! Scripted sessions replayed by the native shell.
//!
//! A session is a JSON document naming a chart, its bars and a list of
//! events (pointer/key input, tool changes, undo/redo, menu actions) to
//! feed through a [`ChartEngine`] backed by a [`LinearScale`].

use crate::error::AppError;
use chartmark_core::storage::ChartKey;
use chartmark_core::{
    Bar, ChartEngine, DataSeries, EngineConfig, GridBounds, InputEvent, LinearScale, MenuAction,
    Shape, ShapeKind,
};
use serde::Deserialize;

/// Plot area pointer positions are expressed in.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    /// Pixels per bar.
    pub bar_spacing: f64,
    /// Price range; taken from the bars (with 5% padding) when unset.
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 500.0,
            bar_spacing: 10.0,
            price_min: None,
            price_max: None,
        }
    }
}

/// One scripted step.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum SessionEvent {
    Input { event: InputEvent },
    Tool { tool: Option<ShapeKind> },
    Undo,
    Redo,
    /// Context-menu action on the selected shape.
    Menu { action: MenuAction },
    Bar { bar: Bar },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub symbol: String,
    pub timeframe: String,
    pub bars: Vec<Bar>,
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default)]
    pub events: Vec<SessionEvent>,
    /// Overrides the shell's engine config for this session.
    #[serde(default)]
    pub config: Option<EngineConfig>,
}

/// Result of a replay.
pub struct Replay {
    pub engine: ChartEngine<LinearScale>,
    /// Whether the scripted events changed any shape.
    pub changed: bool,
}

impl Session {
    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let session: Self = serde_json::from_str(json)?;
        if session.bars.is_empty() {
            return Err(AppError::Session("no bars".to_string()));
        }
        Ok(session)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_file(path: &std::path::Path) -> Result<Self, AppError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn key(&self) -> ChartKey {
        ChartKey::new(self.symbol.clone(), self.timeframe.clone())
    }

    /// The renderer the session's pixel positions refer to.
    pub fn scale(&self) -> Result<LinearScale, AppError> {
        let vp = &self.viewport;
        if !(vp.width > 0.0 && vp.height > 0.0 && vp.bar_spacing > 0.0) {
            return Err(AppError::Session(
                "viewport must have a positive size and bar spacing".to_string(),
            ));
        }
        let (low, high) = self
            .bars
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), b| {
                (lo.min(b.low), hi.max(b.high))
            });
        if !low.is_finite() || !high.is_finite() {
            return Err(AppError::Session("bars have no finite prices".to_string()));
        }
        let pad = ((high - low) * 0.05).max(1.0);
        let min = vp.price_min.unwrap_or(low - pad);
        let max = vp.price_max.unwrap_or(high + pad);
        if max <= min {
            return Err(AppError::Session(format!("empty price range {min}..{max}")));
        }
        Ok(LinearScale::new(
            GridBounds::new(0.0, 0.0, vp.width, vp.height),
            vp.bar_spacing,
            min,
            max,
        ))
    }

    /// Mount `stored` shapes, then play every event through a fresh engine.
    pub fn replay(&self, config: EngineConfig, stored: Vec<Shape>) -> Result<Replay, AppError> {
        let config = self.config.clone().unwrap_or(config);
        let mut engine = ChartEngine::new(self.scale()?, config)?;
        engine.set_series(DataSeries::new(self.bars.clone()));
        engine.on_ready();
        engine.mount(stored);
        let baseline = engine.revision();

        for (index, event) in self.events.iter().enumerate() {
            log::debug!("step {index}: {event:?}");
            apply(&mut engine, event.clone());
        }

        let changed = engine.revision() != baseline;
        log::info!(
            "replayed {} event(s) on {}: {} shape(s)",
            self.events.len(),
            self.key(),
            engine.store().len()
        );
        Ok(Replay { engine, changed })
    }
}

fn apply(engine: &mut ChartEngine<LinearScale>, event: SessionEvent) {
    match event {
        SessionEvent::Input { event } => engine.handle_input(event),
        SessionEvent::Tool { tool } => engine.select_tool(tool),
        SessionEvent::Undo => {
            if let Err(e) = engine.undo() {
                log::debug!("undo: {e}");
            }
        }
        SessionEvent::Redo => {
            if let Err(e) = engine.redo() {
                log::debug!("redo: {e}");
            }
        }
        SessionEvent::Menu { action } => match engine.selection() {
            Some(id) => {
                if let Err(e) = engine.apply_menu_action(id, action) {
                    log::warn!("menu action failed: {e}");
                }
            }
            None => log::warn!("menu action {action:?} with nothing selected"),
        },
        SessionEvent::Bar { bar } => engine.push_bar(bar),
    }
}

/// One-line description of a shape for terminal output.
pub fn describe(shape: &Shape) -> String {
    let points: Vec<String> = shape
        .points()
        .iter()
        .map(|p| format!("({}, {:.2})", p.timestamp, p.price))
        .collect();
    let mut flags = String::new();
    if shape.locked {
        flags.push_str(" locked");
    }
    if !shape.visible {
        flags.push_str(" hidden");
    }
    format!(
        "{:<10} {} {} z={}{}",
        shape.kind().name(),
        points.join(" -> "),
        shape.style.color,
        shape.z_index,
        flags
    )
}
