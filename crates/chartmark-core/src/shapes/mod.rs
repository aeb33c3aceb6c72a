//! Shape definitions for chart annotations.

pub mod fibonacci;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Use web-time on WASM, std::time otherwise
#[cfg(not(target_arch = "wasm32"))]
use std::time::{SystemTime, UNIX_EPOCH};
#[cfg(target_arch = "wasm32")]
use web_time::{SystemTime, UNIX_EPOCH};

/// Unique identifier for shapes.
pub type ShapeId = Uuid;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// A point in chart data space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// Bar timestamp (unix ms, or whatever unit the data feed uses).
    pub timestamp: i64,
    pub price: f64,
}

impl ChartPoint {
    pub const fn new(timestamp: i64, price: f64) -> Self {
        Self { timestamp, price }
    }

    /// Whether the price is a finite number.
    pub fn is_finite(&self) -> bool {
        self.price.is_finite()
    }

    /// Offset this point by a data-space delta.
    pub fn offset(&self, dt: i64, dp: f64) -> Self {
        Self {
            timestamp: self.timestamp.saturating_add(dt),
            price: self.price + dp,
        }
    }
}

/// Supported annotation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Trendline,
    Horizontal,
    Vertical,
    Fibonacci,
}

impl ShapeKind {
    /// All kinds, in toolbar order.
    pub const ALL: [ShapeKind; 4] = [
        ShapeKind::Trendline,
        ShapeKind::Horizontal,
        ShapeKind::Vertical,
        ShapeKind::Fibonacci,
    ];

    /// Stable lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Trendline => "trendline",
            ShapeKind::Horizontal => "horizontal",
            ShapeKind::Vertical => "vertical",
            ShapeKind::Fibonacci => "fibonacci",
        }
    }

    /// Parse a kind from its lowercase name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

pub const DEFAULT_COLOR: &str = "#2962ff";
pub const DEFAULT_THICKNESS: f64 = 1.0;
pub const DEFAULT_OPACITY: f64 = 1.0;

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_thickness() -> f64 {
    DEFAULT_THICKNESS
}

fn default_opacity() -> f64 {
    DEFAULT_OPACITY
}

/// Style properties for shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeStyle {
    /// CSS color string.
    #[serde(default = "default_color")]
    pub color: String,
    /// Stroke thickness in pixels (>= 1).
    #[serde(default = "default_thickness")]
    pub thickness: f64,
    /// Overall opacity (0.0 = fully transparent, 1.0 = fully opaque).
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            color: default_color(),
            thickness: DEFAULT_THICKNESS,
            opacity: DEFAULT_OPACITY,
        }
    }
}

impl ShapeStyle {
    /// Return a copy with the patch's fields applied.
    pub fn patched(&self, patch: &StylePatch) -> Self {
        Self {
            color: patch.color.clone().unwrap_or_else(|| self.color.clone()),
            thickness: patch.thickness.unwrap_or(self.thickness),
            opacity: patch.opacity.unwrap_or(self.opacity),
        }
    }
}

/// Partial style; omitted fields keep their current (or default) value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StylePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thickness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

impl StylePatch {
    pub fn color(color: impl Into<String>) -> Self {
        Self {
            color: Some(color.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.thickness.is_none() && self.opacity.is_none()
    }
}

impl From<ShapeStyle> for StylePatch {
    fn from(style: ShapeStyle) -> Self {
        Self {
            color: Some(style.color),
            thickness: Some(style.thickness),
            opacity: Some(style.opacity),
        }
    }
}

fn default_visible() -> bool {
    true
}

/// A persisted chart annotation.
///
/// Shapes are only built through [`crate::tools::ToolRegistry`], which
/// guarantees the point count matches the kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub(crate) id: ShapeId,
    pub(crate) kind: ShapeKind,
    pub(crate) points: Vec<ChartPoint>,
    #[serde(default)]
    pub style: ShapeStyle,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub z_index: i32,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl Shape {
    /// Build a shape with a fresh id. Validation is the caller's job.
    pub(crate) fn assemble(kind: ShapeKind, points: Vec<ChartPoint>, style: ShapeStyle) -> Self {
        let now = now_millis();
        Self {
            id: Uuid::new_v4(),
            kind,
            points,
            style,
            visible: true,
            locked: false,
            z_index: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn points(&self) -> &[ChartPoint] {
        &self.points
    }

    /// First anchor.
    pub fn start(&self) -> Option<ChartPoint> {
        self.points.first().copied()
    }

    /// Second anchor (two-point kinds only).
    pub fn end(&self) -> Option<ChartPoint> {
        self.points.get(1).copied()
    }

    /// Replace the anchors. Callers validate the count first.
    pub(crate) fn set_points(&mut self, points: Vec<ChartPoint>) {
        self.points = points;
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = now_millis().max(self.updated_at);
    }

    /// Retracement levels, for Fibonacci shapes.
    pub fn fibonacci_levels(&self) -> Option<[fibonacci::FibLevel; fibonacci::LEVEL_COUNT]> {
        match (self.kind, self.start(), self.end()) {
            (ShapeKind::Fibonacci, Some(a), Some(b)) => {
                Some(fibonacci::retracement_levels(a.price, b.price))
            }
            _ => None,
        }
    }

    /// Equality on content, ignoring edit timestamps.
    pub fn same_content(&self, other: &Shape) -> bool {
        self.id == other.id
            && self.kind == other.kind
            && self.points == other.points
            && self.style == other.style
            && self.visible == other.visible
            && self.locked == other.locked
            && self.z_index == other.z_index
    }
}
