//! Geometry kernel: distances, index lookup and per-kind hit testing.
//!
//! Everything here is pure and works in pixel space, except
//! [`nearest_index_by_timestamp`] which works on the data series.

use crate::shapes::{fibonacci, ShapeKind};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Default body hit tolerance in pixels.
pub const DEFAULT_HIT_TOLERANCE: f64 = 10.0;
/// Default endpoint handle tolerance in pixels.
pub const DEFAULT_HANDLE_TOLERANCE: f64 = 12.0;

/// Part of a shape grabbed by the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleKind {
    /// First anchor.
    Start,
    /// Second anchor.
    End,
    /// The body; moves every anchor.
    Line,
}

/// A shape projected into pixel space.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShapePixels {
    /// Anchor positions, in point order.
    pub anchors: Vec<Point>,
    /// Screen y of each retracement level (Fibonacci only).
    pub level_ys: Vec<f64>,
}

/// Distance from `p` to the nearest point of segment `a`–`b`.
pub fn distance_point_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let seg = Vec2::new(b.x - a.x, b.y - a.y);
    let pv = Vec2::new(p.x - a.x, p.y - a.y);
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * seg.x, a.y + t * seg.y);
    ((p.x - proj.x).powi(2) + (p.y - proj.y).powi(2)).sqrt()
}

/// Index of the timestamp closest to `target`; ties go to the lower index.
///
/// Returns `None` for an empty series.
pub fn nearest_index_by_timestamp(timestamps: &[i64], target: i64) -> Option<usize> {
    let mut best: Option<(usize, u64)> = None;
    for (i, &ts) in timestamps.iter().enumerate() {
        let diff = ts.abs_diff(target);
        match best {
            Some((_, best_diff)) if diff >= best_diff => {}
            _ => best = Some((i, diff)),
        }
    }
    best.map(|(i, _)| i)
}

/// Horizontal extent covered by Fibonacci level lines.
pub fn fibonacci_extent(x1: f64, x2: f64) -> (f64, f64) {
    let (lo, hi) = (x1.min(x2), x1.max(x2));
    (lo, hi + fibonacci::EXTENSION * (x1 - x2).abs())
}

/// Whether `click` lands on a shape of `kind`, given its pixel projection.
pub fn hit_test(kind: ShapeKind, pixels: &ShapePixels, click: Point, tolerance: f64) -> bool {
    let anchors = &pixels.anchors;
    match kind {
        ShapeKind::Trendline => match anchors.as_slice() {
            [a, b] => distance_point_to_segment(click, *a, *b) <= tolerance,
            _ => false,
        },
        ShapeKind::Horizontal => anchors
            .first()
            .is_some_and(|p| (click.y - p.y).abs() <= tolerance),
        ShapeKind::Vertical => anchors
            .first()
            .is_some_and(|p| (click.x - p.x).abs() <= tolerance),
        ShapeKind::Fibonacci => {
            let [a, b] = anchors.as_slice() else {
                return false;
            };
            let (x_min, x_max) = fibonacci_extent(a.x, b.x);
            if click.x < x_min || click.x > x_max {
                return false;
            }
            pixels
                .level_ys
                .iter()
                .any(|y| (click.y - y).abs() <= tolerance)
        }
    }
}

/// Which endpoint handle (if any) is under `click`.
///
/// Only meaningful for two-point kinds; the closest endpoint within
/// `tolerance` wins, otherwise the caller falls through to [`hit_test`].
pub fn hit_test_handle(
    kind: ShapeKind,
    anchors: &[Point],
    click: Point,
    tolerance: f64,
) -> Option<HandleKind> {
    if !kind.has_handles() {
        return None;
    }
    let [a, b] = anchors else {
        return None;
    };
    let da = a.distance(click);
    let db = b.distance(click);
    let (handle, dist) = if db < da {
        (HandleKind::End, db)
    } else {
        (HandleKind::Start, da)
    };
    (dist <= tolerance).then_some(handle)
}
