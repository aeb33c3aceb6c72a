//! Shape picking and drag manipulation.

use crate::bridge::{ChartRenderer, CoordinateBridge};
use crate::geometry::{self, HandleKind};
use crate::shapes::{ChartPoint, ShapeId};
use crate::store::ShapeStore;
use kurbo::Point;

/// What the pointer landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub shape_id: ShapeId,
    pub handle: HandleKind,
}

/// Find the topmost visible shape under `click`.
///
/// Endpoint handles are tried before the body of each shape. Shapes that
/// cannot be projected (bridge not ready, empty series) are skipped.
pub fn hit_shape<R: ChartRenderer>(
    store: &ShapeStore,
    bridge: &CoordinateBridge<R>,
    click: Point,
    tolerance: f64,
    handle_tolerance: f64,
) -> Option<Hit> {
    let grid = bridge.grid_bounds()?;
    if !grid.contains(click) {
        return None;
    }
    for shape in store.topmost_first() {
        if !shape.visible {
            continue;
        }
        let Some(pixels) = bridge.shape_pixels(shape) else {
            continue;
        };
        let handle =
            geometry::hit_test_handle(shape.kind(), &pixels.anchors, click, handle_tolerance);
        if let Some(handle) = handle {
            return Some(Hit {
                shape_id: shape.id(),
                handle,
            });
        }
        if geometry::hit_test(shape.kind(), &pixels, click, tolerance) {
            return Some(Hit {
                shape_id: shape.id(),
                handle: HandleKind::Line,
            });
        }
    }
    None
}

/// An active drag of one shape.
#[derive(Debug, Clone, PartialEq)]
pub struct DragState {
    pub shape_id: ShapeId,
    pub handle: HandleKind,
    /// Pointer position when the button went down.
    pub anchor_pixel: Point,
    /// Points before the drag started, for preview and undo.
    pub original_points: Vec<ChartPoint>,
}

impl DragState {
    pub fn new(hit: Hit, anchor_pixel: Point, original_points: Vec<ChartPoint>) -> Self {
        Self {
            shape_id: hit.shape_id,
            handle: hit.handle,
            anchor_pixel,
            original_points,
        }
    }

    /// Whether `current` is strictly farther than `threshold` from the anchor.
    pub fn exceeds_threshold(&self, current: Point, threshold: f64) -> bool {
        self.anchor_pixel.distance(current) > threshold
    }

    /// Points after dragging the pointer to `current`.
    ///
    /// The pixel offset is converted to a data-space offset so that shapes
    /// stay attached to bars. `None` if either pixel is off the grid.
    pub fn dragged_points<R: ChartRenderer>(
        &self,
        bridge: &CoordinateBridge<R>,
        current: Point,
    ) -> Option<Vec<ChartPoint>> {
        let from = bridge.pixel_to_point(self.anchor_pixel)?;
        let to = bridge.pixel_to_point(current)?;
        Some(apply_drag(
            &self.original_points,
            self.handle,
            to.timestamp - from.timestamp,
            to.price - from.price,
        ))
    }
}

/// Offset the grabbed part of `points` by a data-space delta.
pub fn apply_drag(points: &[ChartPoint], handle: HandleKind, dt: i64, dp: f64) -> Vec<ChartPoint> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let moves = match handle {
                HandleKind::Start => i == 0,
                HandleKind::End => i == 1,
                HandleKind::Line => true,
            };
            if moves { p.offset(dt, dp) } else { *p }
        })
        .collect()
}
