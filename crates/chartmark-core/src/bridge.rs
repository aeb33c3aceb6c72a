//! Coordinate bridge between pixel space and chart data space.
//!
//! The chart renderer is external; it is reached only through
//! [`ChartRenderer`]. Every conversion returns `Option` and `None` means
//! "ignore this event": the renderer is not ready yet, is resizing, or the
//! pixel is outside the plotted grid.

use crate::geometry::ShapePixels;
use crate::series::DataSeries;
use crate::shapes::{fibonacci, ChartPoint, Shape};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// A data-space coordinate as reported by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataCoord {
    pub timestamp: i64,
    pub price: f64,
}

impl From<DataCoord> for ChartPoint {
    fn from(c: DataCoord) -> Self {
        ChartPoint::new(c.timestamp, c.price)
    }
}

/// Plotting area in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridBounds {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl GridBounds {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self { left, right, top, bottom }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Inclusive containment check.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.top && p.y <= self.bottom
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.right, self.bottom)
    }
}

/// The rendering library's conversion API.
pub trait ChartRenderer {
    /// Whether the renderer has painted at least once and is not mid-resize.
    fn is_ready(&self) -> bool;

    /// Convert a pixel to data space.
    fn pixel_to_data(&self, pixel: Point) -> Option<DataCoord>;

    /// Convert a (series index, price) pair to a pixel.
    fn data_to_pixel(&self, index: usize, price: f64) -> Option<Point>;

    /// Current plotting area.
    fn grid_bounds(&self) -> Option<GridBounds>;

    /// Called when the plotted series changes.
    fn series_changed(&mut self, _series: &DataSeries) {}
}

/// Wraps a [`ChartRenderer`] and the current series.
#[derive(Debug, Clone)]
pub struct CoordinateBridge<R> {
    renderer: R,
    series: DataSeries,
    ready: bool,
}

impl<R: ChartRenderer> CoordinateBridge<R> {
    /// Create a bridge. It stays unusable until [`CoordinateBridge::on_ready`].
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            series: DataSeries::default(),
            ready: false,
        }
    }

    /// Renderer signalled its first paint.
    pub fn on_ready(&mut self) {
        if !self.ready {
            log::debug!("coordinate bridge ready");
        }
        self.ready = true;
    }

    /// Renderer is going away or resizing; conversions return `None`.
    pub fn suspend(&mut self) {
        self.ready = false;
    }

    pub fn is_ready(&self) -> bool {
        self.ready && self.renderer.is_ready()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn series(&self) -> &DataSeries {
        &self.series
    }

    /// Replace the plotted series.
    pub fn set_series(&mut self, series: DataSeries) {
        self.series = series;
        self.series.reindex();
        self.renderer.series_changed(&self.series);
    }

    /// Append or update the latest bar.
    pub fn push_bar(&mut self, bar: crate::series::Bar) {
        self.series.push(bar);
        self.renderer.series_changed(&self.series);
    }

    pub fn grid_bounds(&self) -> Option<GridBounds> {
        if !self.is_ready() {
            return None;
        }
        self.renderer.grid_bounds()
    }

    /// Pixel → data point. `None` outside the grid.
    pub fn pixel_to_point(&self, pixel: Point) -> Option<ChartPoint> {
        let grid = self.grid_bounds()?;
        if !grid.contains(pixel) {
            return None;
        }
        let coord = self.renderer.pixel_to_data(pixel)?;
        coord.price.is_finite().then(|| coord.into())
    }

    /// Data point → pixel, via the nearest loaded timestamp.
    pub fn point_to_pixel(&self, point: ChartPoint) -> Option<Point> {
        if !self.is_ready() {
            return None;
        }
        let index = self.series.nearest_index(point.timestamp)?;
        self.renderer.data_to_pixel(index, point.price)
    }

    /// Project a list of points; fails if any point cannot be projected.
    pub fn points_to_pixels(&self, points: &[ChartPoint]) -> Option<Vec<Point>> {
        points.iter().map(|p| self.point_to_pixel(*p)).collect()
    }

    /// Project a shape (anchors plus Fibonacci level lines).
    pub fn shape_pixels(&self, shape: &Shape) -> Option<ShapePixels> {
        self.project(shape.kind(), shape.points())
    }

    /// Project raw anchors of a given kind (used for previews).
    pub fn project(
        &self,
        kind: crate::shapes::ShapeKind,
        points: &[ChartPoint],
    ) -> Option<ShapePixels> {
        let anchors = self.points_to_pixels(points)?;
        let level_ys = if kind.capabilities().shows_levels {
            let (first, second) = (points.first()?, points.get(1)?);
            let index = self.series.nearest_index(first.timestamp)?;
            fibonacci::retracement_levels(first.price, second.price)
                .iter()
                .map(|level| self.renderer.data_to_pixel(index, level.price).map(|p| p.y))
                .collect::<Option<Vec<_>>>()?
        } else {
            Vec::new()
        };
        Some(ShapePixels { anchors, level_ys })
    }
}

/// Reference renderer: index-based time axis, linear price axis.
///
/// Bar `i` is centred at `left + (i - first_visible) * bar_spacing`; price
/// maps linearly from `price_max` at `top` to `price_min` at `bottom`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearScale {
    pub grid: GridBounds,
    /// Pixels per bar.
    pub bar_spacing: f64,
    /// Index drawn at the left edge.
    pub first_visible: f64,
    pub price_min: f64,
    pub price_max: f64,
    #[serde(skip)]
    timestamps: Vec<i64>,
    #[serde(default = "default_painted")]
    painted: bool,
}

fn default_painted() -> bool {
    true
}

impl LinearScale {
    pub fn new(grid: GridBounds, bar_spacing: f64, price_min: f64, price_max: f64) -> Self {
        Self {
            grid,
            bar_spacing,
            first_visible: 0.0,
            price_min,
            price_max,
            timestamps: Vec::new(),
            painted: true,
        }
    }

    /// Simulate a resize / repaint cycle.
    pub fn set_painted(&mut self, painted: bool) {
        self.painted = painted;
    }

    /// Scroll the time axis by `bars`.
    pub fn scroll(&mut self, bars: f64) {
        self.first_visible += bars;
    }

    fn price_span(&self) -> f64 {
        self.price_max - self.price_min
    }
}

impl ChartRenderer for LinearScale {
    fn is_ready(&self) -> bool {
        self.painted && self.bar_spacing > 0.0 && self.price_span() > 0.0
    }

    fn pixel_to_data(&self, pixel: Point) -> Option<DataCoord> {
        if self.timestamps.is_empty() || !self.is_ready() {
            return None;
        }
        let raw = (pixel.x - self.grid.left) / self.bar_spacing + self.first_visible;
        let last = (self.timestamps.len() - 1) as f64;
        let index = raw.round().clamp(0.0, last) as usize;
        let frac = (pixel.y - self.grid.top) / self.grid.height();
        Some(DataCoord {
            timestamp: self.timestamps[index],
            price: self.price_max - frac * self.price_span(),
        })
    }

    fn data_to_pixel(&self, index: usize, price: f64) -> Option<Point> {
        if !self.is_ready() || !price.is_finite() {
            return None;
        }
        let x = self.grid.left + (index as f64 - self.first_visible) * self.bar_spacing;
        let y = self.grid.top + (self.price_max - price) / self.price_span() * self.grid.height();
        Some(Point::new(x, y))
    }

    fn grid_bounds(&self) -> Option<GridBounds> {
        Some(self.grid)
    }

    fn series_changed(&mut self, series: &DataSeries) {
        self.timestamps = series.timestamps().to_vec();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::series::Bar;
    use crate::shapes::ShapeKind;
    use crate::tools::ToolRegistry;

    /// Bars every 100 time units from 0 to 1000, 10 px apart; prices
    /// 0..100 over a 400 px tall grid, so `y = 400 - 4 * price`.
    pub(crate) fn test_bridge() -> CoordinateBridge<LinearScale> {
        let scale = LinearScale::new(GridBounds::new(0.0, 0.0, 500.0, 400.0), 10.0, 0.0, 100.0);
        let mut bridge = CoordinateBridge::new(scale);
        bridge.set_series(DataSeries::new(
            (0..=10).map(|i| Bar::flat(i * 100, 50.0)).collect(),
        ));
        bridge.on_ready();
        bridge
    }

    #[test]
    fn test_not_ready_until_on_ready() {
        let scale = LinearScale::new(GridBounds::new(0.0, 0.0, 500.0, 400.0), 10.0, 0.0, 100.0);
        let mut bridge = CoordinateBridge::new(scale);
        bridge.set_series(DataSeries::new(vec![Bar::flat(0, 1.0)]));
        assert!(bridge.pixel_to_point(Point::new(0.0, 0.0)).is_none());
        assert!(bridge.point_to_pixel(ChartPoint::new(0, 1.0)).is_none());
        bridge.on_ready();
        assert!(bridge.pixel_to_point(Point::new(0.0, 0.0)).is_some());
    }

    #[test]
    fn test_roundtrip_conversion() {
        let bridge = test_bridge();
        let p = bridge.point_to_pixel(ChartPoint::new(200, 60.0)).unwrap();
        assert!((p.x - 20.0).abs() < 1e-9);
        assert!((p.y - 160.0).abs() < 1e-9);
        let back = bridge.pixel_to_point(p).unwrap();
        assert_eq!(back.timestamp, 200);
        assert!((back.price - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_outside_grid_is_none() {
        let bridge = test_bridge();
        assert!(bridge.pixel_to_point(Point::new(-1.0, 10.0)).is_none());
        assert!(bridge.pixel_to_point(Point::new(10.0, 401.0)).is_none());
    }

    #[test]
    fn test_suspend_during_resize() {
        let mut bridge = test_bridge();
        bridge.renderer_mut().set_painted(false);
        assert!(bridge.pixel_to_point(Point::new(10.0, 10.0)).is_none());
        bridge.renderer_mut().set_painted(true);
        assert!(bridge.pixel_to_point(Point::new(10.0, 10.0)).is_some());
        bridge.suspend();
        assert!(bridge.grid_bounds().is_none());
    }

    #[test]
    fn test_point_uses_nearest_timestamp() {
        let bridge = test_bridge();
        // 240 is nearest to bar 2 (t = 200)
        let p = bridge.point_to_pixel(ChartPoint::new(240, 50.0)).unwrap();
        assert!((p.x - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_fibonacci_projection_has_seven_levels() {
        let bridge = test_bridge();
        let shape = ToolRegistry::build(
            ShapeKind::Fibonacci,
            vec![ChartPoint::new(100, 50.0), ChartPoint::new(300, 75.0)],
            None,
        )
        .unwrap();
        let pixels = bridge.shape_pixels(&shape).unwrap();
        assert_eq!(pixels.anchors.len(), 2);
        assert_eq!(pixels.level_ys.len(), 7);
        assert!((pixels.level_ys[0] - 100.0).abs() < 1e-9);
        assert!((pixels.level_ys[6] - 200.0).abs() < 1e-9);
    }
}
