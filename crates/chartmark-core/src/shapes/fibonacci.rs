//! Fibonacci retracement levels.

use serde::{Deserialize, Serialize};

/// Number of retracement levels drawn for a Fibonacci shape.
pub const LEVEL_COUNT: usize = 7;

/// Retracement ratios, 0% at the second anchor and 100% at the first.
pub const RATIOS: [f64; LEVEL_COUNT] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];

/// Horizontal overshoot of the level lines past the right-most anchor,
/// as a fraction of the anchors' horizontal distance.
pub const EXTENSION: f64 = 0.2;

/// A single retracement level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FibLevel {
    pub ratio: f64,
    pub price: f64,
}

/// Compute the retracement levels for a move from `start` to `end`.
///
/// Interpolates as `start·r + end·(1−r)` so the 0 and 1 levels land on the
/// anchor prices without rounding.
pub fn retracement_levels(start: f64, end: f64) -> [FibLevel; LEVEL_COUNT] {
    RATIOS.map(|ratio| FibLevel {
        ratio,
        price: start * ratio + end * (1.0 - ratio),
    })
}

/// Interpolate level positions in pixel space (same formula on screen y).
pub fn level_ys(start_y: f64, end_y: f64) -> [f64; LEVEL_COUNT] {
    RATIOS.map(|ratio| start_y * ratio + end_y * (1.0 - ratio))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_count_and_anchors() {
        let levels = retracement_levels(50.0, 60.0);
        assert_eq!(levels.len(), 7);
        assert!((levels[0].price - 60.0).abs() < f64::EPSILON);
        assert!((levels[6].price - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_midpoint_level() {
        let levels = retracement_levels(100.0, 200.0);
        assert!((levels[3].price - 150.0).abs() < 1e-9);
        assert!((levels[1].price - (200.0 - 100.0 * 0.236)).abs() < 1e-9);
    }

    #[test]
    fn test_awkward_prices_hit_anchors_exactly() {
        let (a, b) = (0.1, 0.3);
        let levels = retracement_levels(a, b);
        assert_eq!(levels[0].price, b);
        assert_eq!(levels[6].price, a);
    }

    #[test]
    fn test_downtrend_levels_are_monotonic() {
        let levels = retracement_levels(200.0, 100.0);
        for pair in levels.windows(2) {
            assert!(pair[1].price > pair[0].price);
        }
    }
}
