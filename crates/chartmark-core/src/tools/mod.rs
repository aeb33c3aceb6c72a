//! Tool registry: shape capabilities and validated construction.

use crate::shapes::{ChartPoint, Shape, ShapeKind, ShapeStyle, StylePatch};
use thiserror::Error;

/// What a shape kind supports. Every kind has exactly one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Number of anchor points the kind requires.
    pub points: usize,
    /// Endpoints can be dragged individually.
    pub has_handles: bool,
    /// Drawn across the full grid width (hit test ignores x).
    pub spans_width: bool,
    /// Drawn across the full grid height (hit test ignores y).
    pub spans_height: bool,
    /// Draws retracement levels between the anchors.
    pub shows_levels: bool,
}

impl ShapeKind {
    /// Capability table.
    pub const fn capabilities(self) -> Capabilities {
        match self {
            ShapeKind::Trendline => Capabilities {
                points: 2,
                has_handles: true,
                spans_width: false,
                spans_height: false,
                shows_levels: false,
            },
            ShapeKind::Horizontal => Capabilities {
                points: 1,
                has_handles: false,
                spans_width: true,
                spans_height: false,
                shows_levels: false,
            },
            ShapeKind::Vertical => Capabilities {
                points: 1,
                has_handles: false,
                spans_width: false,
                spans_height: true,
                shows_levels: false,
            },
            ShapeKind::Fibonacci => Capabilities {
                points: 2,
                has_handles: true,
                spans_width: false,
                spans_height: false,
                shows_levels: true,
            },
        }
    }

    /// Number of anchor points required.
    pub const fn required_points(self) -> usize {
        self.capabilities().points
    }

    /// Whether the kind has draggable endpoint handles.
    pub const fn has_handles(self) -> bool {
        self.capabilities().has_handles
    }
}

/// Reasons a shape cannot be constructed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{kind:?} requires {expected} point(s), got {actual}")]
    PointCount {
        kind: ShapeKind,
        expected: usize,
        actual: usize,
    },
    #[error("point {index} has a non-finite coordinate")]
    NonFinite { index: usize },
    #[error("invalid style: {0}")]
    InvalidStyle(String),
}

/// Builds validated shapes.
pub struct ToolRegistry;

impl ToolRegistry {
    /// Check anchors for a kind without building anything.
    pub fn validate(kind: ShapeKind, points: &[ChartPoint]) -> Result<(), ValidationError> {
        let expected = kind.required_points();
        if points.len() != expected {
            return Err(ValidationError::PointCount {
                kind,
                expected,
                actual: points.len(),
            });
        }
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(ValidationError::NonFinite { index });
        }
        Ok(())
    }

    /// Resolve a style patch against defaults.
    ///
    /// Thickness below 1 is raised to 1 and opacity is clamped to 0..=1;
    /// non-finite numbers and blank colors are rejected.
    pub fn resolve_style(
        base: &ShapeStyle,
        patch: Option<&StylePatch>,
    ) -> Result<ShapeStyle, ValidationError> {
        let mut style = match patch {
            Some(patch) => base.patched(patch),
            None => base.clone(),
        };
        if !style.thickness.is_finite() {
            return Err(ValidationError::InvalidStyle(format!(
                "thickness {} is not finite",
                style.thickness
            )));
        }
        if !style.opacity.is_finite() {
            return Err(ValidationError::InvalidStyle(format!(
                "opacity {} is not finite",
                style.opacity
            )));
        }
        if style.color.trim().is_empty() {
            return Err(ValidationError::InvalidStyle("empty color".to_string()));
        }
        style.thickness = style.thickness.max(1.0);
        style.opacity = style.opacity.clamp(0.0, 1.0);
        Ok(style)
    }

    /// Construct a shape from a (kind, points, style) triple.
    pub fn build(
        kind: ShapeKind,
        points: Vec<ChartPoint>,
        style: Option<&StylePatch>,
    ) -> Result<Shape, ValidationError> {
        Self::build_with_base(kind, points, &ShapeStyle::default(), style)
    }

    /// Like [`ToolRegistry::build`] but with a caller-provided default style.
    pub fn build_with_base(
        kind: ShapeKind,
        points: Vec<ChartPoint>,
        base: &ShapeStyle,
        style: Option<&StylePatch>,
    ) -> Result<Shape, ValidationError> {
        Self::validate(kind, &points)?;
        let style = Self::resolve_style(base, style)?;
        Ok(Shape::assemble(kind, points, style))
    }

    /// Re-check a shape that arrived from outside (storage, wasm).
    pub fn revalidate(shape: &Shape) -> Result<(), ValidationError> {
        Self::validate(shape.kind(), shape.points())?;
        Self::resolve_style(&shape.style, None).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(t: i64, p: f64) -> ChartPoint {
        ChartPoint::new(t, p)
    }

    #[test]
    fn test_capability_table() {
        assert_eq!(ShapeKind::Trendline.required_points(), 2);
        assert_eq!(ShapeKind::Fibonacci.required_points(), 2);
        assert_eq!(ShapeKind::Horizontal.required_points(), 1);
        assert_eq!(ShapeKind::Vertical.required_points(), 1);
        assert!(ShapeKind::Trendline.has_handles());
        assert!(!ShapeKind::Horizontal.has_handles());
        assert!(ShapeKind::Horizontal.capabilities().spans_width);
        assert!(ShapeKind::Vertical.capabilities().spans_height);
        assert!(ShapeKind::Fibonacci.capabilities().shows_levels);
    }

    #[test]
    fn test_build_trendline() {
        let shape = ToolRegistry::build(
            ShapeKind::Trendline,
            vec![pt(100, 50.0), pt(200, 60.0)],
            None,
        )
        .unwrap();
        assert_eq!(shape.points().len(), 2);
        assert_eq!(shape.style, ShapeStyle::default());
        assert!(shape.visible);
        assert!(!shape.locked);
    }

    #[test]
    fn test_wrong_point_count_rejected() {
        let err = ToolRegistry::build(ShapeKind::Fibonacci, vec![pt(1, 1.0)], None).unwrap_err();
        assert_eq!(
            err,
            ValidationError::PointCount {
                kind: ShapeKind::Fibonacci,
                expected: 2,
                actual: 1
            }
        );
        assert!(ToolRegistry::build(ShapeKind::Vertical, vec![], None).is_err());
        assert!(
            ToolRegistry::build(ShapeKind::Horizontal, vec![pt(1, 1.0), pt(2, 2.0)], None).is_err()
        );
    }

    #[test]
    fn test_non_finite_rejected() {
        let err = ToolRegistry::build(
            ShapeKind::Trendline,
            vec![pt(1, 1.0), pt(2, f64::NAN)],
            None,
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::NonFinite { index: 1 });
        let infinite = vec![pt(1, f64::INFINITY)];
        assert!(ToolRegistry::build(ShapeKind::Horizontal, infinite, None).is_err());
    }

    #[test]
    fn test_style_clamping() {
        let patch = StylePatch {
            color: None,
            thickness: Some(0.2),
            opacity: Some(4.0),
        };
        let shape =
            ToolRegistry::build(ShapeKind::Horizontal, vec![pt(1, 1.0)], Some(&patch)).unwrap();
        assert!((shape.style.thickness - 1.0).abs() < f64::EPSILON);
        assert!((shape.style.opacity - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bad_style_rejected() {
        let patch = StylePatch {
            thickness: Some(f64::NAN),
            ..StylePatch::default()
        };
        assert!(matches!(
            ToolRegistry::build(ShapeKind::Vertical, vec![pt(1, 1.0)], Some(&patch)),
            Err(ValidationError::InvalidStyle(_))
        ));
        let blank = StylePatch::color("  ");
        assert!(ToolRegistry::build(ShapeKind::Vertical, vec![pt(1, 1.0)], Some(&blank)).is_err());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = ToolRegistry::build(ShapeKind::Vertical, vec![pt(1, 1.0)], None).unwrap();
        let b = ToolRegistry::build(ShapeKind::Vertical, vec![pt(1, 1.0)], None).unwrap();
        assert_ne!(a.id(), b.id());
    }
}
