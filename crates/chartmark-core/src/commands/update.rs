//! Update an existing shape's points or properties.

use super::{CommandError, CommandMeta, CommandOutcome};
use crate::shapes::{ChartPoint, Shape, ShapeId, StylePatch};
use crate::store::ShapeStore;
use crate::tools::ToolRegistry;
use serde::{Deserialize, Serialize};

/// Fields to change; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<ChartPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StylePatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
}

impl ShapeUpdate {
    pub fn is_empty(&self) -> bool {
        self.points.is_none()
            && self.style.as_ref().is_none_or(StylePatch::is_empty)
            && self.visible.is_none()
            && self.locked.is_none()
            && self.z_index.is_none()
    }

    /// Build the updated shape. Assumes the update has been validated.
    fn apply_to(&self, shape: &Shape) -> Result<Shape, CommandError> {
        let mut next = shape.clone();
        if let Some(points) = &self.points {
            next.set_points(points.clone());
        }
        if let Some(patch) = &self.style {
            next.style = ToolRegistry::resolve_style(&shape.style, Some(patch))?;
        }
        if let Some(visible) = self.visible {
            next.visible = visible;
        }
        if let Some(locked) = self.locked {
            next.locked = locked;
        }
        if let Some(z) = self.z_index {
            next.z_index = z;
        }
        next.touch();
        Ok(next)
    }
}

/// Changes a shape, remembering its previous state for undo.
#[derive(Debug, Clone)]
pub struct UpdateCommand {
    pub(super) meta: CommandMeta,
    shape_id: ShapeId,
    update: ShapeUpdate,
    before: Option<Shape>,
    after: Option<Shape>,
}

impl UpdateCommand {
    pub fn new(shape_id: ShapeId, update: ShapeUpdate) -> Self {
        Self {
            meta: CommandMeta::default(),
            shape_id,
            update,
            before: None,
            after: None,
        }
    }

    /// Move a shape's anchors (drag commit).
    pub fn move_points(shape_id: ShapeId, points: Vec<ChartPoint>) -> Self {
        Self::new(
            shape_id,
            ShapeUpdate {
                points: Some(points),
                ..ShapeUpdate::default()
            },
        )
    }

    /// Restyle a shape.
    pub fn restyle(shape_id: ShapeId, style: StylePatch) -> Self {
        Self::new(
            shape_id,
            ShapeUpdate {
                style: Some(style),
                ..ShapeUpdate::default()
            },
        )
    }

    pub fn shape_id(&self) -> ShapeId {
        self.shape_id
    }

    pub fn update(&self) -> &ShapeUpdate {
        &self.update
    }

    /// State captured before execution.
    pub fn before(&self) -> Option<&Shape> {
        self.before.as_ref()
    }

    pub fn validate(&self, store: &ShapeStore) -> Result<(), CommandError> {
        let shape = store
            .get(self.shape_id)
            .ok_or(CommandError::NotFound(self.shape_id))?;
        if self.update.is_empty() {
            return Err(CommandError::EmptyUpdate(self.shape_id));
        }
        if let Some(points) = &self.update.points {
            // Unlocking and moving in one update is allowed.
            if shape.locked && self.update.locked != Some(false) {
                return Err(CommandError::Locked(self.shape_id));
            }
            ToolRegistry::validate(shape.kind(), points)?;
        }
        if let Some(patch) = &self.update.style {
            ToolRegistry::resolve_style(&shape.style, Some(patch))?;
        }
        Ok(())
    }

    pub fn execute(&mut self, store: &mut ShapeStore) -> Result<CommandOutcome, CommandError> {
        if self.before.is_some() {
            return Err(CommandError::AlreadyExecuted);
        }
        self.validate(store)?;
        let before = store
            .get(self.shape_id)
            .cloned()
            .ok_or(CommandError::NotFound(self.shape_id))?;
        let after = self.update.apply_to(&before)?;
        store.replace(after.clone());
        self.before = Some(before);
        self.after = Some(after.clone());
        Ok(CommandOutcome::Shape(after))
    }

    pub fn undo(&mut self, store: &mut ShapeStore) -> Result<(), CommandError> {
        let before = self.before.as_ref().ok_or(CommandError::NotExecuted)?;
        store
            .replace(before.clone())
            .map(|_| ())
            .ok_or(CommandError::NotFound(self.shape_id))
    }

    pub fn redo(&mut self, store: &mut ShapeStore) -> Result<CommandOutcome, CommandError> {
        let after = self.after.as_ref().ok_or(CommandError::NotExecuted)?;
        store
            .replace(after.clone())
            .ok_or(CommandError::NotFound(self.shape_id))?;
        Ok(CommandOutcome::Shape(after.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{create_trend, pt};

    #[test]
    fn test_move_points_undo_redo() {
        let mut store = ShapeStore::new();
        let id = create_trend(&mut store, pt(100, 50.0), pt(200, 60.0));
        let mut cmd = UpdateCommand::move_points(id, vec![pt(100, 50.0), pt(200, 70.0)]);
        cmd.execute(&mut store).unwrap();
        assert_eq!(store.get(id).unwrap().points()[1], pt(200, 70.0));
        assert_eq!(cmd.before().unwrap().points()[1], pt(200, 60.0));

        cmd.undo(&mut store).unwrap();
        assert_eq!(store.get(id).unwrap().points()[1], pt(200, 60.0));

        cmd.redo(&mut store).unwrap();
        assert_eq!(store.get(id).unwrap().points()[1], pt(200, 70.0));
    }

    #[test]
    fn test_missing_shape() {
        let store = ShapeStore::new();
        let id = uuid::Uuid::new_v4();
        let cmd = UpdateCommand::restyle(id, StylePatch::color("red"));
        assert_eq!(cmd.validate(&store), Err(CommandError::NotFound(id)));
    }

    #[test]
    fn test_wrong_point_count_fails_validation() {
        let mut store = ShapeStore::new();
        let id = create_trend(&mut store, pt(100, 50.0), pt(200, 60.0));
        let mut cmd = UpdateCommand::move_points(id, vec![pt(100, 50.0)]);
        assert!(matches!(cmd.execute(&mut store), Err(CommandError::Validation(_))));
        assert_eq!(store.get(id).unwrap().points().len(), 2);
    }

    #[test]
    fn test_locked_shape_cannot_move() {
        let mut store = ShapeStore::new();
        let id = create_trend(&mut store, pt(100, 50.0), pt(200, 60.0));
        UpdateCommand::new(id, ShapeUpdate { locked: Some(true), ..ShapeUpdate::default() })
            .execute(&mut store)
            .unwrap();
        let mv = UpdateCommand::move_points(id, vec![pt(100, 1.0), pt(200, 2.0)]);
        assert_eq!(mv.validate(&store), Err(CommandError::Locked(id)));
        // style changes still allowed
        assert!(UpdateCommand::restyle(id, StylePatch::color("#000")).validate(&store).is_ok());
    }

    #[test]
    fn test_empty_update_rejected() {
        let mut store = ShapeStore::new();
        let id = create_trend(&mut store, pt(100, 50.0), pt(200, 60.0));
        let cmd = UpdateCommand::new(id, ShapeUpdate::default());
        assert_eq!(cmd.validate(&store), Err(CommandError::EmptyUpdate(id)));
    }

    #[test]
    fn test_restyle_merges_with_existing() {
        let mut store = ShapeStore::new();
        let id = create_trend(&mut store, pt(100, 50.0), pt(200, 60.0));
        let patch = StylePatch {
            thickness: Some(3.0),
            ..StylePatch::default()
        };
        let mut cmd = UpdateCommand::restyle(id, patch);
        cmd.execute(&mut store).unwrap();
        let style = &store.get(id).unwrap().style;
        assert!((style.thickness - 3.0).abs() < f64::EPSILON);
        assert_eq!(style.color, crate::shapes::DEFAULT_COLOR);
    }
}
