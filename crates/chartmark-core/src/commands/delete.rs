//! Delete a shape.

use super::{CommandError, CommandMeta, CommandOutcome};
use crate::shapes::{Shape, ShapeId};
use crate::store::ShapeStore;

/// Removes a shape, keeping it (and its position) for undo.
#[derive(Debug, Clone)]
pub struct DeleteCommand {
    pub(super) meta: CommandMeta,
    shape_id: ShapeId,
    removed: Option<(usize, Shape)>,
}

impl DeleteCommand {
    pub fn new(shape_id: ShapeId) -> Self {
        Self {
            meta: CommandMeta::default(),
            shape_id,
            removed: None,
        }
    }

    pub fn shape_id(&self) -> ShapeId {
        self.shape_id
    }

    /// The removed shape, once executed.
    pub fn removed(&self) -> Option<&Shape> {
        self.removed.as_ref().map(|(_, shape)| shape)
    }

    pub fn validate(&self, store: &ShapeStore) -> Result<(), CommandError> {
        if store.contains(self.shape_id) {
            Ok(())
        } else {
            Err(CommandError::NotFound(self.shape_id))
        }
    }

    pub fn execute(&mut self, store: &mut ShapeStore) -> Result<CommandOutcome, CommandError> {
        if self.removed.is_some() {
            return Err(CommandError::AlreadyExecuted);
        }
        let removed = store
            .remove(self.shape_id)
            .ok_or(CommandError::NotFound(self.shape_id))?;
        log::debug!("deleted shape {}", self.shape_id);
        self.removed = Some(removed);
        Ok(CommandOutcome::Deleted(true))
    }

    pub fn undo(&mut self, store: &mut ShapeStore) -> Result<(), CommandError> {
        let (position, shape) = self.removed.as_ref().ok_or(CommandError::NotExecuted)?;
        if !store.insert_at(*position, shape.clone()) {
            return Err(CommandError::AlreadyExists(self.shape_id));
        }
        Ok(())
    }

    pub fn redo(&mut self, store: &mut ShapeStore) -> Result<CommandOutcome, CommandError> {
        if self.removed.is_none() {
            return Err(CommandError::NotExecuted);
        }
        match store.remove(self.shape_id) {
            Some(removed) => {
                self.removed = Some(removed);
                Ok(CommandOutcome::Deleted(true))
            }
            None => Ok(CommandOutcome::Deleted(false)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{create_trend, pt};

    #[test]
    fn test_delete_and_restore_position() {
        let mut store = ShapeStore::new();
        let a = create_trend(&mut store, pt(100, 1.0), pt(200, 2.0));
        let b = create_trend(&mut store, pt(100, 3.0), pt(200, 4.0));
        let c = create_trend(&mut store, pt(100, 5.0), pt(200, 6.0));

        let mut cmd = DeleteCommand::new(b);
        assert_eq!(cmd.execute(&mut store), Ok(CommandOutcome::Deleted(true)));
        assert!(!store.contains(b));
        assert_eq!(cmd.removed().map(Shape::id), Some(b));

        cmd.undo(&mut store).unwrap();
        let ids: Vec<_> = store.iter().map(Shape::id).collect();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[test]
    fn test_delete_missing() {
        let mut store = ShapeStore::new();
        let id = uuid::Uuid::new_v4();
        let mut cmd = DeleteCommand::new(id);
        assert_eq!(cmd.execute(&mut store), Err(CommandError::NotFound(id)));
    }

    #[test]
    fn test_redo_when_already_gone() {
        let mut store = ShapeStore::new();
        let id = create_trend(&mut store, pt(100, 1.0), pt(200, 2.0));
        let mut cmd = DeleteCommand::new(id);
        cmd.execute(&mut store).unwrap();
        assert_eq!(cmd.redo(&mut store), Ok(CommandOutcome::Deleted(false)));

        cmd.undo(&mut store).unwrap();
        assert_eq!(cmd.redo(&mut store), Ok(CommandOutcome::Deleted(true)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_undo_conflict() {
        let mut store = ShapeStore::new();
        let id = create_trend(&mut store, pt(100, 1.0), pt(200, 2.0));
        let mut cmd = DeleteCommand::new(id);
        cmd.execute(&mut store).unwrap();
        cmd.undo(&mut store).unwrap();
        assert_eq!(cmd.undo(&mut store), Err(CommandError::AlreadyExists(id)));
    }
}
