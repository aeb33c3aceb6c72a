//! Atomic groups of commands.

use super::{Command, CommandError, CommandMeta, CommandOutcome};
use crate::store::ShapeStore;

/// Several commands applied all-or-nothing and undone as one step.
#[derive(Debug, Clone)]
pub struct BatchCommand {
    pub(super) meta: CommandMeta,
    label: String,
    children: Vec<Command>,
    executed: bool,
}

impl BatchCommand {
    pub fn new(label: impl Into<String>, children: Vec<Command>) -> Self {
        Self {
            meta: CommandMeta::default(),
            label: label.into(),
            children,
            executed: false,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn children(&self) -> &[Command] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn validate(&self, store: &ShapeStore) -> Result<(), CommandError> {
        if self.children.is_empty() {
            return Err(CommandError::EmptyBatch);
        }
        for (index, child) in self.children.iter().enumerate() {
            child.validate(store).map_err(|source| CommandError::BatchAborted {
                index,
                source: Box::new(source),
            })?;
        }
        Ok(())
    }

    pub fn execute(&mut self, store: &mut ShapeStore) -> Result<CommandOutcome, CommandError> {
        if self.executed {
            return Err(CommandError::AlreadyExecuted);
        }
        if self.children.is_empty() {
            return Err(CommandError::EmptyBatch);
        }
        let outcomes = self.run_forward(store, false)?;
        self.executed = true;
        Ok(CommandOutcome::Batch(outcomes))
    }

    pub fn undo(&mut self, store: &mut ShapeStore) -> Result<(), CommandError> {
        if !self.executed {
            return Err(CommandError::NotExecuted);
        }
        let count = self.children.len();
        for step in 0..count {
            let index = count - 1 - step;
            if let Err(source) = self.children[index].undo(store) {
                // Put back what was already undone.
                for redo_index in index + 1..count {
                    if let Err(e) = self.children[redo_index].redo(store) {
                        log::error!(
                            "batch '{}': failed to restore child {redo_index}: {e}",
                            self.label
                        );
                    }
                }
                return Err(CommandError::BatchAborted {
                    index,
                    source: Box::new(source),
                });
            }
        }
        Ok(())
    }

    pub fn redo(&mut self, store: &mut ShapeStore) -> Result<CommandOutcome, CommandError> {
        if !self.executed {
            return Err(CommandError::NotExecuted);
        }
        self.run_forward(store, true).map(CommandOutcome::Batch)
    }

    /// Execute (or redo) every child in order, rolling back on the first failure.
    fn run_forward(
        &mut self,
        store: &mut ShapeStore,
        redo: bool,
    ) -> Result<Vec<CommandOutcome>, CommandError> {
        let mut outcomes = Vec::with_capacity(self.children.len());
        for index in 0..self.children.len() {
            let child = &mut self.children[index];
            let result = if redo { child.redo(store) } else { child.execute(store) };
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(source) => {
                    log::warn!("batch '{}' aborted at child {index}: {source}", self.label);
                    for done in self.children[..index].iter_mut().rev() {
                        if let Err(e) = done.undo(store) {
                            log::error!("batch '{}': rollback failed: {e}", self.label);
                        }
                    }
                    return Err(CommandError::BatchAborted {
                        index,
                        source: Box::new(source),
                    });
                }
            }
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{create_trend, pt};
    use crate::commands::{CreateCommand, DeleteCommand, UpdateCommand};
    use crate::shapes::ShapeKind;

    fn create(kind: ShapeKind, points: Vec<crate::shapes::ChartPoint>) -> Command {
        CreateCommand::new(kind, points, None).into()
    }

    #[test]
    fn test_failing_child_rolls_back_everything() {
        let mut store = ShapeStore::new();
        let mut batch = BatchCommand::new(
            "import",
            vec![
                create(ShapeKind::Horizontal, vec![pt(1, 1.0)]),
                create(ShapeKind::Vertical, vec![pt(2, 1.0)]),
                create(ShapeKind::Trendline, vec![pt(1, 1.0), pt(2, 2.0)]),
                create(ShapeKind::Fibonacci, vec![pt(1, 1.0)]),
            ],
        );
        let err = batch.execute(&mut store).unwrap_err();
        assert!(matches!(err, CommandError::BatchAborted { index: 3, .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn test_batch_undo_redo_as_one() {
        let mut store = ShapeStore::new();
        let existing = create_trend(&mut store, pt(100, 1.0), pt(200, 2.0));
        let mut batch = BatchCommand::new(
            "replace",
            vec![
                DeleteCommand::new(existing).into(),
                create(ShapeKind::Horizontal, vec![pt(1, 5.0)]),
            ],
        );
        batch.execute(&mut store).unwrap();
        assert!(!store.contains(existing));
        assert_eq!(store.len(), 1);

        batch.undo(&mut store).unwrap();
        assert!(store.contains(existing));
        assert_eq!(store.len(), 1);

        batch.redo(&mut store).unwrap();
        assert!(!store.contains(existing));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_update_failure_restores_earlier_update() {
        let mut store = ShapeStore::new();
        let id = create_trend(&mut store, pt(100, 1.0), pt(200, 2.0));
        let missing = uuid::Uuid::new_v4();
        let mut batch = BatchCommand::new(
            "move",
            vec![
                UpdateCommand::move_points(id, vec![pt(100, 9.0), pt(200, 9.0)]).into(),
                UpdateCommand::move_points(missing, vec![pt(0, 0.0), pt(1, 1.0)]).into(),
            ],
        );
        assert!(batch.execute(&mut store).is_err());
        assert_eq!(store.get(id).unwrap().points()[0], pt(100, 1.0));
    }

    #[test]
    fn test_empty_batch() {
        let mut store = ShapeStore::new();
        let mut batch = BatchCommand::new("nothing", Vec::new());
        assert_eq!(batch.validate(&store), Err(CommandError::EmptyBatch));
        assert_eq!(batch.execute(&mut store), Err(CommandError::EmptyBatch));
    }

    #[test]
    fn test_affected_shapes_flattens_children() {
        let mut store = ShapeStore::new();
        let a = create_trend(&mut store, pt(100, 1.0), pt(200, 2.0));
        let b = create_trend(&mut store, pt(100, 3.0), pt(200, 4.0));
        let cmd = Command::from(BatchCommand::new(
            "delete both",
            vec![DeleteCommand::new(a).into(), DeleteCommand::new(b).into()],
        ));
        assert_eq!(cmd.affected_shapes(), vec![a, b]);
        assert_eq!(cmd.label(), "delete both");
    }
}
