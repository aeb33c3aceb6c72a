//! Undo/redo history.
//!
//! Commands live in an arena keyed by [`CommandId`]; the undo and redo
//! stacks only hold ids. A new execute always clears the redo stack, and
//! the oldest undo entries are evicted beyond `max_history`.

use super::{Command, CommandError, CommandId, CommandOutcome};
use crate::store::ShapeStore;
use std::collections::{HashMap, VecDeque};

/// Default number of undoable steps kept.
pub const DEFAULT_MAX_HISTORY: usize = 100;

/// Executes commands and tracks them for undo/redo.
#[derive(Debug, Clone)]
pub struct CommandHistory {
    arena: HashMap<CommandId, Command>,
    undo_stack: VecDeque<CommandId>,
    redo_stack: Vec<CommandId>,
    next_id: u64,
    max_history: usize,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl CommandHistory {
    pub fn new(max_history: usize) -> Self {
        Self {
            arena: HashMap::new(),
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            next_id: 1,
            max_history: max_history.max(1),
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Change the limit, evicting the oldest entries if needed.
    pub fn set_max_history(&mut self, max_history: usize) {
        self.max_history = max_history.max(1);
        self.trim();
    }

    /// Validate and execute a command, recording it for undo.
    pub fn execute(
        &mut self,
        store: &mut ShapeStore,
        mut command: Command,
    ) -> Result<(CommandId, CommandOutcome), CommandError> {
        command.validate(store)?;
        let outcome = command.execute(store)?;

        let id = CommandId(self.next_id);
        self.next_id += 1;
        command.meta_mut().id = Some(id);
        log::debug!("executed {:?} '{}'", id, command.label());

        // Branching off: redo entries can never be reached again.
        for stale in self.redo_stack.drain(..) {
            self.arena.remove(&stale);
        }

        if command.can_undo() {
            self.arena.insert(id, command);
            self.undo_stack.push_back(id);
            self.trim();
        }
        Ok((id, outcome))
    }

    /// Undo the most recent command.
    pub fn undo(&mut self, store: &mut ShapeStore) -> Result<CommandId, CommandError> {
        let id = self.undo_stack.pop_back().ok_or(CommandError::NothingToUndo)?;
        let Some(command) = self.arena.get_mut(&id) else {
            return Err(CommandError::NothingToUndo);
        };
        if let Err(e) = command.undo(store) {
            log::warn!("undo of {id:?} failed: {e}");
            self.undo_stack.push_back(id);
            return Err(e);
        }
        self.redo_stack.push(id);
        Ok(id)
    }

    /// Redo the most recently undone command.
    pub fn redo(
        &mut self,
        store: &mut ShapeStore,
    ) -> Result<(CommandId, CommandOutcome), CommandError> {
        let id = self.redo_stack.pop().ok_or(CommandError::NothingToRedo)?;
        let Some(command) = self.arena.get_mut(&id) else {
            return Err(CommandError::NothingToRedo);
        };
        match command.redo(store) {
            Ok(outcome) => {
                self.undo_stack.push_back(id);
                Ok((id, outcome))
            }
            Err(e) => {
                log::warn!("redo of {id:?} failed: {e}");
                self.redo_stack.push(id);
                Err(e)
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Label of the command the next undo would reverse.
    pub fn undo_label(&self) -> Option<String> {
        self.next_undo().map(Command::label)
    }

    /// Label of the command the next redo would re-apply.
    pub fn redo_label(&self) -> Option<String> {
        self.next_redo().map(Command::label)
    }

    /// The command the next undo would reverse.
    pub fn next_undo(&self) -> Option<&Command> {
        self.undo_stack.back().and_then(|id| self.get(*id))
    }

    /// The command the next redo would re-apply.
    pub fn next_redo(&self) -> Option<&Command> {
        self.redo_stack.last().and_then(|id| self.get(*id))
    }

    pub fn get(&self, id: CommandId) -> Option<&Command> {
        self.arena.get(&id)
    }

    /// Forget everything (after loading a different chart).
    pub fn clear(&mut self) {
        self.arena.clear();
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn trim(&mut self) {
        while self.undo_stack.len() > self.max_history {
            if let Some(oldest) = self.undo_stack.pop_front() {
                self.arena.remove(&oldest);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::pt;
    use crate::commands::{CreateCommand, DeleteCommand, UpdateCommand};
    use crate::shapes::{Shape, ShapeKind};

    fn hline(price: f64) -> Command {
        CreateCommand::new(ShapeKind::Horizontal, vec![pt(0, price)], None).into()
    }

    fn created_id(outcome: &CommandOutcome) -> crate::shapes::ShapeId {
        outcome.shape().map(Shape::id).unwrap()
    }

    #[test]
    fn test_n_executes_then_n_undos_restores_initial_state() {
        let mut store = ShapeStore::new();
        let mut history = CommandHistory::default();
        let (_, first) = history.execute(&mut store, hline(1.0)).unwrap();
        let initial = store.snapshot();

        let id = created_id(&first);
        history.execute(&mut store, hline(2.0)).unwrap();
        history
            .execute(&mut store, UpdateCommand::move_points(id, vec![pt(0, 5.0)]).into())
            .unwrap();
        history.execute(&mut store, DeleteCommand::new(id).into()).unwrap();

        for _ in 0..3 {
            history.undo(&mut store).unwrap();
        }
        assert!(store.content_eq(&initial));
    }

    #[test]
    fn test_undo_then_redo_is_identity() {
        let mut store = ShapeStore::new();
        let mut history = CommandHistory::default();
        let (_, out) = history.execute(&mut store, hline(1.0)).unwrap();
        let id = created_id(&out);
        history
            .execute(&mut store, UpdateCommand::move_points(id, vec![pt(0, 7.0)]).into())
            .unwrap();
        let after = store.snapshot();

        history.undo(&mut store).unwrap();
        history.redo(&mut store).unwrap();
        assert!(store.content_eq(&after));

        history.undo(&mut store).unwrap();
        history.undo(&mut store).unwrap();
        history.redo(&mut store).unwrap();
        history.redo(&mut store).unwrap();
        assert!(store.content_eq(&after));
    }

    #[test]
    fn test_execute_clears_redo() {
        let mut store = ShapeStore::new();
        let mut history = CommandHistory::default();
        history.execute(&mut store, hline(1.0)).unwrap();
        history.undo(&mut store).unwrap();
        assert!(history.can_redo());

        history.execute(&mut store, hline(2.0)).unwrap();
        assert!(!history.can_redo());
        assert_eq!(history.redo(&mut store), Err(CommandError::NothingToRedo));
    }

    #[test]
    fn test_non_undoable_still_clears_redo() {
        let mut store = ShapeStore::new();
        let mut history = CommandHistory::default();
        history.execute(&mut store, hline(1.0)).unwrap();
        history.undo(&mut store).unwrap();

        history.execute(&mut store, hline(2.0).non_undoable()).unwrap();
        assert!(!history.can_redo());
        assert!(!history.can_undo());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_empty_stacks() {
        let mut store = ShapeStore::new();
        let mut history = CommandHistory::default();
        assert_eq!(history.undo(&mut store), Err(CommandError::NothingToUndo));
        assert_eq!(history.redo(&mut store), Err(CommandError::NothingToRedo));
    }

    #[test]
    fn test_invalid_command_not_recorded() {
        let mut store = ShapeStore::new();
        let mut history = CommandHistory::default();
        let bad: Command = CreateCommand::new(ShapeKind::Trendline, vec![pt(0, 1.0)], None).into();
        assert!(history.execute(&mut store, bad).is_err());
        assert!(!history.can_undo());
        assert!(store.is_empty());
    }

    #[test]
    fn test_max_history_evicts_oldest() {
        let mut store = ShapeStore::new();
        let mut history = CommandHistory::new(3);
        for i in 0..5 {
            history.execute(&mut store, hline(i as f64)).unwrap();
        }
        assert_eq!(history.undo_len(), 3);
        for _ in 0..3 {
            history.undo(&mut store).unwrap();
        }
        assert_eq!(history.undo(&mut store), Err(CommandError::NothingToUndo));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_ids_increase_and_labels() {
        let mut store = ShapeStore::new();
        let mut history = CommandHistory::default();
        let (a, _) = history.execute(&mut store, hline(1.0)).unwrap();
        let (b, _) = history.execute(&mut store, hline(2.0)).unwrap();
        assert!(b > a);
        assert_eq!(history.get(b).and_then(Command::id), Some(b));
        assert_eq!(history.undo_label().as_deref(), Some("Create horizontal"));
        history.undo(&mut store).unwrap();
        assert_eq!(history.redo_label().as_deref(), Some("Create horizontal"));
    }

    #[test]
    fn test_clear() {
        let mut store = ShapeStore::new();
        let mut history = CommandHistory::default();
        history.execute(&mut store, hline(1.0)).unwrap();
        history.clear();
        assert!(!history.can_undo());
        assert_eq!(store.len(), 1);
    }
}
