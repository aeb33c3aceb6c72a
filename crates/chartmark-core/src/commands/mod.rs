//! Undoable commands over the shape store.
//!
//! Every mutation of [`ShapeStore`] is a [`Command`]: validated, then
//! executed, and recorded by [`CommandHistory`] so it can be undone and
//! redone. Commands capture whatever "before" state they need when they
//! execute.

mod batch;
mod create;
mod delete;
mod history;
mod update;

pub use batch::BatchCommand;
pub use create::CreateCommand;
pub use delete::DeleteCommand;
pub use history::{CommandHistory, DEFAULT_MAX_HISTORY};
pub use update::{ShapeUpdate, UpdateCommand};

use crate::shapes::{Shape, ShapeId};
use crate::store::ShapeStore;
use crate::tools::ValidationError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier assigned by [`CommandHistory`] when a command executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommandId(pub u64);

/// Discriminant of a [`Command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    Create,
    Update,
    Delete,
    Batch,
}

/// Data common to all commands.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandMeta {
    /// Set once the command has been executed through a history.
    pub id: Option<CommandId>,
    /// Whether the history records this command for undo.
    pub can_undo: bool,
}

impl Default for CommandMeta {
    fn default() -> Self {
        Self {
            id: None,
            can_undo: true,
        }
    }
}

/// Result of executing or redoing a command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// The created or updated shape.
    Shape(Shape),
    /// Whether a delete actually removed something.
    Deleted(bool),
    /// Outcomes of a batch's children, in execution order.
    Batch(Vec<CommandOutcome>),
}

impl CommandOutcome {
    /// The shape, for create/update outcomes.
    pub fn shape(&self) -> Option<&Shape> {
        match self {
            CommandOutcome::Shape(shape) => Some(shape),
            _ => None,
        }
    }
}

/// Command failures. None of these leave the store half-modified.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("shape {0} not found")]
    NotFound(ShapeId),
    #[error("shape {0} already exists")]
    AlreadyExists(ShapeId),
    #[error("shape {0} is locked")]
    Locked(ShapeId),
    #[error("no z-index left to move shape {0} to")]
    ZOrderExhausted(ShapeId),
    #[error("update for shape {0} changes nothing")]
    EmptyUpdate(ShapeId),
    #[error("batch is empty")]
    EmptyBatch,
    #[error("batch aborted at child {index}: {source}")]
    BatchAborted {
        index: usize,
        source: Box<CommandError>,
    },
    #[error("command has not been executed")]
    NotExecuted,
    #[error("command was already executed")]
    AlreadyExecuted,
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("nothing to redo")]
    NothingToRedo,
}

/// A reversible mutation of the shape store.
#[derive(Debug, Clone)]
pub enum Command {
    Create(CreateCommand),
    Update(UpdateCommand),
    Delete(DeleteCommand),
    Batch(BatchCommand),
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Create(_) => CommandKind::Create,
            Command::Update(_) => CommandKind::Update,
            Command::Delete(_) => CommandKind::Delete,
            Command::Batch(_) => CommandKind::Batch,
        }
    }

    pub fn meta(&self) -> &CommandMeta {
        match self {
            Command::Create(c) => &c.meta,
            Command::Update(c) => &c.meta,
            Command::Delete(c) => &c.meta,
            Command::Batch(c) => &c.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut CommandMeta {
        match self {
            Command::Create(c) => &mut c.meta,
            Command::Update(c) => &mut c.meta,
            Command::Delete(c) => &mut c.meta,
            Command::Batch(c) => &mut c.meta,
        }
    }

    pub fn id(&self) -> Option<CommandId> {
        self.meta().id
    }

    pub fn can_undo(&self) -> bool {
        self.meta().can_undo
    }

    /// Mark the command as not recorded in undo history.
    pub fn non_undoable(mut self) -> Self {
        self.meta_mut().can_undo = false;
        self
    }

    /// Human-readable label for history UIs.
    pub fn label(&self) -> String {
        match self {
            Command::Create(c) => format!("Create {}", c.kind().name()),
            Command::Update(_) => "Edit shape".to_string(),
            Command::Delete(_) => "Delete shape".to_string(),
            Command::Batch(c) => c.label().to_string(),
        }
    }

    /// Check the command against the current store. No mutation.
    pub fn validate(&self, store: &ShapeStore) -> Result<(), CommandError> {
        match self {
            Command::Create(c) => c.validate(store),
            Command::Update(c) => c.validate(store),
            Command::Delete(c) => c.validate(store),
            Command::Batch(c) => c.validate(store),
        }
    }

    /// Apply the command, capturing undo state.
    pub fn execute(&mut self, store: &mut ShapeStore) -> Result<CommandOutcome, CommandError> {
        match self {
            Command::Create(c) => c.execute(store),
            Command::Update(c) => c.execute(store),
            Command::Delete(c) => c.execute(store),
            Command::Batch(c) => c.execute(store),
        }
    }

    /// Reverse a previous execute/redo.
    pub fn undo(&mut self, store: &mut ShapeStore) -> Result<(), CommandError> {
        match self {
            Command::Create(c) => c.undo(store),
            Command::Update(c) => c.undo(store),
            Command::Delete(c) => c.undo(store),
            Command::Batch(c) => c.undo(store),
        }
    }

    /// Re-apply after an undo.
    pub fn redo(&mut self, store: &mut ShapeStore) -> Result<CommandOutcome, CommandError> {
        match self {
            Command::Create(c) => c.redo(store),
            Command::Update(c) => c.redo(store),
            Command::Delete(c) => c.redo(store),
            Command::Batch(c) => c.redo(store),
        }
    }

    /// Shapes this command touches (for change notifications).
    pub fn affected_shapes(&self) -> Vec<ShapeId> {
        match self {
            Command::Create(c) => c.shape_id().into_iter().collect(),
            Command::Update(c) => vec![c.shape_id()],
            Command::Delete(c) => vec![c.shape_id()],
            Command::Batch(c) => c.children().iter().flat_map(Command::affected_shapes).collect(),
        }
    }
}

impl From<CreateCommand> for Command {
    fn from(c: CreateCommand) -> Self {
        Command::Create(c)
    }
}

impl From<UpdateCommand> for Command {
    fn from(c: UpdateCommand) -> Self {
        Command::Update(c)
    }
}

impl From<DeleteCommand> for Command {
    fn from(c: DeleteCommand) -> Self {
        Command::Delete(c)
    }
}

impl From<BatchCommand> for Command {
    fn from(c: BatchCommand) -> Self {
        Command::Batch(c)
    }
}
