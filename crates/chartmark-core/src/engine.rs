//! The chart engine: store, history, interaction and renderer bridge in one place.

use crate::bridge::{ChartRenderer, CoordinateBridge};
use crate::commands::{
    Command, CommandError, CommandHistory, CommandId, CommandOutcome, CreateCommand, DeleteCommand,
    ShapeUpdate, UpdateCommand,
};
use crate::config::{ConfigError, EngineConfig};
use crate::events::{EngineEvent, EventDispatcher, EventFilter, SubscriptionId};
use crate::input::{HistoryKey, InputEvent, KeyEvent, PointerEvent};
use crate::interaction::{Action, Interaction, Preview};
use crate::series::{Bar, DataSeries};
use crate::shapes::{Shape, ShapeId, ShapeKind, StylePatch};
use crate::storage::retain_valid;
use crate::store::ShapeStore;
use serde::{Deserialize, Serialize};

/// Context-menu actions on a single shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "style", rename_all = "camelCase")]
pub enum MenuAction {
    Delete,
    /// Copy placed on top of everything and selected.
    Duplicate,
    BringToFront,
    SendToBack,
    ToggleLock,
    ToggleVisible,
    SetStyle(StylePatch),
}

/// The annotation engine for one chart.
pub struct ChartEngine<R> {
    store: ShapeStore,
    history: CommandHistory,
    interaction: Interaction,
    bridge: CoordinateBridge<R>,
    config: EngineConfig,
    events: EventDispatcher,
    /// Bumped on every change to the stored shapes.
    revision: u64,
}

impl<R: ChartRenderer> ChartEngine<R> {
    /// Create an engine around a renderer.
    pub fn new(renderer: R, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            store: ShapeStore::new(),
            history: CommandHistory::new(config.max_history),
            interaction: Interaction::new(&config),
            bridge: CoordinateBridge::new(renderer),
            config,
            events: EventDispatcher::new(),
            revision: 0,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Swap the configuration. Shapes and history are kept.
    pub fn set_config(&mut self, config: EngineConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.interaction.configure(&config);
        self.history.set_max_history(config.max_history);
        self.config = config;
        self.emit_history();
        Ok(())
    }

    pub fn store(&self) -> &ShapeStore {
        &self.store
    }

    /// Shapes back to front.
    pub fn shapes(&self) -> Vec<&Shape> {
        self.store.shapes_ordered()
    }

    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.store.get(id)
    }

    /// Owned copy of all shapes, for saving.
    pub fn snapshot(&self) -> Vec<Shape> {
        self.store.snapshot()
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn bridge(&self) -> &CoordinateBridge<R> {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut CoordinateBridge<R> {
        &mut self.bridge
    }

    pub fn selection(&self) -> Option<ShapeId> {
        self.interaction.selection()
    }

    pub fn tool(&self) -> Option<ShapeKind> {
        self.interaction.tool()
    }

    pub fn preview(&self) -> Option<Preview> {
        self.interaction.preview()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // --- events ---

    pub fn subscribe(
        &mut self,
        filter: EventFilter,
        listener: impl FnMut(&EngineEvent) + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(filter, listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Take every event dispatched since the last drain.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.events.drain()
    }

    fn emit(&mut self, event: EngineEvent) {
        self.events.dispatch(event);
    }

    fn emit_history(&mut self) {
        self.emit(EngineEvent::HistoryChanged {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        });
    }

    // --- renderer and data ---

    /// The renderer has painted; input is accepted from now on.
    pub fn on_ready(&mut self) {
        self.bridge.on_ready();
        self.emit(EngineEvent::RenderRequested);
    }

    /// The renderer is resizing or going away; input is ignored until ready.
    pub fn suspend(&mut self) {
        self.bridge.suspend();
    }

    pub fn set_series(&mut self, series: DataSeries) {
        log::debug!("series replaced ({} bars)", series.len());
        self.bridge.set_series(series);
        self.emit(EngineEvent::RenderRequested);
    }

    pub fn push_bar(&mut self, bar: Bar) {
        self.bridge.push_bar(bar);
        self.emit(EngineEvent::RenderRequested);
    }

    // --- input ---

    pub fn handle_input(&mut self, event: InputEvent) {
        match event {
            InputEvent::Pointer(event) => self.handle_pointer(event),
            InputEvent::Key(event) => self.handle_key(&event),
        }
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) {
        let actions = self.interaction.handle_pointer(event, &self.store, &self.bridge);
        self.apply(actions);
    }

    pub fn handle_key(&mut self, event: &KeyEvent) {
        match event.history() {
            Some(HistoryKey::Undo) => {
                // An empty stack is not worth reporting from a key press.
                let _ = self.undo();
            }
            Some(HistoryKey::Redo) => {
                let _ = self.redo();
            }
            None => {
                let actions = self.interaction.handle_key(event);
                self.apply(actions);
            }
        }
    }

    /// Choose a drawing tool, or `None` for selection mode.
    pub fn select_tool(&mut self, tool: Option<ShapeKind>) {
        let actions = self.interaction.select_tool(tool);
        self.apply(actions);
    }

    /// Select a shape programmatically. Unknown ids clear the selection.
    pub fn select(&mut self, shape_id: Option<ShapeId>) {
        let shape_id = shape_id.filter(|id| self.store.contains(*id));
        let actions = self.interaction.select(shape_id);
        self.apply(actions);
    }

    fn apply(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                // Failures are already logged and reported as events.
                Action::Execute(command) => {
                    let _ = self.execute_command(command);
                }
                Action::Emit(event) => self.emit(event),
            }
        }
    }

    // --- commands ---

    /// Execute a command through the history.
    pub fn execute(&mut self, command: Command) -> Result<CommandId, CommandError> {
        self.execute_command(command).map(|(id, _)| id)
    }

    fn execute_command(
        &mut self,
        command: Command,
    ) -> Result<(CommandId, CommandOutcome), CommandError> {
        let label = command.label();
        let mut before = self.capture(&command.affected_shapes());
        match self.history.execute(&mut self.store, command) {
            Ok((id, outcome)) => {
                // Created shapes were not known up front.
                for shape_id in outcome_shape_ids(&outcome) {
                    if !before.iter().any(|(known, _)| *known == shape_id) {
                        before.push((shape_id, None));
                    }
                }
                self.after_change(before);
                Ok((id, outcome))
            }
            Err(e) => {
                self.reject(&label, &e);
                Err(e)
            }
        }
    }

    /// Undo the most recent command.
    pub fn undo(&mut self) -> Result<CommandId, CommandError> {
        let actions = self.interaction.cancel_gesture();
        self.apply(actions);

        let ids = self.history.next_undo().map(Command::affected_shapes).unwrap_or_default();
        let before = self.capture(&ids);
        match self.history.undo(&mut self.store) {
            Ok(id) => {
                log::debug!("undid {id:?}");
                self.after_change(before);
                Ok(id)
            }
            Err(e) => {
                self.history_failure("undo", &e);
                Err(e)
            }
        }
    }

    /// Redo the most recently undone command.
    pub fn redo(&mut self) -> Result<CommandId, CommandError> {
        let actions = self.interaction.cancel_gesture();
        self.apply(actions);

        let ids = self.history.next_redo().map(Command::affected_shapes).unwrap_or_default();
        let before = self.capture(&ids);
        match self.history.redo(&mut self.store) {
            Ok((id, _)) => {
                log::debug!("redid {id:?}");
                self.after_change(before);
                Ok(id)
            }
            Err(e) => {
                self.history_failure("redo", &e);
                Err(e)
            }
        }
    }

    /// Patch a shape's style.
    pub fn update_style(
        &mut self,
        shape_id: ShapeId,
        style: StylePatch,
    ) -> Result<CommandId, CommandError> {
        self.execute(UpdateCommand::restyle(shape_id, style).into())
    }

    /// Delete a shape. Locked shapes can be deleted.
    pub fn delete_shape(&mut self, shape_id: ShapeId) -> Result<CommandId, CommandError> {
        self.execute(DeleteCommand::new(shape_id).into())
    }

    /// Run a context-menu action. Returns `None` when the action changes nothing.
    pub fn apply_menu_action(
        &mut self,
        shape_id: ShapeId,
        action: MenuAction,
    ) -> Result<Option<CommandId>, CommandError> {
        let Some(shape) = self.store.get(shape_id).cloned() else {
            return Err(self.reject_menu(CommandError::NotFound(shape_id)));
        };
        let above = self.store.max_z().checked_add(1);
        let below = self.store.min_z().checked_sub(1);

        let update = |patch: ShapeUpdate| Command::from(UpdateCommand::new(shape_id, patch));
        let command = match action {
            MenuAction::Delete => DeleteCommand::new(shape_id).into(),
            MenuAction::Duplicate => {
                let Some(top) = above else {
                    return Err(self.reject_menu(CommandError::ZOrderExhausted(shape_id)));
                };
                let copy = CreateCommand::duplicate(&shape, 0, 0.0).with_z_index(top);
                let (id, outcome) = self.execute_command(copy.into())?;
                let created = outcome.shape().map(Shape::id);
                self.select(created);
                return Ok(Some(id));
            }
            MenuAction::BringToFront => {
                if self.store.topmost_first().first().map(|s| s.id()) == Some(shape_id) {
                    return Ok(None);
                }
                let Some(top) = above else {
                    return Err(self.reject_menu(CommandError::ZOrderExhausted(shape_id)));
                };
                update(ShapeUpdate {
                    z_index: Some(top),
                    ..ShapeUpdate::default()
                })
            }
            MenuAction::SendToBack => {
                if self.store.shapes_ordered().first().map(|s| s.id()) == Some(shape_id) {
                    return Ok(None);
                }
                let Some(bottom) = below else {
                    return Err(self.reject_menu(CommandError::ZOrderExhausted(shape_id)));
                };
                update(ShapeUpdate {
                    z_index: Some(bottom),
                    ..ShapeUpdate::default()
                })
            }
            MenuAction::ToggleLock => update(ShapeUpdate {
                locked: Some(!shape.locked),
                ..ShapeUpdate::default()
            }),
            MenuAction::ToggleVisible => {
                let hiding = shape.visible;
                let id = self.execute(update(ShapeUpdate {
                    visible: Some(!hiding),
                    ..ShapeUpdate::default()
                }))?;
                if hiding && self.selection() == Some(shape_id) {
                    self.select(None);
                }
                return Ok(Some(id));
            }
            MenuAction::SetStyle(style) => UpdateCommand::restyle(shape_id, style).into(),
        };
        self.execute(command).map(Some)
    }

    // --- persistence ---

    /// Replace all shapes with ones loaded from storage.
    ///
    /// Invalid shapes are skipped. History and interaction state are reset.
    /// Returns the number of shapes mounted.
    pub fn mount(&mut self, shapes: Vec<Shape>) -> usize {
        let shapes = retain_valid(shapes);
        let actions = self.interaction.reset();
        self.apply(actions);

        self.store.reset(shapes);
        self.history.clear();
        self.revision += 1;
        let count = self.store.len();
        log::info!("mounted {count} shape(s)");

        self.emit(EngineEvent::ShapesLoaded { count });
        self.emit_history();
        self.emit(EngineEvent::RenderRequested);
        count
    }

    /// Current shapes as JSON, in insertion order.
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.store.snapshot())
    }

    /// Mount shapes from JSON produced by [`ChartEngine::export_json`].
    pub fn import_json(&mut self, json: &str) -> Result<usize, serde_json::Error> {
        let shapes: Vec<Shape> = serde_json::from_str(json)?;
        Ok(self.mount(shapes))
    }

    // --- change bookkeeping ---

    fn capture(&self, ids: &[ShapeId]) -> Vec<(ShapeId, Option<Shape>)> {
        let mut captured: Vec<(ShapeId, Option<Shape>)> = Vec::with_capacity(ids.len());
        for id in ids {
            if !captured.iter().any(|(known, _)| known == id) {
                captured.push((*id, self.store.get(*id).cloned()));
            }
        }
        captured
    }

    fn after_change(&mut self, before: Vec<(ShapeId, Option<Shape>)>) {
        let mut changed = false;
        for (id, old) in before {
            let event = match (old, self.store.get(id)) {
                (None, Some(now)) => EngineEvent::ShapeCreated { shape: now.clone() },
                (Some(_), None) => EngineEvent::ShapeDeleted { shape_id: id },
                (Some(old), Some(now)) if old != *now => EngineEvent::ShapeUpdated {
                    shape: now.clone(),
                },
                _ => continue,
            };
            changed = true;
            self.emit(event);
        }
        if changed {
            self.revision += 1;
        }
        self.emit_history();

        let actions = self.interaction.reconcile(&self.store);
        self.apply(actions);
        self.emit(EngineEvent::RenderRequested);
    }

    fn reject(&mut self, what: &str, error: &CommandError) {
        log::warn!("{what} rejected: {error}");
        self.emit(EngineEvent::CommandRejected {
            reason: error.to_string(),
        });
    }

    fn reject_menu(&mut self, error: CommandError) -> CommandError {
        self.reject("menu action", &error);
        error
    }

    fn history_failure(&mut self, what: &str, error: &CommandError) {
        match error {
            CommandError::NothingToUndo | CommandError::NothingToRedo => {
                log::debug!("{what}: {error}")
            }
            _ => {
                self.reject(what, error);
                self.emit_history();
            }
        }
    }
}

fn outcome_shape_ids(outcome: &CommandOutcome) -> Vec<ShapeId> {
    match outcome {
        CommandOutcome::Shape(shape) => vec![shape.id()],
        CommandOutcome::Deleted(_) => Vec::new(),
        CommandOutcome::Batch(children) => children.iter().flat_map(outcome_shape_ids).collect(),
    }
}
