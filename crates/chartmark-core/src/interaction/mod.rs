//! Pointer and keyboard interaction state machine.
//!
//! Drawing and manipulation are tracked independently:
//!
//! - drawing: `Idle -> ToolArmed -> Placing -> Idle` (or back to
//!   `ToolArmed` when tools are sticky)
//! - manipulation: `Idle <-> Selected <-> Armed -> Dragging -> Selected`
//!
//! Handlers never touch the store. They return [`Action`]s which the
//! engine executes through the command history, so the in-progress shape
//! and the drag preview are never visible to undo/redo.

mod throttle;

pub use throttle::MoveThrottle;

use crate::bridge::{ChartRenderer, CoordinateBridge};
use crate::commands::{Command, CreateCommand, DeleteCommand, UpdateCommand};
use crate::config::EngineConfig;
use crate::events::EngineEvent;
use crate::input::{KeyEvent, MouseButton, PointerEvent};
use crate::selection::{self, DragState};
use crate::shapes::{ChartPoint, ShapeId, ShapeKind, ShapeStyle};
use crate::store::ShapeStore;
use kurbo::Point;
use serde::Serialize;

/// What the engine should do in response to an input.
#[derive(Debug, Clone)]
pub enum Action {
    /// Run through the command history.
    Execute(Command),
    /// Forward to listeners.
    Emit(EngineEvent),
}

/// Drawing progress.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawState {
    Idle,
    /// A tool is selected; the next click places the first point.
    ToolArmed(ShapeKind),
    /// First point placed, waiting for the second.
    Placing {
        kind: ShapeKind,
        first: ChartPoint,
        /// Last pointer position, for the preview.
        hover: Option<ChartPoint>,
    },
}

/// Manipulation progress.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gesture {
    #[default]
    None,
    /// Button is down on a shape but has not moved past the threshold.
    Armed(DragState),
    /// Moving a shape; `points` is the uncommitted preview.
    Dragging {
        drag: DragState,
        points: Vec<ChartPoint>,
    },
}

/// Uncommitted geometry to draw on top of the stored shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Preview {
    Drawing {
        kind: ShapeKind,
        points: Vec<ChartPoint>,
    },
    Drag {
        shape_id: ShapeId,
        points: Vec<ChartPoint>,
    },
}

/// Interaction settings taken from [`EngineConfig`].
#[derive(Debug, Clone, PartialEq)]
struct Settings {
    hit_tolerance: f64,
    handle_tolerance: f64,
    drag_threshold: f64,
    keep_tool_after_draw: bool,
    default_style: ShapeStyle,
}

impl From<&EngineConfig> for Settings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            hit_tolerance: config.hit_tolerance,
            handle_tolerance: config.handle_tolerance,
            drag_threshold: config.drag_threshold,
            keep_tool_after_draw: config.keep_tool_after_draw,
            default_style: config.default_style.clone(),
        }
    }
}

/// The single authoritative interaction state.
#[derive(Debug, Clone)]
pub struct Interaction {
    draw: DrawState,
    gesture: Gesture,
    selection: Option<ShapeId>,
    button_held: bool,
    /// Swallow the click the host fires after a completed drag.
    suppress_click: bool,
    throttle: MoveThrottle,
    settings: Settings,
}

impl Default for Interaction {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

fn emit(event: EngineEvent) -> Action {
    Action::Emit(event)
}

impl Interaction {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            draw: DrawState::Idle,
            gesture: Gesture::None,
            selection: None,
            button_held: false,
            suppress_click: false,
            throttle: MoveThrottle::new(config.move_throttle_ms),
            settings: Settings::from(config),
        }
    }

    /// Apply a new configuration. In-flight state is kept.
    pub fn configure(&mut self, config: &EngineConfig) {
        self.settings = Settings::from(config);
        self.throttle = MoveThrottle::new(config.move_throttle_ms);
    }

    pub fn draw_state(&self) -> &DrawState {
        &self.draw
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn selection(&self) -> Option<ShapeId> {
        self.selection
    }

    /// The active drawing tool, if any.
    pub fn tool(&self) -> Option<ShapeKind> {
        match self.draw {
            DrawState::Idle => None,
            DrawState::ToolArmed(kind) | DrawState::Placing { kind, .. } => Some(kind),
        }
    }

    pub fn is_placing(&self) -> bool {
        matches!(self.draw, DrawState::Placing { .. })
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.gesture, Gesture::Dragging { .. })
    }

    /// Uncommitted drawing or drag to render.
    pub fn preview(&self) -> Option<Preview> {
        if let Gesture::Dragging { drag, points } = &self.gesture {
            return Some(Preview::Drag {
                shape_id: drag.shape_id,
                points: points.clone(),
            });
        }
        match &self.draw {
            DrawState::Placing { kind, first, hover } => Some(Preview::Drawing {
                kind: *kind,
                points: std::iter::once(*first).chain(*hover).collect(),
            }),
            _ => None,
        }
    }

    /// Dispatch a pointer event.
    pub fn handle_pointer<R: ChartRenderer>(
        &mut self,
        event: PointerEvent,
        store: &ShapeStore,
        bridge: &CoordinateBridge<R>,
    ) -> Vec<Action> {
        match event {
            PointerEvent::Down {
                position, button, ..
            } => self.pointer_down(position, button, store, bridge),
            PointerEvent::Move { position, time_ms } => {
                self.pointer_move(position, time_ms, bridge)
            }
            PointerEvent::Up { position, button, .. } => self.pointer_up(position, button, bridge),
            PointerEvent::Click { position, .. } => self.click(position, store, bridge),
            PointerEvent::ContextMenu { position, .. } => {
                self.context_menu(position, store, bridge)
            }
        }
    }

    /// Choose a drawing tool, or `None` to return to selection.
    pub fn select_tool(&mut self, tool: Option<ShapeKind>) -> Vec<Action> {
        if self.tool() == tool && !self.is_placing() {
            return Vec::new();
        }
        let mut actions = self.cancel_gesture();
        actions.extend(self.set_selection(None));
        self.draw = match tool {
            Some(kind) => DrawState::ToolArmed(kind),
            None => DrawState::Idle,
        };
        log::debug!("tool changed to {:?}", tool);
        actions.push(emit(EngineEvent::ToolChanged { tool }));
        actions.push(emit(EngineEvent::RenderRequested));
        actions
    }

    /// Select a shape (or clear with `None`).
    pub fn select(&mut self, shape_id: Option<ShapeId>) -> Vec<Action> {
        let mut actions = self.set_selection(shape_id);
        if !actions.is_empty() {
            actions.push(emit(EngineEvent::RenderRequested));
        }
        actions
    }

    fn set_selection(&mut self, shape_id: Option<ShapeId>) -> Vec<Action> {
        if self.selection == shape_id {
            return Vec::new();
        }
        self.selection = shape_id;
        vec![emit(EngineEvent::SelectionChanged { shape_id })]
    }

    fn pointer_down<R: ChartRenderer>(
        &mut self,
        position: Point,
        button: MouseButton,
        store: &ShapeStore,
        bridge: &CoordinateBridge<R>,
    ) -> Vec<Action> {
        if button != MouseButton::Left {
            return Vec::new();
        }
        self.button_held = true;
        self.suppress_click = false;

        // Placement happens on click; presses with a tool active do nothing.
        if self.draw != DrawState::Idle {
            return Vec::new();
        }
        if bridge.pixel_to_point(position).is_none() {
            return Vec::new();
        }

        let hit = selection::hit_shape(
            store,
            bridge,
            position,
            self.settings.hit_tolerance,
            self.settings.handle_tolerance,
        );
        let Some(hit) = hit else {
            return self.select(None);
        };
        let Some(shape) = store.get(hit.shape_id) else {
            return Vec::new();
        };

        let actions = self.select(Some(hit.shape_id));
        if shape.locked {
            log::debug!("shape {} is locked; not arming drag", hit.shape_id);
        } else {
            self.gesture = Gesture::Armed(DragState::new(hit, position, shape.points().to_vec()));
        }
        actions
    }

    fn pointer_move<R: ChartRenderer>(
        &mut self,
        position: Point,
        time_ms: f64,
        bridge: &CoordinateBridge<R>,
    ) -> Vec<Action> {
        let pressed = self.button_held || self.gesture != Gesture::None;
        if !self.throttle.should_process(time_ms, pressed) {
            return Vec::new();
        }

        match std::mem::take(&mut self.gesture) {
            Gesture::Armed(drag) => {
                if !drag.exceeds_threshold(position, self.settings.drag_threshold) {
                    self.gesture = Gesture::Armed(drag);
                    return Vec::new();
                }
                match drag.dragged_points(bridge, position) {
                    Some(points) => {
                        let shape_id = drag.shape_id;
                        log::debug!("drag started on {shape_id} ({:?})", drag.handle);
                        self.gesture = Gesture::Dragging { drag, points };
                        vec![
                            emit(EngineEvent::DragStarted { shape_id }),
                            emit(EngineEvent::RenderRequested),
                        ]
                    }
                    None => {
                        self.gesture = Gesture::Armed(drag);
                        Vec::new()
                    }
                }
            }
            Gesture::Dragging { drag, points } => {
                let moved = drag.dragged_points(bridge, position);
                let changed = moved.is_some();
                self.gesture = Gesture::Dragging {
                    points: moved.unwrap_or(points),
                    drag,
                };
                if changed {
                    vec![emit(EngineEvent::RenderRequested)]
                } else {
                    Vec::new()
                }
            }
            Gesture::None => {
                let DrawState::Placing { hover, .. } = &mut self.draw else {
                    return Vec::new();
                };
                match bridge.pixel_to_point(position) {
                    Some(point) => {
                        *hover = Some(point);
                        vec![emit(EngineEvent::RenderRequested)]
                    }
                    None => Vec::new(),
                }
            }
        }
    }

    fn pointer_up<R: ChartRenderer>(
        &mut self,
        position: Point,
        button: MouseButton,
        bridge: &CoordinateBridge<R>,
    ) -> Vec<Action> {
        if button != MouseButton::Left {
            return Vec::new();
        }
        self.button_held = false;

        match std::mem::take(&mut self.gesture) {
            Gesture::Dragging { drag, points } => {
                self.suppress_click = true;
                // Off-grid release keeps the last valid preview.
                let points = drag.dragged_points(bridge, position).unwrap_or(points);
                let mut actions = Vec::new();
                if points != drag.original_points {
                    log::debug!("drag committed on {}", drag.shape_id);
                    let command = UpdateCommand::move_points(drag.shape_id, points);
                    actions.push(Action::Execute(command.into()));
                }
                actions.push(emit(EngineEvent::RenderRequested));
                actions
            }
            // Never passed the threshold: a plain click.
            Gesture::Armed(_) | Gesture::None => Vec::new(),
        }
    }

    fn click<R: ChartRenderer>(
        &mut self,
        position: Point,
        store: &ShapeStore,
        bridge: &CoordinateBridge<R>,
    ) -> Vec<Action> {
        if std::mem::take(&mut self.suppress_click) {
            return Vec::new();
        }
        let Some(point) = bridge.pixel_to_point(position) else {
            return Vec::new();
        };

        match self.draw.clone() {
            DrawState::ToolArmed(kind) if kind.required_points() == 1 => {
                self.finish_drawing(kind, vec![point])
            }
            DrawState::ToolArmed(kind) => {
                self.draw = DrawState::Placing {
                    kind,
                    first: point,
                    hover: None,
                };
                vec![emit(EngineEvent::RenderRequested)]
            }
            DrawState::Placing { kind, first, .. } => self.finish_drawing(kind, vec![first, point]),
            DrawState::Idle => {
                let hit = selection::hit_shape(
                    store,
                    bridge,
                    position,
                    self.settings.hit_tolerance,
                    self.settings.handle_tolerance,
                );
                // Clicking the selected shape again is a no-op; drags only
                // arm from a real pointer-down.
                self.select(hit.map(|h| h.shape_id))
            }
        }
    }

    fn finish_drawing(&mut self, kind: ShapeKind, points: Vec<ChartPoint>) -> Vec<Action> {
        let command = CreateCommand::new(kind, points, None)
            .with_base_style(self.settings.default_style.clone());
        let mut actions = vec![Action::Execute(command.into())];
        if self.settings.keep_tool_after_draw {
            self.draw = DrawState::ToolArmed(kind);
        } else {
            self.draw = DrawState::Idle;
            actions.push(emit(EngineEvent::ToolChanged { tool: None }));
        }
        actions.push(emit(EngineEvent::RenderRequested));
        actions
    }

    fn context_menu<R: ChartRenderer>(
        &mut self,
        position: Point,
        store: &ShapeStore,
        bridge: &CoordinateBridge<R>,
    ) -> Vec<Action> {
        // Reset drawing, press/drag state and selection first so the menu
        // never opens over a half-drawn shape or one still mid-drag.
        self.button_held = false;
        self.suppress_click = false;
        let mut actions = self.cancel_placing().unwrap_or_default();
        actions.extend(self.cancel_gesture());
        actions.extend(self.set_selection(None));

        let hit = selection::hit_shape(
            store,
            bridge,
            position,
            self.settings.hit_tolerance,
            self.settings.handle_tolerance,
        );
        actions.push(emit(EngineEvent::RenderRequested));
        if let Some(hit) = hit {
            actions.push(emit(EngineEvent::ContextMenuRequested {
                shape_id: hit.shape_id,
                x: position.x,
                y: position.y,
            }));
        }
        actions
    }

    /// Handle Escape and Delete/Backspace. Other keys are ignored.
    pub fn handle_key(&mut self, event: &KeyEvent) -> Vec<Action> {
        if event.is_escape() {
            return self.escape();
        }
        if event.is_delete() {
            let Some(shape_id) = self.selection else {
                return Vec::new();
            };
            let mut actions = self.cancel_gesture();
            actions.push(Action::Execute(DeleteCommand::new(shape_id).into()));
            return actions;
        }
        Vec::new()
    }

    /// Abandon a drawing whose first point is placed.
    fn cancel_placing(&mut self) -> Option<Vec<Action>> {
        let DrawState::Placing { kind, .. } = self.draw else {
            return None;
        };
        log::debug!("cancelled {} drawing", kind.name());
        self.draw = DrawState::Idle;
        Some(vec![
            emit(EngineEvent::DrawingCancelled),
            emit(EngineEvent::ToolChanged { tool: None }),
            emit(EngineEvent::RenderRequested),
        ])
    }

    fn escape(&mut self) -> Vec<Action> {
        if let Some(actions) = self.cancel_placing() {
            return actions;
        }
        if self.gesture != Gesture::None {
            self.button_held = false;
            return self.cancel_gesture();
        }
        if let DrawState::ToolArmed(_) = self.draw {
            self.draw = DrawState::Idle;
            return vec![emit(EngineEvent::ToolChanged { tool: None })];
        }
        self.select(None)
    }

    /// Drop any armed or active drag without committing.
    pub fn cancel_gesture(&mut self) -> Vec<Action> {
        match std::mem::take(&mut self.gesture) {
            Gesture::Dragging { drag, .. } => {
                log::debug!("drag on {} cancelled", drag.shape_id);
                vec![emit(EngineEvent::RenderRequested)]
            }
            Gesture::Armed(_) | Gesture::None => Vec::new(),
        }
    }

    /// Drop state that refers to shapes no longer in the store.
    pub fn reconcile(&mut self, store: &ShapeStore) -> Vec<Action> {
        let mut actions = Vec::new();
        let gesture_target = match &self.gesture {
            Gesture::Armed(drag) | Gesture::Dragging { drag, .. } => Some(drag.shape_id),
            Gesture::None => None,
        };
        if gesture_target.is_some_and(|id| !store.contains(id)) {
            actions.extend(self.cancel_gesture());
        }
        if self.selection.is_some_and(|id| !store.contains(id)) {
            actions.extend(self.select(None));
        }
        actions
    }

    /// Forget everything (after a mount).
    pub fn reset(&mut self) -> Vec<Action> {
        let mut actions = self.cancel_gesture();
        actions.extend(self.set_selection(None));
        self.button_held = false;
        self.suppress_click = false;
        self.throttle.reset();
        if self.draw != DrawState::Idle {
            self.draw = DrawState::Idle;
            actions.push(emit(EngineEvent::ToolChanged { tool: None }));
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::tests::test_bridge;
    use crate::bridge::LinearScale;
    use crate::commands::CommandHistory;
    use crate::input::{Key, Modifiers};

    struct Harness {
        store: ShapeStore,
        history: CommandHistory,
        bridge: CoordinateBridge<LinearScale>,
        ix: Interaction,
        events: Vec<EngineEvent>,
        time: f64,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_config(EngineConfig::default())
        }

        fn with_config(config: EngineConfig) -> Self {
            Self {
                store: ShapeStore::new(),
                history: CommandHistory::default(),
                bridge: test_bridge(),
                ix: Interaction::new(&config),
                events: Vec::new(),
                time: 0.0,
            }
        }

        fn apply(&mut self, actions: Vec<Action>) {
            for action in actions {
                match action {
                    Action::Execute(command) => {
                        self.history.execute(&mut self.store, command).unwrap();
                        let follow_up = self.ix.reconcile(&self.store);
                        self.apply(follow_up);
                    }
                    Action::Emit(event) => self.events.push(event),
                }
            }
        }

        fn pointer(&mut self, event: PointerEvent) {
            let actions = self.ix.handle_pointer(event, &self.store, &self.bridge);
            self.apply(actions);
        }

        fn tick(&mut self) -> f64 {
            self.time += 20.0;
            self.time
        }

        fn down(&mut self, x: f64, y: f64) {
            let time_ms = self.tick();
            self.pointer(PointerEvent::Down {
                position: Point::new(x, y),
                button: MouseButton::Left,
                time_ms,
            });
        }

        fn move_to(&mut self, x: f64, y: f64) {
            let time_ms = self.tick();
            self.pointer(PointerEvent::Move {
                position: Point::new(x, y),
                time_ms,
            });
        }

        fn up(&mut self, x: f64, y: f64) {
            let time_ms = self.tick();
            self.pointer(PointerEvent::Up {
                position: Point::new(x, y),
                button: MouseButton::Left,
                time_ms,
            });
        }

        fn click(&mut self, x: f64, y: f64) {
            self.down(x, y);
            self.up(x, y);
            let time_ms = self.tick();
            self.pointer(PointerEvent::Click {
                position: Point::new(x, y),
                time_ms,
            });
        }

        fn key(&mut self, key: Key) {
            let actions = self.ix.handle_key(&KeyEvent::new(key, Modifiers::NONE));
            self.apply(actions);
        }

        fn tool(&mut self, kind: Option<ShapeKind>) {
            let actions = self.ix.select_tool(kind);
            self.apply(actions);
        }

        /// Trendline from (t=100, p=50) to (t=200, p=60); pixels (10,200) → (20,160).
        fn draw_trendline(&mut self) -> ShapeId {
            self.tool(Some(ShapeKind::Trendline));
            self.click(10.0, 200.0);
            self.move_to(15.0, 180.0);
            self.click(20.0, 160.0);
            self.store.iter().last().map(|s| s.id()).unwrap()
        }
    }

    #[test]
    fn test_two_point_drawing_creates_one_shape() {
        let mut h = Harness::new();
        h.tool(Some(ShapeKind::Trendline));
        h.click(10.0, 200.0);
        assert!(h.ix.is_placing());
        assert!(h.store.is_empty());

        h.move_to(15.0, 180.0);
        match h.ix.preview() {
            Some(Preview::Drawing { kind, points }) => {
                assert_eq!(kind, ShapeKind::Trendline);
                assert_eq!(points.len(), 2);
            }
            other => panic!("unexpected preview {other:?}"),
        }

        h.click(20.0, 160.0);
        assert_eq!(h.store.len(), 1);
        let shape = h.store.iter().next().unwrap();
        assert_eq!(shape.points()[0], ChartPoint::new(100, 50.0));
        assert_eq!(shape.points()[1], ChartPoint::new(200, 60.0));
        assert_eq!(h.ix.draw_state(), &DrawState::Idle);
        assert!(h.ix.preview().is_none());
        assert!(h.history.can_undo());
    }

    #[test]
    fn test_single_point_kind_finishes_on_first_click() {
        let mut h = Harness::new();
        h.tool(Some(ShapeKind::Horizontal));
        h.click(100.0, 200.0);
        assert_eq!(h.store.len(), 1);
        assert!(!h.ix.is_placing());
    }

    #[test]
    fn test_sticky_tool() {
        let mut h = Harness::with_config(EngineConfig {
            keep_tool_after_draw: true,
            ..EngineConfig::default()
        });
        h.tool(Some(ShapeKind::Vertical));
        h.click(100.0, 200.0);
        h.click(200.0, 200.0);
        assert_eq!(h.store.len(), 2);
        assert_eq!(h.ix.tool(), Some(ShapeKind::Vertical));
    }

    #[test]
    fn test_escape_discards_placing() {
        let mut h = Harness::new();
        h.tool(Some(ShapeKind::Fibonacci));
        h.click(10.0, 200.0);
        h.key(Key::Escape);
        assert_eq!(h.ix.draw_state(), &DrawState::Idle);
        assert!(h.ix.preview().is_none());
        assert!(h.store.is_empty());
        assert!(!h.history.can_undo());
        assert!(h.events.contains(&EngineEvent::DrawingCancelled));
    }

    #[test]
    fn test_click_off_grid_does_not_advance() {
        let mut h = Harness::new();
        h.tool(Some(ShapeKind::Trendline));
        h.click(900.0, 200.0);
        assert_eq!(h.ix.draw_state(), &DrawState::ToolArmed(ShapeKind::Trendline));
        h.click(10.0, 200.0);
        h.click(10.0, 900.0);
        assert!(h.ix.is_placing());
        assert!(h.store.is_empty());
    }

    #[test]
    fn test_click_selects_and_empty_click_clears() {
        let mut h = Harness::new();
        let id = h.draw_trendline();
        h.click(15.0, 180.0);
        assert_eq!(h.ix.selection(), Some(id));
        h.click(300.0, 20.0);
        assert_eq!(h.ix.selection(), None);
    }

    #[test]
    fn test_drag_threshold_four_vs_six_pixels() {
        let mut h = Harness::new();
        let id = h.draw_trendline();
        h.click(15.0, 180.0);
        h.down(20.0, 160.0);
        h.move_to(20.0, 164.0);
        assert!(matches!(h.ix.gesture(), Gesture::Armed(_)));
        h.move_to(20.0, 166.0);
        assert!(h.ix.is_dragging());
        assert!(h.events.contains(&EngineEvent::DragStarted { shape_id: id }));
    }

    #[test]
    fn test_release_without_drag_changes_nothing() {
        let mut h = Harness::new();
        h.draw_trendline();
        h.click(15.0, 180.0);
        let undo_len = h.history.undo_len();
        h.down(20.0, 160.0);
        h.move_to(22.0, 161.0);
        h.up(22.0, 161.0);
        assert_eq!(h.ix.gesture(), &Gesture::None);
        assert_eq!(h.history.undo_len(), undo_len);
    }

    #[test]
    fn test_drag_end_handle_then_undo_redo() {
        let mut h = Harness::new();
        let id = h.draw_trendline();
        h.click(15.0, 180.0);
        assert_eq!(h.ix.selection(), Some(id));

        // End handle sits at (20, 160); p = 70 is y = 120.
        h.down(20.0, 160.0);
        h.move_to(20.0, 140.0);
        assert!(matches!(h.ix.preview(), Some(Preview::Drag { .. })));
        // store untouched until release
        assert!((h.store.get(id).unwrap().points()[1].price - 60.0).abs() < 1e-9);
        h.move_to(20.0, 120.0);
        h.up(20.0, 120.0);
        assert_eq!(h.ix.selection(), Some(id));
        assert!(!h.ix.is_dragging());

        let end = |h: &Harness| h.store.get(id).unwrap().points()[1];
        let start = |h: &Harness| h.store.get(id).unwrap().points()[0];
        assert_eq!(end(&h).timestamp, 200);
        assert!((end(&h).price - 70.0).abs() < 1e-9);
        assert_eq!(start(&h), ChartPoint::new(100, 50.0));

        h.history.undo(&mut h.store).unwrap();
        assert!((end(&h).price - 60.0).abs() < 1e-9);

        h.history.redo(&mut h.store).unwrap();
        assert!((end(&h).price - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_body_drag_moves_all_points() {
        let mut h = Harness::new();
        let id = h.draw_trendline();
        h.click(15.0, 180.0);
        h.down(15.0, 180.0);
        // one bar right, 10 price units up
        h.move_to(25.0, 140.0);
        h.up(25.0, 140.0);
        let points = h.store.get(id).unwrap().points().to_vec();
        assert_eq!(points[0].timestamp, 200);
        assert_eq!(points[1].timestamp, 300);
        assert!((points[0].price - 60.0).abs() < 1e-9);
        assert!((points[1].price - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_click_after_drag_is_suppressed() {
        let mut h = Harness::new();
        let id = h.draw_trendline();
        h.click(15.0, 180.0);
        h.down(20.0, 160.0);
        h.move_to(20.0, 120.0);
        h.up(20.0, 120.0);
        // the host reports a click at an empty spot right after the drag
        let time_ms = h.tick();
        h.pointer(PointerEvent::Click {
            position: Point::new(300.0, 300.0),
            time_ms,
        });
        assert_eq!(h.ix.selection(), Some(id));
    }

    #[test]
    fn test_drag_moves_bypass_throttle() {
        let mut h = Harness::new();
        h.draw_trendline();
        h.click(15.0, 180.0);
        h.down(20.0, 160.0);
        // all within one 16 ms window
        let t = h.time;
        h.pointer(PointerEvent::Move { position: Point::new(20.0, 163.0), time_ms: t + 1.0 });
        h.pointer(PointerEvent::Move { position: Point::new(20.0, 167.0), time_ms: t + 2.0 });
        assert!(h.ix.is_dragging());
    }

    #[test]
    fn test_hover_moves_are_throttled() {
        let mut h = Harness::new();
        h.tool(Some(ShapeKind::Trendline));
        h.click(10.0, 200.0);
        let t = h.time + 100.0;
        h.pointer(PointerEvent::Move { position: Point::new(30.0, 200.0), time_ms: t });
        h.pointer(PointerEvent::Move { position: Point::new(40.0, 200.0), time_ms: t + 5.0 });
        let Some(Preview::Drawing { points, .. }) = h.ix.preview() else {
            panic!("expected drawing preview");
        };
        assert_eq!(points[1].timestamp, 300);
    }

    #[test]
    fn test_locked_shape_selects_but_does_not_drag() {
        let mut h = Harness::new();
        let id = h.draw_trendline();
        h.apply(vec![Action::Execute(
            UpdateCommand::new(
                id,
                crate::commands::ShapeUpdate {
                    locked: Some(true),
                    ..Default::default()
                },
            )
            .into(),
        )]);
        h.down(15.0, 180.0);
        assert_eq!(h.ix.selection(), Some(id));
        h.move_to(15.0, 100.0);
        assert!(!h.ix.is_dragging());
        h.up(15.0, 100.0);
        assert!((h.store.get(id).unwrap().points()[0].price - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_right_click_resets_before_menu() {
        let mut h = Harness::new();
        let id = h.draw_trendline();
        h.click(15.0, 180.0);
        h.down(20.0, 160.0);
        h.move_to(20.0, 140.0);
        assert!(h.ix.is_dragging());
        h.events.clear();

        h.pointer(PointerEvent::ContextMenu {
            position: Point::new(15.0, 180.0),
            time_ms: 1.0,
        });
        assert_eq!(h.ix.gesture(), &Gesture::None);
        assert_eq!(h.ix.selection(), None);
        let cleared = h
            .events
            .iter()
            .position(|e| *e == EngineEvent::SelectionChanged { shape_id: None })
            .unwrap();
        let menu = h
            .events
            .iter()
            .position(|e| {
                matches!(e, EngineEvent::ContextMenuRequested { shape_id, .. } if *shape_id == id)
            })
            .unwrap();
        assert!(cleared < menu);
        // the cancelled drag was never committed
        assert!((h.store.get(id).unwrap().points()[1].price - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_right_click_abandons_placing() {
        let mut h = Harness::new();
        let id = h.draw_trendline();
        h.tool(Some(ShapeKind::Trendline));
        h.click(100.0, 100.0);
        assert!(h.ix.is_placing());
        h.events.clear();

        h.pointer(PointerEvent::ContextMenu {
            position: Point::new(15.0, 180.0),
            time_ms: 1.0,
        });
        assert!(!h.ix.is_placing());
        assert_eq!(h.ix.tool(), None);
        assert!(h.ix.preview().is_none());
        let cancelled = h.events.iter().position(|e| *e == EngineEvent::DrawingCancelled).unwrap();
        let menu = h
            .events
            .iter()
            .position(|e| {
                matches!(e, EngineEvent::ContextMenuRequested { shape_id, .. } if *shape_id == id)
            })
            .unwrap();
        assert!(cancelled < menu);
        assert_eq!(h.store.len(), 1);
    }

    #[test]
    fn test_escape_deselects_and_cancels_drag() {
        let mut h = Harness::new();
        let id = h.draw_trendline();
        h.click(15.0, 180.0);
        h.down(20.0, 160.0);
        h.move_to(20.0, 140.0);
        h.key(Key::Escape);
        assert!(!h.ix.is_dragging());
        assert_eq!(h.ix.selection(), Some(id));
        h.up(20.0, 140.0);
        assert!((h.store.get(id).unwrap().points()[1].price - 60.0).abs() < 1e-9);
        h.key(Key::Escape);
        assert_eq!(h.ix.selection(), None);
    }

    #[test]
    fn test_delete_key_removes_selection() {
        let mut h = Harness::new();
        let id = h.draw_trendline();
        h.key(Key::Delete);
        assert!(h.store.contains(id));
        h.click(15.0, 180.0);
        h.key(Key::Backspace);
        assert!(!h.store.contains(id));
        assert_eq!(h.ix.selection(), None);
    }

    #[test]
    fn test_reconcile_after_undo_of_create() {
        let mut h = Harness::new();
        let id = h.draw_trendline();
        h.click(15.0, 180.0);
        assert_eq!(h.ix.selection(), Some(id));
        h.history.undo(&mut h.store).unwrap();
        let actions = h.ix.reconcile(&h.store);
        h.apply(actions);
        assert_eq!(h.ix.selection(), None);
    }

    #[test]
    fn test_bridge_not_ready_ignores_input() {
        let mut h = Harness::new();
        h.tool(Some(ShapeKind::Horizontal));
        h.bridge.suspend();
        h.click(100.0, 200.0);
        assert!(h.store.is_empty());
        h.bridge.on_ready();
        h.click(100.0, 200.0);
        assert_eq!(h.store.len(), 1);
    }
}
