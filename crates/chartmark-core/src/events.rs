//! Engine events and a typed dispatcher.
//!
//! Listeners subscribe with an [`EventFilter`] and receive events
//! synchronously. Every dispatched event is also queued so a host that
//! polls (the wasm binding, the session replayer) can drain it instead.

use crate::shapes::{Shape, ShapeId, ShapeKind};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;

/// Something the host should know about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    ShapeCreated { shape: Shape },
    ShapeUpdated { shape: Shape },
    ShapeDeleted { shape_id: ShapeId },
    SelectionChanged { shape_id: Option<ShapeId> },
    ToolChanged { tool: Option<ShapeKind> },
    /// In-progress drawing was discarded.
    DrawingCancelled,
    /// A drag went past the threshold.
    DragStarted { shape_id: ShapeId },
    /// The user asked for the shape's context menu at a pixel position.
    ContextMenuRequested { shape_id: ShapeId, x: f64, y: f64 },
    /// A command failed validation or execution; nothing changed.
    CommandRejected { reason: String },
    HistoryChanged { can_undo: bool, can_redo: bool },
    /// Shapes were replaced wholesale from storage.
    ShapesLoaded { count: usize },
    /// Something visible changed (including previews).
    RenderRequested,
}

/// Discriminant of [`EngineEvent`], for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ShapeCreated,
    ShapeUpdated,
    ShapeDeleted,
    SelectionChanged,
    ToolChanged,
    DrawingCancelled,
    DragStarted,
    ContextMenuRequested,
    CommandRejected,
    HistoryChanged,
    ShapesLoaded,
    RenderRequested,
}

impl EngineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EngineEvent::ShapeCreated { .. } => EventKind::ShapeCreated,
            EngineEvent::ShapeUpdated { .. } => EventKind::ShapeUpdated,
            EngineEvent::ShapeDeleted { .. } => EventKind::ShapeDeleted,
            EngineEvent::SelectionChanged { .. } => EventKind::SelectionChanged,
            EngineEvent::ToolChanged { .. } => EventKind::ToolChanged,
            EngineEvent::DrawingCancelled => EventKind::DrawingCancelled,
            EngineEvent::DragStarted { .. } => EventKind::DragStarted,
            EngineEvent::ContextMenuRequested { .. } => EventKind::ContextMenuRequested,
            EngineEvent::CommandRejected { .. } => EventKind::CommandRejected,
            EngineEvent::HistoryChanged { .. } => EventKind::HistoryChanged,
            EngineEvent::ShapesLoaded { .. } => EventKind::ShapesLoaded,
            EngineEvent::RenderRequested => EventKind::RenderRequested,
        }
    }

    /// Whether the shape collection changed.
    pub fn is_shape_change(&self) -> bool {
        matches!(
            self.kind(),
            EventKind::ShapeCreated
                | EventKind::ShapeUpdated
                | EventKind::ShapeDeleted
                | EventKind::ShapesLoaded
        )
    }
}

/// Which events a listener receives.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum EventFilter {
    #[default]
    All,
    Kinds(Vec<EventKind>),
}

impl EventFilter {
    pub fn only(kind: EventKind) -> Self {
        EventFilter::Kinds(vec![kind])
    }

    pub fn matches(&self, event: &EngineEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Kinds(kinds) => kinds.contains(&event.kind()),
        }
    }
}

/// Handle returned by [`EventDispatcher::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&EngineEvent)>;

/// Default number of undrained events kept.
const DEFAULT_QUEUE_LIMIT: usize = 1024;

/// Delivers [`EngineEvent`]s to listeners and a drainable queue.
pub struct EventDispatcher {
    listeners: Vec<(SubscriptionId, EventFilter, Listener)>,
    queue: VecDeque<EngineEvent>,
    queue_limit: usize,
    next_id: u64,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
            queue: VecDeque::new(),
            queue_limit: DEFAULT_QUEUE_LIMIT,
            next_id: 1,
        }
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listeners.len())
            .field("queued", &self.queue.len())
            .finish()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        filter: EventFilter,
        listener: impl FnMut(&EngineEvent) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, filter, Box::new(listener)));
        id
    }

    /// Returns `false` if the subscription was unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _, _)| *sub != id);
        self.listeners.len() != before
    }

    pub fn dispatch(&mut self, event: EngineEvent) {
        for (_, filter, listener) in &mut self.listeners {
            if filter.matches(&event) {
                listener(&event);
            }
        }
        if self.queue.len() >= self.queue_limit {
            self.queue.pop_front();
        }
        self.queue.push_back(event);
    }

    /// Take every queued event, oldest first.
    pub fn drain(&mut self) -> Vec<EngineEvent> {
        self.queue.drain(..).collect()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
