//! Create a shape.

use super::{CommandError, CommandMeta, CommandOutcome};
use crate::shapes::{ChartPoint, Shape, ShapeId, ShapeKind, ShapeStyle, StylePatch};
use crate::store::ShapeStore;
use crate::tools::ToolRegistry;

/// Adds a new shape built from (kind, points, style).
#[derive(Debug, Clone)]
pub struct CreateCommand {
    pub(super) meta: CommandMeta,
    kind: ShapeKind,
    points: Vec<ChartPoint>,
    style: Option<StylePatch>,
    base_style: ShapeStyle,
    z_index: Option<i32>,
    /// Full snapshot of the created shape, kept for redo.
    created: Option<Shape>,
}

impl CreateCommand {
    pub fn new(kind: ShapeKind, points: Vec<ChartPoint>, style: Option<StylePatch>) -> Self {
        Self {
            meta: CommandMeta::default(),
            kind,
            points,
            style,
            base_style: ShapeStyle::default(),
            z_index: None,
            created: None,
        }
    }

    /// Copy of an existing shape with a new id, optionally shifted in data space.
    pub fn duplicate(shape: &Shape, dt: i64, dp: f64) -> Self {
        let points = shape.points().iter().map(|p| p.offset(dt, dp)).collect();
        let mut cmd = Self::new(shape.kind(), points, Some(shape.style.clone().into()));
        cmd.z_index = Some(shape.z_index);
        cmd
    }

    /// Style that omitted fields fall back to.
    pub fn with_base_style(mut self, base: ShapeStyle) -> Self {
        self.base_style = base;
        self
    }

    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = Some(z_index);
        self
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn points(&self) -> &[ChartPoint] {
        &self.points
    }

    /// Id of the created shape, once executed.
    pub fn shape_id(&self) -> Option<ShapeId> {
        self.created.as_ref().map(Shape::id)
    }

    pub fn validate(&self, _store: &ShapeStore) -> Result<(), CommandError> {
        ToolRegistry::validate(self.kind, &self.points)?;
        ToolRegistry::resolve_style(&self.base_style, self.style.as_ref())?;
        Ok(())
    }

    pub fn execute(&mut self, store: &mut ShapeStore) -> Result<CommandOutcome, CommandError> {
        if self.created.is_some() {
            return Err(CommandError::AlreadyExecuted);
        }
        let mut shape = ToolRegistry::build_with_base(
            self.kind,
            self.points.clone(),
            &self.base_style,
            self.style.as_ref(),
        )?;
        if let Some(z) = self.z_index {
            shape.z_index = z;
        }
        if !store.insert(shape.clone()) {
            return Err(CommandError::AlreadyExists(shape.id()));
        }
        log::debug!("created {} {}", self.kind.name(), shape.id());
        self.created = Some(shape.clone());
        Ok(CommandOutcome::Shape(shape))
    }

    pub fn undo(&mut self, store: &mut ShapeStore) -> Result<(), CommandError> {
        let shape = self.created.as_ref().ok_or(CommandError::NotExecuted)?;
        if store.remove(shape.id()).is_none() {
            // Already gone (deleted elsewhere); the end state is the same.
            log::debug!("undo create: shape {} already absent", shape.id());
        }
        Ok(())
    }

    pub fn redo(&mut self, store: &mut ShapeStore) -> Result<CommandOutcome, CommandError> {
        let shape = self.created.as_ref().ok_or(CommandError::NotExecuted)?;
        if let Some(existing) = store.get(shape.id()) {
            return Ok(CommandOutcome::Shape(existing.clone()));
        }
        // Rebuild from the snapshot, keeping the original id.
        store.insert(shape.clone());
        Ok(CommandOutcome::Shape(shape.clone()))
    }
}
