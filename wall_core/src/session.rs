//! # Interaction Session
//!
//! Everything about the current user interaction that is not part of the
//! building itself: which column/blocks are selected, what is hovered, and
//! the active drag. The session is passed explicitly into every operation
//! that needs it; there is no global state.
//!
//! The picking layer reduces a pointer ray to a [`PickTarget`], and the
//! session dispatches on it in [`Session::press`] and [`Session::hover`].
//! Visual restyling is driven by the [`SessionEvent`]s queued here.

use std::collections::HashSet;

use glam::DVec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::connectivity::connected_wall;
use crate::construction::{BlockDrag, ColumnDrag, Direction, DragRecord};
use crate::graph::{BlockId, ColumnId, StructureGraph};

/// What the pointer ray hit, as reported by the picking layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum PickTarget {
    /// Nothing pickable under the pointer
    Empty,
    Column(ColumnId),
    Block(BlockId),
    /// One of the four horizontal growth arrows of a column
    ColumnHandle { column: ColumnId, direction: Direction },
    /// The upward growth arrow of a block
    BlockHandle { block: BlockId },
}

/// A reference to either kind of entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Column(ColumnId),
    Block(BlockId),
}

/// Outbound notification of a selection, hover or drag change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "entity")]
pub enum SessionEvent {
    Selected(EntityRef),
    Deselected(EntityRef),
    Hovered(EntityRef),
    Unhovered(EntityRef),
    DragStarted,
    DragEnded,
}

/// Selection, hover and drag state for one editing session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    selected_column: Option<ColumnId>,
    selected_blocks: Vec<BlockId>,
    hovered: Option<EntityRef>,
    /// Held modifier: block clicks add to / toggle the selection
    additive: bool,
    pub(crate) drag: Option<DragRecord>,
    events: Vec<SessionEvent>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    pub fn selected_column(&self) -> Option<ColumnId> {
        self.selected_column
    }

    /// Selected blocks, in selection order
    pub fn selected_blocks(&self) -> &[BlockId] {
        &self.selected_blocks
    }

    pub fn is_block_selected(&self, id: &BlockId) -> bool {
        self.selected_blocks.contains(id)
    }

    pub fn hovered(&self) -> Option<&EntityRef> {
        self.hovered.as_ref()
    }

    pub fn drag(&self) -> Option<&DragRecord> {
        self.drag.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Set the additive-selection modifier (e.g. while Shift is held).
    pub fn set_additive(&mut self, additive: bool) {
        self.additive = additive;
    }

    pub fn events(&self) -> &[SessionEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------
    // Selection primitives
    // ------------------------------------------------------------------

    /// Make `column` the only selection.
    pub fn select_column(&mut self, column: ColumnId) {
        if self.selected_column == Some(column) && self.selected_blocks.is_empty() {
            return;
        }
        self.deselect_all();
        self.selected_column = Some(column);
        self.events.push(SessionEvent::Selected(EntityRef::Column(column)));
    }

    pub fn deselect_column(&mut self) {
        if let Some(column) = self.selected_column.take() {
            self.events.push(SessionEvent::Deselected(EntityRef::Column(column)));
        }
    }

    /// Add a block to the selection (no-op if already selected).
    pub fn select_block(&mut self, block: BlockId) {
        if self.selected_blocks.contains(&block) {
            return;
        }
        self.events.push(SessionEvent::Selected(EntityRef::Block(block.clone())));
        self.selected_blocks.push(block);
    }

    /// Remove a block from the selection. Returns whether it was selected.
    pub fn deselect_block(&mut self, block: &BlockId) -> bool {
        let Some(index) = self.selected_blocks.iter().position(|b| b == block) else {
            return false;
        };
        let removed = self.selected_blocks.remove(index);
        self.events.push(SessionEvent::Deselected(EntityRef::Block(removed)));
        true
    }

    pub fn deselect_blocks(&mut self) {
        for block in std::mem::take(&mut self.selected_blocks) {
            self.events.push(SessionEvent::Deselected(EntityRef::Block(block)));
        }
    }

    pub fn deselect_all(&mut self) {
        self.deselect_column();
        self.deselect_blocks();
    }

    /// Deselect every selected block on the same column pair below `block`.
    pub fn deselect_blocks_below(&mut self, graph: &StructureGraph, block: &BlockId) {
        let Some(top) = graph.block(block) else {
            return;
        };
        let below: Vec<BlockId> = self
            .selected_blocks
            .iter()
            .filter(|id| {
                graph.block(id).is_some_and(|b| {
                    b.connects(top.from_column(), top.to_column()) && b.y() < top.y()
                })
            })
            .cloned()
            .collect();
        for id in &below {
            self.deselect_block(id);
        }
    }

    /// Extend the selection with the whole coplanar wall of every selected block.
    pub fn select_connected(&mut self, graph: &StructureGraph) {
        let mut seen: HashSet<BlockId> = HashSet::new();
        let mut additions: Vec<BlockId> = Vec::new();
        for seed in &self.selected_blocks {
            for id in connected_wall(graph, seed) {
                if seen.insert(id.clone()) {
                    additions.push(id);
                }
            }
        }
        debug!(count = additions.len(), "selecting connected walls");
        for id in additions {
            self.select_block(id);
        }
    }

    // ------------------------------------------------------------------
    // Pointer dispatch
    // ------------------------------------------------------------------

    /// Handle a primary-button press on `target` at world point `point`.
    ///
    /// Handles start a drag; columns become the sole selection; blocks
    /// replace the block selection (or toggle within it while the additive
    /// modifier is held); empty space clears everything.
    pub fn press(&mut self, graph: &StructureGraph, target: &PickTarget, point: DVec3) {
        match target {
            PickTarget::ColumnHandle { column, direction } => {
                if graph.contains_column(*column) {
                    self.drag = Some(DragRecord::Column(ColumnDrag::start(*column, *direction, point)));
                    self.events.push(SessionEvent::DragStarted);
                }
            }
            PickTarget::BlockHandle { block } => {
                if let Some(drag) = BlockDrag::start(graph, block, point) {
                    self.drag = Some(DragRecord::Block(drag));
                    self.events.push(SessionEvent::DragStarted);
                }
            }
            PickTarget::Column(column) => {
                if graph.contains_column(*column) {
                    self.select_column(*column);
                }
            }
            PickTarget::Block(block) => {
                if !graph.contains_block(block) {
                    return;
                }
                self.deselect_column();
                if !self.additive {
                    self.deselect_blocks();
                }
                if !self.deselect_block(block) {
                    self.select_block(block.clone());
                }
            }
            PickTarget::Empty => self.deselect_all(),
        }
    }

    /// Handle pointer motion over `target` while not dragging.
    ///
    /// Selected entities are never shown as hovered.
    pub fn hover(&mut self, target: &PickTarget) {
        if self.is_dragging() {
            return;
        }
        let next = match target {
            PickTarget::Column(column) if self.selected_column != Some(*column) => {
                Some(EntityRef::Column(*column))
            }
            PickTarget::Block(block) if !self.is_block_selected(block) => {
                Some(EntityRef::Block(block.clone()))
            }
            _ => None,
        };
        if next == self.hovered {
            return;
        }
        if let Some(previous) = self.hovered.take() {
            self.events.push(SessionEvent::Unhovered(previous));
        }
        if let Some(entity) = next {
            self.events.push(SessionEvent::Hovered(entity.clone()));
            self.hovered = Some(entity);
        }
    }

    /// End the active drag (pointer release). The drag record is discarded.
    pub fn release(&mut self) {
        if self.drag.take().is_some() {
            self.events.push(SessionEvent::DragEnded);
        }
    }

    /// Drop every reference to entities no longer in `graph`.
    ///
    /// Call after destroying entities or loading a new document.
    pub fn prune(&mut self, graph: &StructureGraph) {
        if let Some(column) = self.selected_column {
            if !graph.contains_column(column) {
                self.deselect_column();
            }
        }
        let gone: Vec<BlockId> = self
            .selected_blocks
            .iter()
            .filter(|id| !graph.contains_block(id))
            .cloned()
            .collect();
        for id in &gone {
            self.deselect_block(id);
        }
        let hovered_gone = match &self.hovered {
            Some(EntityRef::Column(c)) => !graph.contains_column(*c),
            Some(EntityRef::Block(b)) => !graph.contains_block(b),
            None => false,
        };
        if hovered_gone {
            self.hovered = None;
        }
        let drag_gone = match &self.drag {
            Some(DragRecord::Column(d)) => !graph.contains_column(d.origin),
            Some(DragRecord::Block(d)) => !graph.contains_block(&d.block),
            None => false,
        };
        if drag_gone {
            self.release();
        }
    }
}
