//! # Structure Graph
//!
//! The single source of truth for a building's topology and geometry:
//! columns (vertical posts on the ground plane) and blocks (horizontal
//! panels spanning two columns at some height).
//!
//! ## Structure
//!
//! ```text
//! StructureGraph
//! ├── columns: HashMap<ColumnId, Column>   (arena)
//! │   └── Column.blocks: Vec<BlockId>      (incidence index)
//! ├── blocks: HashMap<BlockId, Block>      (arena)
//! ├── column_order / block_order           (creation order, used by the codec)
//! └── events: Vec<GraphEvent>              (outbound change notifications)
//! ```
//!
//! The incidence lists are only ever touched by [`StructureGraph::add_block`],
//! [`StructureGraph::destroy_block`] and [`StructureGraph::destroy_column`],
//! so a block is listed on a column exactly when it references that column.
//!
//! ## Example
//!
//! ```rust
//! use wall_core::graph::StructureGraph;
//!
//! let mut graph = StructureGraph::new();
//! let a = graph.add_column(0.0, 0.0);
//! let b = graph.add_column(1.5, 0.0);
//! let block = graph.add_block(a, b, 0.205).unwrap();
//!
//! // Same pair and height: the existing block comes back
//! assert_eq!(graph.add_block(b, a, 0.205).unwrap(), block);
//!
//! // Destroying a column cascades to its blocks
//! graph.destroy_column(a);
//! assert_eq!(graph.block_count(), 0);
//! ```

use std::collections::HashMap;
use std::fmt;

use glam::DVec2;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::errors::{WallError, WallResult};

/// Two columns closer than this on both axes count as the same position.
pub const POSITION_TOLERANCE: f64 = 0.1;

/// Two blocks on the same column pair closer than this vertically are the same block.
pub const HEIGHT_TOLERANCE: f64 = 0.1;

/// Runtime identity of a column.
///
/// Column ids are not persisted; a loaded document gets fresh ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(Uuid);

impl ColumnId {
    fn generate() -> Self {
        ColumnId(Uuid::new_v4())
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identity of a block, preserved across save/load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// Fresh random id for a newly built block
    pub fn generate() -> Self {
        BlockId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BlockId {
    fn from(id: &str) -> Self {
        BlockId(id.to_string())
    }
}

impl From<String> for BlockId {
    fn from(id: String) -> Self {
        BlockId(id)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A vertical post standing on the ground plane at `(x, z)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    id: ColumnId,
    /// Planar position; `x` is world x, `y` is world z
    position: DVec2,
    /// Blocks incident to this column, in attachment order
    blocks: Vec<BlockId>,
}

impl Column {
    pub fn id(&self) -> ColumnId {
        self.id
    }

    pub fn x(&self) -> f64 {
        self.position.x
    }

    pub fn z(&self) -> f64 {
        self.position.y
    }

    /// Planar position as `(x, z)`
    pub fn position(&self) -> DVec2 {
        self.position
    }

    /// Ids of the blocks attached to this column
    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    /// True if this column sits within `tolerance` of `(x, z)` on both axes.
    pub fn is_near(&self, x: f64, z: f64, tolerance: f64) -> bool {
        (self.position.x - x).abs() < tolerance && (self.position.y - z).abs() < tolerance
    }
}

/// A horizontal panel spanning two distinct columns at height `y`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    id: BlockId,
    from: ColumnId,
    to: ColumnId,
    y: f64,
    /// Planar midpoint between the two columns, as `(x, z)`
    midpoint: DVec2,
    /// Orientation around the vertical axis: `atan2(dz, dx)` from `from` to `to`
    angle: f64,
}

impl Block {
    pub fn id(&self) -> &BlockId {
        &self.id
    }

    pub fn from_column(&self) -> ColumnId {
        self.from
    }

    pub fn to_column(&self) -> ColumnId {
        self.to
    }

    /// Both endpoints, `[from, to]`
    pub fn columns(&self) -> [ColumnId; 2] {
        [self.from, self.to]
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn midpoint(&self) -> DVec2 {
        self.midpoint
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// True if this block spans `a` and `b`, in either direction.
    pub fn connects(&self, a: ColumnId, b: ColumnId) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }
}

/// Outbound notification of a structural change.
///
/// The rendering collaborator drains these to add or remove visuals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "id")]
pub enum GraphEvent {
    ColumnCreated(ColumnId),
    ColumnDestroyed(ColumnId),
    BlockCreated(BlockId),
    BlockDestroyed(BlockId),
}

/// Arena of columns and blocks with an explicit incidence index.
#[derive(Debug, Clone, Default)]
pub struct StructureGraph {
    columns: HashMap<ColumnId, Column>,
    column_order: Vec<ColumnId>,
    blocks: HashMap<BlockId, Block>,
    block_order: Vec<BlockId>,
    events: Vec<GraphEvent>,
}

impl StructureGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the session-start graph: a single column at the origin.
    pub fn seeded() -> Self {
        let mut graph = Self::new();
        graph.add_column(0.0, 0.0);
        graph
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Create and register a column at `(x, z)`.
    ///
    /// Duplicates are not rejected here; callers that care (the construction
    /// engine) check [`find_column_near`](Self::find_column_near) first.
    pub fn add_column(&mut self, x: f64, z: f64) -> ColumnId {
        let id = ColumnId::generate();
        self.columns.insert(
            id,
            Column {
                id,
                position: DVec2::new(x, z),
                blocks: Vec::new(),
            },
        );
        self.column_order.push(id);
        self.events.push(GraphEvent::ColumnCreated(id));
        debug!(column = %id, x, z, "column added");
        id
    }

    /// Create a block between two distinct columns at height `y`.
    ///
    /// If a block already spans the same pair (either direction) at the same
    /// height within [`HEIGHT_TOLERANCE`], its id is returned and nothing
    /// changes.
    pub fn add_block(&mut self, from: ColumnId, to: ColumnId, y: f64) -> WallResult<BlockId> {
        self.check_block_endpoints(from, to, y)?;
        if let Some(existing) = self.find_block(from, to, y, HEIGHT_TOLERANCE) {
            return Ok(existing.id.clone());
        }
        self.insert_block(BlockId::generate(), from, to, y)
    }

    /// Insert a block under a caller-chosen id, without the duplicate check.
    ///
    /// Used when rebuilding a graph from a document.
    pub(crate) fn insert_block(
        &mut self,
        id: BlockId,
        from: ColumnId,
        to: ColumnId,
        y: f64,
    ) -> WallResult<BlockId> {
        self.check_block_endpoints(from, to, y)?;
        if self.blocks.contains_key(&id) {
            return Err(WallError::invalid_input(
                "block_id",
                id.to_string(),
                "A block with this id already exists",
            ));
        }

        let position = |column: ColumnId| {
            self.columns
                .get(&column)
                .map(|c| c.position)
                .ok_or_else(|| WallError::column_not_found(column))
        };
        let (from_pos, to_pos) = (position(from)?, position(to)?);
        let delta = to_pos - from_pos;
        let block = Block {
            id: id.clone(),
            from,
            to,
            y,
            midpoint: (from_pos + to_pos) * 0.5,
            angle: delta.y.atan2(delta.x),
        };

        for column in [from, to] {
            if let Some(column) = self.columns.get_mut(&column) {
                column.blocks.push(id.clone());
            }
        }
        self.blocks.insert(id.clone(), block);
        self.block_order.push(id.clone());
        self.events.push(GraphEvent::BlockCreated(id.clone()));
        debug!(block = %id, %from, %to, y, "block added");
        Ok(id)
    }

    fn check_block_endpoints(&self, from: ColumnId, to: ColumnId, y: f64) -> WallResult<()> {
        if from == to {
            return Err(WallError::invalid_input(
                "to_column",
                to.to_string(),
                "A block needs two distinct columns",
            ));
        }
        for column in [from, to] {
            if !self.columns.contains_key(&column) {
                return Err(WallError::column_not_found(column));
            }
        }
        if !y.is_finite() {
            return Err(WallError::invalid_input("y", y.to_string(), "Height must be finite"));
        }
        Ok(())
    }

    /// Remove a block from the graph and from both endpoint columns.
    ///
    /// Returns `false` (and does nothing) if the block is not in the graph.
    pub fn destroy_block(&mut self, id: &BlockId) -> bool {
        let Some(block) = self.blocks.remove(id) else {
            return false;
        };
        for column in block.columns() {
            if let Some(column) = self.columns.get_mut(&column) {
                column.blocks.retain(|b| b != id);
            }
        }
        self.block_order.retain(|b| b != id);
        self.events.push(GraphEvent::BlockDestroyed(id.clone()));
        debug!(block = %id, "block destroyed");
        true
    }

    /// Destroy every block attached to the column, then the column itself.
    ///
    /// Returns `false` (and does nothing) if the column is not in the graph.
    pub fn destroy_column(&mut self, id: ColumnId) -> bool {
        let Some(incident) = self.columns.get(&id).map(|c| c.blocks.clone()) else {
            return false;
        };
        for block in &incident {
            self.destroy_block(block);
        }
        self.columns.remove(&id);
        self.column_order.retain(|c| *c != id);
        self.events.push(GraphEvent::ColumnDestroyed(id));
        debug!(column = %id, cascaded = incident.len(), "column destroyed");
        true
    }

    /// Remove everything, emitting destroy events for every entity.
    pub fn clear(&mut self) {
        for block in std::mem::take(&mut self.block_order) {
            self.events.push(GraphEvent::BlockDestroyed(block));
        }
        for column in std::mem::take(&mut self.column_order) {
            self.events.push(GraphEvent::ColumnDestroyed(column));
        }
        self.blocks.clear();
        self.columns.clear();
    }

    /// Swap in the contents of `other` wholesale.
    ///
    /// Pending events of `other` are discarded; this graph emits destroy
    /// events for its old contents followed by create events for the new
    /// ones, in creation order.
    pub fn replace_with(&mut self, other: StructureGraph) {
        self.clear();
        let StructureGraph {
            columns,
            column_order,
            blocks,
            block_order,
            events: _,
        } = other;
        self.events
            .extend(column_order.iter().copied().map(GraphEvent::ColumnCreated));
        self.events
            .extend(block_order.iter().cloned().map(GraphEvent::BlockCreated));
        self.columns = columns;
        self.column_order = column_order;
        self.blocks = blocks;
        self.block_order = block_order;
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Pending change notifications, oldest first.
    pub fn events(&self) -> &[GraphEvent] {
        &self.events
    }

    /// Take all pending change notifications.
    pub fn drain_events(&mut self) -> Vec<GraphEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.get(&id)
    }

    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    pub fn contains_column(&self, id: ColumnId) -> bool {
        self.columns.contains_key(&id)
    }

    pub fn contains_block(&self, id: &BlockId) -> bool {
        self.blocks.contains_key(id)
    }

    /// Columns in creation order.
    pub fn columns(&self) -> impl Iterator<Item = &Column> + '_ {
        self.column_order.iter().filter_map(move |id| self.columns.get(id))
    }

    /// Blocks in creation order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        self.block_order.iter().filter_map(move |id| self.blocks.get(id))
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of a column in creation order.
    pub fn column_index(&self, id: ColumnId) -> Option<usize> {
        self.column_order.iter().position(|c| *c == id)
    }

    /// Column at a creation-order position.
    pub fn column_at(&self, index: usize) -> Option<ColumnId> {
        self.column_order.get(index).copied()
    }

    /// Blocks attached to a column (empty if the column does not exist).
    pub fn blocks_of(&self, column: ColumnId) -> impl Iterator<Item = &Block> + '_ {
        self.columns
            .get(&column)
            .map(|c| c.blocks.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(move |id| self.blocks.get(id))
    }

    /// First column (in creation order) within `tolerance` of `(x, z)`.
    pub fn find_column_near(&self, x: f64, z: f64, tolerance: f64) -> Option<ColumnId> {
        self.columns()
            .find(|c| c.is_near(x, z, tolerance))
            .map(|c| c.id)
    }

    /// Block spanning `a`/`b` (either direction) at height `y` within `tolerance`.
    pub fn find_block(&self, a: ColumnId, b: ColumnId, y: f64, tolerance: f64) -> Option<&Block> {
        self.blocks_of(a)
            .find(|block| block.connects(a, b) && (block.y - y).abs() < tolerance)
    }

    /// All blocks spanning `a`/`b`, in attachment order.
    pub fn blocks_between(&self, a: ColumnId, b: ColumnId) -> Vec<&Block> {
        self.blocks_of(a).filter(|block| block.connects(a, b)).collect()
    }
}
