//! # Construction Engine
//!
//! Turns a continuous drag gesture into discrete graph growth.
//!
//! Two kinds of drag exist:
//!
//! - **Column drags** start on one of the four cardinal handles of a column.
//!   The drag is projected onto the handle's direction and quantized to
//!   whole multiples of [`SceneConfig::min_column_distance`]; each whole step
//!   places (or reuses) a column and links it to the previous one with a
//!   block at the base height.
//! - **Block drags** start on the upward handle of a selected block. Only
//!   upward motion counts; every selected block grows a stack of blocks in
//!   [`SceneConfig::block_height`] increments, never reaching the column
//!   height.
//!
//! [`drag_to`] is called once per pointer-move/frame with the current world
//! point. A column drag remembers how many steps it has already
//! materialized (`created`), so a frame only builds the delta; a block drag
//! re-checks every selected block and only fills increments that are still
//! empty. Growth never regresses: pulling the pointer back does not remove
//! anything.
//!
//! ## Example
//!
//! ```rust
//! use glam::DVec3;
//! use wall_core::config::SceneConfig;
//! use wall_core::construction::{drag_to, Direction};
//! use wall_core::graph::StructureGraph;
//! use wall_core::session::{PickTarget, Session};
//!
//! let scene = SceneConfig::default();
//! let mut graph = StructureGraph::seeded();
//! let mut session = Session::new();
//! let seed = graph.column_at(0).unwrap();
//!
//! session.press(&graph, &PickTarget::ColumnHandle { column: seed, direction: Direction::East }, DVec3::ZERO);
//! drag_to(&mut session, &mut graph, &scene, DVec3::new(3.0 * scene.min_column_distance, 0.0, 0.0));
//! session.release();
//!
//! assert_eq!(graph.column_count(), 4);
//! assert_eq!(graph.block_count(), 3);
//! ```

use std::fmt;
use std::str::FromStr;

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::SceneConfig;
use crate::errors::WallError;
use crate::graph::{BlockId, ColumnId, StructureGraph, HEIGHT_TOLERANCE, POSITION_TOLERANCE};
use crate::session::Session;

/// Upper bound on grid steps a single column drag may span.
pub const MAX_COLUMN_STEPS: u32 = 1000;

/// Cardinal direction of a column handle.
///
/// North is `-z`, south `+z`, east `+x`, west `-x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// All directions, in handle order
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Unit vector on the ground plane, as `(x, z)`.
    pub fn unit(self) -> DVec2 {
        match self {
            Direction::North => DVec2::new(0.0, -1.0),
            Direction::South => DVec2::new(0.0, 1.0),
            Direction::East => DVec2::new(1.0, 0.0),
            Direction::West => DVec2::new(-1.0, 0.0),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Direction {
    type Err = WallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "n" | "north" => Ok(Direction::North),
            "s" | "south" => Ok(Direction::South),
            "e" | "east" => Ok(Direction::East),
            "w" | "west" => Ok(Direction::West),
            _ => Err(WallError::invalid_input(
                "direction",
                s,
                "Expected one of north, south, east, west",
            )),
        }
    }
}

/// State of a drag that started on a column handle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnDrag {
    /// Column whose handle was grabbed
    pub origin: ColumnId,
    pub direction: Direction,
    /// World point where the drag started (on the ground plane)
    pub start_point: DVec3,
    /// Grid steps already materialized by this drag
    pub created: u32,
    /// Column reached by the last materialized step
    pub last_column: ColumnId,
}

impl ColumnDrag {
    pub fn start(origin: ColumnId, direction: Direction, start_point: DVec3) -> Self {
        ColumnDrag {
            origin,
            direction,
            start_point,
            created: 0,
            last_column: origin,
        }
    }
}

/// State of a drag that started on a block handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDrag {
    /// Block whose handle was grabbed
    pub block: BlockId,
    /// Height of that block when the drag started
    pub anchor_y: f64,
    /// World point where the drag started (on the viewer-facing plane)
    pub start_point: DVec3,
    /// Whole block-height increments the pointer has risen so far
    pub created: u32,
}

impl BlockDrag {
    /// Start a block drag, or `None` if the block is not in the graph.
    pub fn start(graph: &StructureGraph, block: &BlockId, start_point: DVec3) -> Option<Self> {
        let anchor_y = graph.block(block)?.y();
        Some(BlockDrag {
            block: block.clone(),
            anchor_y,
            start_point,
            created: 0,
        })
    }
}

/// The active drag of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum DragRecord {
    Column(ColumnDrag),
    Block(BlockDrag),
}

/// Entities created by one drag frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Growth {
    pub columns: Vec<ColumnId>,
    pub blocks: Vec<BlockId>,
}

impl Growth {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.blocks.is_empty()
    }
}

/// Advance the session's active drag to `point` and build whatever is missing.
///
/// For column drags `point` is the pointer ray hit on the ground plane; for
/// block drags it is the hit on the vertical plane facing the viewer. With no
/// active drag this does nothing.
pub fn drag_to(
    session: &mut Session,
    graph: &mut StructureGraph,
    scene: &SceneConfig,
    point: DVec3,
) -> Growth {
    if session.drag.is_none() {
        return Growth::default();
    }
    if let Err(e) = scene.validate() {
        warn!(error = %e, "ignoring drag with invalid scene configuration");
        return Growth::default();
    }
    let Some(record) = session.drag.take() else {
        return Growth::default();
    };

    let (record, growth) = match record {
        DragRecord::Column(mut drag) => {
            let growth = grow_columns(graph, scene, &mut drag, point);
            if let Some(&newest) = growth.columns.last() {
                session.select_column(newest);
            }
            (DragRecord::Column(drag), growth)
        }
        DragRecord::Block(mut drag) => {
            let growth = grow_blocks(session, graph, scene, &mut drag, point);
            (DragRecord::Block(drag), growth)
        }
    };

    session.drag = Some(record);
    growth
}

/// Extend a row of columns from the drag origin along its direction.
pub fn grow_columns(
    graph: &mut StructureGraph,
    scene: &SceneConfig,
    drag: &mut ColumnDrag,
    point: DVec3,
) -> Growth {
    let mut growth = Growth::default();
    let Some(origin) = graph.column(drag.origin).map(|c| c.position()) else {
        return growth;
    };

    let dir = drag.direction.unit();
    let delta = DVec2::new(point.x - drag.start_point.x, point.z - drag.start_point.z);
    let distance = delta.dot(dir).abs();
    if !distance.is_finite() {
        return growth;
    }

    let steps = (distance / scene.min_column_distance).floor();
    if !(steps <= f64::from(MAX_COLUMN_STEPS)) {
        warn!(distance, steps, "column drag out of range");
        return growth;
    }
    let target = steps as u32;
    if target <= drag.created {
        return growth;
    }

    let base_y = scene.base_block_y();
    let mut previous = if graph.contains_column(drag.last_column) {
        drag.last_column
    } else {
        drag.origin
    };

    for step in drag.created..target {
        let candidate = origin + dir * (scene.min_column_distance * f64::from(step + 1));
        let column = match graph.find_column_near(candidate.x, candidate.y, POSITION_TOLERANCE) {
            Some(existing) => existing,
            None => {
                let id = graph.add_column(candidate.x, candidate.y);
                growth.columns.push(id);
                id
            }
        };

        if column != previous && graph.find_block(previous, column, base_y, HEIGHT_TOLERANCE).is_none() {
            match graph.add_block(previous, column, base_y) {
                Ok(id) => growth.blocks.push(id),
                Err(e) => warn!(error = %e, "could not link columns"),
            }
        }
        previous = column;
    }

    debug!(
        direction = %drag.direction,
        from_step = drag.created,
        to_step = target,
        new_columns = growth.columns.len(),
        new_blocks = growth.blocks.len(),
        "column drag advanced"
    );
    drag.created = target;
    drag.last_column = previous;
    growth
}

/// Stack blocks on top of every selected block.
///
/// The pointer's rise above the drag start is added to the grabbed block's
/// height to give the target height. Every frame, each selected block fills
/// the whole increments between its own height and that target that are not
/// already occupied, lowest first. New blocks take over the selection from
/// the blocks below them on the same column pair.
pub fn grow_blocks(
    session: &mut Session,
    graph: &mut StructureGraph,
    scene: &SceneConfig,
    drag: &mut BlockDrag,
    point: DVec3,
) -> Growth {
    let mut growth = Growth::default();
    let block_height = scene.block_height;

    let rise = point.y - drag.start_point.y;
    if !(rise > 0.0) || !rise.is_finite() {
        return growth;
    }
    let steps = (rise / block_height).floor() as u32;
    let target_y = drag.anchor_y + rise;

    let bases: Vec<BlockId> = session.selected_blocks().to_vec();
    for base in bases {
        let Some(block) = graph.block(&base) else {
            continue;
        };
        let (from, to, base_y) = (block.from_column(), block.to_column(), block.y());

        let height_above = target_y - base_y;
        if height_above <= 0.0 {
            continue;
        }
        let wanted = (height_above / block_height).floor() as u32;

        for k in 1..=wanted {
            let y = base_y + f64::from(k) * block_height;
            if y >= scene.column_height {
                break;
            }
            if graph.find_block(from, to, y, HEIGHT_TOLERANCE).is_some() {
                continue;
            }
            let id = match graph.add_block(from, to, y) {
                Ok(id) => id,
                Err(e) => {
                    warn!(error = %e, "could not stack block");
                    break;
                }
            };
            session.deselect_column();
            session.select_block(id.clone());
            session.deselect_blocks_below(graph, &id);
            growth.blocks.push(id);
        }
    }

    if !growth.is_empty() {
        debug!(
            from_step = drag.created,
            to_step = steps,
            new_blocks = growth.blocks.len(),
            "block drag advanced"
        );
    }
    drag.created = drag.created.max(steps);
    growth
}
