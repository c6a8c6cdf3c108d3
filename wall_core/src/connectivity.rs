//! # Connectivity Search
//!
//! Finds the blocks that make up one continuous wall, so the user can
//! select a whole wall from a single block.
//!
//! The search walks the column/block incidence graph breadth-first from a
//! seed block. Every reachable block is visited once; a visited block is
//! *included* only if it lines up with the seed. Non-matching blocks still
//! propagate the search through their columns, which lets the walk pass a
//! corner or junction column and pick up aligned blocks beyond it without
//! picking up the junction's other blocks.
//!
//! Two alignment rules exist (see [`Alignment`]):
//!
//! - [`Alignment::Coplanar`]: same height, same orientation, and the same
//!   invariant coordinate (`x` for north–south walls, `z` for east–west
//!   walls). This is the wall selection used by the editor.
//! - [`Alignment::Course`]: same height and orientation only, so parallel
//!   offset walls reachable through the structure are included too.
//!
//! ## Example
//!
//! ```rust
//! use wall_core::connectivity::connected_wall;
//! use wall_core::graph::StructureGraph;
//!
//! let mut graph = StructureGraph::new();
//! let a = graph.add_column(0.0, 0.0);
//! let b = graph.add_column(1.5, 0.0);
//! let c = graph.add_column(3.0, 0.0);
//! let ab = graph.add_block(a, b, 0.2).unwrap();
//! let bc = graph.add_block(b, c, 0.2).unwrap();
//!
//! assert_eq!(connected_wall(&graph, &ab), vec![ab, bc]);
//! ```

use std::collections::{HashSet, VecDeque};
use std::f64::consts::{PI, TAU};

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::graph::{Block, BlockId, StructureGraph};

/// Tolerance for height, angle and planar-coordinate comparisons.
pub const ALIGNMENT_TOLERANCE: f64 = 0.01;

/// Inclusion rule applied to each visited block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    /// Height, orientation and wall plane must match the seed
    Coplanar,
    /// Height and orientation must match the seed
    Course,
}

/// Primary axis of a wall, derived from the seed block's orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WallAxis {
    /// Runs along z; every block in the wall shares its `x`
    NorthSouth,
    /// Runs along x; every block in the wall shares its `z`
    EastWest,
}

impl WallAxis {
    /// Classify an orientation angle (radians around the vertical axis).
    pub fn from_angle(angle: f64) -> Self {
        if angle.sin().abs() > 0.5 {
            WallAxis::NorthSouth
        } else {
            WallAxis::EastWest
        }
    }

    /// The planar coordinate that stays constant along a wall on this axis.
    pub fn invariant(self, position: DVec2) -> f64 {
        match self {
            WallAxis::NorthSouth => position.x,
            WallAxis::EastWest => position.y,
        }
    }
}

/// Absolute difference between two orientations, wrapped into `[0, π]`.
///
/// `atan2` reports due-west as either `π` or `-π` depending on the sign of a
/// zero or near-zero `z` delta; both must compare equal.
pub fn angle_difference(a: f64, b: f64) -> f64 {
    ((a - b + PI).rem_euclid(TAU) - PI).abs()
}

/// Reference values captured from the seed block.
struct Reference {
    y: f64,
    angle: f64,
    axis: WallAxis,
    plane: f64,
}

impl Reference {
    fn of(seed: &Block) -> Self {
        let axis = WallAxis::from_angle(seed.angle());
        Reference {
            y: seed.y(),
            angle: seed.angle(),
            axis,
            plane: axis.invariant(seed.midpoint()),
        }
    }

    fn accepts(&self, block: &Block, alignment: Alignment) -> bool {
        let level = (block.y() - self.y).abs() < ALIGNMENT_TOLERANCE
            && angle_difference(block.angle(), self.angle) < ALIGNMENT_TOLERANCE;
        match alignment {
            Alignment::Course => level,
            Alignment::Coplanar => {
                level && (self.axis.invariant(block.midpoint()) - self.plane).abs() < ALIGNMENT_TOLERANCE
            }
        }
    }
}

/// Blocks forming the coplanar wall through `seed`, seed first.
///
/// Returns an empty list if `seed` is not in the graph.
pub fn connected_wall(graph: &StructureGraph, seed: &BlockId) -> Vec<BlockId> {
    connected_blocks(graph, seed, Alignment::Coplanar)
}

/// Blocks reachable from `seed` at the same height and orientation, seed first.
pub fn connected_course(graph: &StructureGraph, seed: &BlockId) -> Vec<BlockId> {
    connected_blocks(graph, seed, Alignment::Course)
}

/// Breadth-first search from `seed`, keeping blocks that satisfy `alignment`.
///
/// Results are in visit order. The seed is always the first entry.
pub fn connected_blocks(graph: &StructureGraph, seed: &BlockId, alignment: Alignment) -> Vec<BlockId> {
    let Some(seed_block) = graph.block(seed) else {
        return Vec::new();
    };
    let reference = Reference::of(seed_block);

    let mut result = Vec::new();
    let mut visited: HashSet<BlockId> = HashSet::new();
    let mut queue: VecDeque<BlockId> = VecDeque::new();

    visited.insert(seed.clone());
    queue.push_back(seed.clone());

    while let Some(id) = queue.pop_front() {
        let Some(block) = graph.block(&id) else {
            continue;
        };
        if id == *seed || reference.accepts(block, alignment) {
            result.push(id.clone());
        }
        for column in block.columns() {
            for neighbor in graph.blocks_of(column) {
                if visited.insert(neighbor.id().clone()) {
                    queue.push_back(neighbor.id().clone());
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ColumnId;

    /// Two parallel east-west walls joined by a north-south return:
    ///
    /// ```text
    ///  z=0   a ── b ── c
    ///                  │
    ///  z=1.5 f ── e ── d
    /// ```
    struct Fixture {
        graph: StructureGraph,
        ab: BlockId,
        bc: BlockId,
        cd: BlockId,
        de: BlockId,
        ef: BlockId,
    }

    fn u_shape() -> Fixture {
        let mut graph = StructureGraph::new();
        let col = |g: &mut StructureGraph, x: f64, z: f64| -> ColumnId { g.add_column(x, z) };
        let a = col(&mut graph, 0.0, 0.0);
        let b = col(&mut graph, 1.5, 0.0);
        let c = col(&mut graph, 3.0, 0.0);
        let d = col(&mut graph, 3.0, 1.5);
        let e = col(&mut graph, 1.5, 1.5);
        let f = col(&mut graph, 0.0, 1.5);
        let ab = graph.add_block(a, b, 0.2).unwrap();
        let bc = graph.add_block(b, c, 0.2).unwrap();
        let cd = graph.add_block(c, d, 0.2).unwrap();
        // Built westward, so orientation differs from the front wall
        let de = graph.add_block(d, e, 0.2).unwrap();
        let ef = graph.add_block(e, f, 0.2).unwrap();
        Fixture { graph, ab, bc, cd, de, ef }
    }

    #[test]
    fn test_axis_classification() {
        assert_eq!(WallAxis::from_angle(0.0), WallAxis::EastWest);
        assert_eq!(WallAxis::from_angle(std::f64::consts::PI), WallAxis::EastWest);
        assert_eq!(WallAxis::from_angle(std::f64::consts::FRAC_PI_2), WallAxis::NorthSouth);
        assert_eq!(WallAxis::from_angle(-std::f64::consts::FRAC_PI_2), WallAxis::NorthSouth);
        assert_eq!(WallAxis::NorthSouth.invariant(DVec2::new(4.0, 9.0)), 4.0);
        assert_eq!(WallAxis::EastWest.invariant(DVec2::new(4.0, 9.0)), 9.0);
    }

    #[test]
    fn test_front_wall() {
        let fx = u_shape();
        assert_eq!(connected_wall(&fx.graph, &fx.ab), vec![fx.ab.clone(), fx.bc.clone()]);
        assert_eq!(connected_wall(&fx.graph, &fx.bc), vec![fx.bc.clone(), fx.ab.clone()]);
    }

    #[test]
    fn test_return_wall_is_alone() {
        let fx = u_shape();
        assert_eq!(connected_wall(&fx.graph, &fx.cd), vec![fx.cd.clone()]);
    }

    #[test]
    fn test_search_passes_through_corner() {
        let fx = u_shape();
        // From the back wall, the walk crosses the return wall but only the back wall matches
        assert_eq!(connected_wall(&fx.graph, &fx.ef), vec![fx.ef.clone(), fx.de.clone()]);
    }

    #[test]
    fn test_height_filter() {
        let mut fx = u_shape();
        let b = fx.graph.block(&fx.ab).unwrap().to_column();
        let c = fx.graph.block(&fx.bc).unwrap().to_column();
        let upper = fx.graph.add_block(b, c, 0.61).unwrap();

        let wall = connected_wall(&fx.graph, &fx.ab);
        assert!(!wall.contains(&upper));
        assert_eq!(connected_wall(&fx.graph, &upper), vec![upper]);
    }

    #[test]
    fn test_offset_parallel_wall() {
        let mut graph = StructureGraph::new();
        let a = graph.add_column(0.0, 0.0);
        let b = graph.add_column(1.5, 0.0);
        let c = graph.add_column(1.5, 1.5);
        let d = graph.add_column(3.0, 1.5);
        let front = graph.add_block(a, b, 0.2).unwrap();
        graph.add_block(b, c, 0.2).unwrap();
        let offset = graph.add_block(c, d, 0.2).unwrap();

        // Coplanar: the offset wall is on another plane
        assert_eq!(connected_wall(&graph, &front), vec![front.clone()]);
        // Course: same height and orientation is enough
        assert_eq!(connected_course(&graph, &front), vec![front, offset]);
    }

    #[test]
    fn test_seed_always_included_and_results_aligned() {
        let fx = u_shape();
        for seed in [&fx.ab, &fx.bc, &fx.cd, &fx.de, &fx.ef] {
            let seed_block = fx.graph.block(seed).unwrap();
            let wall = connected_wall(&fx.graph, seed);
            assert_eq!(wall.first(), Some(seed));
            for id in &wall {
                let block = fx.graph.block(id).unwrap();
                assert!((block.y() - seed_block.y()).abs() < ALIGNMENT_TOLERANCE);
                assert!(angle_difference(block.angle(), seed_block.angle()) < ALIGNMENT_TOLERANCE);
            }
        }
    }

    #[test]
    fn test_angle_difference_wraps() {
        assert!(angle_difference(PI, -PI) < 1e-12);
        assert!((angle_difference(0.0, PI) - PI).abs() < 1e-12);
        assert!((angle_difference(-0.1, 0.1) - 0.2).abs() < 1e-12);
        assert!((angle_difference(PI - 0.05, -PI + 0.05) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_westward_wall_across_angle_seam() {
        let mut graph = StructureGraph::new();
        let a = graph.add_column(4.5, 0.0);
        let b = graph.add_column(3.0, 0.0);
        // A hair south of the line: atan2 lands on -π instead of π
        let c = graph.add_column(1.5, -1e-9);
        let ab = graph.add_block(a, b, 0.2).unwrap();
        let bc = graph.add_block(b, c, 0.2).unwrap();

        assert!(graph.block(&ab).unwrap().angle() > 0.0);
        assert!(graph.block(&bc).unwrap().angle() < 0.0);
        assert_eq!(connected_wall(&graph, &ab), vec![ab.clone(), bc.clone()]);
        assert_eq!(connected_wall(&graph, &bc), vec![bc, ab]);
    }

    #[test]
    fn test_missing_seed() {
        let fx = u_shape();
        assert!(connected_wall(&fx.graph, &BlockId::from("nope")).is_empty());
    }

    #[test]
    fn test_survives_reload() {
        let fx = u_shape();
        let doc = crate::codec::serialize(&fx.graph);
        let reloaded = crate::codec::deserialize(&doc).unwrap();
        assert_eq!(connected_wall(&reloaded, &fx.ab), vec![fx.ab.clone(), fx.bc.clone()]);
    }
}
