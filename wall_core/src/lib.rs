//! # wall_core - Modular Wall Structure Engine
//!
//! `wall_core` models a wall built from vertical **columns** and horizontal
//! **blocks** spanning pairs of columns. It grows the structure from drag
//! gestures, finds continuous walls for selection, estimates cost, and
//! persists scenes in a compact index-based JSON document.
//!
//! Rendering and input handling stay outside the core: callers translate
//! pointer input into [`session::PickTarget`]s and world-space points, and
//! mirror the structure by draining [`graph::GraphEvent`]s.
//!
//! ## Design Philosophy
//!
//! - **Explicit context**: the graph, the interaction session and the
//!   configuration are separate values passed into every operation
//! - **JSON-First**: documents, settings and events implement Serialize/Deserialize
//! - **Rich Errors**: structured error types, not just strings
//!
//! ## Quick Start
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
//! // Drag the seed column's east handle 4.6 units
//! let handle = PickTarget::ColumnHandle { column: seed, direction: Direction::East };
//! session.press(&graph, &handle, DVec3::ZERO);
//! drag_to(&mut session, &mut graph, &scene, DVec3::new(4.6, 0.0, 0.0));
//! session.release();
//!
//! assert_eq!(graph.column_count(), 4);
//! assert_eq!(graph.block_count(), 3);
//! ```
//!
//! ## Modules
//!
//! - [`graph`] - Columns, blocks and their incidence
//! - [`construction`] - Drag-driven growth of columns and blocks
//! - [`connectivity`] - Continuous-wall search
//! - [`session`] - Selection, hover and active drag state
//! - [`codec`] - Index-based scene documents
//! - [`estimate`] - Materials and labor cost
//! - [`config`] - Element dimensions and TOML settings
//! - [`project`] - Project container and metadata
//! - [`file_io`] - File operations with atomic saves and locking
//! - [`errors`] - Structured error types

pub mod codec;
pub mod config;
pub mod connectivity;
pub mod construction;
pub mod errors;
pub mod estimate;
pub mod file_io;
pub mod graph;
pub mod project;
pub mod session;

// Re-export commonly used types at crate root for convenience
pub use codec::SceneDocument;
pub use config::{SceneConfig, Settings};
pub use errors::{WallError, WallResult};
pub use file_io::{load_project, save_project, FileLock};
pub use graph::{Block, BlockId, Column, ColumnId, GraphEvent, StructureGraph};
pub use project::{Project, ProjectMetadata};
pub use session::{PickTarget, Session};
