//! # Project Data Structures
//!
//! The `Project` struct is the root container for a saved scene. Projects
//! serialize to `.wall` files as human-readable JSON.
//!
//! ## Structure
//!
//! ```text
//! Project
//! ├── meta: ProjectMetadata (schema version, name, timestamps)
//! ├── settings: Settings (element dimensions, cost rates)
//! └── scene: SceneDocument (index-based columns and blocks)
//! ```
//!
//! The scene is kept in its document form so a project file embeds exactly
//! the same format the codec exchanges with other tools.
//!
//! ## Example
//!
//! ```rust
//! use wall_core::graph::StructureGraph;
//! use wall_core::project::Project;
//!
//! let mut graph = StructureGraph::seeded();
//! graph.add_column(1.5, 0.0);
//!
//! let project = Project::from_graph("Garden wall", &graph);
//! let json = serde_json::to_string_pretty(&project).unwrap();
//! assert!(json.contains("Garden wall"));
//!
//! let restored = project.to_graph().unwrap();
//! assert_eq!(restored.column_count(), 2);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::{self, SceneDocument};
use crate::config::Settings;
use crate::errors::WallResult;
use crate::graph::StructureGraph;

/// Current schema version for .wall files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Root project container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Project metadata (version, name, timestamps)
    pub meta: ProjectMetadata,

    /// Dimensions and rates used when editing and estimating this scene
    #[serde(default)]
    pub settings: Settings,

    /// The structure, in persisted document form
    pub scene: SceneDocument,
}

impl Project {
    /// Create a project holding the session-start graph (one column at the origin).
    ///
    /// # Example
    ///
    /// ```rust
    /// use wall_core::project::{Project, SCHEMA_VERSION};
    ///
    /// let project = Project::new("Shed");
    /// assert_eq!(project.meta.version, SCHEMA_VERSION);
    /// assert_eq!(project.scene.columns.len(), 1);
    /// ```
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_graph(name, &StructureGraph::seeded())
    }

    /// Create a project from an existing graph with default settings.
    pub fn from_graph(name: impl Into<String>, graph: &StructureGraph) -> Self {
        let now = Utc::now();
        Project {
            meta: ProjectMetadata {
                version: SCHEMA_VERSION.to_string(),
                name: name.into(),
                created: now,
                modified: now,
            },
            settings: Settings::default(),
            scene: codec::serialize(graph),
        }
    }

    /// Rebuild the graph stored in this project.
    pub fn to_graph(&self) -> WallResult<StructureGraph> {
        codec::deserialize(&self.scene)
    }

    /// Replace the stored scene with the current state of `graph`.
    pub fn update_scene(&mut self, graph: &StructureGraph) {
        self.scene = codec::serialize(graph);
        self.touch();
    }

    /// Check the settings and the scene document.
    pub fn validate(&self) -> WallResult<()> {
        self.settings.validate()?;
        codec::deserialize(&self.scene).map(|_| ())
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.meta.modified = Utc::now();
    }
}

impl Default for Project {
    fn default() -> Self {
        Project::new("")
    }
}

/// Project metadata stored in the file header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Schema version (for migration compatibility)
    pub version: String,

    /// Display name of the project
    pub name: String,

    /// When the project was created
    pub created: DateTime<Utc>,

    /// When the project was last modified
    pub modified: DateTime<Utc>,
}
