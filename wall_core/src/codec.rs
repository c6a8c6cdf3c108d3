//! # Persistence Codec
//!
//! Converts a [`StructureGraph`] to and from its compact, index-based
//! document format.
//!
//! ## Wire Format
//!
//! ```json
//! {
//!   "columns": [ { "x": 0.0, "z": 0.0 }, { "x": 1.0, "z": 0.0 } ],
//!   "blocks":  [ { "id": "a", "fromColumnIndex": 0, "toColumnIndex": 1, "y": 0.2 } ]
//! }
//! ```
//!
//! Column indices refer to positions in the same document's `columns`
//! array, so a document is self-contained. Column identities are not
//! persisted; block ids are.
//!
//! Loading is all-or-nothing: the whole document is validated and built
//! into a fresh graph before anything is installed.
//!
//! ## Example
//!
//! ```rust
//! use wall_core::codec;
//!
//! let json = r#"{"columns":[{"x":0,"z":0},{"x":1,"z":0}],
//!               "blocks":[{"id":"a","fromColumnIndex":0,"toColumnIndex":1,"y":0.2}]}"#;
//! let doc = codec::from_json(json).unwrap();
//! let graph = codec::deserialize(&doc).unwrap();
//!
//! assert_eq!(graph.column_count(), 2);
//! assert_eq!(graph.block_count(), 1);
//! assert_eq!(codec::serialize(&graph), doc);
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::{WallError, WallResult};
use crate::graph::{BlockId, ColumnId, StructureGraph, HEIGHT_TOLERANCE};

/// A column in the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnRecord {
    pub x: f64,
    pub z: f64,
}

/// A block in the wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRecord {
    pub id: String,
    /// Zero-based index into [`SceneDocument::columns`]
    pub from_column_index: i64,
    /// Zero-based index into [`SceneDocument::columns`]
    pub to_column_index: i64,
    pub y: f64,
}

/// The complete persisted form of a graph.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneDocument {
    pub columns: Vec<ColumnRecord>,
    pub blocks: Vec<BlockRecord>,
}

/// Emit the graph as a document: columns and blocks in creation order.
pub fn serialize(graph: &StructureGraph) -> SceneDocument {
    let mut index: HashMap<ColumnId, usize> = HashMap::with_capacity(graph.column_count());
    let columns = graph
        .columns()
        .enumerate()
        .map(|(i, column)| {
            index.insert(column.id(), i);
            ColumnRecord {
                x: column.x(),
                z: column.z(),
            }
        })
        .collect();

    let blocks = graph
        .blocks()
        .filter_map(|block| {
            let from = *index.get(&block.from_column())?;
            let to = *index.get(&block.to_column())?;
            Some(BlockRecord {
                id: block.id().to_string(),
                from_column_index: from as i64,
                to_column_index: to as i64,
                y: block.y(),
            })
        })
        .collect();

    SceneDocument { columns, blocks }
}

/// Build a fresh graph from a document.
///
/// Fails with a load error on an out-of-range column index, a block whose
/// two indices are equal, a duplicate block id, two blocks on the same
/// column pair and height, or a non-finite coordinate.
pub fn deserialize(doc: &SceneDocument) -> WallResult<StructureGraph> {
    let mut graph = StructureGraph::new();

    let mut columns = Vec::with_capacity(doc.columns.len());
    for (i, record) in doc.columns.iter().enumerate() {
        if !record.x.is_finite() || !record.z.is_finite() {
            return Err(WallError::invalid_document(format!(
                "column {} has a non-finite position",
                i
            )));
        }
        columns.push(graph.add_column(record.x, record.z));
    }

    let mut ids: HashSet<&str> = HashSet::with_capacity(doc.blocks.len());
    for record in &doc.blocks {
        let from = resolve(&columns, record, "fromColumnIndex", record.from_column_index)?;
        let to = resolve(&columns, record, "toColumnIndex", record.to_column_index)?;

        if from == to {
            return Err(WallError::invalid_document(format!(
                "block '{}' connects column {} to itself",
                record.id, record.from_column_index
            )));
        }
        if !record.y.is_finite() {
            return Err(WallError::invalid_document(format!(
                "block '{}' has a non-finite height",
                record.id
            )));
        }
        if !ids.insert(record.id.as_str()) {
            return Err(WallError::invalid_document(format!(
                "duplicate block id '{}'",
                record.id
            )));
        }
        if let Some(existing) = graph.find_block(from, to, record.y, HEIGHT_TOLERANCE) {
            return Err(WallError::invalid_document(format!(
                "block '{}' duplicates block '{}' (same columns and height)",
                record.id,
                existing.id()
            )));
        }

        graph.insert_block(BlockId::from(record.id.as_str()), from, to, record.y)?;
    }

    Ok(graph)
}

fn resolve(columns: &[ColumnId], record: &BlockRecord, field: &str, index: i64) -> WallResult<ColumnId> {
    usize::try_from(index)
        .ok()
        .and_then(|i| columns.get(i).copied())
        .ok_or_else(|| WallError::ColumnIndexOutOfRange {
            block_id: record.id.clone(),
            field: field.to_string(),
            index,
            column_count: columns.len(),
        })
}

/// Replace the contents of `graph` with the document.
///
/// On error `graph` is left exactly as it was.
pub fn load(graph: &mut StructureGraph, doc: &SceneDocument) -> WallResult<()> {
    let fresh = deserialize(doc).inspect_err(|e| warn!(error = %e, "rejected scene document"))?;
    info!(
        columns = fresh.column_count(),
        blocks = fresh.block_count(),
        "scene loaded"
    );
    graph.replace_with(fresh);
    Ok(())
}

/// Parse a document from JSON text.
pub fn from_json(json: &str) -> WallResult<SceneDocument> {
    serde_json::from_str(json).map_err(WallError::serialization)
}

/// Serialize the graph to compact JSON text.
pub fn to_json(graph: &StructureGraph) -> WallResult<String> {
    serde_json::to_string(&serialize(graph)).map_err(WallError::serialization)
}

/// Parse JSON text and load it into `graph` (all-or-nothing).
pub fn load_json(graph: &mut StructureGraph, json: &str) -> WallResult<()> {
    let doc = from_json(json)?;
    load(graph, &doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphEvent;
    use proptest::prelude::*;

    const EXAMPLE: &str = r#"{"columns":[{"x":0,"z":0},{"x":1,"z":0}],"blocks":[{"id":"a","fromColumnIndex":0,"toColumnIndex":1,"y":0.2}]}"#;

    #[test]
    fn test_load_example_document() {
        let mut graph = StructureGraph::seeded();
        load_json(&mut graph, EXAMPLE).unwrap();

        assert_eq!(graph.column_count(), 2);
        assert_eq!(graph.block_count(), 1);

        let block = graph.block(&BlockId::from("a")).unwrap();
        assert_eq!(block.y(), 0.2);
        let from = graph.column(block.from_column()).unwrap();
        let to = graph.column(block.to_column()).unwrap();
        assert_eq!((from.x(), from.z()), (0.0, 0.0));
        assert_eq!((to.x(), to.z()), (1.0, 0.0));
        assert_eq!(from.blocks(), &[BlockId::from("a")]);
        assert_eq!(to.blocks(), &[BlockId::from("a")]);
    }

    #[test]
    fn test_json_field_names() {
        let graph = deserialize(&from_json(EXAMPLE).unwrap()).unwrap();
        let json = to_json(&graph).unwrap();
        assert!(json.contains("\"fromColumnIndex\":0"));
        assert!(json.contains("\"toColumnIndex\":1"));
        assert!(json.contains("\"id\":\"a\""));

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let expected: serde_json::Value = serde_json::from_str(EXAMPLE).unwrap();
        assert_eq!(value["blocks"], expected["blocks"]);
        assert_eq!(value["columns"][1]["x"], 1.0);
    }

    #[test]
    fn test_serialize_uses_current_indices() {
        let mut graph = StructureGraph::new();
        let a = graph.add_column(0.0, 0.0);
        let b = graph.add_column(1.5, 0.0);
        let c = graph.add_column(3.0, 0.0);
        graph.add_block(b, c, 0.2).unwrap();
        graph.destroy_column(a);

        let doc = serialize(&graph);
        assert_eq!(doc.columns.len(), 2);
        assert_eq!(doc.blocks[0].from_column_index, 0);
        assert_eq!(doc.blocks[0].to_column_index, 1);
    }

    #[test]
    fn test_out_of_range_index_leaves_graph_untouched() {
        let mut graph = StructureGraph::seeded();
        graph.drain_events();
        let bad = r#"{"columns":[{"x":0,"z":0}],"blocks":[{"id":"a","fromColumnIndex":0,"toColumnIndex":3,"y":0.2}]}"#;

        let err = load_json(&mut graph, bad).unwrap_err();
        assert!(err.is_load_error());
        match err {
            WallError::ColumnIndexOutOfRange { index, column_count, field, .. } => {
                assert_eq!(index, 3);
                assert_eq!(column_count, 1);
                assert_eq!(field, "toColumnIndex");
            }
            other => panic!("Expected ColumnIndexOutOfRange, got {:?}", other),
        }
        assert_eq!(graph.column_count(), 1);
        assert_eq!(graph.block_count(), 0);
        assert!(graph.events().is_empty());
    }

    #[test]
    fn test_negative_index() {
        let bad = r#"{"columns":[{"x":0,"z":0},{"x":1,"z":0}],"blocks":[{"id":"a","fromColumnIndex":-1,"toColumnIndex":1,"y":0.2}]}"#;
        let err = deserialize(&from_json(bad).unwrap()).unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_INDEX_OUT_OF_RANGE");
    }

    #[test]
    fn test_rejects_structural_problems() {
        let two = vec![ColumnRecord { x: 0.0, z: 0.0 }, ColumnRecord { x: 1.0, z: 0.0 }];
        let block = |id: &str, from: i64, to: i64, y: f64| BlockRecord {
            id: id.to_string(),
            from_column_index: from,
            to_column_index: to,
            y,
        };

        let self_loop = SceneDocument {
            columns: two.clone(),
            blocks: vec![block("a", 1, 1, 0.2)],
        };
        let duplicate_id = SceneDocument {
            columns: two.clone(),
            blocks: vec![block("a", 0, 1, 0.2), block("a", 0, 1, 0.6)],
        };
        let duplicate_slot = SceneDocument {
            columns: two.clone(),
            blocks: vec![block("a", 0, 1, 0.2), block("b", 1, 0, 0.2)],
        };
        let bad_height = SceneDocument {
            columns: two,
            blocks: vec![block("a", 0, 1, f64::INFINITY)],
        };

        for doc in [self_loop, duplicate_id, duplicate_slot, bad_height] {
            let err = deserialize(&doc).unwrap_err();
            assert_eq!(err.error_code(), "INVALID_DOCUMENT", "{:?}", doc);
        }
    }

    #[test]
    fn test_malformed_json() {
        let mut graph = StructureGraph::seeded();
        let err = load_json(&mut graph, "{\"columns\": [").unwrap_err();
        assert!(err.is_load_error());
        assert_eq!(graph.column_count(), 1);
    }

    #[test]
    fn test_load_emits_replacement_events() {
        let mut graph = StructureGraph::seeded();
        let seed = graph.column_at(0).unwrap();
        graph.drain_events();

        load_json(&mut graph, EXAMPLE).unwrap();
        let events = graph.drain_events();

        assert_eq!(events[0], GraphEvent::ColumnDestroyed(seed));
        assert_eq!(events.len(), 4);
        assert_eq!(events[3], GraphEvent::BlockCreated(BlockId::from("a")));
    }

    #[test]
    fn test_empty_document() {
        let mut graph = StructureGraph::seeded();
        load(&mut graph, &SceneDocument::default()).unwrap();
        assert!(graph.is_empty());
        assert_eq!(serialize(&graph), SceneDocument::default());
    }

    /// Build a valid document from raw generated parts, skipping blocks that
    /// would be self-loops or duplicate an earlier (pair, level) slot.
    fn build_document(columns: Vec<(i32, i32)>, blocks: Vec<(usize, usize, u8)>) -> SceneDocument {
        let columns: Vec<ColumnRecord> = columns
            .into_iter()
            .map(|(x, z)| ColumnRecord {
                x: f64::from(x) * 1.5,
                z: f64::from(z) * 1.5,
            })
            .collect();
        let n = columns.len();
        let mut slots = HashSet::new();
        let mut records = Vec::new();
        for (i, (from, to, level)) in blocks.into_iter().enumerate() {
            let (from, to) = (from % n, to % n);
            if from == to || !slots.insert((from.min(to), from.max(to), level)) {
                continue;
            }
            records.push(BlockRecord {
                id: format!("b{}", i),
                from_column_index: from as i64,
                to_column_index: to as i64,
                y: 0.205 + f64::from(level) * 0.41,
            });
        }
        SceneDocument {
            columns,
            blocks: records,
        }
    }

    proptest! {
        /// Property: serialize(deserialize(d)) == d for every valid document
        #[test]
        fn prop_round_trip(
            columns in proptest::collection::vec((-20i32..20, -20i32..20), 2..12),
            blocks in proptest::collection::vec((0usize..64, 0usize..64, 0u8..6), 0..40),
        ) {
            let doc = build_document(columns, blocks);
            let graph = deserialize(&doc).unwrap();
            prop_assert_eq!(graph.column_count(), doc.columns.len());
            prop_assert_eq!(graph.block_count(), doc.blocks.len());
            prop_assert_eq!(serialize(&graph), doc);
        }

        /// Property: a block index past the column list is always rejected
        #[test]
        fn prop_out_of_range_rejected(
            column_count in 1usize..6,
            overshoot in 0i64..10,
        ) {
            let doc = SceneDocument {
                columns: vec![ColumnRecord { x: 0.0, z: 0.0 }; column_count],
                blocks: vec![BlockRecord {
                    id: "x".to_string(),
                    from_column_index: 0,
                    to_column_index: column_count as i64 + overshoot,
                    y: 0.2,
                }],
            };
            let err = deserialize(&doc).unwrap_err();
            prop_assert!(err.is_load_error());
        }
    }
}
