//! Node, edge and label tables for the graph model, built from the same diffs as the feature table.

use std::collections::{HashMap, HashSet};
use std::io;

use serde::Serialize;

use crate::data::record::{Action, LooseId, ObjectType, VersionedRecord};
use crate::data::table::{FeatureRow, Table};
use crate::errors::Result;
use crate::extract::RecordDiff;

pub const NODE_COLUMNS: [&str; 14] = [
    "object_id",
    "object_type_id",
    "is_created",
    "is_deleted",
    "version_delta",
    "tag_count_before",
    "tag_count_after",
    "tag_add_count",
    "tag_remove_count",
    "tag_modify_count",
    "geo_shift_distance",
    "length_change_ratio",
    "centroid_shift",
    "member_count_delta",
];

pub const LABEL_COLUMNS: [&str; 2] = ["object_id", "label"];

const SHIFT_THRESHOLD_M: f64 = 50.0;
const TAG_CHURN_THRESHOLD: usize = 5;
const LENGTH_RATIO_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Contains,
    MemberOf,
    Connected,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    pub src_id: String,
    pub dst_id: String,
    pub edge_type: EdgeType,
}

impl Edge {
    fn new(src_id: impl ToString, dst_id: impl ToString, edge_type: EdgeType) -> Self {
        Edge {
            src_id: src_id.to_string(),
            dst_id: dst_id.to_string(),
            edge_type,
        }
    }
}

/// Versions since the predecessor, or since nothing when there is none.
fn version_delta(diff: &RecordDiff) -> i64 {
    let previous = if diff.has_predecessor { diff.version - 1 } else { 0 };
    diff.version - previous
}

/// Plain length ratio: a previous way of zero length counts as unchanged.
fn length_ratio(diff: &RecordDiff) -> f64 {
    let before = diff.geometry.previous_length_m;
    if before > 0.0 {
        (diff.geometry.current_length_m - before) / before
    } else {
        0.0
    }
}

fn geo_shift(diff: &RecordDiff) -> f64 {
    if diff.obj_type == ObjectType::Node {
        diff.geometry.centroid_shift
    } else {
        0.0
    }
}

pub fn node_row(diff: &RecordDiff) -> FeatureRow {
    let mut row = FeatureRow::new();
    row.set("object_id", &diff.obj_id);
    row.set("object_type_id", diff.obj_type.code());
    row.set("is_created", diff.action == Action::Create);
    row.set("is_deleted", diff.action == Action::Delete);
    row.set("version_delta", version_delta(diff));
    row.set("tag_count_before", diff.tags.count_before);
    row.set("tag_count_after", diff.tags.count);
    row.set("tag_add_count", diff.tags.added);
    row.set("tag_remove_count", diff.tags.removed);
    row.set("tag_modify_count", diff.tags.modified);
    row.set("geo_shift_distance", geo_shift(diff));
    row.set("length_change_ratio", length_ratio(diff));
    row.set("centroid_shift", diff.geometry.centroid_shift);
    let member_delta = if diff.obj_type == ObjectType::Relation {
        diff.geometry.node_count_change
    } else {
        0
    };
    row.set("member_count_delta", member_delta);
    row
}

/// Rule-based weak label: large moves, heavy tag churn, deletions or big length changes.
pub fn is_anomalous(diff: &RecordDiff) -> bool {
    let tag_churn = diff.tags.added + diff.tags.removed + diff.tags.modified;
    let ratio = length_ratio(diff);

    geo_shift(diff) > SHIFT_THRESHOLD_M
        || tag_churn > TAG_CHURN_THRESHOLD
        || diff.action == Action::Delete
        || (ratio.is_finite() && ratio.abs() > LENGTH_RATIO_THRESHOLD)
}

pub fn label_row(diff: &RecordDiff) -> FeatureRow {
    let mut row = FeatureRow::new();
    row.set("object_id", &diff.obj_id);
    row.set("label", is_anomalous(diff));
    row
}

/// Structural edges between the current records. Duplicates are dropped, first occurrence kept.
pub fn build_edges(current: &[VersionedRecord]) -> Vec<Edge> {
    let mut edges = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |edge: Edge| {
        if seen.insert(edge.clone()) {
            edges.push(edge);
        }
    };

    // node ref -> ways that use it, in order of first use
    let mut ways_by_node: Vec<(String, Vec<LooseId>)> = Vec::new();
    let mut node_slot: HashMap<String, usize> = HashMap::new();

    for record in current {
        match record.obj_type {
            ObjectType::Way => {
                for node_ref in &record.refs.node_refs {
                    let raw = node_ref.raw();
                    push(Edge::new(&record.obj_id, &raw, EdgeType::Contains));

                    let slot = *node_slot.entry(raw.clone()).or_insert_with(|| {
                        ways_by_node.push((raw, Vec::new()));
                        ways_by_node.len() - 1
                    });
                    let ways = &mut ways_by_node[slot].1;
                    if !ways.contains(&record.obj_id) {
                        ways.push(record.obj_id.clone());
                    }
                }
            }
            ObjectType::Relation => {
                for member in &record.refs.members {
                    if let Some(member_ref) = &member.member_ref {
                        push(Edge::new(&record.obj_id, member_ref.raw(), EdgeType::MemberOf));
                    }
                }
            }
            ObjectType::Node | ObjectType::Other(_) => (),
        }
    }

    for (_, ways) in &ways_by_node {
        for (i, first) in ways.iter().enumerate() {
            for second in &ways[i + 1..] {
                push(Edge::new(first, second, EdgeType::Connected));
                push(Edge::new(second, first, EdgeType::Connected));
            }
        }
    }

    edges
}

pub fn write_edges<W: io::Write>(edges: &[Edge], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    if edges.is_empty() {
        wtr.write_record(["src_id", "dst_id", "edge_type"])?;
    }
    for edge in edges {
        wtr.serialize(edge)?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct GraphTables {
    pub nodes: Table,
    pub edges: Vec<Edge>,
    pub labels: Table,
}

impl GraphTables {
    pub fn new() -> Self {
        GraphTables {
            nodes: Table::new(&NODE_COLUMNS),
            edges: Vec::new(),
            labels: Table::new(&LABEL_COLUMNS),
        }
    }

    pub fn push(&mut self, diff: &RecordDiff) {
        self.nodes.push(&node_row(diff));
        self.labels.push(&label_row(diff));
    }
}

impl Default for GraphTables {
    fn default() -> Self {
        Self::new()
    }
}
