//! Per-record comparison against the preceding version, and the feature row built from it.

use crate::data::record::{Action, LooseId, ObjectType, Tags, VersionedRecord};
use crate::data::table::FeatureRow;
use crate::geometry::{distance, way_metrics};
use crate::index::EditIndex;

/// Floor for ratio denominators.
const RATIO_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagDiff {
    pub count: usize,
    pub count_before: usize,
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub name_changed: bool,
}

impl TagDiff {
    pub fn between(current: &Tags, previous: Option<&Tags>) -> Self {
        let empty = Tags::new();
        let previous = previous.unwrap_or(&empty);

        let added = current.keys().filter(|k| !previous.contains_key(*k)).count();
        let removed = previous.keys().filter(|k| !current.contains_key(*k)).count();
        let modified = current
            .iter()
            .filter(|(k, v)| previous.get(*k).is_some_and(|before| before != *v))
            .count();

        TagDiff {
            count: current.len(),
            count_before: previous.len(),
            added,
            removed,
            modified,
            name_changed: name_of(current) != name_of(previous),
        }
    }
}

// null and absent names are the same thing
fn name_of(tags: &Tags) -> Option<&serde_json::Value> {
    tags.get("name").filter(|v| !v.is_null())
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GeometryDiff {
    pub length_change_ratio: f64,
    pub area_change_ratio: f64,
    pub node_count_change: i64,
    pub centroid_shift: f64,
    /// Way lengths in metres, zero unless both versions are ways.
    pub current_length_m: f64,
    pub previous_length_m: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContextFeatures {
    pub changeset_size: u64,
    pub user_edit_count: u64,
    pub user_object_diversity: usize,
    pub time_gap_prev: i64,
}

/// Everything known about one edit relative to its predecessor.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDiff {
    pub changeset_id: Option<LooseId>,
    pub obj_id: LooseId,
    pub obj_type: ObjectType,
    pub version: i64,
    pub action: Action,
    pub last_modified: i64,
    pub created: i64,
    pub has_predecessor: bool,
    pub tags: TagDiff,
    pub geometry: GeometryDiff,
    pub context: ContextFeatures,
}

fn change_ratio(current: f64, previous: f64) -> f64 {
    (current - previous) / previous.max(RATIO_EPSILON)
}

fn reference_count(record: &VersionedRecord) -> i64 {
    i64::try_from(record.refs.len()).unwrap_or(i64::MAX)
}

pub struct FeatureExtractor<'a> {
    index: &'a EditIndex,
}

impl<'a> FeatureExtractor<'a> {
    pub fn new(index: &'a EditIndex) -> Self {
        FeatureExtractor { index }
    }

    fn geometry_diff(&self, current: &VersionedRecord, previous: Option<&VersionedRecord>) -> GeometryDiff {
        let mut diff = GeometryDiff {
            node_count_change: reference_count(current) - previous.map_or(0, reference_count),
            ..GeometryDiff::default()
        };

        match current.obj_type {
            ObjectType::Node => {
                if let Some(previous) = previous {
                    diff.centroid_shift = distance(current.node_coords(), previous.node_coords());
                }
            }
            ObjectType::Way => {
                if let Some(previous) = previous {
                    let now = way_metrics(&current.refs.node_refs, &self.index.current_coords);
                    let before = way_metrics(&previous.refs.node_refs, &self.index.fallback_coords());

                    diff.current_length_m = now.length_m;
                    diff.previous_length_m = before.length_m;
                    diff.length_change_ratio = change_ratio(now.length_m, before.length_m);
                    diff.area_change_ratio = change_ratio(now.area_m2, before.area_m2);
                    // a zero-length previous way has no meaningful centroid
                    if before.length_m > 0.0 {
                        diff.centroid_shift = distance(Some(now.centroid), Some(before.centroid));
                    }
                }
            }
            ObjectType::Relation | ObjectType::Other(_) => (),
        }
        diff
    }

    fn context(&self, current: &VersionedRecord, previous: Option<&VersionedRecord>) -> ContextFeatures {
        let stats = &self.index.context;
        let author = current.author();

        let previous_ts = previous.map_or(0, VersionedRecord::timestamp_secs);
        let time_gap_prev = if previous_ts > 0 {
            current.timestamp_secs() - previous_ts
        } else {
            0
        };

        ContextFeatures {
            changeset_size: stats.changesets.size(current.changeset_id.as_ref()),
            user_edit_count: stats.authors.edit_count(&author),
            user_object_diversity: stats.authors.object_diversity(&author),
            time_gap_prev,
        }
    }

    pub fn diff(&self, current: &VersionedRecord) -> RecordDiff {
        let previous = self.index.predecessor(current);
        let last_modified = current.timestamp_secs();

        RecordDiff {
            changeset_id: current.changeset_id.clone(),
            obj_id: current.obj_id.clone(),
            obj_type: current.obj_type.clone(),
            version: current.version,
            action: current.action(),
            last_modified,
            created: if current.version == 1 { last_modified } else { 0 },
            has_predecessor: previous.is_some(),
            tags: TagDiff::between(&current.tags, previous.map(|p| &p.tags)),
            geometry: self.geometry_diff(current, previous),
            context: self.context(current, previous),
        }
    }

    pub fn extract_row(&self, current: &VersionedRecord) -> FeatureRow {
        FeatureRow::from(&self.diff(current))
    }
}

impl From<&RecordDiff> for FeatureRow {
    fn from(diff: &RecordDiff) -> Self {
        let mut row = FeatureRow::new();

        row.set("changeset_id", diff.changeset_id.as_ref());
        row.set("obj_id", &diff.obj_id);

        row.set("object_type", diff.obj_type.code());
        row.set("version_count", diff.version);
        row.set("is_delete", diff.action == Action::Delete);
        row.set("is_create", diff.action == Action::Create);
        row.set("is_modify", diff.action == Action::Modify);
        row.set("last_modified_time", diff.last_modified);
        row.set("created_time", diff.created);

        row.set("tag_count", diff.tags.count);
        row.set("tag_add_count", diff.tags.added);
        row.set("tag_remove_count", diff.tags.removed);
        row.set("tag_modify_count", diff.tags.modified);
        row.set("name_changed", diff.tags.name_changed);

        row.set("length_change_ratio", diff.geometry.length_change_ratio);
        row.set("area_change_ratio", diff.geometry.area_change_ratio);
        row.set("node_count_change", diff.geometry.node_count_change);
        row.set("centroid_shift", diff.geometry.centroid_shift);

        row.set("changeset_size", diff.context.changeset_size);
        row.set("user_edit_count", diff.context.user_edit_count);
        row.set("user_object_diversity", diff.context.user_object_diversity);
        row.set("time_gap_prev", diff.context.time_gap_prev);

        row
    }
}
