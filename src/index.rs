//! Lookups built once, before any row is extracted: prior versions by identity, node positions
//! from both streams, and the authoring context.

use std::collections::HashMap;

use log::info;

use crate::context::ContextStats;
use crate::data::record::{Action, MapCoords, OsmId, RecordKey, VersionedRecord};
use crate::geometry::CoordinateLookup;

#[derive(Debug, Default, Clone)]
pub struct PriorVersionIndex {
    records: HashMap<RecordKey, VersionedRecord>,
}

impl PriorVersionIndex {
    /// Last record seen for a key wins.
    pub fn insert(&mut self, record: VersionedRecord) {
        self.records.insert(record.key(), record);
    }

    pub fn get(&self, key: &RecordKey) -> Option<&VersionedRecord> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Node id to position. Only nodes with both components present are ever stored.
#[derive(Debug, Default, Clone)]
pub struct CoordinateIndex {
    coords: HashMap<OsmId, MapCoords>,
}

impl CoordinateIndex {
    pub fn insert_record(&mut self, record: &VersionedRecord) {
        if let (Some(node_id), Some(coords)) = (record.obj_id.as_int(), record.node_coords()) {
            self.coords.insert(node_id, coords);
        }
    }

    pub fn get(&self, node_id: OsmId) -> Option<MapCoords> {
        self.coords.get(&node_id).copied()
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }
}

impl CoordinateLookup for CoordinateIndex {
    fn lookup(&self, node_id: OsmId) -> Option<MapCoords> {
        self.get(node_id)
    }
}

/// Prior positions first, current positions for nodes that were never re-versioned.
#[derive(Debug, Clone, Copy)]
pub struct FallbackCoordinates<'a> {
    prior: &'a CoordinateIndex,
    current: &'a CoordinateIndex,
}

impl CoordinateLookup for FallbackCoordinates<'_> {
    fn lookup(&self, node_id: OsmId) -> Option<MapCoords> {
        self.prior.get(node_id).or_else(|| self.current.get(node_id))
    }
}

#[derive(Debug, Default, Clone)]
pub struct EditIndex {
    pub prior_versions: PriorVersionIndex,
    pub prior_coords: CoordinateIndex,
    pub current_coords: CoordinateIndex,
    pub context: ContextStats,
}

impl EditIndex {
    pub fn build<I>(prior: I, current: &[VersionedRecord]) -> Self
    where
        I: IntoIterator<Item = VersionedRecord>,
    {
        let mut index = EditIndex::default();

        for record in prior {
            index.prior_coords.insert_record(&record);
            index.prior_versions.insert(record);
        }

        for record in current {
            index.current_coords.insert_record(record);
            index.context.record(record);
        }

        info!(
            prior_versions = index.prior_versions.len(),
            prior_coords = index.prior_coords.len(),
            current_coords = index.current_coords.len();
            "Built edit index"
        );
        index
    }

    pub fn fallback_coords(&self) -> FallbackCoordinates<'_> {
        FallbackCoordinates {
            prior: &self.prior_coords,
            current: &self.current_coords,
        }
    }

    /// The version right before `record`, if it was fetched. Creations never have one.
    pub fn predecessor(&self, record: &VersionedRecord) -> Option<&VersionedRecord> {
        if record.action() == Action::Create || record.version <= 1 {
            return None;
        }
        let key = RecordKey {
            version: record.version - 1,
            ..record.key()
        };
        self.prior_versions.get(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(line: &str) -> VersionedRecord {
        VersionedRecord::from_json_line(line.as_bytes()).unwrap()
    }

    #[test]
    fn prior_coordinates_win_in_fallback() {
        let prior = vec![record(r#"{"obj_type":"node","obj_id":1,"version":1,"geom":{"lat":1.0,"lon":1.0}}"#)];
        let current = vec![
            record(r#"{"obj_type":"node","obj_id":1,"version":2,"action":"modify","geom":{"lat":2.0,"lon":2.0}}"#),
            record(r#"{"obj_type":"node","obj_id":2,"version":1,"action":"create","geom":{"lat":3.0,"lon":3.0}}"#),
        ];
        let index = EditIndex::build(prior, &current);
        let fallback = index.fallback_coords();

        assert_eq!(fallback.lookup(1), Some(MapCoords { lat: 1.0, lon: 1.0 }));
        assert_eq!(fallback.lookup(2), Some(MapCoords { lat: 3.0, lon: 3.0 }));
        assert_eq!(fallback.lookup(3), None);
        assert_eq!(index.current_coords.get(1), Some(MapCoords { lat: 2.0, lon: 2.0 }));
    }

    #[test]
    fn incomplete_geometry_is_never_indexed() {
        let prior = vec![record(r#"{"obj_type":"node","obj_id":1,"version":1,"geom":{"lat":null,"lon":1.0}}"#)];
        let current =
            vec![record(r#"{"obj_type":"node","obj_id":1,"version":2,"action":"modify","geom":{"lat":2.0,"lon":2.0}}"#)];
        let index = EditIndex::build(prior, &current);

        assert!(index.prior_coords.is_empty());
        assert_eq!(index.fallback_coords().lookup(1), Some(MapCoords { lat: 2.0, lon: 2.0 }));
    }

    #[test]
    fn only_integer_node_ids_are_positioned() {
        let current = vec![record(
            r#"{"obj_type":"node","obj_id":"n1","version":1,"action":"create","geom":{"lat":1.0,"lon":1.0}}"#,
        )];
        let index = EditIndex::build(Vec::new(), &current);
        assert!(index.current_coords.is_empty());
    }

    #[test]
    fn duplicate_prior_keys_keep_the_last() {
        let prior = vec![
            record(r#"{"obj_type":"way","obj_id":1,"version":1,"tags":{"a":"1"}}"#),
            record(r#"{"obj_type":"way","obj_id":1,"version":1,"tags":{"a":"2"}}"#),
        ];
        let current = vec![record(r#"{"obj_type":"way","obj_id":1,"version":2,"action":"modify"}"#)];
        let index = EditIndex::build(prior, &current);

        assert_eq!(index.prior_versions.len(), 1);
        let prev = index.predecessor(&current[0]).unwrap();
        assert_eq!(prev.tags.get("a").and_then(|v| v.as_str()), Some("2"));
    }

    #[test]
    fn creations_and_first_versions_have_no_predecessor() {
        let prior = vec![record(r#"{"obj_type":"node","obj_id":1,"version":1}"#)];
        let current = vec![
            record(r#"{"obj_type":"node","obj_id":1,"version":2,"action":"create"}"#),
            record(r#"{"obj_type":"node","obj_id":1,"version":1,"action":"modify"}"#),
            record(r#"{"obj_type":"way","obj_id":1,"version":2,"action":"modify"}"#),
            record(r#"{"obj_type":"node","obj_id":1,"version":2,"action":"modify"}"#),
        ];
        let index = EditIndex::build(prior, &current);

        assert!(index.predecessor(&current[0]).is_none());
        assert!(index.predecessor(&current[1]).is_none());
        assert!(index.predecessor(&current[2]).is_none());
        assert!(index.predecessor(&current[3]).is_some());
    }
}
