use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer};

use crate::data::table::FeatureValue;
use crate::errors::Result;

pub type OsmId = i64;

/// Tag values are compared as written; the fetcher emits strings but nothing enforces it.
pub type Tags = HashMap<String, serde_json::Value>;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum ObjectType {
    Node,
    Way,
    Relation,
    Other(String),
}

impl From<String> for ObjectType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "node" => ObjectType::Node,
            "way" => ObjectType::Way,
            "relation" => ObjectType::Relation,
            _ => ObjectType::Other(value),
        }
    }
}

impl ObjectType {
    pub fn code(&self) -> i64 {
        match self {
            ObjectType::Node => 0,
            ObjectType::Way => 1,
            ObjectType::Relation => 2,
            ObjectType::Other(_) => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Modify,
    Delete,
    Unknown,
}

impl Action {
    fn parse(value: Option<&str>) -> Action {
        match value.map(str::to_lowercase).as_deref() {
            Some("create") => Action::Create,
            Some("modify") => Action::Modify,
            Some("delete") => Action::Delete,
            _ => Action::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapCoords {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Geom {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

impl Geom {
    /// Both components present, otherwise the position is treated as unknown.
    pub fn coords(&self) -> Option<MapCoords> {
        Some(MapCoords {
            lat: self.lat?,
            lon: self.lon?,
        })
    }
}

/// A node reference as it appears on the wire. The fetcher writes them as strings, hand-written
/// fixtures tend to use integers, and anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NodeRef {
    Id(OsmId),
    Text(String),
    Other(serde_json::Value),
}

impl NodeRef {
    pub fn id(&self) -> Option<OsmId> {
        match self {
            NodeRef::Id(id) => Some(*id),
            NodeRef::Text(text) => text.trim().parse().ok(),
            NodeRef::Other(_) => None,
        }
    }

    pub fn raw(&self) -> String {
        match self {
            NodeRef::Id(id) => id.to_string(),
            NodeRef::Text(text) => text.clone(),
            NodeRef::Other(value) => value.to_string(),
        }
    }
}

impl From<OsmId> for NodeRef {
    fn from(value: OsmId) -> Self {
        NodeRef::Id(value)
    }
}

impl From<&str> for NodeRef {
    fn from(value: &str) -> Self {
        NodeRef::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    #[serde(default, rename = "type")]
    pub member_type: Option<String>,
    #[serde(default, rename = "ref")]
    pub member_ref: Option<NodeRef>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Refs {
    #[serde(default, deserialize_with = "null_as_default")]
    pub node_refs: Vec<NodeRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub members: Vec<Member>,
}

impl Refs {
    /// Length of the reference list: node refs for ways, members otherwise.
    pub fn len(&self) -> usize {
        if self.node_refs.is_empty() {
            self.members.len()
        } else {
            self.node_refs.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An identifier field as found on the wire. Non-integer ids still key the indices and
/// statistics; they only become 0 once the table is sanitized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum LooseId {
    Int(i64),
    Text(String),
    /// Any other JSON value, kept as its serialized text.
    Json(String),
}

impl From<serde_json::Value> for LooseId {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(id) => LooseId::Int(id),
                None => LooseId::Json(number.to_string()),
            },
            serde_json::Value::String(text) => LooseId::Text(text),
            other => LooseId::Json(other.to_string()),
        }
    }
}

impl LooseId {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            LooseId::Int(id) => Some(*id),
            LooseId::Text(_) | LooseId::Json(_) => None,
        }
    }
}

impl std::fmt::Display for LooseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LooseId::Int(id) => write!(f, "{}", id),
            LooseId::Text(text) | LooseId::Json(text) => f.write_str(text),
        }
    }
}

impl From<&LooseId> for FeatureValue {
    fn from(value: &LooseId) -> Self {
        match value {
            LooseId::Int(id) => FeatureValue::Int(*id),
            LooseId::Text(text) | LooseId::Json(text) => FeatureValue::Text(text.clone()),
        }
    }
}

impl From<Option<&LooseId>> for FeatureValue {
    fn from(value: Option<&LooseId>) -> Self {
        value.map_or(FeatureValue::Missing, FeatureValue::from)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub obj_type: ObjectType,
    pub obj_id: LooseId,
    pub version: i64,
}

/// One observed state of a map feature, as written by the changeset and version fetchers.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionedRecord {
    pub obj_type: ObjectType,
    pub obj_id: LooseId,
    pub version: i64,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub geom: Option<Geom>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Tags,
    #[serde(default, deserialize_with = "null_as_default")]
    pub refs: Refs,
    #[serde(default)]
    pub changeset_id: Option<LooseId>,
    #[serde(default)]
    pub uid: Option<LooseId>,
}

impl VersionedRecord {
    pub fn from_json_line(line: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(line)?)
    }

    pub fn key(&self) -> RecordKey {
        RecordKey {
            obj_type: self.obj_type.clone(),
            obj_id: self.obj_id.clone(),
            version: self.version,
        }
    }

    pub fn action(&self) -> Action {
        Action::parse(self.action.as_deref())
    }

    /// Author id, 0 when the record is anonymous.
    pub fn author(&self) -> LooseId {
        self.uid.clone().unwrap_or(LooseId::Int(0))
    }

    /// Position of a node record with both components present.
    pub fn node_coords(&self) -> Option<MapCoords> {
        if self.obj_type != ObjectType::Node {
            return None;
        }
        self.geom.as_ref()?.coords()
    }

    /// Unix seconds of the last edit, 0 when absent or unparsable.
    pub fn timestamp_secs(&self) -> i64 {
        self.timestamp
            .as_deref()
            .and_then(|ts| parse_timestamp(ts).ok())
            .unwrap_or(0)
    }
}

pub fn parse_timestamp(value: &str) -> Result<i64> {
    let parsed = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)?;
    Ok(parsed.and_utc().timestamp())
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> VersionedRecord {
        VersionedRecord::from_json_line(line.as_bytes()).unwrap()
    }

    #[test]
    fn parses_full_node_record() {
        let record = parse(
            r#"{"obj_type":"node","obj_id":42,"version":3,"action":"Modify",
                "timestamp":"2024-01-02T03:04:05Z","geom":{"lat":51.5,"lon":-0.12},
                "tags":{"name":"Baker Street"},"changeset_id":7,"uid":99}"#,
        );
        assert_eq!(record.obj_type, ObjectType::Node);
        assert_eq!(record.action(), Action::Modify);
        assert_eq!(record.node_coords(), Some(MapCoords { lat: 51.5, lon: -0.12 }));
        assert_eq!(record.timestamp_secs(), 1_704_164_645);
        assert_eq!(record.author(), LooseId::Int(99));
        assert_eq!(record.changeset_id, Some(LooseId::Int(7)));
    }

    #[test]
    fn half_missing_geometry_is_no_geometry() {
        let record = parse(r#"{"obj_type":"node","obj_id":1,"version":1,"geom":{"lat":10.0,"lon":null}}"#);
        assert_eq!(record.node_coords(), None);
    }

    #[test]
    fn null_collections_become_empty() {
        let record = parse(r#"{"obj_type":"way","obj_id":1,"version":1,"tags":null,"refs":null,"uid":null}"#);
        assert!(record.tags.is_empty());
        assert!(record.refs.is_empty());
        assert_eq!(record.author(), LooseId::Int(0));
    }

    #[test]
    fn node_refs_accept_strings_and_numbers() {
        let record = parse(r#"{"obj_type":"way","obj_id":1,"version":1,"refs":{"node_refs":["10",11,"x"]}}"#);
        let ids: Vec<_> = record.refs.node_refs.iter().map(NodeRef::id).collect();
        assert_eq!(ids, vec![Some(10), Some(11), None]);
        assert_eq!(record.refs.node_refs[1].raw(), "11");
    }

    #[test]
    fn relation_reference_count_uses_members() {
        let record = parse(
            r#"{"obj_type":"relation","obj_id":5,"version":2,
                "refs":{"members":[{"type":"way","ref":"1","role":"outer"},{"type":"node","ref":"2","role":""}]}}"#,
        );
        assert_eq!(record.refs.len(), 2);
        assert_eq!(record.obj_type.code(), 2);
    }

    #[test]
    fn unknown_object_type_has_negative_code() {
        let record = parse(r#"{"obj_type":"area","obj_id":1,"version":1}"#);
        assert_eq!(record.obj_type.code(), -1);
    }

    #[test]
    fn bad_timestamp_is_zero() {
        let record = parse(r#"{"obj_type":"node","obj_id":1,"version":1,"timestamp":"yesterday"}"#);
        assert_eq!(record.timestamp_secs(), 0);
    }

    #[test]
    fn odd_ids_and_tag_values_are_kept() {
        let record = parse(
            r#"{"obj_type":"node","obj_id":1.5,"version":1,"changeset_id":"cs-7","uid":"anon",
                "tags":{"lanes":2,"oneway":true}}"#,
        );
        assert_eq!(record.obj_id, LooseId::Json("1.5".to_string()));
        assert_eq!(record.changeset_id, Some(LooseId::Text("cs-7".to_string())));
        assert_eq!(record.author(), LooseId::Text("anon".to_string()));
        assert_eq!(record.tags.get("lanes"), Some(&serde_json::json!(2)));
        assert_eq!(FeatureValue::from(record.changeset_id.as_ref()), FeatureValue::Text("cs-7".to_string()));
        assert_eq!(FeatureValue::from(None::<&LooseId>), FeatureValue::Missing);
    }

    #[test]
    fn missing_identity_is_an_error() {
        assert!(VersionedRecord::from_json_line(br#"{"obj_type":"node","version":1}"#).is_err());
        assert!(VersionedRecord::from_json_line(b"not json").is_err());
    }
}
