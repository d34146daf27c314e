//! Changeset and author statistics gathered from the current-version stream.

use std::collections::{HashMap, HashSet};

use crate::data::record::{LooseId, ObjectType, VersionedRecord};

#[derive(Debug, Default, Clone)]
pub struct ChangesetStats {
    sizes: HashMap<Option<LooseId>, u64>,
}

impl ChangesetStats {
    pub fn record(&mut self, changeset_id: Option<&LooseId>) {
        *self.sizes.entry(changeset_id.cloned()).or_insert(0) += 1;
    }

    pub fn size(&self, changeset_id: Option<&LooseId>) -> u64 {
        self.sizes.get(&changeset_id.cloned()).copied().unwrap_or(0)
    }
}

#[derive(Debug, Default, Clone)]
struct AuthorActivity {
    edit_count: u64,
    object_types: HashSet<ObjectType>,
}

#[derive(Debug, Default, Clone)]
pub struct AuthorStats {
    authors: HashMap<LooseId, AuthorActivity>,
}

impl AuthorStats {
    pub fn record(&mut self, author: LooseId, obj_type: &ObjectType) {
        let activity = self.authors.entry(author).or_default();
        activity.edit_count += 1;
        activity.object_types.insert(obj_type.clone());
    }

    pub fn edit_count(&self, author: &LooseId) -> u64 {
        self.authors.get(author).map_or(0, |a| a.edit_count)
    }

    /// Number of distinct object types the author touched.
    pub fn object_diversity(&self, author: &LooseId) -> usize {
        self.authors.get(author).map_or(0, |a| a.object_types.len())
    }
}

#[derive(Debug, Default, Clone)]
pub struct ContextStats {
    pub changesets: ChangesetStats,
    pub authors: AuthorStats,
}

impl ContextStats {
    pub fn record(&mut self, record: &VersionedRecord) {
        self.changesets.record(record.changeset_id.as_ref());
        self.authors.record(record.author(), &record.obj_type);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(line: &str) -> VersionedRecord {
        VersionedRecord::from_json_line(line.as_bytes()).unwrap()
    }

    #[test]
    fn counts_changesets_and_authors() {
        let mut stats = ContextStats::default();
        stats.record(&record(r#"{"obj_type":"node","obj_id":1,"version":1,"changeset_id":5,"uid":9}"#));
        stats.record(&record(r#"{"obj_type":"node","obj_id":2,"version":1,"changeset_id":5,"uid":9}"#));
        stats.record(&record(r#"{"obj_type":"way","obj_id":3,"version":2,"changeset_id":6,"uid":9}"#));
        stats.record(&record(r#"{"obj_type":"way","obj_id":4,"version":2,"changeset_id":6}"#));

        assert_eq!(stats.changesets.size(Some(&LooseId::Int(5))), 2);
        assert_eq!(stats.changesets.size(Some(&LooseId::Int(6))), 2);
        assert_eq!(stats.authors.edit_count(&LooseId::Int(9)), 3);
        assert_eq!(stats.authors.object_diversity(&LooseId::Int(9)), 2);
        assert_eq!(stats.authors.edit_count(&LooseId::Int(0)), 1);
    }

    #[test]
    fn unknown_keys_are_zero() {
        let stats = ContextStats::default();
        assert_eq!(stats.changesets.size(Some(&LooseId::Int(1))), 0);
        assert_eq!(stats.changesets.size(None), 0);
        assert_eq!(stats.authors.edit_count(&LooseId::Int(1)), 0);
        assert_eq!(stats.authors.object_diversity(&LooseId::Int(1)), 0);
    }

    #[test]
    fn text_ids_are_their_own_keys() {
        let mut stats = ContextStats::default();
        stats.record(&record(r#"{"obj_type":"node","obj_id":1,"version":1,"changeset_id":"cs-7","uid":"anon"}"#));
        stats.record(&record(r#"{"obj_type":"way","obj_id":2,"version":1,"changeset_id":"cs-7","uid":"anon"}"#));
        stats.record(&record(r#"{"obj_type":"way","obj_id":3,"version":1,"changeset_id":7,"uid":7}"#));

        let text_changeset = LooseId::Text("cs-7".to_string());
        assert_eq!(stats.changesets.size(Some(&text_changeset)), 2);
        assert_eq!(stats.changesets.size(Some(&LooseId::Int(7))), 1);
        assert_eq!(stats.authors.object_diversity(&LooseId::Text("anon".to_string())), 2);
    }
}
