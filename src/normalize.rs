//! Schema normalization
//!
//! Group datasets mix two shapes:
//!
//! ```json
//! { "一": { "1": { "parents": "2" }, "2": {} },   // nested under a base character
//!   "呂2": { "parents": { "1": "部件" } } }        // already flat
//! ```
//!
//! Normalization flattens containers into `<topKey><childKey>` ids, rewrites
//! numeric-only parent references relative to the owning base character and
//! fills in the default origin class. Downstream code only ever sees
//! [`NormalizedGroups`].

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::Result;
use crate::record::{base_character, GroupEntry, GroupId, GroupRecord, OriginClass, RECORD_FIELDS};

/// Flat, normalized group records keyed by group id
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedGroups {
    entries: BTreeMap<GroupId, GroupEntry>,
}

impl NormalizedGroups {
    pub fn get(&self, id: &str) -> Option<&GroupEntry> {
        self.entries.get(id)
    }

    /// The interpreted record for `id`, if it is not opaque
    pub fn record(&self, id: &str) -> Option<&GroupRecord> {
        self.entries.get(id).and_then(GroupEntry::record)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All group ids, sorted
    pub fn ids(&self) -> impl Iterator<Item = &GroupId> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupId, &GroupEntry)> {
        self.entries.iter()
    }

    /// Interpreted records only, sorted by id
    pub fn records(&self) -> impl Iterator<Item = (&GroupId, &GroupRecord)> {
        self.entries
            .iter()
            .filter_map(|(id, entry)| entry.record().map(|r| (id, r)))
    }

    /// Records whose id has the given base character
    pub fn records_with_base<'a>(
        &'a self,
        base: &'a str,
    ) -> impl Iterator<Item = (&'a GroupId, &'a GroupRecord)> + 'a {
        self.records().filter(move |(id, _)| base_character(id) == base)
    }

    /// Canonical JSON form; feeding it back to [`normalize`] is a no-op
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl FromIterator<(GroupId, GroupEntry)> for NormalizedGroups {
    fn from_iter<I: IntoIterator<Item = (GroupId, GroupEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Normalize a raw groups dataset.
///
/// Never fails: a top level that is not an object yields an empty set, and
/// records that cannot be interpreted are carried through as opaque entries.
pub fn normalize(raw: &Value) -> NormalizedGroups {
    let Some(top) = raw.as_object() else {
        warn!("groups dataset is not an object; treating it as empty");
        return NormalizedGroups::default();
    };

    let mut entries = BTreeMap::new();
    let mut containers = 0usize;

    for (top_key, value) in top {
        match container_children(value) {
            Some(children) => {
                containers += 1;
                for (child_key, child) in children {
                    let id = format!("{}{}", top_key, child_key);
                    let entry = interpret(&id, child, top_key);
                    entries.insert(id, entry);
                }
            }
            None => {
                let entry = interpret(top_key, value, base_character(top_key));
                entries.insert(top_key.clone(), entry);
            }
        }
    }

    // Re-scan with each record's own base and apply the class default
    for (id, entry) in entries.iter_mut() {
        if let GroupEntry::Record(record) = entry {
            let base = base_character(id);
            record.parents = record.parents.take().map(|p| p.rebase(base));
            if record.parents.is_none() && record.origin_class.is_none() {
                record.origin_class = Some(OriginClass::Pictographic);
            }
        }
    }

    debug!(
        groups = entries.len(),
        containers,
        "normalized groups dataset"
    );

    NormalizedGroups { entries }
}

/// Children of a container value, or `None` when the value is a record.
///
/// A container is a non-empty object without any record field whose keys are
/// mostly digit-prefixed. Every normalized record carries either `parents` or
/// `class`, so normalized output is never mistaken for a container.
fn container_children(value: &Value) -> Option<&Map<String, Value>> {
    let map = value.as_object()?;
    if map.is_empty() || map.keys().any(|k| RECORD_FIELDS.contains(&k.as_str())) {
        return None;
    }
    let numeric = map
        .keys()
        .filter(|k| k.starts_with(|c: char| c.is_ascii_digit()))
        .count();
    (numeric * 2 > map.len()).then_some(map)
}

fn interpret(id: &str, value: &Value, base: &str) -> GroupEntry {
    match GroupRecord::from_value(value) {
        Ok(mut record) => {
            record.parents = record.parents.take().map(|p| p.rebase(base));
            GroupEntry::Record(record)
        }
        Err(err) => {
            warn!(group = id, error = %err, "keeping uninterpretable group record verbatim");
            GroupEntry::Opaque(value.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ParentSpec, RelationLabel};
    use serde_json::json;

    #[test]
    fn test_nested_numeric_parent_resolves_to_own_base() {
        let groups = normalize(&json!({
            "一": { "1": { "parents": "2" }, "2": {} }
        }));

        let one = groups.record("一1").unwrap();
        assert_eq!(one.parents, Some(ParentSpec::Single("一2".into())));
        assert_eq!(one.origin_class, None);

        let two = groups.record("一2").unwrap();
        assert_eq!(two.origin_class, Some(OriginClass::Pictographic));
    }

    #[test]
    fn test_flat_records_rebased_on_rescan() {
        let groups = normalize(&json!({
            "呂2": { "parents": { "1": "部件" } },
            "口3": { "parents": [ "呂2", 4 ] }
        }));

        assert_eq!(
            groups.record("呂2").unwrap().parents,
            Some(ParentSpec::Labeled(
                [("呂1".to_string(), RelationLabel::Component)].into()
            ))
        );
        assert_eq!(
            groups.record("口3").unwrap().parents,
            Some(ParentSpec::List(vec!["呂2".into(), "口4".into()]))
        );
    }

    #[test]
    fn test_explicit_class_kept() {
        let groups = normalize(&json!({ "木1": { "class": "指事", "parents": null } }));
        assert_eq!(
            groups.record("木1").unwrap().origin_class,
            Some(OriginClass::Other("指事".into()))
        );
    }

    #[test]
    fn test_record_with_fields_is_not_a_container() {
        let groups = normalize(&json!({
            "人": { "1": {}, "2": {}, "images": [1] }
        }));
        assert!(groups.contains("人"));
        assert!(!groups.contains("人1"));
        assert_eq!(groups.record("人").unwrap().extra.len(), 2);
    }

    #[test]
    fn test_minority_numeric_object_is_a_record() {
        let groups = normalize(&json!({ "人": { "1": {}, "note": "x", "src": "y" } }));
        assert!(groups.contains("人"));
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_malformed_record_is_opaque() {
        let groups = normalize(&json!({
            "一": { "1": { "parents": true }, "2": "not a record" }
        }));
        assert!(matches!(groups.get("一1"), Some(GroupEntry::Opaque(_))));
        assert_eq!(groups.get("一2"), Some(&GroupEntry::Opaque(json!("not a record"))));
        assert_eq!(groups.records().count(), 0);
    }

    #[test]
    fn test_non_object_dataset_is_empty() {
        assert!(normalize(&json!([1, 2, 3])).is_empty());
    }

    #[test]
    fn test_idempotent_on_mixed_input() {
        let raw = json!({
            "一": { "1": { "parents": "2", "variant": "弌" }, "2": {} },
            "呂2": { "parents": { "1": "component" }, "chars": "呂" },
            "口": { "3": { "parents": "呂2" }, "9": { "parents": 3 } },
            "odd": 17
        });
        let once = normalize(&raw);
        let twice = normalize(&once.to_value().unwrap());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_canonical_value_is_flat() {
        let groups = normalize(&json!({
            "口": { "3": { "parents": "呂2" } },
            "odd": 17
        }));
        let value = groups.to_value().unwrap();
        assert_eq!(value["口3"]["parents"], json!("呂2"));
        assert_eq!(value["odd"], json!(17));
        assert!(value.get("口").is_none());
    }
}
