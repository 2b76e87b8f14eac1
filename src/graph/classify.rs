//! Origin Classification
//!
//! Derives origin tags for a group from the labels on incoming derivation
//! edges. Tags are computed over every group sharing the base character, so
//! all groups of one character carry the same tag set.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::RelationGraph;
use crate::normalize::NormalizedGroups;
use crate::record::{base_character, OriginClass, RelationLabel};

// =============================================================================
// Origin Tag
// =============================================================================

/// How a character came to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OriginTag {
    Pictographic,
    Indicative,
    Associative,
    PhonoSemantic,
    Differentiation,
}

impl OriginTag {
    /// Tag implied by an incoming edge label
    pub fn from_label(label: &RelationLabel) -> Option<Self> {
        match label {
            RelationLabel::Phonetic => Some(Self::PhonoSemantic),
            RelationLabel::Semantic => Some(Self::Associative),
            RelationLabel::Differentiation => Some(Self::Differentiation),
            RelationLabel::Component | RelationLabel::Pictographic => Some(Self::Pictographic),
            RelationLabel::Indicative => Some(Self::Indicative),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pictographic => "pictographic",
            Self::Indicative => "indicative",
            Self::Associative => "associative",
            Self::PhonoSemantic => "phono-semantic",
            Self::Differentiation => "differentiation",
        }
    }
}

impl fmt::Display for OriginTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Classifier
// =============================================================================

/// Classifier with a per-base-character cache
pub struct OriginClassifier<'a> {
    groups: &'a NormalizedGroups,
    graph: &'a RelationGraph,
    /// Nodes bucketed by base character
    by_base: HashMap<&'a str, Vec<&'a str>>,
    cache: HashMap<String, BTreeSet<OriginTag>>,
}

impl<'a> OriginClassifier<'a> {
    pub fn new(groups: &'a NormalizedGroups, graph: &'a RelationGraph) -> Self {
        let mut by_base: HashMap<&'a str, Vec<&'a str>> = HashMap::new();
        for id in graph.node_indices.keys() {
            by_base
                .entry(base_character(id))
                .or_default()
                .push(id.as_str());
        }
        Self {
            groups,
            graph,
            by_base,
            cache: HashMap::new(),
        }
    }

    /// Tags for a group id
    pub fn classify(&mut self, id: &str) -> BTreeSet<OriginTag> {
        self.classify_base(base_character(id))
    }

    /// Tags for every group with base character `base`
    pub fn classify_base(&mut self, base: &str) -> BTreeSet<OriginTag> {
        if let Some(tags) = self.cache.get(base) {
            return tags.clone();
        }

        let mut tags = BTreeSet::new();
        for id in self.by_base.get(base).into_iter().flatten() {
            for (_, label) in self.graph.parents(id) {
                tags.extend(OriginTag::from_label(label));
            }
            if let Some(record) = self.groups.record(id) {
                if record.origin_class == Some(OriginClass::Pictographic) {
                    tags.insert(OriginTag::Pictographic);
                }
            }
        }

        if tags.contains(&OriginTag::PhonoSemantic) {
            tags.remove(&OriginTag::Associative);
        }

        self.cache.insert(base.to_string(), tags.clone());
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use serde_json::json;

    fn classify(raw: serde_json::Value, id: &str) -> BTreeSet<OriginTag> {
        let groups = normalize(&raw);
        let graph = RelationGraph::invert(&groups);
        OriginClassifier::new(&groups, &graph).classify(id)
    }

    #[test]
    fn test_rootless_group_is_pictographic() {
        let tags = classify(json!({ "一": { "1": { "parents": "2" }, "2": {} } }), "一2");
        assert_eq!(tags, BTreeSet::from([OriginTag::Pictographic]));
    }

    #[test]
    fn test_phonetic_suppresses_associative() {
        let tags = classify(
            json!({
                "河1": { "parents": { "可1": "声符", "水1": "義符" } },
                "可1": { "parents": null },
                "水1": { "parents": null }
            }),
            "河1",
        );
        assert!(tags.contains(&OriginTag::PhonoSemantic));
        assert!(!tags.contains(&OriginTag::Associative));
    }

    #[test]
    fn test_suppression_spans_the_base_character() {
        let tags = classify(
            json!({
                "河1": { "parents": { "水1": "semantic" } },
                "河2": { "parents": { "可1": "phonetic" } }
            }),
            "河1",
        );
        assert_eq!(tags, BTreeSet::from([OriginTag::PhonoSemantic]));
    }

    #[test]
    fn test_label_mapping() {
        let tags = classify(
            json!({
                "大2": { "parents": { "大1": "分化", "人1": "部件", "一1": "指事", "x1": "疑" } }
            }),
            "大2",
        );
        assert_eq!(
            tags,
            BTreeSet::from([
                OriginTag::Pictographic,
                OriginTag::Indicative,
                OriginTag::Differentiation,
            ])
        );
    }

    #[test]
    fn test_tags_serialize_kebab_case() {
        assert_eq!(
            serde_json::to_value(OriginTag::PhonoSemantic).unwrap(),
            json!("phono-semantic")
        );
    }

    #[test]
    fn test_unknown_group_has_no_tags() {
        assert!(classify(json!({}), "無1").is_empty());
    }
}
