//! Ego-subgraph extraction
//!
//! A focused view shows the groups of one character plus their immediate
//! neighbourhood: direct parents and direct dependents. The radius is one hop.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traverse::guarded_bfs;
use super::{Adjacency, RelationGraph};
use crate::normalize::NormalizedGroups;
use crate::record::{base_character, variant_root_character, GroupId};

/// Hops from the focal character's own groups
pub const EGO_RADIUS: usize = 1;

/// Result of an ego extraction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EgoSubgraph {
    pub focal: String,
    /// Focal groups, their parents and their dependents
    pub members: BTreeSet<GroupId>,
    /// Edges with both endpoints in `members`; every member is a key
    pub adjacency: Adjacency,
}

impl EgoSubgraph {
    /// No group of the focal character exists
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }
}

/// Defined groups whose base character is `focal`, sorted.
///
/// Ids only referenced as parents and synthetic variant roots are not
/// starting points.
fn focal_groups<'a>(groups: &'a NormalizedGroups, focal: &str) -> Vec<&'a GroupId> {
    groups
        .ids()
        .filter(|id| variant_root_character(id).is_none() && base_character(id) == focal)
        .collect()
}

/// Extract the radius-1 neighbourhood of `focal`'s groups
pub fn extract_ego(groups: &NormalizedGroups, graph: &RelationGraph, focal: &str) -> EgoSubgraph {
    let starts = focal_groups(groups, focal);

    let reached = guarded_bfs(starts, Some(EGO_RADIUS), |id: &&GroupId| {
        graph
            .parents(id)
            .into_iter()
            .chain(graph.children(id))
            .map(|(other, _)| other)
            .collect()
    });

    let members: BTreeSet<GroupId> = reached.into_iter().map(|(id, _)| id.clone()).collect();
    let adjacency = filter_adjacency(&graph.adjacency(), &members);

    debug!(focal, members = members.len(), "extracted ego subgraph");

    EgoSubgraph {
        focal: focal.to_string(),
        members,
        adjacency,
    }
}

/// Restrict an adjacency to `members`; isolated members are kept as keys
pub fn filter_adjacency(adjacency: &Adjacency, members: &BTreeSet<GroupId>) -> Adjacency {
    members
        .iter()
        .map(|member| {
            let children = adjacency
                .get(member)
                .map(|children| {
                    children
                        .iter()
                        .filter(|(child, _)| members.contains(*child))
                        .map(|(child, label)| (child.clone(), label.clone()))
                        .collect()
                })
                .unwrap_or_else(BTreeMap::new);
            (member.clone(), children)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use crate::record::RelationLabel;
    use serde_json::json;

    fn lu_groups() -> NormalizedGroups {
        normalize(&json!({
            "呂1": {},
            "呂2": { "parents": { "呂1": "component" } },
            "口3": { "parents": "呂2" },
            "口9": { "parents": "口3" }
        }))
    }

    fn ego_of(groups: &NormalizedGroups, focal: &str) -> EgoSubgraph {
        extract_ego(groups, &RelationGraph::invert(groups), focal)
    }

    #[test]
    fn test_one_hop_neighbourhood() {
        let ego = ego_of(&lu_groups(), "呂");
        let members: Vec<&str> = ego.members.iter().map(String::as_str).collect();
        assert_eq!(members, vec!["口3", "呂1", "呂2"]);
        assert!(!ego.contains("口9"));
    }

    #[test]
    fn test_adjacency_restricted_to_members() {
        let ego = ego_of(&lu_groups(), "呂");
        assert_eq!(ego.adjacency.len(), 3);
        assert_eq!(ego.adjacency["呂1"]["呂2"], RelationLabel::Component);
        assert_eq!(ego.adjacency["呂2"]["口3"], RelationLabel::Evolution);
        assert!(ego.adjacency["口3"].is_empty());
    }

    #[test]
    fn test_isolated_member_kept() {
        let groups = normalize(&json!({ "木1": {}, "林1": {} }));
        let ego = ego_of(&groups, "木");
        assert_eq!(ego.members.len(), 1);
        assert!(ego.adjacency["木1"].is_empty());
    }

    #[test]
    fn test_unknown_focal_is_empty() {
        let ego = ego_of(&lu_groups(), "森");
        assert!(ego.is_empty());
        assert!(ego.adjacency.is_empty());
        assert_eq!(ego.focal, "森");
    }

    #[test]
    fn test_deterministic() {
        let groups = lu_groups();
        assert_eq!(ego_of(&groups, "口"), ego_of(&groups, "口"));
    }

    #[test]
    fn test_referenced_only_parent_is_not_focal() {
        let groups = normalize(&json!({ "口3": { "parents": "呂2" } }));
        let ego = ego_of(&groups, "呂");
        assert!(ego.is_empty());
        assert!(ego.adjacency.is_empty());
    }

    #[test]
    fn test_variant_root_is_not_focal() {
        let groups = normalize(&json!({
            "吕1": { "characters": ["吕"] },
            "variant-root:吕": { "variants": ["呂"] }
        }));
        let ego = ego_of(&groups, "吕");
        let members: Vec<&str> = ego.members.iter().map(String::as_str).collect();
        assert_eq!(members, vec!["吕1"]);
    }
}
