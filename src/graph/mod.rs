//! Character Derivation Graph
//!
//! Primary data structure using petgraph for parent → child derivation edges.
//! Cycles in the source data are tolerated; every traversal goes through
//! [`traverse::guarded_bfs`]. Node lookup is O(1) via a HashMap index.

pub mod classify;
pub mod ego;
pub mod era;
pub mod loader;
pub mod traverse;

pub use classify::OriginTag;
pub use ego::{extract_ego, EgoSubgraph};
pub use era::{classify_descriptor, classify_group_era, describe_descriptor, DescriptorLabel, EraShade};
pub use loader::{load_dataset, LoadConfig, LoadedDataset};
pub use traverse::guarded_bfs;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::normalize::NormalizedGroups;
use crate::record::{split_numbered, GroupId, RelationLabel};

/// Parent → {child → label}; every node is a key, even without children
pub type Adjacency = BTreeMap<GroupId, BTreeMap<GroupId, RelationLabel>>;

/// Base-character search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub base: String,
    pub score: i64,
}

/// The derivation graph
#[derive(Debug, Clone, Default)]
pub struct RelationGraph {
    /// Edges point from parent to child
    pub(crate) graph: DiGraph<GroupId, RelationLabel>,

    /// Node index lookup: group id -> NodeIndex
    pub(crate) node_indices: HashMap<GroupId, NodeIndex>,
}

impl RelationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invert child → parent specs into parent → child edges.
    ///
    /// Every explicit group id and every referenced parent becomes a node.
    /// Empty parent ids are skipped. A later spec for the same (parent, child)
    /// pair replaces the earlier label.
    pub fn invert(groups: &NormalizedGroups) -> Self {
        let mut graph = Self::new();

        for id in groups.ids() {
            graph.ensure_node(id);
        }

        for (child, record) in groups.records() {
            let Some(parents) = &record.parents else {
                continue;
            };
            for (parent, label) in parents.edges() {
                graph.add_edge(parent, child, label);
            }
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "inverted parent specs"
        );
        graph
    }

    /// Index of `id`, adding the node if missing
    pub fn ensure_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.node_indices.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(id.to_string());
        self.node_indices.insert(id.to_string(), idx);
        idx
    }

    /// Add or relabel the edge `parent -> child`
    pub fn add_edge(&mut self, parent: &str, child: &str, label: RelationLabel) {
        let from = self.ensure_node(parent);
        let to = self.ensure_node(child);
        self.graph.update_edge(from, to, label);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_indices.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All node ids, sorted
    pub fn ids(&self) -> Vec<&GroupId> {
        let mut ids: Vec<&GroupId> = self.node_indices.keys().collect();
        ids.sort();
        ids
    }

    /// Immediate parents of `id` with the edge label
    pub fn parents(&self, id: &str) -> Vec<(&GroupId, &RelationLabel)> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Immediate children of `id` with the edge label
    pub fn children(&self, id: &str) -> Vec<(&GroupId, &RelationLabel)> {
        self.neighbors(id, Direction::Outgoing)
    }

    fn neighbors(&self, id: &str, direction: Direction) -> Vec<(&GroupId, &RelationLabel)> {
        let Some(&node_idx) = self.node_indices.get(id) else {
            return Vec::new();
        };

        let mut out: Vec<(&GroupId, &RelationLabel)> = self
            .graph
            .edges_directed(node_idx, direction)
            .filter_map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                self.graph.node_weight(other).map(|n| (n, e.weight()))
            })
            .collect();
        out.sort();
        out
    }

    /// Adjacency map over all nodes
    pub fn adjacency(&self) -> Adjacency {
        let mut adjacency: Adjacency = self
            .node_indices
            .keys()
            .map(|id| (id.clone(), BTreeMap::new()))
            .collect();

        for edge in self.graph.edge_references() {
            if let (Some(parent), Some(child)) = (
                self.graph.node_weight(edge.source()),
                self.graph.node_weight(edge.target()),
            ) {
                adjacency
                    .entry(parent.clone())
                    .or_default()
                    .insert(child.clone(), edge.weight().clone());
            }
        }
        adjacency
    }

    /// Base characters that own at least one numbered group, sorted
    pub fn base_characters(&self) -> Vec<String> {
        self.node_indices
            .keys()
            .filter_map(|id| split_numbered(id).map(|(base, _)| base.to_string()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Search base characters: an exact match first, then fuzzy matches
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        use fuzzy_matcher::skim::SkimMatcherV2;
        use fuzzy_matcher::FuzzyMatcher;

        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }

        let bases = self.base_characters();
        let mut results = Vec::new();

        if bases.iter().any(|b| b == query) {
            results.push(SearchResult {
                base: query.to_string(),
                score: i64::MAX,
            });
        }

        let matcher = SkimMatcherV2::default();
        let mut fuzzy: Vec<(i64, &String)> = bases
            .iter()
            .filter(|b| b.as_str() != query)
            .filter_map(|b| matcher.fuzzy_match(b, query).map(|score| (score, b)))
            .collect();

        // Sort by score descending, then by character for stable output
        fuzzy.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));

        results.extend(fuzzy.into_iter().map(|(score, base)| SearchResult {
            base: base.clone(),
            score,
        }));
        results.truncate(limit);
        results
    }
}
