//! Graph construction and the renderer boundary
//!
//! The engine turns a [`LoadedDataset`] and a [`Selection`] into a
//! [`RenderBoundary`]: the adjacency plus per-node classification data an
//! external diagram emitter needs. Results are cached by content hash.
//!
//! ```text
//! selection ──► cache key ──► hit? ──► deserialize
//!                               │ miss
//!                               ▼
//!            invert ─► (ego filter | add form groups) ─► classify ─► store
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{ArtifactCache, ArtifactStore, CacheKey, PutOutcome};
use crate::forms::Form;
use crate::graph::classify::OriginClassifier;
use crate::graph::ego::extract_ego;
use crate::graph::era::{classify_group_era, describe_descriptor, DescriptorLabel};
use crate::graph::loader::LoadedDataset;
use crate::graph::{Adjacency, EraShade, OriginTag, RelationGraph};
use crate::palette::{fill_for, stroke_for};
use crate::record::{base_character, GroupId, GroupRecord, RelationLabel};

/// Selection value meaning "no graph"
pub const SELECTION_NONE: &str = "none";

/// Selection value meaning "the whole graph"
pub const SELECTION_ALL: &str = "all";

/// What the caller asked to see
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// No graph requested
    Disabled,
    /// Unfiltered graph
    All,
    /// Ego subgraph of one character
    Focal(String),
}

impl Selection {
    /// Trim and lower-case; absent, empty and `none` disable the graph
    pub fn parse(raw: Option<&str>) -> Self {
        let normalized = raw.map(|s| s.trim().to_lowercase()).unwrap_or_default();
        match normalized.as_str() {
            "" | SELECTION_NONE => Self::Disabled,
            SELECTION_ALL => Self::All,
            _ => Self::Focal(normalized),
        }
    }

    /// Selection component of the cache key
    pub fn cache_marker(&self) -> &str {
        match self {
            Self::Disabled => "",
            Self::All => SELECTION_ALL,
            Self::Focal(focal) => focal,
        }
    }
}

/// Edge with its rendering hints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeView {
    pub parent: GroupId,
    pub child: GroupId,
    pub label: RelationLabel,
    pub dashed: bool,
    pub stroke: String,
}

/// One form with the captions a renderer prints under its image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormView {
    pub descriptor_id: String,
    pub image_id: String,
    /// Era and script captions; `None` for placeholder forms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<DescriptorLabel>,
}

impl From<&Form> for FormView {
    fn from(form: &Form) -> Self {
        let label = if form.is_placeholder() {
            None
        } else {
            Some(describe_descriptor(&form.descriptor_id))
        };
        Self {
            descriptor_id: form.descriptor_id.clone(),
            image_id: form.image_id.clone(),
            label,
        }
    }
}

/// Everything a renderer needs to know about one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub base: String,
    /// Present in the groups dataset (as opposed to implied by an edge or image)
    pub defined: bool,
    pub origin_tags: BTreeSet<OriginTag>,
    /// `None` when the group has no classifiable forms
    pub era: Option<EraShade>,
    pub pictographic: bool,
    pub forms: Vec<FormView>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub characters: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<String>,
    pub fill: String,
    pub stroke: String,
}

/// The artifact handed to the diagram emitter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderBoundary {
    /// `all` or the focal character
    pub selection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focal: Option<String>,
    /// Ego members in focused mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<BTreeSet<GroupId>>,
    pub adjacency: Adjacency,
    pub edges: Vec<EdgeView>,
    pub nodes: BTreeMap<GroupId, NodeData>,
}

impl RenderBoundary {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// Where the boundary came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Stored,
    /// Built, but the store could not keep it
    NotStored,
    /// Engine runs without a cache
    Uncached,
}

/// Result of a construction request
#[derive(Debug, Clone, PartialEq)]
pub enum Construction {
    Disabled,
    /// The focal character owns no group
    NotFound { focal: String },
    Graph {
        boundary: RenderBoundary,
        cache: CacheStatus,
    },
}

/// Build the boundary without touching any cache. `None` when a focal
/// character has no groups.
pub fn build_boundary(dataset: &LoadedDataset, selection: &Selection) -> Option<RenderBoundary> {
    let mut graph = RelationGraph::invert(&dataset.groups);

    let (focal, members, adjacency, node_ids) = match selection {
        Selection::Disabled => return None,
        Selection::All => {
            for id in dataset.forms.group_ids() {
                graph.ensure_node(id);
            }
            let adjacency = graph.adjacency();
            let node_ids: Vec<GroupId> = adjacency.keys().cloned().collect();
            (None, None, adjacency, node_ids)
        }
        Selection::Focal(focal) => {
            let ego = extract_ego(&dataset.groups, &graph, focal);
            if ego.is_empty() {
                debug!(focal = %focal, "focal character not found");
                return None;
            }
            let node_ids: Vec<GroupId> = ego.members.iter().cloned().collect();
            (Some(ego.focal), Some(ego.members), ego.adjacency, node_ids)
        }
    };

    let mut classifier = OriginClassifier::new(&dataset.groups, &graph);
    let nodes: BTreeMap<GroupId, NodeData> = node_ids
        .into_iter()
        .map(|id| {
            let data = node_data(dataset, &mut classifier, &id);
            (id, data)
        })
        .collect();

    let edges = adjacency
        .iter()
        .flat_map(|(parent, children)| {
            children.iter().map(move |(child, label)| EdgeView {
                parent: parent.clone(),
                child: child.clone(),
                label: label.clone(),
                dashed: label.is_dashed(),
                stroke: label.stroke_color().to_string(),
            })
        })
        .collect();

    Some(RenderBoundary {
        selection: selection.cache_marker().to_string(),
        focal,
        members,
        adjacency,
        edges,
        nodes,
    })
}

fn node_data(dataset: &LoadedDataset, classifier: &mut OriginClassifier<'_>, id: &str) -> NodeData {
    let record: Option<&GroupRecord> = dataset.groups.record(id);
    let forms: &[Form] = dataset.forms.forms_of(id);
    let characters = record.map(|r| r.characters.clone()).unwrap_or_default();
    let variants = record.map(|r| r.variants.clone()).unwrap_or_default();
    let era = classify_group_era(forms, !characters.is_empty());
    let fill = fill_for(era);

    NodeData {
        base: base_character(id).to_string(),
        defined: dataset.groups.contains(id),
        origin_tags: classifier.classify(id),
        era,
        pictographic: record.map_or(false, GroupRecord::is_pictographic),
        forms: forms.iter().map(FormView::from).collect(),
        characters,
        variants,
        fill: fill.to_string(),
        stroke: stroke_for(fill),
    }
}

/// Construction front end with an optional artifact cache
pub struct GraphEngine<S> {
    cache: Option<ArtifactCache<S>>,
}

impl<S: ArtifactStore> GraphEngine<S> {
    pub fn new(cache: ArtifactCache<S>) -> Self {
        Self { cache: Some(cache) }
    }

    pub fn uncached() -> Self {
        Self { cache: None }
    }

    pub fn cache(&self) -> Option<&ArtifactCache<S>> {
        self.cache.as_ref()
    }

    pub fn cache_mut(&mut self) -> Option<&mut ArtifactCache<S>> {
        self.cache.as_mut()
    }

    /// Cache key for a dataset and selection
    pub fn cache_key(dataset: &LoadedDataset, selection: &Selection) -> CacheKey {
        CacheKey::derive(
            &dataset.groups_hash,
            &dataset.images_hash,
            &dataset.assets_hash,
            selection.cache_marker(),
        )
    }

    /// Build (or fetch) the boundary for `selection`
    pub fn construct(&mut self, dataset: &LoadedDataset, selection: &Selection) -> Construction {
        if *selection == Selection::Disabled {
            return Construction::Disabled;
        }

        let key = Self::cache_key(dataset, selection);

        if let Some(cache) = self.cache.as_mut() {
            if let Some(artifact) = cache.get(&key) {
                match serde_json::from_str::<RenderBoundary>(&artifact) {
                    Ok(boundary) => {
                        debug!(key = %key, "graph cache hit");
                        return Construction::Graph {
                            boundary,
                            cache: CacheStatus::Hit,
                        };
                    }
                    Err(e) => {
                        warn!(key = %key, error = %e, "discarding unreadable cached graph");
                        if let Err(e) = cache.invalidate(&key) {
                            warn!(key = %key, error = %e, "cannot remove unreadable cached graph");
                        }
                    }
                }
            }
        }

        let Some(boundary) = build_boundary(dataset, selection) else {
            return Construction::NotFound {
                focal: selection.cache_marker().to_string(),
            };
        };

        info!(
            selection = %boundary.selection,
            nodes = boundary.node_count(),
            edges = boundary.edge_count(),
            "built graph"
        );

        let status = match self.cache.as_mut() {
            None => CacheStatus::Uncached,
            Some(cache) => match serde_json::to_string(&boundary) {
                Ok(artifact) => match cache.put(&key, &artifact) {
                    PutOutcome::Stored | PutOutcome::StoredAfterEviction(_) => CacheStatus::Stored,
                    PutOutcome::Abandoned => CacheStatus::NotStored,
                },
                Err(e) => {
                    warn!(error = %e, "cannot serialize graph for caching");
                    CacheStatus::NotStored
                }
            },
        };

        Construction::Graph {
            boundary,
            cache: status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::graph::loader::DatasetSources;

    fn dataset() -> LoadedDataset {
        LoadedDataset::from_sources(DatasetSources {
            groups_json: r#"{
                "呂": { "1": { "images": 1 }, "2": { "parents": { "1": "部件" }, "images": 2 } },
                "口3": { "parents": "呂2", "characters": ["口"], "images": 5 },
                "口9": { "parents": "口3" }
            }"#
            .to_string(),
            images_json: r#"{
                "shang_oracle": ["呂1"],
                "zhou_late": ["呂2"],
                "qin_seal": ["呂7"]
            }"#
            .to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_selection_parse() {
        assert_eq!(Selection::parse(None), Selection::Disabled);
        assert_eq!(Selection::parse(Some("  ")), Selection::Disabled);
        assert_eq!(Selection::parse(Some("None")), Selection::Disabled);
        assert_eq!(Selection::parse(Some(" ALL ")), Selection::All);
        assert_eq!(Selection::parse(Some(" 呂 ")), Selection::Focal("呂".into()));
        assert_eq!(Selection::parse(Some("呂")).cache_marker(), "呂");
    }

    #[test]
    fn test_unfiltered_includes_form_groups() {
        let boundary = build_boundary(&dataset(), &Selection::All).unwrap();
        assert!(boundary.nodes.contains_key("呂7"));
        assert!(!boundary.nodes["呂7"].defined);
        assert!(boundary.nodes["呂1"].defined);
        assert_eq!(boundary.focal, None);
        assert_eq!(boundary.edge_count(), 3);
    }

    #[test]
    fn test_focused_is_ego_subgraph() {
        let boundary = build_boundary(&dataset(), &Selection::parse(Some("呂"))).unwrap();
        let ids: Vec<&str> = boundary.nodes.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["口3", "呂1", "呂2"]);
        assert_eq!(boundary.focal.as_deref(), Some("呂"));
        assert_eq!(boundary.edge_count(), 2);
        assert!(!boundary.adjacency.contains_key("口9"));
    }

    #[test]
    fn test_node_classification() {
        let boundary = build_boundary(&dataset(), &Selection::All).unwrap();

        let lu1 = &boundary.nodes["呂1"];
        assert_eq!(lu1.era, Some(EraShade { era: 0, shade: 1 }));
        assert!(lu1.pictographic);
        assert_eq!(lu1.fill, "#bc86e9ff");
        assert_eq!(lu1.stroke, "#9c66c9");
        assert!(lu1.origin_tags.contains(&OriginTag::Pictographic));

        let kou3 = &boundary.nodes["口3"];
        assert_eq!(kou3.era, Some(EraShade { era: 8, shade: 1 }));
        assert!(!kou3.pictographic);

        let kou9 = &boundary.nodes["口9"];
        assert_eq!(kou9.era, None);
        assert_eq!(kou9.fill, "#EEEEEE");

        let dashed = boundary
            .edges
            .iter()
            .find(|e| e.parent == "呂1" && e.child == "呂2")
            .unwrap();
        assert!(dashed.dashed);
        assert_eq!(dashed.label, RelationLabel::Component);
    }

    #[test]
    fn test_forms_carry_captions() {
        let boundary = build_boundary(&dataset(), &Selection::All).unwrap();

        let lu2 = &boundary.nodes["呂2"].forms;
        assert_eq!(lu2.len(), 1);
        assert_eq!(lu2[0].descriptor_id, "zhou_late");
        let label = lu2[0].label.as_ref().unwrap();
        assert_eq!(label.era, "西周晩期");
        assert_eq!(label.script, "金文");

        // 口5 is claimed but never listed
        let kou3 = &boundary.nodes["口3"].forms;
        assert_eq!(kou3[0].image_id, "口5");
        assert_eq!(kou3[0].label, None);
        assert_eq!(boundary.nodes["口3"].era, Some(EraShade { era: 8, shade: 1 }));
    }

    #[test]
    fn test_not_found_and_disabled() {
        let mut engine = GraphEngine::new(ArtifactCache::new(MemoryStore::new()));
        let data = dataset();
        assert_eq!(engine.construct(&data, &Selection::Disabled), Construction::Disabled);
        assert_eq!(
            engine.construct(&data, &Selection::parse(Some("森"))),
            Construction::NotFound { focal: "森".into() }
        );
        assert!(engine.cache().unwrap().store().is_empty());
    }

    #[test]
    fn test_second_construction_hits_cache() {
        let mut engine = GraphEngine::new(ArtifactCache::new(MemoryStore::new()));
        let data = dataset();
        let selection = Selection::All;

        let Construction::Graph { boundary: first, cache } = engine.construct(&data, &selection) else {
            panic!("expected a graph");
        };
        assert_eq!(cache, CacheStatus::Stored);

        let Construction::Graph { boundary: second, cache } = engine.construct(&data, &selection) else {
            panic!("expected a graph");
        };
        assert_eq!(cache, CacheStatus::Hit);
        assert_eq!(first, second);
    }

    #[test]
    fn test_corrupt_artifact_is_rebuilt() {
        let data = dataset();
        let selection = Selection::All;
        let key = GraphEngine::<MemoryStore>::cache_key(&data, &selection);

        let mut store = MemoryStore::new();
        store.put(key.as_str(), "{not json").unwrap();
        let mut engine = GraphEngine::new(ArtifactCache::new(store));

        let outcome = engine.construct(&data, &selection);
        assert!(matches!(
            outcome,
            Construction::Graph { cache: CacheStatus::Stored, .. }
        ));
    }

    #[test]
    fn test_corrupt_artifact_is_removed_when_nothing_replaces_it() {
        let data = dataset();
        let selection = Selection::parse(Some("森"));
        let key = GraphEngine::<MemoryStore>::cache_key(&data, &selection);

        let mut store = MemoryStore::new();
        store.put(key.as_str(), "{not json").unwrap();
        let mut engine = GraphEngine::new(ArtifactCache::new(store));

        assert_eq!(
            engine.construct(&data, &selection),
            Construction::NotFound { focal: "森".into() }
        );
        assert!(engine.cache().unwrap().store().is_empty());
    }

    #[test]
    fn test_quota_failure_still_returns_graph() {
        let mut engine = GraphEngine::new(ArtifactCache::new(MemoryStore::with_quota(8)));
        let outcome = engine.construct(&dataset(), &Selection::All);
        assert!(matches!(
            outcome,
            Construction::Graph { cache: CacheStatus::NotStored, .. }
        ));
    }

    #[test]
    fn test_uncached_engine() {
        let mut engine = GraphEngine::<MemoryStore>::uncached();
        assert!(matches!(
            engine.construct(&dataset(), &Selection::All),
            Construction::Graph { cache: CacheStatus::Uncached, .. }
        ));
    }
}
