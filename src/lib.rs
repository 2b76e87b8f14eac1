//! jigen: character derivation graphs
//!
//! Builds the derivation graph of Chinese character forms from two relational
//! datasets, and resolves the descriptive prose shown next to it.
//!
//! ## Features
//!
//! - **Schema Normalization**: nested and flat group records, numeric parent
//!   references and default origin classes reduced to one canonical shape
//! - **Relation Graph**: parent → child edges with relation labels, origin
//!   tags derived from incoming labels
//! - **Era Classification**: each group reduced to its earliest (era, shade)
//! - **Focused Views**: the one-hop ego subgraph of a character
//! - **Variants**: transitive variant chains, cycle safe
//! - **Reference Resolution**: `{{id}}`, `[[id]]` and `{id}` placeholders
//!   resolved through alias chains and HTML-escaped
//! - **Content-Addressed Cache**: built graphs stored under a SHA256 key
//!
//! ## Data flow
//!
//! ```text
//! groups.json ─► normalize ─► RelationGraph::invert ─┬─► extract_ego (focused)
//! images.json ─► FormIndex ──────────────────────────┤
//!                                                    └─► RenderBoundary ─► cache
//! charinfo.json ─► DescriptiveDataset ─► ReferenceResolver ─► CharacterProfile
//! ```

pub mod cache;
pub mod checksum;
pub mod config;
pub mod engine;
pub mod error;
pub mod forms;
pub mod graph;
pub mod normalize;
pub mod palette;
pub mod profile;
pub mod record;
pub mod reference;
pub mod variants;

pub use cache::{ArtifactCache, ArtifactStore, CacheKey, FileStore, MemoryStore, PutOutcome, StoreError};
pub use checksum::Checksum;
pub use config::{JigenConfig, OutputFormat};
pub use engine::{
    build_boundary, CacheStatus, Construction, FormView, GraphEngine, NodeData, RenderBoundary, Selection,
};
pub use error::{JigenError, Result};
pub use forms::{Form, FormIndex};
pub use graph::{
    extract_ego, load_dataset, Adjacency, EgoSubgraph, EraShade, LoadConfig, LoadedDataset,
    OriginTag, RelationGraph,
};
pub use normalize::{normalize, NormalizedGroups};
pub use profile::{build_profile, CharacterProfile};
pub use record::{GroupEntry, GroupId, GroupRecord, OriginClass, ParentSpec, RelationLabel};
pub use reference::{DescriptiveDataset, ReferenceResolver};
pub use variants::VariantResolver;
