//! Variant chain expansion
//!
//! Variant characters are discovered from the focal character's groups and
//! then expanded through variant-root records (`variant-root:吕`), which may
//! list further variants. Chains may loop back on themselves.

use std::collections::HashSet;

use tracing::debug;

use crate::graph::traverse::guarded_bfs;
use crate::normalize::NormalizedGroups;
use crate::record::{
    base_character, variant_root_character, variant_root_id, GroupRecord,
    LEGACY_VARIANT_ROOT_PREFIX,
};

/// Resolves the variant set of a focal character
pub struct VariantResolver<'a> {
    groups: &'a NormalizedGroups,
}

impl<'a> VariantResolver<'a> {
    pub fn new(groups: &'a NormalizedGroups) -> Self {
        Self { groups }
    }

    /// Variant-root record for `character`, under either prefix
    pub fn root_record(&self, character: &str) -> Option<&'a GroupRecord> {
        self.groups
            .record(&variant_root_id(character))
            .or_else(|| {
                self.groups
                    .record(&format!("{}{}", LEGACY_VARIANT_ROOT_PREFIX, character))
            })
    }

    /// Directly attested variants of `focal`, in discovery order
    pub fn start_set(&self, focal: &str) -> Vec<String> {
        let focal_groups: Vec<(&String, &GroupRecord)> =
            self.groups.records_with_base(focal).collect();
        let focal_ids: HashSet<&str> = focal_groups.iter().map(|(id, _)| id.as_str()).collect();

        let mut found = Vec::new();
        let mut push = |candidate: &str| {
            if !candidate.is_empty() && candidate != focal && !found.iter().any(|c| c == candidate) {
                found.push(candidate.to_string());
            }
        };

        // Other characters whose variant root derives from one of our groups
        for (id, record) in self.groups.records() {
            let Some(character) = variant_root_character(id) else {
                continue;
            };
            if let Some(parents) = &record.parents {
                if parents.ids().iter().any(|p| focal_ids.contains(p)) {
                    push(character);
                }
            }
        }

        for (_, record) in &focal_groups {
            for variant in &record.variants {
                push(variant);
            }
        }

        for (id, record) in &focal_groups {
            let base = base_character(id);
            for character in &record.characters {
                if character != base {
                    push(character);
                }
            }
        }

        found
    }

    /// Full variant set of `focal`: the start set expanded through
    /// variant-root records. Never contains `focal`.
    pub fn resolve(&self, focal: &str) -> Vec<String> {
        let starts = self.start_set(focal);

        let reached = guarded_bfs(starts, None, |character: &String| {
            self.root_record(character)
                .map(|record| {
                    record
                        .variants
                        .iter()
                        .filter(|v| v.as_str() != focal)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        });

        let variants: Vec<String> = reached.into_iter().map(|(c, _)| c).collect();
        debug!(focal, variants = variants.len(), "resolved variants");
        variants
    }
}
