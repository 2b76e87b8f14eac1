//! Per-character descriptive profile
//!
//! Collects what a side panel shows for one character: origin tags, the
//! variant set, resolved `info` prose and the list of senses.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::graph::classify::{OriginClassifier, OriginTag};
use crate::graph::loader::LoadedDataset;
use crate::graph::RelationGraph;
use crate::reference::{escape_html, DescriptiveEntry, DescriptiveRecord, ReferenceResolver};
use crate::variants::VariantResolver;

/// One sense of the character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenseView {
    pub index: String,
    /// Meanings joined with `、`, or `—`
    pub meaning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_reconstruction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_approximation: Option<String>,
    /// Set when the sense is an alias of another sense
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias_of: Option<String>,
}

impl SenseView {
    fn new(index: &str, record: Option<&DescriptiveRecord>, alias_of: Option<String>) -> Self {
        Self {
            index: index.to_string(),
            meaning: record.map_or_else(|| "—".to_string(), DescriptiveRecord::joined_meaning),
            old_reconstruction: record.and_then(|r| r.old_reconstruction.clone()),
            middle_approximation: record.and_then(|r| r.middle_approximation.clone()),
            alias_of,
        }
    }
}

/// Descriptive panel data for one character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterProfile {
    pub character: String,
    pub origin_tags: BTreeSet<OriginTag>,
    pub variants: Vec<String>,
    /// Resolved `info` prose as HTML, newlines turned into `<br>`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info_html: Option<String>,
    pub senses: Vec<SenseView>,
}

impl CharacterProfile {
    /// Nothing is known about the character
    pub fn is_empty(&self) -> bool {
        self.origin_tags.is_empty()
            && self.variants.is_empty()
            && self.info_html.is_none()
            && self.senses.is_empty()
    }
}

/// Build the profile of `character`
pub fn build_profile(dataset: &LoadedDataset, character: &str) -> CharacterProfile {
    let character = character.trim();
    let graph = RelationGraph::invert(&dataset.groups);
    let origin_tags = OriginClassifier::new(&dataset.groups, &graph).classify_base(character);
    let variants = VariantResolver::new(&dataset.groups).resolve(character);

    let resolver = ReferenceResolver::new(&dataset.descriptive);
    let entry = dataset.descriptive.character(character);

    let info_html = entry
        .and_then(|e| e.info.as_deref())
        .filter(|info| !info.is_empty())
        .map(|info| resolver.render(info).replace("\r\n", "<br>").replace('\n', "<br>"));

    let mut senses: Vec<SenseView> = entry
        .map(|e| {
            e.senses
                .iter()
                .map(|(index, sense)| match sense {
                    DescriptiveEntry::Record(record) => SenseView::new(index, Some(record), None),
                    DescriptiveEntry::Alias(target) => {
                        let record = resolver.resolve(target).and_then(|r| r.record);
                        SenseView::new(index, record, Some(target.clone()))
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    // numeric indexes in numeric order, anything else last
    senses.sort_by(|a, b| {
        sense_order(&a.index)
            .cmp(&sense_order(&b.index))
            .then_with(|| a.index.cmp(&b.index))
    });

    CharacterProfile {
        character: character.to_string(),
        origin_tags,
        variants,
        info_html,
        senses,
    }
}

fn sense_order(index: &str) -> u64 {
    index.parse().unwrap_or(u64::MAX)
}

/// Render a profile as a small HTML fragment
pub fn render_profile_html(profile: &CharacterProfile) -> String {
    let mut out = String::new();
    out.push_str("<div class=\"char-side-content\">");

    if !profile.origin_tags.is_empty() {
        out.push_str("<div class=\"char-origin\">");
        for tag in &profile.origin_tags {
            out.push_str(&format!(
                "<span class=\"char-origin-type\">{}</span>",
                escape_html(tag.as_str())
            ));
        }
        out.push_str("</div>");
    }

    if !profile.variants.is_empty() {
        let variants: Vec<String> = profile.variants.iter().map(|v| escape_html(v)).collect();
        out.push_str(&format!("<div class=\"char-variants\">{}</div>", variants.join("、")));
    }

    if let Some(info) = &profile.info_html {
        out.push_str(&format!("<div class=\"char-info\">{}</div>", info));
    }

    for sense in &profile.senses {
        let head = match &sense.alias_of {
            Some(target) => format!("→<b>{}</b>", escape_html(target)),
            None => format!("<b>({})</b>", escape_html(&sense.index)),
        };
        out.push_str(&format!(
            "<div class=\"char-meaning-item\">{} {}。<p>*{}</p><p>{}</p></div>",
            head,
            escape_html(&sense.meaning),
            escape_html(sense.old_reconstruction.as_deref().unwrap_or("—")),
            escape_html(sense.middle_approximation.as_deref().unwrap_or("—")),
        ));
    }

    out.push_str("</div>");
    out
}
