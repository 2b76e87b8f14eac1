//! Descriptive records and template reference resolution
//!
//! Descriptive prose embeds references to (character, sense) pairs:
//!
//! - `{{舌2}}` renders meaning, character and old reconstruction
//! - `[[舌2]]` renders character and old reconstruction in corner brackets
//! - `{舌2}` renders a terse character + reconstruction form
//!
//! A sense entry may itself be a string naming another sense; such alias
//! chains are followed against a read-only [`DescriptiveDataset`] snapshot.

use std::collections::{BTreeMap, HashSet};

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// One sense of a character
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptiveRecord {
    /// Meanings in order of preference
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meaning: Vec<String>,

    /// Old Chinese reconstruction (`oc`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_reconstruction: Option<String>,

    /// Middle Chinese approximation (`mc`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_approximation: Option<String>,
}

impl DescriptiveRecord {
    fn from_map(map: &serde_json::Map<String, Value>) -> Self {
        let meaning = map
            .get("mean")
            .or_else(|| map.get("meaning"))
            .map(|m| match m {
                Value::Array(items) => items.iter().filter_map(text).collect(),
                other => text(other).into_iter().collect(),
            })
            .unwrap_or_default();

        Self {
            meaning,
            old_reconstruction: map.get("oc").and_then(text).filter(|s| !s.is_empty()),
            middle_approximation: map.get("mc").and_then(text).filter(|s| !s.is_empty()),
        }
    }

    /// First non-empty meaning
    pub fn primary_meaning(&self) -> Option<&str> {
        self.meaning.iter().map(String::as_str).find(|m| !m.is_empty())
    }

    /// All meanings joined for display, or an em placeholder when absent
    pub fn joined_meaning(&self) -> String {
        if self.meaning.is_empty() {
            "—".to_string()
        } else {
            self.meaning.join("、")
        }
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A sense entry: a record, or an alias naming another sense
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DescriptiveEntry {
    Record(DescriptiveRecord),
    Alias(String),
}

/// Everything known about one character
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterEntry {
    /// Template prose with placeholders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,

    /// Senses keyed by sense index
    #[serde(default)]
    pub senses: BTreeMap<String, DescriptiveEntry>,
}

/// Read-only descriptive dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptiveDataset {
    characters: BTreeMap<String, CharacterEntry>,
}

/// Outcome of following a reference chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<'a> {
    /// Character of the id as written
    pub base: String,
    /// Sense index of the id as written
    pub index: String,
    /// Terminal record; `None` for missing links, cycles and malformed ids
    pub record: Option<&'a DescriptiveRecord>,
}

impl DescriptiveDataset {
    /// Interpret a raw `charinfo.json` value. Unreadable parts are skipped.
    pub fn from_value(raw: &Value) -> Self {
        let Some(top) = raw.as_object() else {
            if !raw.is_null() {
                warn!("descriptive dataset is not an object; treating it as empty");
            }
            return Self::default();
        };

        let mut characters = BTreeMap::new();
        for (character, value) in top {
            let Some(map) = value.as_object() else {
                warn!(character = %character, "skipping descriptive entry that is not an object");
                continue;
            };

            let mut entry = CharacterEntry::default();
            for (key, field) in map {
                if key == "info" {
                    entry.info = field.as_str().map(str::to_string);
                    continue;
                }
                let sense = match field {
                    Value::Object(record) => DescriptiveEntry::Record(DescriptiveRecord::from_map(record)),
                    Value::String(alias) => DescriptiveEntry::Alias(alias.trim().to_string()),
                    _ => continue,
                };
                entry.senses.insert(key.clone(), sense);
            }
            characters.insert(character.clone(), entry);
        }

        debug!(characters = characters.len(), "loaded descriptive dataset");
        Self { characters }
    }

    pub fn character(&self, character: &str) -> Option<&CharacterEntry> {
        self.characters.get(character)
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    fn sense(&self, character: &str, index: &str) -> Option<&DescriptiveEntry> {
        self.characters.get(character)?.senses.get(index)
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolves sense ids and fills template placeholders
pub struct ReferenceResolver<'a> {
    dataset: &'a DescriptiveDataset,
    sense_id: Regex,
    double_brace: Regex,
    double_bracket: Regex,
    single_brace: Regex,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(dataset: &'a DescriptiveDataset) -> Self {
        Self {
            dataset,
            sense_id: Regex::new(r"^([^0-9]+)([0-9]+)$").unwrap(),
            double_brace: Regex::new(r"\{\{\s*([^}\s]+)\s*\}\}").unwrap(),
            double_bracket: Regex::new(r"\[\[\s*([^\]\s]+)\s*\]\]").unwrap(),
            single_brace: Regex::new(r"\{\s*([^}\s]+)\s*\}").unwrap(),
        }
    }

    /// Split `舌2` into (`舌`, `2`)
    pub fn parse_id<'s>(&self, id: &'s str) -> Option<(&'s str, &'s str)> {
        let caps = self.sense_id.captures(id)?;
        Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
    }

    /// Follow alias links from `id` to a terminal record
    pub fn resolve(&self, id: &str) -> Option<Resolution<'a>> {
        let (base, index) = self.parse_id(id)?;
        let mut seen = HashSet::new();
        let mut current = id.to_string();

        let record = loop {
            if !seen.insert(current.clone()) {
                debug!(id, "reference chain cycles");
                break None;
            }
            let Some((character, sense)) = self.parse_id(&current) else {
                break None;
            };
            match self.dataset.sense(character, sense) {
                None => break None,
                Some(DescriptiveEntry::Record(record)) => break Some(record),
                Some(DescriptiveEntry::Alias(next)) => current = next.clone(),
            }
        };

        Some(Resolution {
            base: base.to_string(),
            index: index.to_string(),
            record,
        })
    }

    /// Replace every placeholder in `template`.
    ///
    /// Double braces are handled first, then double brackets, then single
    /// braces, so the syntaxes cannot capture each other. Ids that do not
    /// parse are emitted as escaped literal text.
    pub fn render(&self, template: &str) -> String {
        let pass = self.double_brace.replace_all(template, |caps: &Captures| {
            self.substitute(caps, |base, meaning, oc| {
                format!(
                    "<b>{}</b>を意味する漢語｛<b>{}</b>/<span class=\"serif\">*{}</span>/｝",
                    escape_html(meaning),
                    escape_html(base),
                    escape_html(oc)
                )
            })
        });

        let pass = self.double_bracket.replace_all(&pass, |caps: &Captures| {
            self.substitute(caps, |base, _, oc| {
                format!(
                    "「{}/<span class=\"serif\">*{}</span>/」",
                    escape_html(base),
                    escape_html(oc)
                )
            })
        });

        self.single_brace
            .replace_all(&pass, |caps: &Captures| {
                self.substitute(caps, |base, _, oc| {
                    format!(
                        "｛{} /<span class=\"serif\">*{}</span>/｝",
                        escape_html(base),
                        escape_html(oc)
                    )
                })
            })
            .into_owned()
    }

    fn substitute<F>(&self, caps: &Captures, format: F) -> String
    where
        F: Fn(&str, &str, &str) -> String,
    {
        let id = caps.get(1).map_or("", |m| m.as_str());
        match self.resolve(id) {
            Some(resolution) => {
                let record = resolution.record;
                let meaning = record
                    .and_then(DescriptiveRecord::primary_meaning)
                    .unwrap_or(&resolution.base);
                let oc = record
                    .and_then(|r| r.old_reconstruction.as_deref())
                    .unwrap_or("");
                format(&resolution.base, meaning, oc)
            }
            None => escape_html(id),
        }
    }
}

/// Escape `& < > "` for embedding in HTML
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
