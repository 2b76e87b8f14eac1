//! Group records and their heterogeneous field shapes
//!
//! Raw group records come from hand-edited JSON where the same field may be a
//! string, a number, a list or a mapping. Each shape is parsed into a tagged
//! union here so that everything past the normalizer sees a single canonical
//! form.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// Group identifier: base character plus numeric suffix (`一1`), or a
/// synthetic variant root (`variant-root:呂`)
pub type GroupId = String;

/// Prefix of synthetic variant-root group ids
pub const VARIANT_ROOT_PREFIX: &str = "variant-root:";

/// Older spelling of the variant-root prefix still found in datasets
pub const LEGACY_VARIANT_ROOT_PREFIX: &str = "c_";

/// Field names a group record may carry. An object holding any of them is a
/// record, never a container of sub-groups.
pub(crate) const RECORD_FIELDS: &[&str] = &[
    "images",
    "parents",
    "class",
    "originClass",
    "variants",
    "variant",
    "characters",
    "chars",
    "characters_list",
];

/// Build the variant-root id for a character
pub fn variant_root_id(character: &str) -> GroupId {
    format!("{}{}", VARIANT_ROOT_PREFIX, character)
}

/// The character a variant-root id stands for
pub fn variant_root_character(id: &str) -> Option<&str> {
    id.strip_prefix(VARIANT_ROOT_PREFIX)
        .or_else(|| id.strip_prefix(LEGACY_VARIANT_ROOT_PREFIX))
        .filter(|c| !c.is_empty())
}

/// Base character of a group id.
///
/// For variant roots this is the wrapped character, otherwise the leading run
/// of non-digit characters. An id starting with a digit is its own base.
pub fn base_character(id: &str) -> &str {
    if let Some(character) = variant_root_character(id) {
        return character;
    }
    let end = id.find(|c: char| c.is_ascii_digit()).unwrap_or(id.len());
    if end == 0 {
        id
    } else {
        &id[..end]
    }
}

/// Split `一12` / `一12a` into (`一`, `12`). Ids without a leading base or
/// without digits after it yield `None`.
pub fn split_numbered(id: &str) -> Option<(&str, &str)> {
    let start = id.find(|c: char| c.is_ascii_digit())?;
    if start == 0 {
        return None;
    }
    let rest = &id[start..];
    let len = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    Some((&id[..start], &rest[..len]))
}

/// True for references made only of digits and dots (`"2"`, `"1.5"`)
pub fn is_numeric_ref(reference: &str) -> bool {
    !reference.is_empty() && reference.chars().all(|c| c.is_ascii_digit() || c == '.')
}

fn rebase_ref(reference: String, base: &str) -> String {
    if is_numeric_ref(&reference) {
        format!("{}{}", base, reference)
    } else {
        reference
    }
}

/// Failure to interpret a raw record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("record is not an object")]
    NotAnObject,

    #[error("field `{field}` has an unsupported shape")]
    UnexpectedShape { field: &'static str },
}

// =============================================================================
// Relation Label
// =============================================================================

/// Label on a parent → child derivation edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationLabel {
    /// Plain evolution (no label)
    Evolution,
    /// Parent supplies the sound
    Phonetic,
    /// Parent supplies the meaning
    Semantic,
    /// Child split off from the parent
    Differentiation,
    /// Parent is a graphic component
    Component,
    Pictographic,
    Indicative,
    /// Derivation is doubtful
    Uncertain,
    /// Label not known to this crate, kept verbatim
    Other(String),
}

impl RelationLabel {
    /// Parse a label in either its English or source-dataset spelling
    pub fn parse(label: &str) -> Self {
        match label.trim() {
            "" => Self::Evolution,
            "phonetic" | "声符" => Self::Phonetic,
            "semantic" | "義符" => Self::Semantic,
            "differentiation" | "分化" => Self::Differentiation,
            "component" | "部件" => Self::Component,
            "pictographic" | "象形" => Self::Pictographic,
            "indicative" | "指事" => Self::Indicative,
            "uncertain" | "疑" => Self::Uncertain,
            _ => Self::Other(label.to_string()),
        }
    }

    /// Canonical spelling
    pub fn as_str(&self) -> &str {
        match self {
            Self::Evolution => "",
            Self::Phonetic => "phonetic",
            Self::Semantic => "semantic",
            Self::Differentiation => "differentiation",
            Self::Component => "component",
            Self::Pictographic => "pictographic",
            Self::Indicative => "indicative",
            Self::Uncertain => "uncertain",
            Self::Other(label) => label,
        }
    }

    /// Whether renderers draw this edge with a dashed stroke
    pub fn is_dashed(&self) -> bool {
        matches!(
            self,
            Self::Differentiation
                | Self::Component
                | Self::Indicative
                | Self::Pictographic
                | Self::Uncertain
        )
    }

    /// Stroke colour renderers use for this edge
    pub fn stroke_color(&self) -> &'static str {
        match self {
            Self::Phonetic | Self::Differentiation => "#06c",
            Self::Semantic | Self::Component | Self::Indicative => "#f00",
            Self::Pictographic => "#6c6",
            _ => "#333",
        }
    }

    fn from_value(value: &Value) -> Result<Self, RecordError> {
        match value {
            Value::Null => Ok(Self::Evolution),
            Value::String(s) => Ok(Self::parse(s)),
            Value::Number(n) => Ok(Self::parse(&n.to_string())),
            _ => Err(RecordError::UnexpectedShape { field: "parents" }),
        }
    }
}

impl fmt::Display for RelationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RelationLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RelationLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

// =============================================================================
// Origin Class
// =============================================================================

/// Explicit origin classification carried on a record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OriginClass {
    Pictographic,
    Other(String),
}

impl OriginClass {
    pub fn parse(class: &str) -> Self {
        match class.trim() {
            "pictographic" | "象形" => Self::Pictographic,
            _ => Self::Other(class.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pictographic => "pictographic",
            Self::Other(class) => class,
        }
    }
}

impl Serialize for OriginClass {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OriginClass {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

// =============================================================================
// Parent Spec
// =============================================================================

/// The `parents` field of a group record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParentSpec {
    /// One unlabelled parent
    Single(GroupId),
    /// Several unlabelled parents, in order
    List(Vec<GroupId>),
    /// Parents with a relation label each
    Labeled(BTreeMap<GroupId, RelationLabel>),
}

impl ParentSpec {
    /// Parse the raw field. `null` means no parents.
    pub fn from_value(value: &Value) -> Result<Option<Self>, RecordError> {
        let shape = RecordError::UnexpectedShape { field: "parents" };
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(Self::Single(s.clone()))),
            Value::Number(n) => Ok(Some(Self::Single(n.to_string()))),
            Value::Array(items) => {
                let mut parents = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Null => {}
                        Value::String(s) => parents.push(s.clone()),
                        Value::Number(n) => parents.push(n.to_string()),
                        _ => return Err(shape),
                    }
                }
                Ok(Some(Self::List(parents)))
            }
            Value::Object(map) => {
                let mut labeled = BTreeMap::new();
                for (parent, label) in map {
                    labeled.insert(parent.clone(), RelationLabel::from_value(label)?);
                }
                Ok(Some(Self::Labeled(labeled)))
            }
            Value::Bool(_) => Err(shape),
        }
    }

    /// Rewrite numeric-only references as `<base><number>`
    pub fn rebase(self, base: &str) -> Self {
        match self {
            Self::Single(parent) => Self::Single(rebase_ref(parent, base)),
            Self::List(parents) => {
                Self::List(parents.into_iter().map(|p| rebase_ref(p, base)).collect())
            }
            Self::Labeled(labeled) => Self::Labeled(
                labeled
                    .into_iter()
                    .map(|(parent, label)| (rebase_ref(parent, base), label))
                    .collect(),
            ),
        }
    }

    /// Every (parent, label) pair, skipping empty ids
    pub fn edges(&self) -> Vec<(&str, RelationLabel)> {
        match self {
            Self::Single(parent) => vec![(parent.as_str(), RelationLabel::Evolution)],
            Self::List(parents) => parents
                .iter()
                .map(|p| (p.as_str(), RelationLabel::Evolution))
                .collect(),
            Self::Labeled(labeled) => labeled
                .iter()
                .map(|(p, label)| (p.as_str(), label.clone()))
                .collect(),
        }
        .into_iter()
        .filter(|(parent, _)| !parent.is_empty())
        .collect()
    }

    /// Parent ids, skipping empty ones
    pub fn ids(&self) -> Vec<&str> {
        self.edges().into_iter().map(|(parent, _)| parent).collect()
    }

    /// Does this spec name `group` as a parent?
    pub fn references(&self, group: &str) -> bool {
        match self {
            Self::Single(parent) => parent == group,
            Self::List(parents) => parents.iter().any(|p| p == group),
            Self::Labeled(labeled) => labeled.contains_key(group),
        }
    }

    /// True when no usable parent id is present
    pub fn is_empty(&self) -> bool {
        self.edges().is_empty()
    }
}

// =============================================================================
// Group Record
// =============================================================================

/// A normalized group record
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupRecord {
    /// Image numbers owned by the group (relative to its base character)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parents: Option<ParentSpec>,

    #[serde(rename = "class", skip_serializing_if = "Option::is_none")]
    pub origin_class: Option<OriginClass>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<String>,

    /// Modern/print characters attached directly to the group
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub characters: Vec<String>,

    /// Fields this crate does not interpret, kept verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl GroupRecord {
    /// Interpret a raw record object
    pub fn from_value(value: &Value) -> Result<Self, RecordError> {
        let map = value.as_object().ok_or(RecordError::NotAnObject)?;
        let mut record = GroupRecord::default();

        for (key, field) in map {
            match key.as_str() {
                "images" => record.images = scalar_list(field, "images")?,
                "parents" => record.parents = ParentSpec::from_value(field)?,
                "class" | "originClass" => {
                    record.origin_class = match field {
                        Value::Null => record.origin_class.take(),
                        Value::String(s) if s.trim().is_empty() => record.origin_class.take(),
                        Value::String(s) => Some(OriginClass::parse(s)),
                        _ => return Err(RecordError::UnexpectedShape { field: "class" }),
                    }
                }
                "variants" | "variant" => {
                    record.variants.extend(scalar_list(field, "variants")?);
                }
                "characters" | "chars" | "characters_list" => {
                    record.characters.extend(scalar_list(field, "characters")?);
                }
                _ => {
                    record.extra.insert(key.clone(), field.clone());
                }
            }
        }

        dedup_in_order(&mut record.variants);
        dedup_in_order(&mut record.characters);
        Ok(record)
    }

    /// Image ids (`<base><number>`) owned by the group `group_id`
    pub fn image_ids(&self, group_id: &str) -> Vec<String> {
        let base = base_character(group_id);
        self.images
            .iter()
            .map(|image| format!("{}{}", base, image))
            .collect()
    }

    /// Explicitly pictographic, or no usable parents at all
    pub fn is_pictographic(&self) -> bool {
        self.origin_class == Some(OriginClass::Pictographic)
            || self.parents.as_ref().map_or(true, ParentSpec::is_empty)
    }
}

/// Accept a scalar or a list of scalars; blank entries are dropped
fn scalar_list(value: &Value, field: &'static str) -> Result<Vec<String>, RecordError> {
    let scalar = |v: &Value| -> Result<Option<String>, RecordError> {
        match v {
            Value::Null => Ok(None),
            Value::String(s) => {
                let s = s.trim();
                Ok((!s.is_empty()).then(|| s.to_string()))
            }
            Value::Number(n) => Ok(Some(n.to_string())),
            _ => Err(RecordError::UnexpectedShape { field }),
        }
    };

    match value {
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                if let Some(s) = scalar(item)? {
                    out.push(s);
                }
            }
            Ok(out)
        }
        other => Ok(scalar(other)?.into_iter().collect()),
    }
}

fn dedup_in_order(values: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    values.retain(|v| seen.insert(v.clone()));
}

/// A group entry after normalization
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GroupEntry {
    Record(GroupRecord),
    /// A value that could not be read as a record, carried through verbatim
    Opaque(Value),
}

impl GroupEntry {
    pub fn record(&self) -> Option<&GroupRecord> {
        match self {
            Self::Record(record) => Some(record),
            Self::Opaque(_) => None,
        }
    }
}
