//! Attested forms and their assignment to groups

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::normalize::NormalizedGroups;
use crate::record::GroupId;

/// One attested image of a character at a given era/script
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Form {
    /// Era + script tag, e.g. `zhou_early`
    pub descriptor_id: String,
    /// `<base character><number>`, e.g. `一3`
    pub image_id: String,
}

impl Form {
    /// Identity key `descriptorId/imageId`
    pub fn key(&self) -> String {
        format!("{}/{}", self.descriptor_id, self.image_id)
    }

    /// Placeholder forms (claimed by a group but not listed in the images
    /// dataset) use the image id as descriptor
    pub fn is_placeholder(&self) -> bool {
        self.descriptor_id == self.image_id
    }

    fn sort_key(&self) -> (u64, &str, &str) {
        (
            first_number(&self.image_id).unwrap_or(u64::MAX),
            &self.descriptor_id,
            &self.image_id,
        )
    }
}

/// First run of ASCII digits in `s`
fn first_number(s: &str) -> Option<u64> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let digits: String = s[start..].chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Forms grouped by the group that owns them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormIndex {
    by_group: BTreeMap<GroupId, Vec<Form>>,
}

impl FormIndex {
    /// Assign every image in the images dataset to a group.
    ///
    /// An image belongs to the group whose `images` claims it; unclaimed
    /// images form their own group named after the image id. Claimed images
    /// missing from the dataset still get a placeholder form.
    pub fn build(images: &Value, groups: &NormalizedGroups) -> Self {
        let mut image_to_group: HashMap<String, GroupId> = HashMap::new();
        for (group_id, record) in groups.records() {
            for image_id in record.image_ids(group_id) {
                image_to_group.insert(image_id, group_id.clone());
            }
        }

        let mut seen_images = BTreeSet::new();
        let mut by_group: BTreeMap<GroupId, BTreeSet<Form>> = BTreeMap::new();

        if let Some(descriptors) = images.as_object() {
            for (descriptor_id, listed) in descriptors {
                for image_id in image_list(listed) {
                    let group = image_to_group
                        .get(&image_id)
                        .cloned()
                        .unwrap_or_else(|| image_id.clone());
                    seen_images.insert(image_id.clone());
                    by_group.entry(group).or_default().insert(Form {
                        descriptor_id: descriptor_id.clone(),
                        image_id,
                    });
                }
            }
        }

        for (image_id, group) in &image_to_group {
            if !seen_images.contains(image_id) {
                by_group.entry(group.clone()).or_default().insert(Form {
                    descriptor_id: image_id.clone(),
                    image_id: image_id.clone(),
                });
            }
        }

        let by_group: BTreeMap<GroupId, Vec<Form>> = by_group
            .into_iter()
            .map(|(group, forms)| {
                let mut forms: Vec<Form> = forms.into_iter().collect();
                forms.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
                (group, forms)
            })
            .collect();

        debug!(
            groups = by_group.len(),
            forms = by_group.values().map(Vec::len).sum::<usize>(),
            "assigned forms to groups"
        );

        Self { by_group }
    }

    /// Forms of a group, ordered by image number then descriptor
    pub fn forms_of(&self, group: &str) -> &[Form] {
        self.by_group.get(group).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every group that owns at least one form
    pub fn group_ids(&self) -> impl Iterator<Item = &GroupId> {
        self.by_group.keys()
    }

    pub fn form_count(&self) -> usize {
        self.by_group.values().map(Vec::len).sum()
    }
}

fn image_list(value: &Value) -> Vec<String> {
    let scalar = |v: &Value| match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };
    match value {
        Value::Array(items) => items.iter().filter_map(scalar).collect(),
        other => scalar(other).into_iter().collect(),
    }
}
