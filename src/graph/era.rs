//! Era/shade classification of descriptors and groups

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::forms::Form;

/// Era prefixes, earliest first; the position is the era index
pub const ERA_PREFIXES: [&str; 9] = [
    "shang_",
    "zhou_",
    "spring_autumn_",
    "warring_states_",
    "qin_",
    "western_han_",
    "xin_",
    "eastern_han_",
    "computer_",
];

/// Era index used for groups known only through print characters
pub const MODERN_PRINT_ERA: u8 = 8;

/// Shade used when a descriptor names no sub-era
pub const DEFAULT_SHADE: u8 = 1;

/// Known descriptors with their era and script labels
const DESCRIPTOR_LABELS: &[(&str, &str, &str)] = &[
    ("shang_oracle", "商代", "甲骨文"),
    ("shang_bronze", "商代", "金文"),
    ("zhou_early_oracle", "西周早期", "甲骨文"),
    ("zhou_early", "西周早期", "金文"),
    ("zhou_middle", "西周中期", "金文"),
    ("zhou_late", "西周晩期", "金文"),
    ("spring_autumn_early", "春秋早期", "金文"),
    ("spring_autumn_early_seal", "春秋早期", "石鼓文"),
    ("spring_autumn_middle", "春秋中期", "金文"),
    ("spring_autumn_late", "春秋晩期", "金文"),
    ("spring_autumn_late_slip", "春秋晩期", "侯馬"),
    ("warring_states_early", "戦国早期", "金文"),
    ("warring_states_middle", "戦国中期", "金文"),
    ("warring_states_middle_qi", "戦国中期", "斉系"),
    ("warring_states_middle_yan", "戦国中期", "燕系"),
    ("warring_states_middle_jin", "戦国中期", "晉系"),
    ("warring_states_middle_qin", "戦国中期", "秦系"),
    ("warring_states_middle_slip", "戦国中期", "楚系簡帛"),
    ("warring_states_late", "戦国晩期", "金文"),
    ("qin_slip", "秦", "簡牘"),
    ("qin_seal", "秦", "小篆"),
    ("qin_clerical", "秦", "隷書"),
    ("western_han_slip", "西漢", "簡帛"),
    ("western_han_clerical", "西漢", "隷書"),
    ("xin_clerical", "新", "隷書"),
    ("eastern_han_seal", "東漢", "説文"),
    ("eastern_han_clerical", "東漢", "隷書"),
    ("computer_print", "現代", "印刷体"),
];

/// Representative (era, shade) pair; orders era first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EraShade {
    /// 0 (Shang) ..= 8 (modern print)
    pub era: u8,
    /// 0 early, 1 middle, 2 late
    pub shade: u8,
}

impl fmt::Display for EraShade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.era, self.shade)
    }
}

/// Era and script labels for a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorLabel {
    pub era: String,
    pub script: String,
}

/// Classify a descriptor id by its era prefix
pub fn classify_descriptor(descriptor_id: &str) -> Option<EraShade> {
    let era = ERA_PREFIXES
        .iter()
        .position(|prefix| descriptor_id.starts_with(prefix))?;

    let shade = if descriptor_id.contains("_early") {
        0
    } else if descriptor_id.contains("_middle") {
        1
    } else if descriptor_id.contains("_late") {
        2
    } else {
        DEFAULT_SHADE
    };

    Some(EraShade {
        era: era as u8,
        shade,
    })
}

/// Representative classification of a group.
///
/// The earliest era among its forms, then the earliest shade within that
/// era. Groups without classifiable forms fall back to the modern-print era
/// when they carry print characters, otherwise they are unclassified.
pub fn classify_group_era(forms: &[Form], has_characters: bool) -> Option<EraShade> {
    let earliest = forms
        .iter()
        .filter_map(|form| classify_descriptor(&form.descriptor_id))
        .min();

    match earliest {
        Some(era_shade) => Some(era_shade),
        None if has_characters => Some(EraShade {
            era: MODERN_PRINT_ERA,
            shade: DEFAULT_SHADE,
        }),
        None => None,
    }
}

/// Human-readable labels; unknown descriptors label both parts with the id
pub fn describe_descriptor(descriptor_id: &str) -> DescriptorLabel {
    DESCRIPTOR_LABELS
        .iter()
        .find(|(id, _, _)| *id == descriptor_id)
        .map(|(_, era, script)| DescriptorLabel {
            era: era.to_string(),
            script: script.to_string(),
        })
        .unwrap_or_else(|| DescriptorLabel {
            era: descriptor_id.to_string(),
            script: descriptor_id.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(descriptor: &str) -> Form {
        Form {
            descriptor_id: descriptor.to_string(),
            image_id: "一1".to_string(),
        }
    }

    #[test]
    fn test_classify_descriptor() {
        assert_eq!(classify_descriptor("shang_oracle"), Some(EraShade { era: 0, shade: 1 }));
        assert_eq!(classify_descriptor("zhou_early_oracle"), Some(EraShade { era: 1, shade: 0 }));
        assert_eq!(classify_descriptor("spring_autumn_late_slip"), Some(EraShade { era: 2, shade: 2 }));
        assert_eq!(classify_descriptor("warring_states_middle_qi"), Some(EraShade { era: 3, shade: 1 }));
        assert_eq!(classify_descriptor("computer_print"), Some(EraShade { era: 8, shade: 1 }));
        assert_eq!(classify_descriptor("tang_regular"), None);
        assert_eq!(classify_descriptor(""), None);
    }

    #[test]
    fn test_group_takes_earliest_era_then_shade() {
        let forms = [
            form("qin_seal"),
            form("zhou_late"),
            form("zhou_early"),
            form("shang_bronze"),
        ];
        assert_eq!(classify_group_era(&forms, false), Some(EraShade { era: 0, shade: 1 }));
        assert_eq!(
            classify_group_era(&forms[..3], false),
            Some(EraShade { era: 1, shade: 0 })
        );
    }

    #[test]
    fn test_group_fallbacks() {
        let placeholder = [form("一1")];
        assert_eq!(classify_group_era(&placeholder, false), None);
        assert_eq!(
            classify_group_era(&placeholder, true),
            Some(EraShade { era: MODERN_PRINT_ERA, shade: 1 })
        );
        assert_eq!(classify_group_era(&[], false), None);
    }

    #[test]
    fn test_describe_descriptor() {
        let label = describe_descriptor("qin_seal");
        assert_eq!(label.era, "秦");
        assert_eq!(label.script, "小篆");
        assert_eq!(describe_descriptor("mystery").era, "mystery");
        assert_eq!(DESCRIPTOR_LABELS.len(), 28);
    }
}
