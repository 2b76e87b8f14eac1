//! Content hashes for datasets and cache keys

use sha2::{Digest, Sha256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between combined parts; cannot occur in a hex digest
const PART_SEPARATOR: u8 = 0x1f;

/// SHA256 checksum of some input, as lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute checksum from a string
    pub fn from_str(content: &str) -> Self {
        Self::from_bytes(content.as_bytes())
    }

    /// Combine several parts into one digest.
    ///
    /// Parts are length-delimited so `["ab", "c"]` and `["a", "bc"]` differ.
    pub fn combine<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut hasher = Sha256::new();
        for part in parts {
            let part = part.as_ref();
            hasher.update((part.len() as u64).to_be_bytes());
            hasher.update(part.as_bytes());
            hasher.update([PART_SEPARATOR]);
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_consistency() {
        let content = r#"{"一": {"1": {"parents": "2"}}}"#;
        let checksum1 = Checksum::from_str(content);
        let checksum2 = Checksum::from_str(content);
        assert_eq!(checksum1, checksum2);
        assert_eq!(checksum1.as_str().len(), 64);
    }

    #[test]
    fn test_checksum_different_content() {
        let checksum1 = Checksum::from_str(r#"{"一1": {}}"#);
        let checksum2 = Checksum::from_str(r#"{"一2": {}}"#);
        assert_ne!(checksum1, checksum2);
    }

    #[test]
    fn test_bytes_and_str_agree() {
        let content = r#"{"shang_oracle": ["一1"]}"#;
        assert_eq!(Checksum::from_str(content), Checksum::from_bytes(content.as_bytes()));
        assert_eq!(Checksum::from_str(content).to_string(), Checksum::from_str(content).as_str());
    }

    #[test]
    fn test_combine_is_boundary_sensitive() {
        assert_ne!(Checksum::combine(["ab", "c"]), Checksum::combine(["a", "bc"]));
        assert_eq!(Checksum::combine(["a", ""]), Checksum::combine(["a", ""]));
        assert_ne!(Checksum::combine(["a", ""]), Checksum::combine(["a"]));
    }
}
