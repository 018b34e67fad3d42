//! Spec fingerprints
//!
//! A fingerprint is the SHA-256 of the spec's canonical JSON encoding. Since
//! every map in `PackageSpec` is ordered, the encoding — and therefore the
//! fingerprint — is stable across regenerations for unchanged input, which
//! is what release tooling diffs against.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::spec::PackageSpec;

/// SHA-256 digest of a serialized package spec
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Fingerprint of a completed spec
    pub fn of_spec(spec: &PackageSpec) -> Result<Self> {
        let canonical = serde_json::to_string(spec)?;
        Ok(Self::from_bytes(canonical.as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check serialized content against this fingerprint
    pub fn matches(&self, data: &[u8]) -> bool {
        *self == Self::from_bytes(data)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_spec_same_fingerprint() {
        let a = PackageSpec::new("example");
        let b = PackageSpec::new("example");
        assert_eq!(Fingerprint::of_spec(&a).unwrap(), Fingerprint::of_spec(&b).unwrap());
    }

    #[test]
    fn test_different_name_different_fingerprint() {
        let a = PackageSpec::new("example");
        let b = PackageSpec::new("other");
        assert_ne!(Fingerprint::of_spec(&a).unwrap(), Fingerprint::of_spec(&b).unwrap());
    }

    #[test]
    fn test_matches() {
        let spec = PackageSpec::new("example");
        let encoded = serde_json::to_string(&spec).unwrap();
        let fp = Fingerprint::of_spec(&spec).unwrap();
        assert!(fp.matches(encoded.as_bytes()));
        assert!(!fp.matches(b"something else"));
    }
}
