//! Schema and source-provenance descriptors attached to serialized artifacts.

use serde::{Deserialize, Serialize};

/// Semantic version describing the schema of serialized payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Major version incremented for breaking changes.
    pub major: u32,
    /// Minor version incremented for additive changes.
    pub minor: u32,
    /// Patch version incremented for bug fixes and documentation updates.
    pub patch: u32,
}

impl SchemaVersion {
    /// Creates a new schema version descriptor.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

/// Identity of an external input file, recorded for reproducibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SourceDigest {
    /// Path the input was read from, as given by the caller.
    pub source: String,
    /// SHA-256 hash of the raw file content, hex encoded.
    pub sha256: String,
}

impl SourceDigest {
    /// Creates a digest descriptor from a path string and content hash.
    pub fn new(source: impl Into<String>, sha256: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            sha256: sha256.into(),
        }
    }
}
