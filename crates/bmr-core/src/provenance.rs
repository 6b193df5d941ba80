//! Version and seed provenance recorded alongside exported runs.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// `major.minor.patch` version of a serialized document layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Bumped when existing fields change meaning or disappear.
    pub major: u32,
    /// Bumped when fields are added.
    pub minor: u32,
    /// Bumped for anything else.
    pub patch: u32,
}

impl SchemaVersion {
    /// Layout written by this release.
    pub const CURRENT: SchemaVersion = SchemaVersion::new(1, 0, 0);

    /// Builds a version triple.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Documents sharing a major version can be read by each other.
    pub fn is_compatible_with(&self, other: &SchemaVersion) -> bool {
        self.major == other.major
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Where a run's randomness came from and which tools produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RunProvenance {
    /// Seed the engine's stream was started from.
    pub seed: u64,
    /// Master seed before substream derivation, when one was applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_seed: Option<u64>,
    /// Substream index used for seed derivation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substream: Option<u64>,
    /// RFC 3339 timestamp of the export.
    pub created_at: String,
    /// Crate name to version.
    #[serde(default)]
    pub tool_versions: BTreeMap<String, String>,
}
