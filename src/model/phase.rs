//! The pipeline stage a repository has reached.

use serde::{Deserialize, Serialize};

/// Ordered pipeline stages. A repository only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    Source,
    Clone,
    Scan,
    Patch,
    Forge,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Source => "SOURCE",
            Phase::Clone => "CLONE",
            Phase::Scan => "SCAN",
            Phase::Patch => "PATCH",
            Phase::Forge => "FORGE",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
