use anyhow::Result;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::plugins::{Forge, PrRequest};

/// A real, stable PR to hand out as placeholder.
pub const DUMMY_PR_URL: &str = "https://github.com/OverkillGuy/sphinx-needs-tests/pull/1";

/// Forge that talks to nothing: every PR "opens" at `pr_url`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DummyForge {
    #[serde(default = "default_pr_url")]
    pub pr_url: String,
    /// Status to report per PR URL; unknown PRs report `open`
    #[serde(default)]
    pub statuses: BTreeMap<String, String>,
}

fn default_pr_url() -> String {
    DUMMY_PR_URL.to_string()
}

impl Default for DummyForge {
    fn default() -> Self {
        Self {
            pr_url: default_pr_url(),
            statuses: BTreeMap::new(),
        }
    }
}

impl Forge for DummyForge {
    fn create_pr(&self, _request: &PrRequest<'_>) -> Result<String> {
        Ok(self.pr_url.clone())
    }

    fn pr_status(&self, pr_url: &str) -> Result<String> {
        Ok(self
            .statuses
            .get(pr_url)
            .cloned()
            .unwrap_or_else(|| "open".to_string()))
    }

    fn pr_statuses(&self) -> Vec<String> {
        ["merged", "closed", "open"]
            .into_iter()
            .map(String::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_pr_returns_configured_url() {
        let forge = DummyForge::default();
        let request = PrRequest {
            forge_repo_url: "unix:///tmp/repo",
            base_branch: "main",
            head_branch: "counter",
            title: "t",
            body: "b",
            draft: false,
        };
        assert_eq!(forge.create_pr(&request).unwrap(), DUMMY_PR_URL);
    }

    #[test]
    fn status_defaults_to_open() {
        let mut forge = DummyForge::default();
        forge.statuses.insert("pr-1".into(), "merged".into());
        assert_eq!(forge.pr_status("pr-1").unwrap(), "merged");
        assert_eq!(forge.pr_status("pr-2").unwrap(), "open");
    }
}
