//! Repositories as discovered by a Source and as cloned on disk.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::outcome::PhaseError;

/// Unique key of a repository within one run.
pub type RepoId = String;

/// A git branch name.
pub type BranchName = String;

/// Repositories indexed by their id. Ordered so every run iterates identically.
pub type IndexedRepos = BTreeMap<RepoId, SourcedRepo>;

/// A repository as discovered, before cloning, with any Source-provided metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcedRepo {
    /// The `git clone`-able URL, or a local path
    pub clone_url: String,
    pub repo_id: RepoId,
    /// Branch to check out after cloning (None keeps whatever is checked out)
    #[serde(default)]
    pub upstream_branch: Option<BranchName>,
    /// Pull before handing the repo over (useful when reusing cached clones)
    #[serde(default)]
    pub force_pull: bool,
    /// Arbitrary per-repo data handed to the PatchDriver
    #[serde(default)]
    pub patch_data: serde_json::Map<String, serde_json::Value>,
    /// An error the Source attached while discovering this repo
    #[serde(default)]
    pub error: Option<PhaseError>,
}

impl SourcedRepo {
    /// A repo identified by its own clone URL.
    pub fn from_url(url: &str) -> Self {
        Self::new(url, url)
    }

    pub fn new(repo_id: &str, clone_url: &str) -> Self {
        Self {
            clone_url: clone_url.to_string(),
            repo_id: repo_id.to_string(),
            upstream_branch: None,
            force_pull: false,
            patch_data: serde_json::Map::new(),
            error: None,
        }
    }
}

/// A repository after a successful clone with its branch configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClonedRepo {
    #[serde(flatten)]
    pub source: SourcedRepo,
    /// Filesystem path of the working tree
    pub cloned_path: PathBuf,
    /// Branch checked out once cloning finished
    pub current_branch: BranchName,
    /// HEAD commit at clone time
    pub commit_hash: String,
}

impl ClonedRepo {
    pub fn repo_id(&self) -> &str {
        &self.source.repo_id
    }
}

/// Build an index from a list of clone URLs, each URL being its own id.
pub fn index_urls<I, S>(urls: I) -> IndexedRepos
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    urls.into_iter()
        .map(|u| u.as_ref().trim().to_string())
        .filter(|u| !u.is_empty())
        .map(|u| (u.clone(), SourcedRepo::from_url(&u)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_urls_skips_blank_lines() {
        let repos = index_urls(["git@github.com:org/a.git", "  ", "/tmp/b"]);
        assert_eq!(repos.len(), 2);
        assert_eq!(repos["/tmp/b"].clone_url, "/tmp/b");
        assert_eq!(repos["/tmp/b"].repo_id, "/tmp/b");
    }

    #[test]
    fn cloned_repo_flattens_source_fields() {
        let cloned = ClonedRepo {
            source: SourcedRepo::new("a", "git@x:org/a.git"),
            cloned_path: PathBuf::from("/tmp/a"),
            current_branch: "main".into(),
            commit_hash: "0".repeat(40),
        };
        let json = serde_json::to_value(&cloned).unwrap();
        assert_eq!(json["repo_id"], "a");
        assert_eq!(json["current_branch"], "main");
        let back: ClonedRepo = serde_json::from_value(json).unwrap();
        assert_eq!(back, cloned);
    }
}
