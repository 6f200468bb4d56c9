//! Per-repo results of each phase, and the batch-wide outcome.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::path::Path;

use super::phase::Phase;
use super::repo::{ClonedRepo, IndexedRepos, RepoId, SourcedRepo};
use crate::errors::{ConfigError, GitError};

/// Key under which a failing scanner's error is recorded.
pub const SCAN_ERROR_KEY: &str = "scan_error";

/// Scanner name to whatever that scanner reported.
pub type ScanResult = BTreeMap<String, serde_json::Value>;

/// Record of a failure, tagged with the phase that raised it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseError {
    pub phase: Phase,
    /// Error family, e.g. `GitError`, `Panic`
    pub kind: String,
    pub message: String,
    /// Rendered cause chain, outermost first
    #[serde(default)]
    pub backtrace: Vec<String>,
}

impl PhaseError {
    pub fn new(phase: Phase, kind: &str, message: impl Into<String>) -> Self {
        Self {
            phase,
            kind: kind.to_string(),
            message: message.into(),
            backtrace: Vec::new(),
        }
    }

    pub fn from_error(phase: Phase, err: &anyhow::Error) -> Self {
        let kind = if err.chain().any(|c| c.is::<GitError>()) {
            "GitError"
        } else if err.chain().any(|c| c.is::<ConfigError>()) {
            "ConfigError"
        } else {
            "Error"
        };
        Self {
            phase,
            kind: kind.to_string(),
            message: format!("{:#}", err),
            backtrace: err.chain().map(|c| c.to_string()).collect(),
        }
    }

    /// Convert a caught panic payload.
    pub fn from_panic(phase: Phase, payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "panic with non-string payload".to_string()
        };
        Self::new(phase, "Panic", message)
    }
}

impl std::fmt::Display for PhaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at phase {}: {}", self.kind, self.phase, self.message)
    }
}

/// Category of result after running a PatchDriver over one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatchOutcome {
    PatchedOk,
    AlreadyPatched,
    PatchDoesNotApply,
    PatchError,
}

impl PatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchOutcome::PatchedOk => "PATCHED_OK",
            PatchOutcome::AlreadyPatched => "ALREADY_PATCHED",
            PatchOutcome::PatchDoesNotApply => "PATCH_DOES_NOT_APPLY",
            PatchOutcome::PatchError => "PATCH_ERROR",
        }
    }
}

impl std::fmt::Display for PatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchResult {
    pub outcome: PatchOutcome,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub error: Option<PhaseError>,
}

impl PatchResult {
    pub fn new(outcome: PatchOutcome) -> Self {
        Self {
            outcome,
            details: None,
            error: None,
        }
    }

    pub fn with_details(outcome: PatchOutcome, details: impl Into<String>) -> Self {
        Self {
            outcome,
            details: Some(details.into()),
            error: None,
        }
    }

    pub fn failed(error: PhaseError) -> Self {
        Self {
            outcome: PatchOutcome::PatchError,
            details: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrOutcome {
    PrCreated,
    PrFailed,
}

impl PrOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrOutcome::PrCreated => "PR_CREATED",
            PrOutcome::PrFailed => "PR_FAILED",
        }
    }
}

impl std::fmt::Display for PrOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrResult {
    pub outcome: PrOutcome,
    #[serde(default)]
    pub pr_html_url: Option<String>,
    #[serde(default)]
    pub error: Option<PhaseError>,
}

impl PrResult {
    pub fn created(url: String) -> Self {
        Self {
            outcome: PrOutcome::PrCreated,
            pr_html_url: Some(url),
            error: None,
        }
    }

    pub fn failed(error: PhaseError) -> Self {
        Self {
            outcome: PrOutcome::PrFailed,
            pr_html_url: None,
            error: Some(error),
        }
    }
}

/// A single repository's progress through the pipeline.
///
/// Created at Source time and advanced in place. Once `error` is set it is
/// never cleared: later phases see it and record a cascaded result instead of
/// doing real work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoOutcome {
    pub repo_id: RepoId,
    pub status: Phase,
    pub source: SourcedRepo,
    #[serde(default)]
    pub clone: Option<ClonedRepo>,
    #[serde(default)]
    pub scan: Option<ScanResult>,
    #[serde(default)]
    pub patch: Option<PatchResult>,
    #[serde(default)]
    pub forge: Option<PrResult>,
    #[serde(default)]
    pub error: Option<PhaseError>,
}

impl RepoOutcome {
    pub fn sourced(source: SourcedRepo) -> Self {
        Self {
            repo_id: source.repo_id.clone(),
            status: Phase::Source,
            error: source.error.clone(),
            source,
            clone: None,
            scan: None,
            patch: None,
            forge: None,
        }
    }

    /// Record an error unless one is already set; the first error wins.
    pub fn fail(&mut self, error: PhaseError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Move to `phase`. Never goes backwards.
    pub fn advance(&mut self, phase: Phase) {
        if phase > self.status {
            self.status = phase;
        }
    }

    /// Whether the Forge pass should pick this repo up.
    pub fn is_forge_candidate(&self) -> bool {
        self.status == Phase::Patch
            && self
                .patch
                .as_ref()
                .is_some_and(|p| p.outcome == PatchOutcome::PatchedOk)
    }
}

/// Every repo of the batch, keyed by id. Serializes as `{repo_id: RepoOutcome}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityOutcome {
    pub repos: BTreeMap<RepoId, RepoOutcome>,
}

impl ActivityOutcome {
    pub fn from_sourced(repos: IndexedRepos) -> Self {
        Self {
            repos: repos
                .into_iter()
                .map(|(id, repo)| (id, RepoOutcome::sourced(repo)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    pub fn get(&self, repo_id: &str) -> Option<&RepoOutcome> {
        self.repos.get(repo_id)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize activity outcome to JSON")
    }

    /// Load a previously saved outcome.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read outcome file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse outcome JSON: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut content = self.to_json()?;
        content.push('\n');
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write outcome file: {}", path.display()))
    }
}
