//! Typed error hierarchy for mass-driver.
//!
//! Two enums cover the two places where callers need to match on failures:
//! - `ConfigError` — activity loading and plugin resolution, fatal before any repo is touched
//! - `GitError` — the git adapter primitives used by the per-repo phases
//!
//! Plugin failures stay `anyhow::Error`; the executor records them as a
//! [`PhaseError`](crate::model::PhaseError) on the repo that raised them.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading an activity file or resolving its plugins.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read activity file at {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid activity TOML: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("Config given invalid: missing top-level '{0}' key")]
    MissingProjectKey(&'static str),

    #[error("Unknown {kind} '{name}'. Try `mass-driver {kind}s` for the list")]
    UnknownPlugin { kind: &'static str, name: String },

    #[error("Invalid configuration for {kind} '{name}': {source}")]
    PluginConfig {
        kind: &'static str,
        name: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Forge head branch not set and no migration branch to default to")]
    MissingHeadBranch,

    #[error("No repositories to process: give --repo-path, --repo-filelist or a [source] section")]
    NoRepos,
}

/// Errors from the git adapter.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Failed to open git repository at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("Failed to clone {url} into {path}: {source}")]
    CloneFailed {
        url: String,
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("Branch '{0}' not found locally nor on remote 'origin'")]
    BranchNotFound(String),

    #[error("Cannot pull '{0}': local branch diverged from remote (not a fast-forward)")]
    NonFastForward(String),

    #[error("Working tree is clean: nothing to commit")]
    NothingToCommit,

    #[error("Repository has no git remote")]
    NoRemote,

    #[error("Repository has {0} remotes, cannot pick one")]
    AmbiguousRemote(usize),

    #[error("Base branch could not be autodetected: no remote default branch")]
    NoDefaultBranch,

    #[error("HEAD is detached or unborn, no current branch")]
    NoCurrentBranch,

    #[error(transparent)]
    Git(#[from] git2::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_plugin_names_kind_and_name() {
        let err = ConfigError::UnknownPlugin {
            kind: "driver",
            name: "nope".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("driver 'nope'"));
        assert!(msg.contains("mass-driver drivers"));
    }

    #[test]
    fn read_failed_carries_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = ConfigError::ReadFailed {
            path: PathBuf::from("/tmp/activity.toml"),
            source: io_err,
        };
        match &err {
            ConfigError::ReadFailed { path, source } => {
                assert_eq!(path, &PathBuf::from("/tmp/activity.toml"));
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            _ => panic!("Expected ReadFailed"),
        }
    }

    #[test]
    fn git_error_converts_from_git2() {
        let inner = git2::Error::from_str("boom");
        let err: GitError = inner.into();
        assert!(matches!(err, GitError::Git(_)));
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error + Send + Sync + 'static>(_: &E) {}
        assert_std_error(&ConfigError::NoRepos);
        assert_std_error(&GitError::NothingToCommit);
    }
}
