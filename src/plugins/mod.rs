//! Plugin contracts: the single-operation units an activity is assembled from.
//!
//! | Contract      | Operation                          | Built-ins                                   |
//! |---------------|------------------------------------|---------------------------------------------|
//! | `Source`      | discover repositories              | `repolist`, `repo-filelist`, `template-filelist` |
//! | `Scanner`     | read-only facts from a working tree | `root-files`, `root-folders`                |
//! | `PatchDriver` | mutate a cloned working tree       | `counter`, `stamper`                        |
//! | `Forge`       | create and query pull requests     | `dummy`                                     |
//!
//! Plugins are resolved by name through [`registry`] when an activity is loaded.

pub mod drivers;
pub mod forges;
pub mod registry;
pub mod scanners;
pub mod sources;

use anyhow::Result;
use std::fmt::Debug;
use std::path::Path;

use crate::model::{ClonedRepo, IndexedRepos, PatchResult};

/// Applies a change to one cloned repository.
///
/// One configured instance describes the whole batch. The executor hands each
/// repository its own deep copy, so any state a driver keeps while running
/// (counters, caches) never leaks from one repo into the next.
pub trait PatchDriver: DriverClone + Send + Sync + Debug {
    /// Name of the driver type; lower-cased it is the default branch name.
    fn type_name(&self) -> &'static str;

    /// Patch the working tree at `repo.cloned_path`, touching nothing outside it.
    fn run(&mut self, repo: &ClonedRepo) -> Result<PatchResult>;
}

/// Deep copy of a boxed driver.
pub trait DriverClone {
    fn clone_box(&self) -> Box<dyn PatchDriver>;
}

impl<T> DriverClone for T
where
    T: PatchDriver + Clone + 'static,
{
    fn clone_box(&self) -> Box<dyn PatchDriver> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn PatchDriver> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Everything a Forge needs to open one pull request.
#[derive(Debug, Clone, PartialEq)]
pub struct PrRequest<'a> {
    /// Remote URL identifying the repository on the forge
    pub forge_repo_url: &'a str,
    pub base_branch: &'a str,
    pub head_branch: &'a str,
    pub title: &'a str,
    pub body: &'a str,
    pub draft: bool,
}

/// A code-hosting platform able to create and inspect pull requests.
pub trait Forge: Send + Sync + Debug {
    /// Open a pull request, returning its HTML URL.
    fn create_pr(&self, request: &PrRequest<'_>) -> Result<String>;

    /// Status of one pull request, used to group PRs in reviews.
    fn pr_status(&self, pr_url: &str) -> Result<String>;

    /// Every status `pr_status` may report, most complete (merged) first.
    fn pr_statuses(&self) -> Vec<String>;
}

/// Discovers the repositories an activity runs over.
pub trait Source: Send + Sync + Debug {
    fn discover(&self) -> Result<IndexedRepos>;
}

pub type ScannerFn = fn(&Path) -> Result<serde_json::Value>;

/// A named read-only function over a repository's working tree.
#[derive(Debug, Clone)]
pub struct Scanner {
    pub name: String,
    pub func: ScannerFn,
}

impl Scanner {
    pub fn new(name: &str, func: ScannerFn) -> Self {
        Self {
            name: name.to_string(),
            func,
        }
    }

    pub fn scan(&self, repo_path: &Path) -> Result<serde_json::Value> {
        (self.func)(repo_path)
    }
}
