//! Activity files: what to run over which repos.
//!
//! An activity is a TOML document with a single top-level `[mass-driver]`
//! table holding up to four sections:
//!
//! ```toml
//! [mass-driver.source]
//! source_name = "repolist"
//! [mass-driver.source.source_config]
//! repos = ["git@github.com:org/repo1.git"]
//!
//! [mass-driver.scan]
//! scanner_names = ["root-files"]
//!
//! [mass-driver.migration]
//! commit_message = "Bump counter"
//! driver_name = "counter"
//! [mass-driver.migration.driver_config]
//! counter_file = "counter.txt"
//! target_count = 1
//!
//! [mass-driver.forge]
//! forge_name = "dummy"
//! pr_title = "Bump counter"
//! pr_body = "Automated change"
//! ```
//!
//! Loading resolves every plugin name and validates every plugin config, so
//! any mistake surfaces as a [`ConfigError`] before a single repo is touched.

use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::Path;

use crate::errors::ConfigError;
use crate::git::CommitAuthor;
use crate::plugins::{Forge, PatchDriver, Scanner, Source, registry};

/// Top-level key every activity file must carry.
pub const PROJECT_KEY: &str = "mass-driver";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivityFile {
    #[serde(default)]
    pub source: Option<SourceConfig>,
    #[serde(default)]
    pub scan: Option<ScanConfig>,
    #[serde(default)]
    pub migration: Option<MigrationConfig>,
    #[serde(default)]
    pub forge: Option<ForgeConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub source_name: String,
    #[serde(default)]
    pub source_config: toml::Table,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    pub scanner_names: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfig {
    pub commit_message: String,
    #[serde(default)]
    pub commit_author_name: Option<String>,
    #[serde(default)]
    pub commit_author_email: Option<String>,
    /// Branch to commit onto (default: driver type name, lower-cased)
    #[serde(default)]
    pub branch_name: Option<String>,
    pub driver_name: String,
    #[serde(default)]
    pub driver_config: toml::Table,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForgeConfig {
    pub forge_name: String,
    #[serde(default)]
    pub forge_config: toml::Table,
    /// Branch the PR is raised from (default: the migration branch)
    #[serde(default)]
    pub head_branch: Option<String>,
    /// Branch the PR targets (default: the remote's default branch)
    #[serde(default)]
    pub base_branch: Option<String>,
    #[serde(default = "default_true")]
    pub git_push_first: bool,
    /// Ask the operator to confirm after this many PRs
    #[serde(default)]
    pub interactive_pause_every: Option<usize>,
    #[serde(default)]
    pub draft_pr: bool,
    pub pr_title: String,
    pub pr_body: String,
}

fn default_true() -> bool {
    true
}

impl ActivityFile {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut document: toml::Table = toml::from_str(content).map_err(ConfigError::Parse)?;
        let Some(activity) = document.remove(PROJECT_KEY) else {
            return Err(ConfigError::MissingProjectKey(PROJECT_KEY));
        };
        activity.try_into().map_err(ConfigError::Parse)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Resolve every plugin this activity names.
    pub fn resolve(self) -> Result<Activity, ConfigError> {
        let source = self
            .source
            .map(|s| registry::load_source(&s.source_name, s.source_config))
            .transpose()?;

        let scan = self
            .scan
            .map(|s| {
                s.scanner_names
                    .iter()
                    .map(|name| registry::load_scanner(name))
                    .collect::<Result<Vec<_>, _>>()
                    .map(|scanners| ScanLoaded { scanners })
            })
            .transpose()?;

        let migration = self.migration.map(MigrationLoaded::resolve).transpose()?;

        let forge = self
            .forge
            .map(|f| ForgeLoaded::resolve(f, migration.as_ref()))
            .transpose()?;

        Ok(Activity {
            source,
            scan,
            migration,
            forge,
        })
    }
}

/// An activity with every plugin resolved and configured.
#[derive(Debug, Default)]
pub struct Activity {
    pub source: Option<Box<dyn Source>>,
    pub scan: Option<ScanLoaded>,
    pub migration: Option<MigrationLoaded>,
    pub forge: Option<ForgeLoaded>,
}

impl Activity {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        ActivityFile::load(path)?.resolve()
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        ActivityFile::from_toml(content)?.resolve()
    }

    /// Whether repos must be cloned at all.
    ///
    /// Scanning and patching need a working tree; a forge-only activity only
    /// needs one when it has to push a local branch before opening PRs.
    pub fn needs_clone_pass(&self) -> bool {
        self.scan.is_some()
            || self.migration.is_some()
            || self.forge.as_ref().is_some_and(|f| f.git_push_first)
    }
}

#[derive(Debug, Clone)]
pub struct ScanLoaded {
    pub scanners: Vec<Scanner>,
}

/// A migration ready to run: one driver instance configuring the whole batch.
#[derive(Debug, Clone)]
pub struct MigrationLoaded {
    pub commit_message: String,
    pub author: Option<CommitAuthor>,
    pub branch_name: String,
    pub driver_name: String,
    pub driver: Box<dyn PatchDriver>,
}

impl MigrationLoaded {
    fn resolve(config: MigrationConfig) -> Result<Self, ConfigError> {
        let driver = registry::load_driver(&config.driver_name, config.driver_config)?;
        let branch_name = config
            .branch_name
            .unwrap_or_else(|| driver.type_name().to_lowercase());
        Ok(Self {
            commit_message: config.commit_message,
            author: CommitAuthor::from_parts(config.commit_author_name, config.commit_author_email),
            branch_name,
            driver_name: config.driver_name,
            driver,
        })
    }
}

#[derive(Debug)]
pub struct ForgeLoaded {
    pub forge_name: String,
    pub forge: Box<dyn Forge>,
    pub head_branch: String,
    pub base_branch: Option<String>,
    pub git_push_first: bool,
    /// Zero in the activity file means never pause
    pub interactive_pause_every: Option<NonZeroUsize>,
    pub draft_pr: bool,
    pub pr_title: String,
    pub pr_body: String,
}

impl ForgeLoaded {
    fn resolve(config: ForgeConfig, migration: Option<&MigrationLoaded>) -> Result<Self, ConfigError> {
        let forge = registry::load_forge(&config.forge_name, config.forge_config)?;
        let head_branch = config
            .head_branch
            .or_else(|| migration.map(|m| m.branch_name.clone()))
            .ok_or(ConfigError::MissingHeadBranch)?;
        Ok(Self {
            forge_name: config.forge_name,
            forge,
            head_branch,
            base_branch: config.base_branch,
            git_push_first: config.git_push_first,
            interactive_pause_every: config.interactive_pause_every.and_then(NonZeroUsize::new),
            draft_pr: config.draft_pr,
            pr_title: config.pr_title,
            pr_body: config.pr_body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTER_ACTIVITY: &str = r#"
[mass-driver.migration]
commit_message = "Bump counter"
driver_name = "counter"
[mass-driver.migration.driver_config]
counter_file = "counter.txt"
target_count = 1

[mass-driver.forge]
forge_name = "dummy"
base_branch = "main"
git_push_first = false
pr_title = "Bump counter"
pr_body = "Automated"
"#;

    #[test]
    fn branch_and_head_default_to_driver_name() {
        let activity = Activity::from_toml(COUNTER_ACTIVITY).unwrap();
        let migration = activity.migration.as_ref().unwrap();
        assert_eq!(migration.branch_name, "counter");
        assert!(migration.author.is_none());

        let forge = activity.forge.as_ref().unwrap();
        assert_eq!(forge.head_branch, "counter");
        assert!(!forge.git_push_first);
        assert!(activity.needs_clone_pass());
    }

    #[test]
    fn missing_project_key_is_rejected() {
        let err = ActivityFile::from_toml("[other]\nx = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingProjectKey("mass-driver")));
    }

    #[test]
    fn unknown_section_fields_are_rejected() {
        let err = ActivityFile::from_toml("[mass-driver.scan]\nscanner_names = []\nbogus = 1\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn unknown_scanner_fails_loading() {
        let err = Activity::from_toml("[mass-driver.scan]\nscanner_names = [\"nope\"]\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPlugin { kind: "scanner", .. }));
    }

    #[test]
    fn forge_without_branch_needs_a_head_branch() {
        let err = Activity::from_toml(
            "[mass-driver.forge]\nforge_name = \"dummy\"\npr_title = \"t\"\npr_body = \"b\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingHeadBranch));
    }

    #[test]
    fn clone_pass_rule() {
        let forge_only = |push: bool| {
            format!(
                "[mass-driver.forge]\nforge_name = \"dummy\"\nhead_branch = \"b\"\n\
                 git_push_first = {push}\npr_title = \"t\"\npr_body = \"b\"\n"
            )
        };
        assert!(Activity::from_toml(&forge_only(true)).unwrap().needs_clone_pass());
        assert!(!Activity::from_toml(&forge_only(false)).unwrap().needs_clone_pass());
        assert!(!Activity::from_toml("[mass-driver]\n").unwrap().needs_clone_pass());
    }

    #[test]
    fn author_override_is_kept() {
        let activity = Activity::from_toml(
            "[mass-driver.migration]\ncommit_message = \"m\"\ndriver_name = \"stamper\"\n\
             commit_author_name = \"Bot\"\nbranch_name = \"stamp\"\n\
             [mass-driver.migration.driver_config]\nfilepath_to_create = \"NOTICE\"\n\
             file_contents = \"x\"\n",
        )
        .unwrap();
        let migration = activity.migration.unwrap();
        assert_eq!(migration.branch_name, "stamp");
        assert_eq!(migration.author.unwrap().name.as_deref(), Some("Bot"));
    }

    #[test]
    fn pause_interval_of_zero_means_never() {
        let activity = |every: usize| {
            Activity::from_toml(&format!(
                "[mass-driver.forge]\nforge_name = \"dummy\"\nhead_branch = \"b\"\n\
                 interactive_pause_every = {every}\npr_title = \"t\"\npr_body = \"b\"\n"
            ))
            .unwrap()
        };
        assert!(activity(0).forge.unwrap().interactive_pause_every.is_none());
        assert_eq!(
            activity(3).forge.unwrap().interactive_pause_every,
            NonZeroUsize::new(3)
        );
    }
}
