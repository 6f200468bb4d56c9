//! Per-repo phase executor: drives one repository through clone, scan and
//! patch, turning every failure into data on its [`RepoOutcome`].

use anyhow::anyhow;
use git2::Repository;
use serde_json::{Map, Value};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use tracing::{debug, error, info, info_span, warn};

use crate::activity::{Activity, MigrationLoaded, ScanLoaded};
use crate::git;
use crate::model::{
    ClonedRepo, PatchOutcome, PatchResult, Phase, PhaseError, RepoOutcome, SCAN_ERROR_KEY,
    ScanResult, SourcedRepo,
};

/// Run `f`, converting both its error and any panic into a [`PhaseError`].
pub fn guarded<T>(
    phase: Phase,
    f: impl FnOnce() -> anyhow::Result<T>,
) -> Result<T, PhaseError> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(PhaseError::from_error(phase, &err)),
        Err(payload) => Err(PhaseError::from_panic(phase, payload)),
    }
}

/// Everything needed to process a single repo, shareable across workers.
#[derive(Debug, Clone)]
pub struct RepoExecutor {
    cache: PathBuf,
    scan: Option<ScanLoaded>,
    migration: Option<MigrationLoaded>,
}

impl RepoExecutor {
    pub fn new(cache: PathBuf, scan: Option<ScanLoaded>, migration: Option<MigrationLoaded>) -> Self {
        Self {
            cache,
            scan,
            migration,
        }
    }

    pub fn from_activity(activity: &Activity, cache: PathBuf) -> Self {
        Self::new(cache, activity.scan.clone(), activity.migration.clone())
    }

    /// Human summary of the work each repo goes through.
    pub fn describe(&self) -> String {
        let mut what = vec!["clone".to_string()];
        if let Some(scan) = &self.scan {
            what.push(format!("{} scanners", scan.scanners.len()));
        }
        if let Some(migration) = &self.migration {
            what.push(format!("driver={}", migration.driver.type_name()));
        }
        what.join(" and ")
    }

    /// Process one sourced repo end to end. Never panics, never fails:
    /// whatever goes wrong is recorded on the returned outcome.
    pub fn process(&self, source: SourcedRepo) -> RepoOutcome {
        self.process_outcome(RepoOutcome::sourced(source))
    }

    /// Advance an outcome still at the Source phase.
    pub fn process_outcome(&self, mut outcome: RepoOutcome) -> RepoOutcome {
        let span = info_span!("repo", id = %outcome.repo_id);
        let _guard = span.enter();

        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| self.run_phases(&mut outcome))) {
            let err = PhaseError::from_panic(outcome.status, payload);
            error!("Crashed while processing repo: {}", err);
            outcome.fail(err);
        }
        outcome
    }

    fn run_phases(&self, outcome: &mut RepoOutcome) {
        if let Some(err) = outcome.error.clone() {
            warn!("Skipping repo, error from an earlier phase: {}", err);
            if self.migration.is_some() {
                outcome.advance(Phase::Patch);
                outcome.patch = Some(PatchResult::failed(err));
            }
            return;
        }

        info!("Processing {}...", outcome.repo_id);
        outcome.advance(Phase::Clone);
        let (cloned, repo) = match guarded(Phase::Clone, || self.clone_repo(&outcome.source)) {
            Ok(cloned) => cloned,
            Err(err) => {
                error!("Error cloning repo: {}", err);
                outcome.fail(err);
                return;
            }
        };
        outcome.clone = Some(cloned.clone());

        if let Some(scan) = &self.scan {
            outcome.advance(Phase::Scan);
            outcome.scan = Some(scan_repo(scan, &cloned));
        }

        if let Some(migration) = &self.migration {
            outcome.advance(Phase::Patch);
            let result = patch_repo(migration, &cloned, &repo);
            if let Some(err) = &result.error {
                outcome.fail(err.clone());
            }
            outcome.patch = Some(result);
        }
    }

    fn clone_repo(&self, source: &SourcedRepo) -> anyhow::Result<(ClonedRepo, Repository)> {
        let repo = git::clone_if_remote(&source.clone_url, &self.cache)?;
        git::switch_branch_then_pull(&repo, source.force_pull, source.upstream_branch.as_deref())?;
        let cloned_path = repo
            .workdir()
            .map(|p| p.to_path_buf())
            .ok_or_else(|| anyhow!("Repository {} has no working tree", source.clone_url))?;
        let cloned = ClonedRepo {
            source: source.clone(),
            cloned_path,
            current_branch: git::current_branch(&repo)?,
            commit_hash: git::head_sha(&repo).unwrap_or_default(),
        };
        debug!("Cloned to {}", cloned.cloned_path.display());
        Ok((cloned, repo))
    }
}

/// Apply every scanner. A failing scanner only records its own error.
pub fn scan_repo(scan: &ScanLoaded, cloned: &ClonedRepo) -> ScanResult {
    scan.scanners
        .iter()
        .map(|scanner| {
            let value = match guarded(Phase::Scan, || scanner.scan(&cloned.cloned_path)) {
                Ok(value) => value,
                Err(err) => {
                    warn!("Scanner {} failed: {}", scanner.name, err);
                    let mut entry = Map::new();
                    entry.insert(
                        SCAN_ERROR_KEY.to_string(),
                        serde_json::to_value(&err).unwrap_or(Value::String(err.to_string())),
                    );
                    Value::Object(entry)
                }
            };
            (scanner.name.clone(), value)
        })
        .collect()
}

/// Run a private copy of the driver, committing when it patched the repo.
pub fn patch_repo(
    migration: &MigrationLoaded,
    cloned: &ClonedRepo,
    repo: &Repository,
) -> PatchResult {
    let mut driver = migration.driver.clone();
    let result = match guarded(Phase::Patch, || driver.run(cloned)) {
        Ok(result) => result,
        Err(err) => {
            error!("Error migrating repo: {}", err);
            return PatchResult::failed(err);
        }
    };
    info!("{}", result.outcome);
    if result.outcome != PatchOutcome::PatchedOk {
        return result;
    }

    match git::commit(
        repo,
        &migration.branch_name,
        &migration.commit_message,
        migration.author.as_ref(),
    ) {
        Ok(sha) => {
            debug!("Committed {} onto {}", sha, migration.branch_name);
            result
        }
        Err(e) => {
            let err = PhaseError::from_error(Phase::Patch, &e.into());
            error!("Patched but failed to commit: {}", err);
            PatchResult {
                outcome: PatchOutcome::PatchError,
                details: result.details,
                error: Some(err),
            }
        }
    }
}
