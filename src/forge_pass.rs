//! Forge pass: open a pull request for every successfully patched repo.

use anyhow::{Context, Result};
use tracing::{error, info, info_span};

use crate::activity::ForgeLoaded;
use crate::errors::GitError;
use crate::executor::guarded;
use crate::gates::ConfirmGate;
use crate::git;
use crate::model::{ActivityOutcome, Phase, PrResult, RepoId, RepoOutcome};
use crate::plugins::PrRequest;

/// Ids of the repos the forge pass picks up, in repo-id order.
pub fn candidates(outcome: &ActivityOutcome) -> Vec<RepoId> {
    outcome
        .repos
        .values()
        .filter(|r| r.is_forge_candidate())
        .map(|r| r.repo_id.clone())
        .collect()
}

/// Run the forge over every candidate, recording a [`PrResult`] on each.
///
/// Other repos are left exactly as they were. With `interactive_pause_every`
/// set, the operator must confirm after every N PRs before the next one.
/// Only a failing gate aborts the pass; forge failures are recorded per repo.
pub fn run(
    config: &ForgeLoaded,
    outcome: &mut ActivityOutcome,
    gate: &mut dyn ConfirmGate,
) -> Result<()> {
    let todo = candidates(outcome);
    let total = todo.len();
    info!("Processing {} repos with forge {}", total, config.forge_name);

    for (index, repo_id) in todo.iter().enumerate() {
        if let Some(every) = config.interactive_pause_every
            && index > 0
            && index % every.get() == 0
        {
            gate.wait_for_ok(&format!("Reached {} PRs. Continue?", index))?;
        }

        let Some(repo) = outcome.repos.get_mut(repo_id) else {
            continue;
        };
        let span = info_span!("repo", id = %repo_id);
        let _guard = span.enter();
        info!("[{:03}/{:03}] Creating PR...", index + 1, total);
        forge_one(config, repo);
    }
    info!("Forge pass completed");
    Ok(())
}

fn forge_one(config: &ForgeLoaded, repo: &mut RepoOutcome) {
    repo.advance(Phase::Forge);
    match guarded(Phase::Forge, || create_pr(config, repo)) {
        Ok(url) => {
            info!("PR created: {}", url);
            repo.forge = Some(PrResult::created(url));
        }
        Err(err) => {
            error!("Failed to create PR: {}", err);
            repo.forge = Some(PrResult::failed(err.clone()));
            repo.fail(err);
        }
    }
}

fn create_pr(config: &ForgeLoaded, repo: &RepoOutcome) -> Result<String> {
    let cloned = repo
        .clone
        .as_ref()
        .context("Repo not cloned locally, can't create PR of it")?;
    let git_repo = git::open(&cloned.cloned_path)?;
    if config.git_push_first {
        git::push(&git_repo, &config.head_branch)?;
    }

    let forge_repo_url = match git::remote_url(&git_repo) {
        Ok(url) => url,
        // Nothing was pushed and there is nowhere to push: local repos get a placeholder identity
        Err(GitError::NoRemote) if !config.git_push_first => {
            format!("unix://{}", cloned.cloned_path.display())
        }
        Err(e) => return Err(e.into()),
    };

    let base_branch = match &config.base_branch {
        Some(branch) => branch.clone(),
        None => git::default_branch(&git_repo)
            .context("base_branch not configured and could not be autodetected")?,
    };

    config.forge.create_pr(&PrRequest {
        forge_repo_url: &forge_repo_url,
        base_branch: &base_branch,
        head_branch: &config.head_branch,
        title: &config.pr_title,
        body: &config.pr_body,
        draft: config.draft_pr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::AutoConfirm;
    use crate::model::{ClonedRepo, PatchOutcome, PatchResult, PrOutcome, SourcedRepo};
    use crate::plugins::Forge;
    use crate::plugins::forges::{DUMMY_PR_URL, DummyForge};
    use git2::{Repository, RepositoryInitOptions};
    use std::num::NonZeroUsize;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Debug, Default)]
    struct RecordingForge {
        requests: Mutex<Vec<(String, String, String)>>,
    }

    impl Forge for RecordingForge {
        fn create_pr(&self, request: &PrRequest<'_>) -> Result<String> {
            if request.forge_repo_url.contains("fail") {
                anyhow::bail!("forge said no");
            }
            self.requests.lock().unwrap().push((
                request.forge_repo_url.to_string(),
                request.base_branch.to_string(),
                request.head_branch.to_string(),
            ));
            Ok(format!("{}/pull/1", request.forge_repo_url))
        }

        fn pr_status(&self, _pr_url: &str) -> Result<String> {
            Ok("open".into())
        }

        fn pr_statuses(&self) -> Vec<String> {
            vec!["open".into()]
        }
    }

    fn forge_config(forge: Box<dyn Forge>, pause_every: usize) -> ForgeLoaded {
        ForgeLoaded {
            forge_name: "test".into(),
            forge,
            head_branch: "counter".into(),
            base_branch: Some("main".into()),
            git_push_first: false,
            interactive_pause_every: NonZeroUsize::new(pause_every),
            draft_pr: false,
            pr_title: "Bump".into(),
            pr_body: "Body".into(),
        }
    }

    fn init_repo(path: &Path) {
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        Repository::init_opts(path, &opts).unwrap();
    }

    fn repo_at(id: &str, path: &Path, outcome: PatchOutcome) -> RepoOutcome {
        let source = SourcedRepo::new(id, path.to_str().unwrap());
        let mut repo = RepoOutcome::sourced(source.clone());
        repo.status = Phase::Patch;
        repo.clone = Some(ClonedRepo {
            source,
            cloned_path: path.to_path_buf(),
            current_branch: "main".into(),
            commit_hash: "0".repeat(40),
        });
        repo.patch = Some(PatchResult::new(outcome));
        repo
    }

    #[test]
    fn only_patched_ok_repos_are_forged() {
        let dir = tempdir().unwrap();
        init_repo(dir.path());
        let mut outcome = ActivityOutcome::default();
        for (id, patch) in [
            ("ok", PatchOutcome::PatchedOk),
            ("already", PatchOutcome::AlreadyPatched),
            ("n/a", PatchOutcome::PatchDoesNotApply),
            ("error", PatchOutcome::PatchError),
        ] {
            outcome
                .repos
                .insert(id.into(), repo_at(id, dir.path(), patch));
        }
        let before = outcome.clone();

        let config = forge_config(Box::new(DummyForge::default()), 0);
        run(&config, &mut outcome, &mut AutoConfirm::default()).unwrap();

        let ok = outcome.get("ok").unwrap();
        assert_eq!(ok.status, Phase::Forge);
        let forge = ok.forge.as_ref().unwrap();
        assert_eq!(forge.outcome, PrOutcome::PrCreated);
        assert_eq!(forge.pr_html_url.as_deref(), Some(DUMMY_PR_URL));
        for id in ["already", "n/a", "error"] {
            assert_eq!(outcome.get(id), before.get(id));
        }
    }

    #[test]
    fn local_repo_without_remote_gets_unix_url() {
        let dir = tempdir().unwrap();
        init_repo(dir.path());
        let mut outcome = ActivityOutcome::default();
        outcome
            .repos
            .insert("ok".into(), repo_at("ok", dir.path(), PatchOutcome::PatchedOk));

        let forge = RecordingForge::default();
        let config = forge_config(Box::new(forge), 0);
        run(&config, &mut outcome, &mut AutoConfirm::default()).unwrap();

        let url = outcome.get("ok").unwrap().forge.as_ref().unwrap().pr_html_url.clone();
        assert_eq!(url, Some(format!("unix://{}/pull/1", dir.path().display())));
    }

    #[test]
    fn forge_failure_sets_top_level_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fail");
        std::fs::create_dir(&path).unwrap();
        init_repo(&path);
        let mut outcome = ActivityOutcome::default();
        outcome
            .repos
            .insert("bad".into(), repo_at("bad", &path, PatchOutcome::PatchedOk));

        let config = forge_config(Box::new(RecordingForge::default()), 0);
        run(&config, &mut outcome, &mut AutoConfirm::default()).unwrap();

        let repo = outcome.get("bad").unwrap();
        let forge = repo.forge.as_ref().unwrap();
        assert_eq!(forge.outcome, PrOutcome::PrFailed);
        assert_eq!(forge.error.as_ref().unwrap().phase, Phase::Forge);
        assert_eq!(repo.error.as_ref().unwrap().phase, Phase::Forge);
        assert!(repo.error.as_ref().unwrap().message.contains("forge said no"));
    }

    #[test]
    fn push_without_remote_fails_the_repo() {
        let dir = tempdir().unwrap();
        init_repo(dir.path());
        let mut outcome = ActivityOutcome::default();
        outcome
            .repos
            .insert("ok".into(), repo_at("ok", dir.path(), PatchOutcome::PatchedOk));

        let mut config = forge_config(Box::new(DummyForge::default()), 0);
        config.git_push_first = true;
        run(&config, &mut outcome, &mut AutoConfirm::default()).unwrap();

        let repo = outcome.get("ok").unwrap();
        assert_eq!(repo.forge.as_ref().unwrap().outcome, PrOutcome::PrFailed);
        assert_eq!(repo.error.as_ref().unwrap().kind, "GitError");
    }

    #[test]
    fn throttle_pauses_between_batches_only() {
        let dir = tempdir().unwrap();
        init_repo(dir.path());
        let mut outcome = ActivityOutcome::default();
        for i in 0..5 {
            let id = format!("repo{i}");
            outcome
                .repos
                .insert(id.clone(), repo_at(&id, dir.path(), PatchOutcome::PatchedOk));
        }

        let config = forge_config(Box::new(DummyForge::default()), 2);
        let mut gate = AutoConfirm::default();
        run(&config, &mut outcome, &mut gate).unwrap();
        assert_eq!(gate.asked, 2);

        outcome.repos.remove("repo4");
        for repo in outcome.repos.values_mut() {
            repo.status = Phase::Patch;
        }
        let mut gate = AutoConfirm::default();
        run(&config, &mut outcome, &mut gate).unwrap();
        assert_eq!(gate.asked, 1);
    }

    #[test]
    fn zero_pause_interval_never_asks() {
        let dir = tempdir().unwrap();
        init_repo(dir.path());
        let mut outcome = ActivityOutcome::default();
        for i in 0..3 {
            let id = format!("repo{i}");
            outcome
                .repos
                .insert(id.clone(), repo_at(&id, dir.path(), PatchOutcome::PatchedOk));
        }

        let config = forge_config(Box::new(DummyForge::default()), 0);
        assert!(config.interactive_pause_every.is_none());
        let mut gate = AutoConfirm::default();
        run(&config, &mut outcome, &mut gate).unwrap();
        assert_eq!(gate.asked, 0);
        let created = outcome.repos.values().filter(|r| r.forge.is_some()).count();
        assert_eq!(created, 3);
    }
}
