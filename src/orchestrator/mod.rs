//! Batch orchestrator: runs the per-repo executor over every sourced repo,
//! either one after the other or on a bounded pool of blocking workers.
//!
//! Both strategies key results by repo id in an ordered map, so the resulting
//! [`ActivityOutcome`] is identical whichever strategy produced it; only the
//! log interleaving differs.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tracing::{error, info};

use crate::activity::Activity;
use crate::executor::RepoExecutor;
use crate::model::{ActivityOutcome, PhaseError, RepoId, RepoOutcome};

/// Worker count of the threaded strategy unless configured otherwise.
pub const DEFAULT_WORKERS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Sequential,
    Threaded { workers: usize },
}

impl Strategy {
    pub fn from_flags(parallel: bool, workers: usize) -> Self {
        if parallel {
            Strategy::Threaded {
                workers: workers.max(1),
            }
        } else {
            Strategy::Sequential
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Threaded {
            workers: DEFAULT_WORKERS,
        }
    }
}

/// Clone, scan and patch every repo of `sourced`.
///
/// Returns `sourced` untouched when the activity needs no working trees.
pub async fn run_pass(
    activity: &Activity,
    sourced: ActivityOutcome,
    cache: PathBuf,
    strategy: Strategy,
) -> ActivityOutcome {
    if !activity.needs_clone_pass() {
        info!("Nothing to clone for: no scan, no migration, no push before forge");
        return sourced;
    }
    let executor = RepoExecutor::from_activity(activity, cache);
    match strategy {
        Strategy::Sequential => sequential_run(&executor, sourced),
        Strategy::Threaded { workers } => threaded_run(Arc::new(executor), sourced, workers).await,
    }
}

/// One repo at a time, in repo-id order.
pub fn sequential_run(executor: &RepoExecutor, sourced: ActivityOutcome) -> ActivityOutcome {
    let total = sourced.len();
    info!("Processing {} repos with {}", total, executor.describe());

    let mut out = ActivityOutcome::default();
    for (index, (repo_id, outcome)) in sourced.repos.into_iter().enumerate() {
        info!("[{:03}/{:03}] Processing {}...", index + 1, total, repo_id);
        out.repos.insert(repo_id, executor.process_outcome(outcome));
    }
    info!("Action completed");
    out
}

/// Every repo as its own blocking task, at most `workers` running at once.
/// Results are merged as tasks complete.
pub async fn threaded_run(
    executor: Arc<RepoExecutor>,
    sourced: ActivityOutcome,
    workers: usize,
) -> ActivityOutcome {
    let total = sourced.len();
    info!(
        "Processing {} repos with {}, via {} workers",
        total,
        executor.describe(),
        workers
    );

    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let (result_tx, mut result_rx) = mpsc::channel::<(RepoId, RepoOutcome)>(total.max(1));

    for (repo_id, outcome) in sourced.repos {
        let semaphore = semaphore.clone();
        let executor = executor.clone();
        let result_tx = result_tx.clone();
        tokio::spawn(async move {
            let permit = semaphore.acquire_owned().await.ok();
            let fallback = outcome.clone();
            let processed = tokio::task::spawn_blocking(move || executor.process_outcome(outcome)).await;
            drop(permit);

            let outcome = match processed {
                Ok(outcome) => outcome,
                Err(join_err) => {
                    error!("Worker for {} died: {}", repo_id, join_err);
                    let mut outcome = fallback;
                    outcome.fail(PhaseError::new(outcome.status, "Panic", join_err.to_string()));
                    outcome
                }
            };
            // The receiver outlives every sender
            let _ = result_tx.send((repo_id, outcome)).await;
        });
    }
    drop(result_tx);

    let mut out = ActivityOutcome::default();
    let mut done = 0;
    while let Some((repo_id, outcome)) = result_rx.recv().await {
        done += 1;
        info!("[{:04}/{:04}] Processed {}", done, total, repo_id);
        out.repos.insert(repo_id, outcome);
    }
    info!("Action completed");
    out
}
