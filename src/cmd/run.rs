//! `mass-driver run`: source, clone/scan/patch pass, forge pass, summary.

use anyhow::{Context, Result};
use tracing::info;

use mass_driver::activity::Activity;
use mass_driver::errors::ConfigError;
use mass_driver::gates::{AutoConfirm, ConfirmGate, TerminalPrompt};
use mass_driver::model::{ActivityOutcome, IndexedRepos, index_urls};
use mass_driver::orchestrator::{self, Strategy};
use mass_driver::plugins::sources::read_lines;
use mass_driver::{forge_pass, git, summary};

use super::super::RunArgs;

/// Repos from the command line when given, else from the activity's source.
fn discover(activity: &Activity, args: &RunArgs) -> Result<IndexedRepos> {
    let mut urls = args.repo_paths.clone();
    if let Some(file) = &args.repo_filelist {
        urls.extend(read_lines(file)?);
    }
    if !urls.is_empty() {
        return Ok(index_urls(urls));
    }
    match &activity.source {
        Some(source) => source.discover().context("Source failed to discover repos"),
        None => Ok(IndexedRepos::new()),
    }
}

pub async fn cmd_run(args: &RunArgs) -> Result<()> {
    let activity = Activity::load(&args.activity)?;
    let repos = discover(&activity, args)?;
    if repos.is_empty() {
        return Err(ConfigError::NoRepos.into());
    }

    let sourced = ActivityOutcome::from_sourced(repos);
    info!("{}", summary::source_summary(&sourced));

    let cache = git::cache_folder(!args.no_cache, args.cache_dir.as_deref())?;
    let strategy = Strategy::from_flags(args.parallel, args.workers);
    let mut outcome = orchestrator::run_pass(&activity, sourced, cache, strategy).await;

    let forge_result = match &activity.forge {
        Some(forge) => {
            let mut gate: Box<dyn ConfirmGate> = if args.no_pause {
                Box::new(AutoConfirm::default())
            } else {
                Box::new(TerminalPrompt)
            };
            let candidates = forge_pass::candidates(&outcome).len();
            if candidates == 0 {
                info!("No repo patched successfully: no PRs to create");
                Ok(())
            } else {
                gate.wait_for_ok(&format!(
                    "About to create {} PRs with forge {}. Continue?",
                    candidates, forge.forge_name
                ))
                .and_then(|_| forge_pass::run(forge, &mut outcome, gate.as_mut()))
            }
        }
        None => Ok(()),
    };

    summary::print_all(&outcome, args.details);
    if let Some(path) = &args.json_outfile {
        outcome.save(path)?;
        info!("Saved outcome to {}", path.display());
    }
    forge_result
}
