//! `mass-driver view`: read back a saved outcome.

use anyhow::{Result, bail};
use std::path::Path;

use mass_driver::model::ActivityOutcome;
use mass_driver::summary;

pub fn cmd_view(path: &Path, repo_id: Option<&str>, details: bool) -> Result<()> {
    let outcome = ActivityOutcome::load(path)?;
    match repo_id {
        Some(id) => match outcome.get(id) {
            Some(repo) => summary::print_explain(repo),
            None => bail!("Repo '{}' not found in {}", id, path.display()),
        },
        None => summary::print_all(&outcome, details),
    }
    Ok(())
}
