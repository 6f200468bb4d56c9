use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::debug;

use crate::model::{ClonedRepo, PatchOutcome, PatchResult};
use crate::plugins::PatchDriver;

/// Sets an integer counter file to `target_count`.
///
/// The simplest driver that still exercises every outcome, which makes it the
/// reference for writing new drivers.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Counter {
    pub target_count: u64,
    /// Path of the counter file, relative to the repo root
    pub counter_file: PathBuf,
    /// Value read from the last repo this instance ran on
    #[serde(skip)]
    measured: Option<u64>,
}

impl Counter {
    pub fn new(counter_file: impl Into<PathBuf>, target_count: u64) -> Self {
        Self {
            target_count,
            counter_file: counter_file.into(),
            measured: None,
        }
    }

    pub fn measured(&self) -> Option<u64> {
        self.measured
    }
}

impl PatchDriver for Counter {
    fn type_name(&self) -> &'static str {
        "Counter"
    }

    fn run(&mut self, repo: &ClonedRepo) -> Result<PatchResult> {
        let path = repo.cloned_path.join(&self.counter_file);
        if !path.is_file() {
            return Ok(PatchResult::with_details(
                PatchOutcome::PatchDoesNotApply,
                "No counter file exists yet",
            ));
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read counter file {}", path.display()))?;
        let Ok(current) = content.trim().parse::<u64>() else {
            return Ok(PatchResult::with_details(
                PatchOutcome::PatchError,
                "Counter file isn't an integer",
            ));
        };
        self.measured = Some(current);

        debug!(
            "Measured: {}, target: {}. Different? {}",
            current,
            self.target_count,
            current != self.target_count
        );
        if current == self.target_count {
            return Ok(PatchResult::new(PatchOutcome::AlreadyPatched));
        }

        std::fs::write(&path, format!("{}\n", self.target_count))
            .with_context(|| format!("Failed to write counter file {}", path.display()))?;
        Ok(PatchResult::new(PatchOutcome::PatchedOk))
    }
}
