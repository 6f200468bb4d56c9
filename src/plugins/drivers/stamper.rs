use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

use crate::model::{ClonedRepo, PatchOutcome, PatchResult};
use crate::plugins::PatchDriver;

/// Creates ("stamps") a new file onto a repository.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Stamper {
    pub filepath_to_create: PathBuf,
    pub file_contents: String,
}

impl PatchDriver for Stamper {
    fn type_name(&self) -> &'static str {
        "Stamper"
    }

    fn run(&mut self, repo: &ClonedRepo) -> Result<PatchResult> {
        let target = repo.cloned_path.join(&self.filepath_to_create);
        if target.is_file() {
            return Ok(PatchResult::with_details(
                PatchOutcome::AlreadyPatched,
                "File exists already",
            ));
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let mut contents = self.file_contents.clone();
        if !contents.ends_with('\n') {
            contents.push('\n');
        }
        std::fs::write(&target, contents)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        Ok(PatchResult::with_details(
            PatchOutcome::PatchedOk,
            "File created",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourcedRepo;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn stamps_file_with_trailing_newline_once() {
        let dir = tempdir().unwrap();
        let repo = ClonedRepo {
            source: SourcedRepo::new("repo", "repo"),
            cloned_path: dir.path().to_path_buf(),
            current_branch: "main".into(),
            commit_hash: "0".repeat(40),
        };
        let mut driver = Stamper {
            filepath_to_create: PathBuf::from("docs/NOTICE"),
            file_contents: "stamped".into(),
        };

        let first = driver.run(&repo).unwrap();
        assert_eq!(first.outcome, PatchOutcome::PatchedOk);
        assert_eq!(
            fs::read_to_string(dir.path().join("docs/NOTICE")).unwrap(),
            "stamped\n"
        );

        let second = driver.run(&repo).unwrap();
        assert_eq!(second.outcome, PatchOutcome::AlreadyPatched);
    }
}
