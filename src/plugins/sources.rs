//! Built-in Sources: where the list of repositories comes from.

use anyhow::{Context, Result, bail};
use csv::StringRecord;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::Source;
use crate::model::{IndexedRepos, SourcedRepo, index_urls};

/// Inline list of clone URLs, each URL being its own repo id.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepolistSource {
    pub repos: Vec<String>,
}

impl Source for RepolistSource {
    fn discover(&self) -> Result<IndexedRepos> {
        Ok(index_urls(&self.repos))
    }
}

/// Newline-delimited file of clone URLs.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoFilelistSource {
    pub repo_file: PathBuf,
}

impl Source for RepoFilelistSource {
    fn discover(&self) -> Result<IndexedRepos> {
        Ok(index_urls(read_lines(&self.repo_file)?))
    }
}

/// File of repo ids, each turned into a clone URL via a `{id}` template.
///
/// `clone_url_template = "git@github.com:my-org/{id}.git"` maps the line
/// `api` to repo id `api` cloned from `git@github.com:my-org/api.git`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateFileSource {
    pub repo_file: PathBuf,
    pub clone_url_template: String,
}

const TEMPLATE_SLOT: &str = "{id}";

impl Source for TemplateFileSource {
    fn discover(&self) -> Result<IndexedRepos> {
        if !self.clone_url_template.contains(TEMPLATE_SLOT) {
            bail!(
                "clone_url_template '{}' has no {} placeholder",
                self.clone_url_template,
                TEMPLATE_SLOT
            );
        }
        Ok(read_lines(&self.repo_file)?
            .into_iter()
            .map(|id| {
                let url = self.clone_url_template.replace(TEMPLATE_SLOT, &id);
                (id.clone(), SourcedRepo::new(&id, &url))
            })
            .collect())
    }
}

/// CSV file of repos, one row each.
///
/// The `repo_id` and `clone_url` columns are required. `upstream_branch` and
/// `force_pull` are optional; every other column lands in the repo's
/// `patch_data` as a string, for drivers that need per-repo input:
///
/// ```csv
/// repo_id,clone_url,upstream_branch,owner
/// api,git@github.com:org/api.git,develop,team-a
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CsvFileSource {
    pub csv_file: PathBuf,
    /// Single-byte field separator
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_delimiter() -> char {
    ','
}

const REQUIRED_COLUMNS: [&str; 2] = ["repo_id", "clone_url"];

impl Source for CsvFileSource {
    fn discover(&self) -> Result<IndexedRepos> {
        let delimiter = u8::try_from(self.delimiter)
            .with_context(|| format!("CSV delimiter '{}' is not a single byte", self.delimiter))?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_path(&self.csv_file)
            .with_context(|| format!("Failed to open repo CSV {}", self.csv_file.display()))?;

        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read CSV header of {}", self.csv_file.display()))?
            .clone();
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                bail!("{} has no '{}' column", self.csv_file.display(), column);
            }
        }

        let mut repos = IndexedRepos::new();
        for (row, record) in reader.records().enumerate() {
            // Row 1 is the header
            let line = row + 2;
            let record = record
                .with_context(|| format!("Bad CSV row {} of {}", line, self.csv_file.display()))?;
            let repo = csv_repo(&headers, &record)
                .with_context(|| format!("Bad CSV row {} of {}", line, self.csv_file.display()))?;
            repos.insert(repo.repo_id.clone(), repo);
        }
        Ok(repos)
    }
}

fn csv_repo(headers: &StringRecord, record: &StringRecord) -> Result<SourcedRepo> {
    let mut repo = SourcedRepo::new("", "");
    for (column, value) in headers.iter().zip(record.iter()) {
        match column {
            "repo_id" => repo.repo_id = value.to_string(),
            "clone_url" => repo.clone_url = value.to_string(),
            "upstream_branch" if !value.is_empty() => {
                repo.upstream_branch = Some(value.to_string())
            }
            "upstream_branch" => {}
            "force_pull" => repo.force_pull = parse_flag(value)?,
            _ => {
                repo.patch_data
                    .insert(column.to_string(), Value::String(value.to_string()));
            }
        }
    }
    if repo.repo_id.is_empty() || repo.clone_url.is_empty() {
        bail!("repo_id and clone_url must not be empty");
    }
    Ok(repo)
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "" | "false" | "no" | "0" => Ok(false),
        "true" | "yes" | "1" => Ok(true),
        other => bail!("force_pull must be true or false, got '{}'", other),
    }
}

/// Non-blank, trimmed lines of a file.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read repo list {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect())
}
