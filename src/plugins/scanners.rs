//! Built-in Scanners: read-only facts about a working tree.

use anyhow::{Result, bail};
use serde_json::{Map, Value};
use std::path::Path;

const ROOT_FILES: &[&str] = &[
    "README.md",
    "LICENSE",
    "Makefile",
    ".gitignore",
    ".pre-commit-config.yaml",
    "Cargo.toml",
    "pyproject.toml",
    "package.json",
    "Dockerfile",
];

const ROOT_FOLDERS: &[&str] = &["src", "tests", "docs", ".github"];

fn presence(repo_path: &Path, names: &[&str], want_dir: bool) -> Result<Value> {
    if !repo_path.is_dir() {
        bail!("{} is not a directory", repo_path.display());
    }
    let found: Map<String, Value> = names
        .iter()
        .map(|name| {
            let path = repo_path.join(name);
            let exists = if want_dir { path.is_dir() } else { path.is_file() };
            (name.to_string(), Value::Bool(exists))
        })
        .collect();
    Ok(Value::Object(found))
}

/// Which common files exist at the root of the repo.
pub fn rootlevel_files(repo_path: &Path) -> Result<Value> {
    presence(repo_path, ROOT_FILES, false)
}

/// Which common folders exist at the root of the repo.
pub fn rootlevel_folders(repo_path: &Path) -> Result<Value> {
    presence(repo_path, ROOT_FOLDERS, true)
}
