//! Name-based resolution of the built-in plugins.
//!
//! Each plugin's configuration arrives as an opaque TOML table and is only
//! validated here, once the concrete type is known.

use serde::de::DeserializeOwned;

use super::drivers::{Counter, Stamper};
use super::forges::DummyForge;
use super::sources::{CsvFileSource, RepoFilelistSource, RepolistSource, TemplateFileSource};
use super::{Forge, PatchDriver, Scanner, Source, scanners};
use crate::errors::ConfigError;

/// The families of plugins an activity references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginKind {
    Driver,
    Forge,
    Source,
    Scanner,
}

impl PluginKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginKind::Driver => "driver",
            PluginKind::Forge => "forge",
            PluginKind::Source => "source",
            PluginKind::Scanner => "scanner",
        }
    }
}

/// A registered plugin, for listings.
#[derive(Debug, Clone, Copy)]
pub struct PluginEntry {
    pub name: &'static str,
    pub description: &'static str,
}

const DRIVERS: &[PluginEntry] = &[
    PluginEntry {
        name: "counter",
        description: "Sets a counter file to `target_count`. Config: counter_file, target_count",
    },
    PluginEntry {
        name: "stamper",
        description: "Creates a file with given contents. Config: filepath_to_create, file_contents",
    },
];

const FORGES: &[PluginEntry] = &[PluginEntry {
    name: "dummy",
    description: "Pretends to open PRs, returning a fixed URL. Config: pr_url, statuses",
}];

const SOURCES: &[PluginEntry] = &[
    PluginEntry {
        name: "repolist",
        description: "Inline list of clone URLs. Config: repos",
    },
    PluginEntry {
        name: "repo-filelist",
        description: "Newline-delimited file of clone URLs. Config: repo_file",
    },
    PluginEntry {
        name: "template-filelist",
        description: "File of repo ids templated into clone URLs. Config: repo_file, clone_url_template",
    },
    PluginEntry {
        name: "csv-filelist",
        description: "CSV of repos, extra columns become patch data. Config: csv_file, delimiter",
    },
];

const SCANNERS: &[PluginEntry] = &[
    PluginEntry {
        name: "root-files",
        description: "Detects common files at the repo root (README, LICENSE, Makefile...)",
    },
    PluginEntry {
        name: "root-folders",
        description: "Detects common folders at the repo root (src, tests, docs)",
    },
];

/// Registered plugins of a kind, in listing order.
pub fn entries(kind: PluginKind) -> &'static [PluginEntry] {
    match kind {
        PluginKind::Driver => DRIVERS,
        PluginKind::Forge => FORGES,
        PluginKind::Source => SOURCES,
        PluginKind::Scanner => SCANNERS,
    }
}

pub fn find(kind: PluginKind, name: &str) -> Result<&'static PluginEntry, ConfigError> {
    entries(kind)
        .iter()
        .find(|e| e.name == name)
        .ok_or_else(|| unknown(kind, name))
}

fn unknown(kind: PluginKind, name: &str) -> ConfigError {
    ConfigError::UnknownPlugin {
        kind: kind.as_str(),
        name: name.to_string(),
    }
}

fn parse_config<T: DeserializeOwned>(
    kind: PluginKind,
    name: &str,
    config: toml::Table,
) -> Result<T, ConfigError> {
    toml::Value::Table(config)
        .try_into::<T>()
        .map_err(|source| ConfigError::PluginConfig {
            kind: kind.as_str(),
            name: name.to_string(),
            source,
        })
}

pub fn load_driver(name: &str, config: toml::Table) -> Result<Box<dyn PatchDriver>, ConfigError> {
    let kind = PluginKind::Driver;
    match name {
        "counter" => Ok(Box::new(parse_config::<Counter>(kind, name, config)?)),
        "stamper" => Ok(Box::new(parse_config::<Stamper>(kind, name, config)?)),
        _ => Err(unknown(kind, name)),
    }
}

pub fn load_forge(name: &str, config: toml::Table) -> Result<Box<dyn Forge>, ConfigError> {
    let kind = PluginKind::Forge;
    match name {
        "dummy" => Ok(Box::new(parse_config::<DummyForge>(kind, name, config)?)),
        _ => Err(unknown(kind, name)),
    }
}

pub fn load_source(name: &str, config: toml::Table) -> Result<Box<dyn Source>, ConfigError> {
    let kind = PluginKind::Source;
    match name {
        "repolist" => Ok(Box::new(parse_config::<RepolistSource>(kind, name, config)?)),
        "repo-filelist" => Ok(Box::new(parse_config::<RepoFilelistSource>(
            kind, name, config,
        )?)),
        "template-filelist" => Ok(Box::new(parse_config::<TemplateFileSource>(
            kind, name, config,
        )?)),
        "csv-filelist" => Ok(Box::new(parse_config::<CsvFileSource>(kind, name, config)?)),
        _ => Err(unknown(kind, name)),
    }
}

pub fn load_scanner(name: &str) -> Result<Scanner, ConfigError> {
    match name {
        "root-files" => Ok(Scanner::new(name, scanners::rootlevel_files)),
        "root-folders" => Ok(Scanner::new(name, scanners::rootlevel_folders)),
        _ => Err(unknown(PluginKind::Scanner, name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(src: &str) -> toml::Table {
        toml::from_str::<toml::Table>(src).unwrap()
    }

    #[test]
    fn every_listed_plugin_resolves() {
        for entry in entries(PluginKind::Scanner) {
            assert!(load_scanner(entry.name).is_ok(), "{}", entry.name);
        }
        assert!(load_forge("dummy", toml::Table::new()).is_ok());
    }

    #[test]
    fn driver_config_is_validated_on_load() {
        let driver = load_driver(
            "counter",
            table("counter_file = \"counter.txt\"\ntarget_count = 3"),
        )
        .unwrap();
        assert_eq!(driver.type_name(), "Counter");

        let err = load_driver("counter", table("counter_file = \"x\"")).unwrap_err();
        assert!(matches!(err, ConfigError::PluginConfig { kind: "driver", .. }));
    }

    #[test]
    fn unknown_names_are_config_errors() {
        assert!(matches!(
            load_driver("nope", toml::Table::new()).unwrap_err(),
            ConfigError::UnknownPlugin { kind: "driver", .. }
        ));
        assert!(matches!(
            load_scanner("nope").unwrap_err(),
            ConfigError::UnknownPlugin { kind: "scanner", .. }
        ));
        assert!(find(PluginKind::Source, "repolist").is_ok());
        assert!(find(PluginKind::Forge, "github").is_err());
    }

    #[test]
    fn source_config_is_parsed() {
        let source = load_source("repolist", table("repos = [\"a\", \"b\"]")).unwrap();
        assert_eq!(source.discover().unwrap().len(), 2);

        assert!(load_source("csv-filelist", table("csv_file = \"repos.csv\"")).is_ok());
        assert!(matches!(
            load_source("csv-filelist", table("csv_file = \"repos.csv\"\nreader_args = 1")).unwrap_err(),
            ConfigError::PluginConfig { kind: "source", .. }
        ));
    }
}
