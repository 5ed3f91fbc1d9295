//! Configuration resolution: command line, then config file, then defaults.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::source::SourceKind;

pub const DEFAULT_WORKERS: usize = 4;

/// Keys accepted in `config.toml`; all optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub source: Option<SourceKind>,
    pub path: Option<PathBuf>,
    pub localization: Option<PathBuf>,
    pub patch: Option<bool>,
    pub workers: Option<usize>,
}

impl ConfigFile {
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&text).map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))
    }

    /// `config.toml` in the platform config directory
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "eve-sde-index").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub source: Option<SourceKind>,
    pub path: Option<PathBuf>,
    pub localization: Option<PathBuf>,
    pub patch: Option<bool>,
    pub workers: Option<usize>,
    /// Explicit config file; must exist when given
    pub config: Option<PathBuf>,
}

/// Fully resolved settings for one load
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub source: SourceKind,
    pub path: PathBuf,
    pub localization: Option<PathBuf>,
    pub patch: bool,
    pub workers: usize,
}

impl Config {
    pub fn resolve(overrides: Overrides) -> Result<Self> {
        let file = match &overrides.config {
            Some(path) => ConfigFile::read(path)?,
            None => match ConfigFile::default_path() {
                Some(path) if path.is_file() => {
                    debug!(path = %path.display(), "Using config file");
                    ConfigFile::read(&path)?
                }
                _ => ConfigFile::default(),
            },
        };
        Self::merge(overrides, file)
    }

    pub fn merge(overrides: Overrides, file: ConfigFile) -> Result<Self> {
        let source = overrides
            .source
            .or(file.source)
            .ok_or_else(|| Error::Config("no source selected; pass --sqlite or --yaml".into()))?;
        let path = overrides
            .path
            .or(file.path)
            .ok_or_else(|| Error::Config("no source path given".into()))?;
        let localization = overrides.localization.or(file.localization);
        if source == SourceKind::Yaml && localization.is_none() {
            return Err(Error::Config(
                "the YAML export needs a localization table (--localization)".into(),
            ));
        }

        let workers = overrides.workers.or(file.workers).unwrap_or(DEFAULT_WORKERS);
        if workers == 0 {
            return Err(Error::Config("workers must be at least 1".into()));
        }

        Ok(Self {
            source,
            path,
            localization,
            patch: overrides.patch.or(file.patch).unwrap_or(true),
            workers,
        })
    }
}
