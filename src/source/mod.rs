//! Source readers and the load pipeline: read, patch, verify, freeze.

pub mod sqlite;
pub mod yaml;

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::Config;
use crate::data::SdeData;
use crate::error::{Error, Result};
use crate::patch::{self, Ruleset};
use crate::schema::{self, RawTables};

pub use sqlite::SqliteSource;
pub use yaml::YamlSource;

/// One of the two export formats the game data ships in
pub trait SdeSource {
    /// Short label used in logs
    fn name(&self) -> &'static str;

    /// Read every entity table, uncorrected
    fn read(&self) -> Result<RawTables>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Sqlite,
    Yaml,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Sqlite => write!(f, "sqlite"),
            SourceKind::Yaml => write!(f, "yaml"),
        }
    }
}

/// Build the reader a resolved configuration asks for
pub fn open(config: &Config) -> Result<Box<dyn SdeSource>> {
    match config.source {
        SourceKind::Sqlite => Ok(Box::new(SqliteSource::new(&config.path))),
        SourceKind::Yaml => {
            let localization = config.localization.as_ref().ok_or_else(|| {
                Error::Config("the YAML export needs a localization table".into())
            })?;
            Ok(Box::new(
                YamlSource::new(&config.path, localization).with_workers(config.workers),
            ))
        }
    }
}

/// Read `source` and materialize the views.
///
/// With a ruleset the tables are corrected and checked for dangling
/// references first; without one they are frozen as read.
pub fn load(source: &dyn SdeSource, ruleset: Option<&Ruleset>) -> Result<SdeData> {
    let start = Instant::now();
    let mut tables = source.read()?;
    info!(
        source = source.name(),
        types = tables.types.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Source read"
    );

    let report = match ruleset {
        Some(ruleset) => {
            let patch_start = Instant::now();
            let report = patch::apply(&mut tables, ruleset)?;
            schema::verify(&tables)?;
            info!(
                elapsed_ms = patch_start.elapsed().as_millis() as u64,
                "Patches applied"
            );
            Some(report)
        }
        None => None,
    };

    let views_start = Instant::now();
    let data = SdeData::freeze(tables).with_report(report);
    info!(
        elapsed_ms = views_start.elapsed().as_millis() as u64,
        total_ms = start.elapsed().as_millis() as u64,
        "Views materialized"
    );
    Ok(data)
}
