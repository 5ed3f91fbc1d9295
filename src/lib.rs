pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod patch;
pub mod scheduler;
pub mod schema;
pub mod source;
pub mod views;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use data::SdeData;
pub use error::{Error, Result};
pub use patch::{PatchReport, Ruleset};
pub use source::{load, SdeSource, SourceKind};
pub use views::Views;
