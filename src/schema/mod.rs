pub mod integrity;
pub mod tables;
pub mod types;

#[cfg(test)]
pub(crate) mod fixtures;

pub use integrity::{verify, violations, ForeignKey, Target, Violation, FOREIGN_KEYS};
pub use tables::*;
pub use types::*;
