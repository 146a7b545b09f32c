pub mod assets;
pub mod bootstrap;
pub mod catalog;
pub mod config;
pub mod conn;
mod err;
pub mod ident;
mod mysql;
pub mod pool;
pub mod replay;
pub mod rewrite;
pub mod seed;
pub mod split;
pub mod tables;

#[cfg(test)]
mod testing;

pub use assets::{SqlAssets, EXTENSION_TABLES, SCHEMA_TABLES};
pub use bootstrap::{initialize_database, Bootstrap, Report};
pub use config::{ConfigError, DatabaseConfig};
pub use conn::Connection;
pub use err::{ConvergenceError, Error};
pub use ident::{quote_identifier, SchemaName};
pub use rewrite::{Normalize, SchemaRewriter};
pub use seed::{SeedGap, SeedRequirements};

pub type Result<T> = std::result::Result<T, Error>;

/// What one reconciliation stage found and did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome<M> {
    UpToDate,
    /// The SQL file was executed. Holds what was missing beforehand.
    Applied(M),
    /// Something was missing but nothing was executed.
    DryRun(M),
}

impl<M> Outcome<M> {
    pub fn changed(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn missing(&self) -> Option<&M> {
        match self {
            Self::UpToDate => None,
            Self::Applied(missing) | Self::DryRun(missing) => Some(missing),
        }
    }
}
