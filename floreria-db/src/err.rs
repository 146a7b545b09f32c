use std::path::PathBuf;

use thiserror::Error;

use crate::seed::SeedGap;

#[derive(Debug, Error)]
pub enum Error {
    #[error("SQL file not found: {}", .0.display())]
    MissingSqlFile(PathBuf),

    #[error("Unable to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid schema name: {0:?}")]
    InvalidSchemaName(String),

    #[error("At least one source schema name is required")]
    NoSourceNames,

    #[error("Invalid source schema pattern: {0}")]
    SourcePattern(#[from] regex::Error),

    #[error("Duplicate index: {0}")]
    DuplicateIndex(String),

    #[error("Unhandled MySQL error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("Error while executing {}: {source}", .path.display())]
    Script {
        path: PathBuf,
        source: Box<Error>,
    },

    #[error(transparent)]
    Convergence(#[from] ConvergenceError),
}

/// The SQL file ran without error but the catalog still does not show what it
/// was supposed to create.
#[derive(Debug, Error)]
pub enum ConvergenceError {
    #[error("Tables still missing after executing {}: {}", .file.display(), .missing.join(", "))]
    Tables { file: PathBuf, missing: Vec<String> },

    #[error("Seed values still missing after executing {}: {missing}", .file.display())]
    Seed { file: PathBuf, missing: SeedGap },
}

impl Error {
    pub(crate) fn script(path: impl Into<PathBuf>, source: Error) -> Self {
        Self::Script {
            path: path.into(),
            source: Box::new(source),
        }
    }
}
