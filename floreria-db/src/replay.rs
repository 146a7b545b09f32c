use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::{conn::Connection, rewrite::Normalize, split, Error, Result};

pub(crate) fn check_script(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::MissingSqlFile(path.to_owned()))
    }
}

/// Reads a SQL file from disk. Nothing is cached, so edits between runs are
/// picked up.
pub fn read_script(path: &Path) -> Result<String> {
    check_script(path)?;
    std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_owned(),
        source,
    })
}

/// Replays every statement of the SQL file at `path` in one transaction.
///
/// Errors other than [`Error::DuplicateIndex`] roll the transaction back and
/// come back wrapped in [`Error::Script`].
pub async fn execute_script<C, N>(conn: &mut C, path: &Path, normalizer: &N) -> Result<()>
where
    C: Connection,
    N: Normalize + ?Sized,
{
    let sql = read_script(path)?;

    info!(file = %path.display(), "executing SQL file");
    replay(conn, split::statements(&sql), normalizer)
        .await
        .map_err(|err| {
            error!(file = %path.display(), %err, "error executing SQL file");
            Error::script(path, err)
        })
}

pub async fn replay<C, N, I>(conn: &mut C, statements: I, normalizer: &N) -> Result<()>
where
    C: Connection,
    N: Normalize + ?Sized,
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    conn.begin().await?;

    match run(conn, statements, normalizer).await {
        Ok(()) => conn.commit().await,
        Err(err) => {
            if let Err(rollback) = conn.rollback().await {
                error!(%rollback, "rollback failed");
            }
            Err(err)
        }
    }
}

async fn run<C, N, I>(conn: &mut C, statements: I, normalizer: &N) -> Result<()>
where
    C: Connection,
    N: Normalize + ?Sized,
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    for (index, statement) in statements.into_iter().enumerate() {
        let statement = normalizer.normalize(statement.as_ref());
        debug!(index, sql = %statement, "executing statement");

        match conn.execute(&statement).await {
            Ok(()) => {}
            // left behind by an earlier partial run
            Err(Error::DuplicateIndex(message)) => {
                warn!(index, %message, "index already exists, skipping statement");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}
