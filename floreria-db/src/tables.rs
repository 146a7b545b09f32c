use std::path::Path;

use tracing::info;

use crate::{
    catalog, conn::Connection, err::ConvergenceError, replay, rewrite::Normalize, Outcome, Result,
    SchemaName,
};

/// Makes sure every table in `tables` exists, executing `sql_file` when any
/// of them is missing.
///
/// The outcome carries the tables that were missing before anything ran.
pub async fn ensure_tables<C, N, S>(
    conn: &mut C,
    schema: &SchemaName,
    tables: &[S],
    sql_file: &Path,
    normalizer: &N,
    dry_run: bool,
) -> Result<Outcome<Vec<String>>>
where
    C: Connection,
    N: Normalize + ?Sized,
    S: AsRef<str>,
{
    replay::check_script(sql_file)?;

    let missing = catalog::missing_tables(conn, schema, tables).await?;
    if missing.is_empty() {
        info!(file = %sql_file.display(), "tables already exist");
        return Ok(Outcome::UpToDate);
    }

    info!(
        file = %sql_file.display(),
        missing = %missing.join(", "),
        "missing tables"
    );
    if dry_run {
        info!(file = %sql_file.display(), "dry run, not executing");
        return Ok(Outcome::DryRun(missing));
    }

    catalog::create_database_if_missing(conn, schema).await?;
    replay::execute_script(conn, sql_file, normalizer).await?;

    let still_missing = catalog::missing_tables(conn, schema, tables).await?;
    if !still_missing.is_empty() {
        return Err(ConvergenceError::Tables {
            file: sql_file.to_owned(),
            missing: still_missing,
        }
        .into());
    }

    Ok(Outcome::Applied(missing))
}
