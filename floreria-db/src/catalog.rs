use tracing::{debug, info};

use crate::{conn::Connection, Result, SchemaName};

pub async fn database_exists<C: Connection>(conn: &mut C, schema: &SchemaName) -> Result<bool> {
    conn.schema_exists(schema.as_str()).await
}

/// Returns the tables from `tables` that don't exist in `schema`, in input
/// order. When the schema itself is missing every table is missing.
pub async fn missing_tables<C, I, S>(
    conn: &mut C,
    schema: &SchemaName,
    tables: I,
) -> Result<Vec<String>>
where
    C: Connection,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let tables = tables.into_iter().map(|table| table.as_ref().to_owned());

    if !database_exists(conn, schema).await? {
        debug!(%schema, "schema does not exist");
        return Ok(tables.collect());
    }

    let mut missing = Vec::new();
    for table in tables {
        if !conn.table_exists(schema.as_str(), &table).await? {
            missing.push(table);
        }
    }
    Ok(missing)
}

pub async fn create_database_if_missing<C: Connection>(
    conn: &mut C,
    schema: &SchemaName,
) -> Result<()> {
    if database_exists(conn, schema).await? {
        return Ok(());
    }

    info!(%schema, "creating database");
    conn.execute(&format!("CREATE DATABASE IF NOT EXISTS {}", schema.quoted()))
        .await
}
