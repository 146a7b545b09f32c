use const_format::concatcp;
use sqlx::mysql::{MySqlConnection, MySqlDatabaseError};

use crate::{conn::Connection, ident::quote_identifier, Error, Result};

// ER_DUP_KEYNAME, raised by CREATE INDEX when the index already exists
const ER_DUP_KEYNAME: u16 = 1061;

const CATALOG: &str = "INFORMATION_SCHEMA";

const SCHEMA_PROBE: &str =
    concatcp!("SELECT 1 FROM ", CATALOG, ".SCHEMATA WHERE SCHEMA_NAME = ? LIMIT 1");

const TABLE_PROBE: &str = concatcp!(
    "SELECT 1 FROM ",
    CATALOG,
    ".TABLES WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? LIMIT 1"
);

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db) = err.as_database_error() {
            if let Some(db) = db.try_downcast_ref::<MySqlDatabaseError>() {
                if let Some(err) = map_mysql_error_number(db.number(), db.message()) {
                    return err;
                }
            }
        }
        Self::Database(err)
    }
}

fn map_mysql_error_number(number: u16, message: &str) -> Option<Error> {
    use Error::*;
    match number {
        ER_DUP_KEYNAME => Some(DuplicateIndex(message.to_owned())),
        _ => None,
    }
}

impl Connection for MySqlConnection {
    async fn schema_exists(&mut self, schema: &str) -> Result<bool> {
        let row = sqlx::query(SCHEMA_PROBE)
            .bind(schema)
            .fetch_optional(&mut *self)
            .await?;
        Ok(row.is_some())
    }

    async fn table_exists(&mut self, schema: &str, table: &str) -> Result<bool> {
        let row = sqlx::query(TABLE_PROBE)
            .bind(schema)
            .bind(table)
            .fetch_optional(&mut *self)
            .await?;
        Ok(row.is_some())
    }

    // one lookup per value so the column collation decides what matches,
    // e.g. a stored `admin` satisfies `ADMIN` under a _ci collation
    async fn present_values(
        &mut self,
        schema: &str,
        table: &str,
        column: &str,
        values: &[&str],
    ) -> Result<Vec<String>> {
        let column = quote_identifier(column);
        let sql = format!(
            "SELECT 1 FROM {}.{} WHERE {column} = ? LIMIT 1",
            quote_identifier(schema),
            quote_identifier(table),
        );

        let mut present = Vec::new();
        for value in values {
            let row = sqlx::query(&sql)
                .bind(*value)
                .fetch_optional(&mut *self)
                .await?;
            if row.is_some() {
                present.push((*value).to_owned());
            }
        }
        Ok(present)
    }

    // plain &str goes over the text protocol, which USE and friends need
    async fn execute(&mut self, sql: &str) -> Result<()> {
        sqlx::Executor::execute(&mut *self, sql).await?;
        Ok(())
    }

    async fn begin(&mut self) -> Result<()> {
        self.execute("START TRANSACTION").await
    }

    async fn commit(&mut self) -> Result<()> {
        self.execute("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.execute("ROLLBACK").await
    }
}
