use crate::Result;

/// Everything the reconciliation passes need from a live connection.
///
/// The connection is borrowed, never opened or closed here. Catalog probes
/// must bind `schema`, `table` and the values as parameters; only
/// identifiers go through [`crate::quote_identifier`].
#[allow(async_fn_in_trait)]
pub trait Connection {
    async fn schema_exists(&mut self, schema: &str) -> Result<bool>;

    async fn table_exists(&mut self, schema: &str, table: &str) -> Result<bool>;

    /// Returns the members of `values`, as given, that the server finds in
    /// `schema.table.column` using the column's own comparison rules.
    async fn present_values(
        &mut self,
        schema: &str,
        table: &str,
        column: &str,
        values: &[&str],
    ) -> Result<Vec<String>>;

    async fn execute(&mut self, sql: &str) -> Result<()>;

    async fn begin(&mut self) -> Result<()>;

    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;
}
