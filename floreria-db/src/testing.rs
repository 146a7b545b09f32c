//! In-memory stand-in for a MySQL connection.
//!
//! Only the statement shapes used by the bundled SQL files are understood:
//! `CREATE DATABASE`, `USE`, `SET`, `CREATE TABLE`, `CREATE [UNIQUE] INDEX`
//! and multi-row `INSERT ... VALUES`. DDL commits implicitly like it does on
//! the server, so a rollback only undoes inserts.

use std::collections::{BTreeMap, BTreeSet};

use regex::{Captures, Regex};

use crate::{conn::Connection, Error, Result};

const IDENT: &str = r"`(?:[^`]|``)*`|[A-Za-z0-9_$]+";

lazy_static::lazy_static! {
    static ref CREATE_DATABASE: Regex = Regex::new(&format!(
        r"(?is)^CREATE\s+DATABASE\s+(IF\s+NOT\s+EXISTS\s+)?({IDENT})"
    ))
    .unwrap();
    static ref USE: Regex = Regex::new(&format!(r"(?is)^USE\s+({IDENT})$")).unwrap();
    static ref SET: Regex = Regex::new(r"(?is)^SET\s").unwrap();
    static ref CREATE_TABLE: Regex = Regex::new(&format!(
        r"(?is)^CREATE\s+TABLE\s+(IF\s+NOT\s+EXISTS\s+)?(?:({IDENT})\.)?({IDENT})\s*\("
    ))
    .unwrap();
    static ref CREATE_INDEX: Regex = Regex::new(&format!(
        r"(?is)^CREATE\s+(?:UNIQUE\s+)?INDEX\s+({IDENT})\s+ON\s+(?:({IDENT})\.)?({IDENT})"
    ))
    .unwrap();
    static ref INSERT: Regex = Regex::new(&format!(
        r"(?is)^INSERT\s+(?:IGNORE\s+)?INTO\s+(?:({IDENT})\.)?({IDENT})\s*\(([^)]*)\)\s*VALUES\s*(.*)$"
    ))
    .unwrap();
}

#[derive(Clone, Debug, Default)]
struct Schema {
    // table -> column -> stored values
    tables: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
    indexes: BTreeSet<String>,
}

#[derive(Debug, Default)]
pub(crate) struct FakeConnection {
    schemas: BTreeMap<String, Schema>,
    snapshot: Option<BTreeMap<String, Schema>>,
    current: Option<String>,
    executed: Vec<String>,
    commits: usize,
    rollbacks: usize,
    queries: usize,
    table_probes: usize,
    case_insensitive: bool,
}

impl FakeConnection {
    /// Compares seed values like a `_ci` collation: case and trailing
    /// spaces are ignored.
    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    pub fn with_tables<I, S>(mut self, schema: &str, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.schemas.entry(schema.to_owned()).or_default();
        for table in tables {
            entry.tables.entry(table.into()).or_default();
        }
        self
    }

    pub fn with_index(mut self, schema: &str, name: &str) -> Self {
        self.schemas
            .entry(schema.to_owned())
            .or_default()
            .indexes
            .insert(name.to_owned());
        self
    }

    pub fn with_values<I, S>(mut self, schema: &str, table: &str, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schemas
            .entry(schema.to_owned())
            .or_default()
            .tables
            .entry(table.to_owned())
            .or_default()
            .entry(column.to_owned())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// Statements passed to [`Connection::execute`], in order, including the
    /// ones that failed.
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    pub fn has_schema(&self, schema: &str) -> bool {
        self.schemas.contains_key(schema)
    }

    pub fn has_table(&self, schema: &str, table: &str) -> bool {
        self.schemas
            .get(schema)
            .is_some_and(|s| s.tables.contains_key(table))
    }

    pub fn tables(&self, schema: &str) -> Vec<String> {
        self.schemas
            .get(schema)
            .map(|s| s.tables.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Sorted values stored in `schema.table.column`.
    pub fn values(&self, schema: &str, table: &str, column: &str) -> Vec<String> {
        self.schemas
            .get(schema)
            .and_then(|s| s.tables.get(table))
            .and_then(|t| t.get(column))
            .map(|values| values.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks
    }

    /// Number of catalog probes of any kind.
    pub fn queries(&self) -> usize {
        self.queries
    }

    pub fn table_probes(&self) -> usize {
        self.table_probes
    }

    fn interpret(&mut self, sql: &str) -> Result<()> {
        let sql = sql.trim();

        if let Some(caps) = CREATE_DATABASE.captures(sql) {
            let name = unquote(&caps[2]);
            if self.schemas.contains_key(&name) && caps.get(1).is_none() {
                return Err(protocol(format!("Can't create database '{name}'; database exists")));
            }
            self.schemas.entry(name).or_default();
            self.implicit_commit();
        } else if let Some(caps) = USE.captures(sql) {
            let name = unquote(&caps[1]);
            if !self.schemas.contains_key(&name) {
                return Err(protocol(format!("Unknown database '{name}'")));
            }
            self.current = Some(name);
        } else if SET.is_match(sql) {
            // session variables have no effect here
        } else if let Some(caps) = CREATE_TABLE.captures(sql) {
            let table = unquote(&caps[3]);
            let schema = self.schema_mut(&caps, 2)?;
            if schema.tables.contains_key(&table) {
                if caps.get(1).is_none() {
                    return Err(protocol(format!("Table '{table}' already exists")));
                }
            } else {
                schema.tables.insert(table, BTreeMap::new());
            }
            self.implicit_commit();
        } else if let Some(caps) = CREATE_INDEX.captures(sql) {
            let index = unquote(&caps[1]);
            let table = unquote(&caps[3]);
            let schema = self.schema_mut(&caps, 2)?;
            if !schema.tables.contains_key(&table) {
                return Err(protocol(format!("Table '{table}' doesn't exist")));
            }
            if !schema.indexes.insert(index.clone()) {
                return Err(Error::DuplicateIndex(format!("Duplicate key name '{index}'")));
            }
            self.implicit_commit();
        } else if let Some(caps) = INSERT.captures(sql) {
            let table = unquote(&caps[2]);
            let columns = caps[3].split(',').map(unquote).collect::<Vec<_>>();
            let rows = parse_rows(&caps[4])?;
            let schema = self.schema_mut(&caps, 1)?;
            let stored = schema
                .tables
                .get_mut(&table)
                .ok_or_else(|| protocol(format!("Table '{table}' doesn't exist")))?;

            for row in rows {
                if row.len() != columns.len() {
                    return Err(protocol("Column count doesn't match value count"));
                }
                for (column, value) in columns.iter().zip(row) {
                    stored.entry(column.clone()).or_default().insert(value);
                }
            }
        } else {
            return Err(protocol(format!("unsupported statement: {sql}")));
        }

        Ok(())
    }

    // the qualifier in capture group `group`, or the database chosen by USE
    fn schema_mut(&mut self, caps: &Captures<'_>, group: usize) -> Result<&mut Schema> {
        let name = match caps.get(group) {
            Some(name) => unquote(name.as_str()),
            None => self
                .current
                .clone()
                .ok_or_else(|| protocol("No database selected"))?,
        };
        self.schemas
            .get_mut(&name)
            .ok_or_else(|| protocol(format!("Unknown database '{name}'")))
    }

    fn collates_equal(&self, stored: &str, wanted: &str) -> bool {
        if self.case_insensitive {
            stored.trim_end_matches(' ').to_lowercase() == wanted.trim_end_matches(' ').to_lowercase()
        } else {
            stored == wanted
        }
    }

    fn implicit_commit(&mut self) {
        if self.snapshot.is_some() {
            self.snapshot = Some(self.schemas.clone());
        }
    }
}

impl Connection for FakeConnection {
    async fn schema_exists(&mut self, schema: &str) -> Result<bool> {
        self.queries += 1;
        Ok(self.has_schema(schema))
    }

    async fn table_exists(&mut self, schema: &str, table: &str) -> Result<bool> {
        self.queries += 1;
        self.table_probes += 1;
        Ok(self.has_table(schema, table))
    }

    async fn present_values(
        &mut self,
        schema: &str,
        table: &str,
        column: &str,
        values: &[&str],
    ) -> Result<Vec<String>> {
        self.queries += 1;
        let stored = self
            .schemas
            .get(schema)
            .and_then(|s| s.tables.get(table))
            .ok_or_else(|| protocol(format!("Table '{schema}.{table}' doesn't exist")))?;

        let stored = stored.get(column);
        Ok(values
            .iter()
            .filter(|wanted| {
                stored
                    .into_iter()
                    .flatten()
                    .any(|value| self.collates_equal(value, wanted))
            })
            .map(|wanted| wanted.to_string())
            .collect())
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        self.executed.push(sql.to_owned());
        self.interpret(sql)
    }

    async fn begin(&mut self) -> Result<()> {
        self.snapshot = Some(self.schemas.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.snapshot = None;
        self.commits += 1;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if let Some(snapshot) = self.snapshot.take() {
            self.schemas = snapshot;
        }
        self.rollbacks += 1;
        Ok(())
    }
}

fn protocol(message: impl Into<String>) -> Error {
    Error::Database(sqlx::Error::Protocol(message.into()))
}

fn unquote(ident: &str) -> String {
    let ident = ident.trim();
    match ident.strip_prefix('`').and_then(|s| s.strip_suffix('`')) {
        Some(inner) => inner.replace("``", "`"),
        None => ident.to_owned(),
    }
}

// `('a', 1), ('b', NULL) ON DUPLICATE KEY ...`; anything after the last
// tuple is ignored
fn parse_rows(input: &str) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace() || *c == ',').is_some() {}
        if chars.next_if_eq(&'(').is_none() {
            return Ok(rows);
        }

        let mut row = Vec::new();
        loop {
            while chars.next_if(|c| c.is_whitespace()).is_some() {}
            let mut value = String::new();
            if chars.next_if_eq(&'\'').is_some() {
                loop {
                    match chars.next() {
                        Some('\\') => value.extend(chars.next()),
                        Some('\'') if chars.next_if_eq(&'\'').is_some() => value.push('\''),
                        Some('\'') => break,
                        Some(c) => value.push(c),
                        None => return Err(protocol("unterminated string literal")),
                    }
                }
            } else {
                while let Some(c) = chars.next_if(|c| *c != ',' && *c != ')') {
                    value.push(c);
                }
                value = value.trim().to_owned();
            }
            row.push(value);

            while chars.next_if(|c| c.is_whitespace()).is_some() {}
            match chars.next() {
                Some(',') => continue,
                Some(')') => break,
                _ => return Err(protocol("malformed VALUES list")),
            }
        }
        rows.push(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rows() {
        let rows = parse_rows(
            "('ADMIN', 'It''s full'), ( 'SALES' , NULL ) ON DUPLICATE KEY UPDATE x = VALUES(x)",
        )
        .unwrap();
        assert_eq!(rows, [["ADMIN", "It's full"], ["SALES", "NULL"]]);
        assert!(parse_rows("('open").is_err());
    }

    #[tokio::test]
    async fn test_ddl_survives_rollback() {
        let mut conn = FakeConnection::default().with_tables("shop", ["roles"]);

        conn.begin().await.unwrap();
        conn.execute("INSERT INTO shop.roles (name) VALUES ('A')").await.unwrap();
        conn.execute("CREATE TABLE shop.users (id INT)").await.unwrap();
        conn.execute("INSERT INTO shop.roles (name) VALUES ('B')").await.unwrap();
        conn.rollback().await.unwrap();

        assert!(conn.has_table("shop", "users"));
        assert_eq!(conn.values("shop", "roles", "name"), ["A"]);
    }
}
