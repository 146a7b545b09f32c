use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    path::Path,
};

use tracing::info;

use crate::{
    catalog, conn::Connection, err::ConvergenceError, replay, rewrite::Normalize, Outcome, Result,
    SchemaName,
};

/// Reference rows the application can't run without, as
/// `(table, column, values)`.
pub const STANDARD_SEEDS: &[(&str, &str, &[&str])] = &[
    ("roles", "name", &["ADMIN", "SALES", "LOGISTICS"]),
    ("payment_methods", "name", &["CASH", "CARD", "TRANSFER"]),
    (
        "logistic_statuses",
        "code",
        &["PENDING", "PREPARING", "IN_TRANSIT", "DELIVERED", "CANCELLED"],
    ),
];

/// table -> column -> values that must be present in that column.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeedRequirements(BTreeMap<String, BTreeMap<String, BTreeSet<String>>>);

impl SeedRequirements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn standard() -> Self {
        STANDARD_SEEDS
            .iter()
            .fold(Self::new(), |seeds, (table, column, values)| {
                seeds.require(*table, *column, values.iter().copied())
            })
    }

    /// Adds expected values, merging with anything already required for the
    /// same column.
    pub fn require<T, K, I, S>(mut self, table: T, column: K, values: I) -> Self
    where
        T: Into<String>,
        K: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .entry(table.into())
            .or_default()
            .entry(column.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().flat_map(BTreeMap::values).all(BTreeSet::is_empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &BTreeSet<String>)> {
        self.0.iter().flat_map(|(table, columns)| {
            columns
                .iter()
                .map(move |(column, values)| (table.as_str(), column.as_str(), values))
        })
    }
}

/// Expected seed values that are not in the database, per table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeedGap(BTreeMap<String, BTreeSet<String>>);

impl SeedGap {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, table: &str) -> Option<&BTreeSet<String>> {
        self.0.get(table)
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Total number of missing values across all tables.
    pub fn len(&self) -> usize {
        self.0.values().map(BTreeSet::len).sum()
    }

    fn add<I: IntoIterator<Item = String>>(&mut self, table: &str, values: I) {
        let mut values = values.into_iter().peekable();
        if values.peek().is_some() {
            self.0.entry(table.to_owned()).or_default().extend(values);
        }
    }
}

impl fmt::Display for SeedGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (table, values)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{table}: ")?;
            for (j, value) in values.iter().enumerate() {
                if j > 0 {
                    f.write_str(", ")?;
                }
                f.write_str(value)?;
            }
        }
        Ok(())
    }
}

/// Computes which required values are absent. A missing schema or table
/// means all of its values are missing.
pub async fn missing_seed_values<C: Connection>(
    conn: &mut C,
    schema: &SchemaName,
    requirements: &SeedRequirements,
) -> Result<SeedGap> {
    let mut gap = SeedGap::default();
    let schema_exists = catalog::database_exists(conn, schema).await?;

    for (table, column, expected) in requirements.iter() {
        let present = if schema_exists && conn.table_exists(schema.as_str(), table).await? {
            let values = expected.iter().map(String::as_str).collect::<Vec<_>>();
            conn.present_values(schema.as_str(), table, column, &values)
                .await?
                .into_iter()
                .collect()
        } else {
            BTreeSet::new()
        };

        gap.add(table, expected.difference(&present).cloned());
    }

    Ok(gap)
}

pub async fn ensure_seed_data<C, N>(
    conn: &mut C,
    schema: &SchemaName,
    requirements: &SeedRequirements,
    sql_file: &Path,
    normalizer: &N,
    dry_run: bool,
) -> Result<Outcome<SeedGap>>
where
    C: Connection,
    N: Normalize + ?Sized,
{
    replay::check_script(sql_file)?;

    if !dry_run {
        catalog::create_database_if_missing(conn, schema).await?;
    }

    let missing = missing_seed_values(conn, schema, requirements).await?;
    if missing.is_empty() {
        info!(file = %sql_file.display(), "seed data already present");
        return Ok(Outcome::UpToDate);
    }

    info!(file = %sql_file.display(), %missing, "missing seed data");
    if dry_run {
        info!(file = %sql_file.display(), "dry run, not executing");
        return Ok(Outcome::DryRun(missing));
    }

    replay::execute_script(conn, sql_file, normalizer).await?;

    let still_missing = missing_seed_values(conn, schema, requirements).await?;
    if !still_missing.is_empty() {
        return Err(ConvergenceError::Seed {
            file: sql_file.to_owned(),
            missing: still_missing,
        }
        .into());
    }

    Ok(Outcome::Applied(missing))
}
