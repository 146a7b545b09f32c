use tracing::{info, info_span, Instrument};

use crate::{
    assets::{SqlAssets, EXTENSION_TABLES, SCHEMA_TABLES},
    conn::Connection,
    rewrite::{Normalize, SchemaRewriter},
    seed::{self, SeedGap, SeedRequirements},
    tables, Outcome, Result, SchemaName,
};

/// Per-stage outcomes of one bootstrap run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    pub base: Outcome<Vec<String>>,
    /// `None` when the extension stage was skipped.
    pub extension: Option<Outcome<Vec<String>>>,
    pub seed: Outcome<SeedGap>,
}

impl Report {
    /// True when any stage executed its SQL file.
    pub fn changed(&self) -> bool {
        self.base.changed()
            || self.extension.as_ref().is_some_and(Outcome::changed)
            || self.seed.changed()
    }
}

/// Brings a schema up to the expected tables and reference data: base
/// tables, then extension tables, then seed values.
///
/// ```no_run
/// # async fn run(conn: &mut sqlx::MySqlConnection) -> floreria_db::Result<()> {
/// use floreria_db::{Bootstrap, SchemaName, SqlAssets};
///
/// let report = Bootstrap::new(SchemaName::new("floreriadb")?, SqlAssets::default())
///     .include_extension(false)
///     .run(conn)
///     .await?;
/// println!("changed: {}", report.changed());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Bootstrap<N = SchemaRewriter> {
    schema: SchemaName,
    assets: SqlAssets,
    seeds: SeedRequirements,
    normalizer: N,
    include_extension: bool,
    dry_run: bool,
}

impl Bootstrap {
    pub fn new(schema: SchemaName, assets: SqlAssets) -> Self {
        Self {
            normalizer: SchemaRewriter::new(&schema),
            schema,
            assets,
            seeds: SeedRequirements::standard(),
            include_extension: true,
            dry_run: false,
        }
    }
}

impl<N: Normalize> Bootstrap<N> {
    pub fn with_normalizer<M: Normalize>(self, normalizer: M) -> Bootstrap<M> {
        Bootstrap {
            schema: self.schema,
            assets: self.assets,
            seeds: self.seeds,
            normalizer,
            include_extension: self.include_extension,
            dry_run: self.dry_run,
        }
    }

    pub fn with_seeds(mut self, seeds: SeedRequirements) -> Self {
        self.seeds = seeds;
        self
    }

    pub fn include_extension(mut self, include: bool) -> Self {
        self.include_extension = include;
        self
    }

    /// Only report what is missing, never execute anything.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn schema(&self) -> &SchemaName {
        &self.schema
    }

    pub async fn run<C: Connection>(&self, conn: &mut C) -> Result<Report> {
        let span = info_span!("bootstrap", schema = %self.schema, dry_run = self.dry_run);
        self.run_stages(conn).instrument(span).await
    }

    async fn run_stages<C: Connection>(&self, conn: &mut C) -> Result<Report> {
        let base = tables::ensure_tables(
            conn,
            &self.schema,
            SCHEMA_TABLES,
            &self.assets.schema,
            &self.normalizer,
            self.dry_run,
        )
        .await?;

        let extension = if self.include_extension {
            let outcome = tables::ensure_tables(
                conn,
                &self.schema,
                EXTENSION_TABLES,
                &self.assets.extension,
                &self.normalizer,
                self.dry_run,
            )
            .await?;
            Some(outcome)
        } else {
            None
        };

        let seed = seed::ensure_seed_data(
            conn,
            &self.schema,
            &self.seeds,
            &self.assets.seed,
            &self.normalizer,
            self.dry_run,
        )
        .await?;

        let report = Report {
            base,
            extension,
            seed,
        };
        if !report.changed() && !self.dry_run {
            info!("database already up to date");
        }
        Ok(report)
    }
}

/// Runs the full bootstrap with standard settings. Returns whether anything
/// was executed.
pub async fn initialize_database<C: Connection>(
    conn: &mut C,
    schema: &str,
    assets: &SqlAssets,
) -> Result<bool> {
    let schema = SchemaName::new(schema)?;
    let report = Bootstrap::new(schema, assets.clone()).run(conn).await?;
    Ok(report.changed())
}
