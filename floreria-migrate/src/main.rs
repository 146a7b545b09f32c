use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use floreria_db::{
    pool::{self, PoolSettings},
    Bootstrap, DatabaseConfig, Outcome, Report, SqlAssets,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Creates missing Florería Carlitos tables and reference data.
#[derive(Parser)]
#[command(name = "migrate", version)]
struct Args {
    /// MySQL host.
    #[arg(long, env = "DB_HOST", default_value = "127.0.0.1")]
    host: String,
    /// MySQL port.
    #[arg(long, env = "DB_PORT", default_value_t = 3306)]
    port: u16,
    /// MySQL user.
    #[arg(long, env = "DB_USER", default_value = "root")]
    user: String,
    /// MySQL password.
    #[arg(long, env = "DB_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,
    /// Database to create or complete.
    #[arg(long, env = "DB_NAME", default_value = "floreriadb")]
    database: String,
    /// JSON connection config, used instead of the flags above.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Directory holding schema.sql, extension.sql and seed.sql.
    #[arg(long, env = "DB_SQL_DIR", value_name = "DIR", default_value = SqlAssets::DEFAULT_DIR)]
    sql_dir: PathBuf,
    /// Report what is missing without executing anything.
    #[arg(long)]
    dry_run: bool,
    /// Leave the inventory and lost-order tables alone.
    #[arg(long)]
    skip_extension: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    run(Args::parse()).await
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => DatabaseConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => DatabaseConfig {
            host: args.host,
            port: args.port,
            username: args.user,
            password: args.password,
            schema: args.database,
        },
    };
    let schema = config.schema_name()?;

    let assets = SqlAssets::in_dir(&args.sql_dir);
    let missing = assets.missing();
    if !missing.is_empty() {
        let files = missing
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>();
        bail!("SQL files not found: {}", files.join(", "));
    }

    let settings = PoolSettings {
        max_connections: 1,
        ..PoolSettings::default()
    };
    info!(%schema, sql_dir = %args.sql_dir.display(), dry_run = args.dry_run, "starting bootstrap");
    let pool = pool::connect(&config, settings)
        .await
        .with_context(|| format!("failed to connect to {}:{}", config.host, config.port))?;

    let bootstrap = Bootstrap::new(schema, assets)
        .include_extension(!args.skip_extension)
        .dry_run(args.dry_run);
    let report = pool::bootstrap(&pool, &bootstrap)
        .await
        .with_context(|| format!("failed to bootstrap {}", bootstrap.schema()))?;
    pool.close().await;

    print_summary(&report, args.dry_run);
    Ok(())
}

fn print_summary(report: &Report, dry_run: bool) {
    print_tables("schema.sql", &report.base);
    match &report.extension {
        Some(outcome) => print_tables("extension.sql", outcome),
        None => println!("extension.sql: skipped"),
    }
    match &report.seed {
        Outcome::UpToDate => println!("seed.sql: reference data present"),
        Outcome::Applied(gap) => println!("seed.sql: inserted {gap}"),
        Outcome::DryRun(gap) => println!("seed.sql: missing {gap}"),
    }

    if dry_run {
        println!("dry run, nothing was executed");
    } else if report.changed() {
        println!("migration completed");
    } else {
        println!("database already up to date");
    }
}

fn print_tables(file: &str, outcome: &Outcome<Vec<String>>) {
    match outcome {
        Outcome::UpToDate => println!("{file}: all tables present"),
        Outcome::Applied(tables) => println!("{file}: created {}", tables.join(", ")),
        Outcome::DryRun(tables) => println!("{file}: missing {}", tables.join(", ")),
    }
}
