use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sea_orm::sea_query::{PostgresQueryBuilder, SqliteQueryBuilder};
use sea_orm_migration::MigratorTrait;
use sistema_ventas::{
    catalog::Catalog,
    config::{self, AppConfig},
    db::{self, DbPool},
    migrator::Migrator,
};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "migration",
    about = "Create, roll back and inspect the sales database schema",
    version
)]
struct Cli {
    #[arg(long, help = "Database URL; overrides APP__DATABASE_URL and config files")]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply every pending migration
    Up,
    /// Roll back applied migrations
    Down {
        #[arg(long, help = "Number of migrations to roll back; all when omitted")]
        steps: Option<u32>,
    },
    /// List applied and pending migrations
    Status,
    /// Drop every catalog table, then migrate from scratch
    Fresh,
    /// Print the DDL for the catalog without touching a database
    Schema {
        #[arg(long, value_enum, default_value_t = Backend::Postgres)]
        backend: Backend,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Postgres,
    Sqlite,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Schema { backend } = cli.command {
        print_schema(backend)?;
        return Ok(());
    }

    let mut cfg = config::load_config().context("failed to load configuration")?;
    if let Some(url) = cli.database_url {
        cfg.database_url = url;
    }
    config::init_tracing(cfg.log_level(), cfg.log_json);

    let pool = connect(&cfg).await?;
    match cli.command {
        Commands::Up => {
            db::run_migrations(&pool).await?;
            db::verify_schema(&pool, &Catalog::standard()).await?;
        }
        Commands::Down { steps } => db::rollback_migrations(&pool, steps).await?,
        Commands::Status => print_status(&pool).await?,
        Commands::Fresh => {
            db::rollback_migrations(&pool, None).await?;
            db::run_migrations(&pool).await?;
            db::verify_schema(&pool, &Catalog::standard()).await?;
        }
        Commands::Schema { .. } => {}
    }

    db::close_pool(pool).await?;
    info!("Done");
    Ok(())
}

async fn connect(cfg: &AppConfig) -> Result<DbPool> {
    let pool = db::establish_connection_from_app_config(cfg)
        .await
        .with_context(|| format!("failed to connect to {}", cfg.database_url()))?;
    db::check_connection(&pool).await?;
    Ok(pool)
}

async fn print_status(pool: &DbPool) -> Result<()> {
    let applied = Migrator::get_applied_migrations(pool)
        .await
        .context("failed to read applied migrations")?;
    let pending = Migrator::get_pending_migrations(pool)
        .await
        .context("failed to read pending migrations")?;

    for migration in &applied {
        println!("applied  {}", migration.name());
    }
    for migration in &pending {
        println!("pending  {}", migration.name());
    }
    println!("{} applied, {} pending", applied.len(), pending.len());
    Ok(())
}

fn print_schema(backend: Backend) -> Result<()> {
    let catalog = Catalog::standard();
    for table in catalog.dependency_order()? {
        let create = Catalog::create_table_statement(table);
        let indexes = Catalog::create_index_statements(table);
        match backend {
            Backend::Postgres => {
                println!("{};", create.to_string(PostgresQueryBuilder));
                for index in &indexes {
                    println!("{};", index.to_string(PostgresQueryBuilder));
                }
            }
            Backend::Sqlite => {
                println!("{};", create.to_string(SqliteQueryBuilder));
                for index in &indexes {
                    println!("{};", index.to_string(SqliteQueryBuilder));
                }
            }
        }
        println!();
    }
    Ok(())
}
