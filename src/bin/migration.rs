use anyhow::{Context, Result};
use backoffice_api::{config, db, migrator::Migrator};
use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use tracing::info;

#[derive(Parser)]
#[command(name = "migration", about = "Apply or roll back the back office schema", version)]
struct Cli {
    #[arg(
        long,
        help = "Database URL; defaults to DATABASE_URL, then the loaded configuration"
    )]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply every pending migration (default)
    Up,
    /// Roll back the most recent migrations
    Down {
        #[arg(long, default_value_t = 1, help = "Number of migrations to roll back")]
        steps: u32,
    },
    /// Show applied and pending migrations
    Status,
    /// Drop every table and re-apply all migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();
    let database_url = match cli.database_url.or_else(|| std::env::var("DATABASE_URL").ok()) {
        Some(url) => url,
        None => config::load_config()
            .context("no --database-url or DATABASE_URL given and configuration failed to load")?
            .database_url,
    };

    let pool = db::establish_connection_with_config(&db::DbConfig {
        url: database_url,
        max_connections: 2,
        min_connections: 1,
        ..Default::default()
    })
    .await
    .context("failed to connect for migrations")?;

    match cli.command.unwrap_or(Commands::Up) {
        Commands::Up => {
            Migrator::up(&pool, None).await?;
            info!("Migrations applied");
        }
        Commands::Down { steps } => {
            Migrator::down(&pool, Some(steps)).await?;
            info!("Rolled back {} migration(s)", steps);
        }
        Commands::Status => Migrator::status(&pool).await?,
        Commands::Fresh => {
            Migrator::fresh(&pool).await?;
            info!("Schema recreated");
        }
    }

    db::close_pool(pool).await?;
    Ok(())
}
