mod config;
mod graphql;
mod http;
mod seed;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use platform_db::{DatabaseSettings, DbPool, EmployeeStore, connect};
use platform_obs::{ObsConfig, init_tracing};
use products_hr::{EmployeeRepository, InMemoryRepository, OrgChart};
use tracing::{info, warn};

use crate::{
    config::{AppConfig, StorageKind},
    http::{AppState, ServeConfig},
};

#[derive(Parser, Debug)]
#[command(name = "orgchart-server", version, about = "Org chart hierarchy service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP + GraphQL server.
    Serve(ServeCommand),
    /// Run database migrations.
    #[command(subcommand)]
    Migrate(MigrateCommand),
    /// Insert the demo roster when the database is empty.
    Seed,
    /// Print the GraphQL schema SDL.
    #[command(name = "schema:print")]
    SchemaPrint {
        #[arg(long, value_name = "FILE", help = "Write to a file instead of stdout")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum MigrateCommand {
    /// Apply pending migrations.
    Up,
    /// Rollback the most recent migration.
    Down,
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, default_value_t = 8080)]
    port: u16,
    #[arg(long, help = "Allow starting even when migrations are pending")]
    allow_dirty: bool,
}

impl From<&ServeCommand> for ServeConfig {
    fn from(value: &ServeCommand) -> Self {
        ServeConfig::new(value.host, value.port)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(ObsConfig::from_env())?;
    let cli = Cli::parse();
    let app_config = Arc::new(AppConfig::load()?);
    match cli.command {
        Command::Serve(cmd) => run_server(cmd, app_config).await,
        Command::Migrate(action) => match action {
            MigrateCommand::Up => migrate_up(&app_config).await,
            MigrateCommand::Down => migrate_down(&app_config).await,
        },
        Command::Seed => run_seed(&app_config).await,
        Command::SchemaPrint { output } => schema_print(output).await,
    }
}

async fn run_seed(config: &AppConfig) -> Result<()> {
    let pool = setup_pool(config).await?;
    ensure_migrations(&pool, false).await?;
    let store = EmployeeStore::new(pool);
    let inserted = seed::seed_if_empty(&store).await?;
    info!(inserted, "seed finished");
    Ok(())
}

async fn schema_print(path: Option<PathBuf>) -> Result<()> {
    let chart = Arc::new(OrgChart::new(Arc::new(InMemoryRepository::new())));
    let sdl = graphql::build_schema(chart).sdl();
    match path {
        Some(target) => {
            std::fs::write(&target, sdl)
                .with_context(|| format!("failed to write {}", target.display()))?;
            info!(path = %target.display(), "schema written");
        }
        None => println!("{sdl}"),
    }
    Ok(())
}

async fn setup_pool(config: &AppConfig) -> Result<DbPool> {
    let settings = DatabaseSettings::default().with_default_url(config.database_url.clone());
    connect(&settings).await.map_err(Into::into)
}

async fn run_server(cmd: ServeCommand, config: Arc<AppConfig>) -> Result<()> {
    let (repository, pool): (Arc<dyn EmployeeRepository>, Option<DbPool>) = match config.storage {
        StorageKind::Database => {
            let pool = setup_pool(&config).await?;
            ensure_migrations(&pool, cmd.allow_dirty).await?;
            (Arc::new(EmployeeStore::new(pool.clone())), Some(pool))
        }
        StorageKind::Memory => {
            info!("using in-memory roster storage");
            (Arc::new(InMemoryRepository::new()), None)
        }
    };

    if config.seed_demo_data {
        seed::seed_if_empty(repository.as_ref()).await?;
    }

    let chart = Arc::new(OrgChart::open(repository).await);
    if let Some(err) = chart.view(|state| state.error().map(str::to_string)).await {
        warn!(error = %err, "initial roster load failed; serving with an empty chart");
    }

    let state = AppState {
        schema: graphql::build_schema(chart.clone()),
        chart,
        config: config.clone(),
        pool,
    };
    http::serve((&cmd).into(), state).await
}

async fn ensure_migrations(pool: &DbPool, allow_dirty: bool) -> Result<()> {
    let pending = Migrator::get_pending_migrations(pool).await?;
    if !pending.is_empty() && !allow_dirty {
        anyhow::bail!(
            "pending migrations detected; run `orgchart-server migrate up` or pass --allow-dirty"
        );
    }
    Ok(())
}

async fn migrate_up(config: &AppConfig) -> Result<()> {
    let pool = setup_pool(config).await?;
    Migrator::up(&pool, None).await?;
    info!("database migrations applied");
    Ok(())
}

async fn migrate_down(config: &AppConfig) -> Result<()> {
    let pool = setup_pool(config).await?;
    Migrator::down(&pool, Some(1)).await?;
    info!("most recent migration rolled back");
    Ok(())
}
