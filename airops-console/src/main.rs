use std::sync::Arc;

use airops_console::{AppState, Console};
use airops_store::app_config::Config;
use airops_store::{DbClient, PostgresCredentialStore, PostgresMaintenanceStore, PostgresSeatStore};
use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Airline operations console.
#[derive(Parser, Debug)]
#[command(name = "airops", version, about)]
struct Args {
    /// Database name
    dbname: String,
    /// Database port
    port: u16,
    /// Database user
    user: String,
    /// Apply the bundled migrations before the menu starts
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout belongs to the menu
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "airops_console=info,airops_store=info,airops_core=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = Config::load().context("Failed to load config")?;
    config.override_connection(args.dbname, args.port, args.user);

    let db = DbClient::new(&config.database)
        .await
        .context("Failed to connect to Postgres")?;
    if args.migrate {
        db.migrate().await.context("Failed to run migrations")?;
    }

    let lock_timeout = config.allocation.lock_timeout();
    let state = AppState::new(
        Arc::new(PostgresSeatStore::new(db.pool.clone(), lock_timeout)),
        Arc::new(PostgresMaintenanceStore::new(db.pool.clone())),
        Arc::new(PostgresCredentialStore::new(db.pool.clone())),
        lock_timeout,
    );

    let mut console = Console::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout());
    airops_console::run(&state, &mut console).await?;

    tracing::info!("Console closed");
    Ok(())
}
