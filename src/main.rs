use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use wsrelay::{
    AppCtx, Registry, config,
    db::{
        Db,
        repo::{MemoryUserRepository, UserRepo, UserRepository},
    },
    net::http,
    services::UserService,
};

/// How long shutdown waits for sessions to finish their close handshakes.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Parser)]
#[command(name = "wsrelay", about = "Relays text messages between WebSocket clients by username")]
struct Args {
    /// TOML configuration file; environment variables are used when absent
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the configured listen address
    #[arg(long)]
    http_addr: Option<String>,

    /// Keep the identity store in memory instead of PostgreSQL
    #[arg(long)]
    memory_users: bool,

    /// Username known to the in-memory identity store (repeatable)
    #[arg(long = "seed-user", requires = "memory_users")]
    seed_users: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let args = Args::parse();
    let mut cfg = match &args.config {
        Some(path) => config::Config::load(path)?,
        None => config::Config::from_env()?,
    };
    if let Some(addr) = args.http_addr {
        cfg.http_addr = addr;
    }

    let mut db: Option<Arc<Db>> = None;
    let repo: Arc<dyn UserRepo> = if args.memory_users {
        tracing::info!(seeded = args.seed_users.len(), "using in-memory identity store");
        Arc::new(MemoryUserRepository::with_users(args.seed_users))
    } else {
        let pg = Arc::new(Db::new(&cfg.database_url, cfg.db_pool_size)?);
        pg.init().await?;
        db = Some(pg.clone());
        Arc::new(UserRepository::new(pg))
    };

    let registry = Arc::new(Registry::new());
    let users = Arc::new(UserService::new(repo));
    let ctx = AppCtx::new(registry.clone(), users, cfg.send_timeout());

    let shutdown_registry = registry.clone();
    http::serve(&cfg.http_addr, ctx, async move {
        shutdown_signal().await;
        shutdown_registry.close_all().await;
    })
    .await?;

    // Connections upgraded after the first close_all are still registered here.
    if !registry.drain(DRAIN_TIMEOUT).await {
        tracing::warn!(remaining = registry.len(), "sessions still open after shutdown timeout");
    }

    if let Some(db) = db {
        db.close();
    }
    tracing::info!("relay stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::{EnvFilter, prelude::*};

    color_eyre::install().map_err(|e| anyhow::Error::msg(e.to_string()))?;

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info,wsrelay=debug"))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::uptime()),
        )
        .with(tracing_error::ErrorLayer::default())
        .init();

    Ok(())
}
