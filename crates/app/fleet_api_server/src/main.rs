//! Fleet API server binary.
//!
//! Serves the REST API over PostgreSQL when a database URL is configured,
//! otherwise over an in-memory store that lives as long as the process.

use std::sync::Arc;

use clap::Parser;
use fleet_api::AppState;
use fleet_api::config::ApiConfig;
use fleet_api::services::users::ensure_admin;
use fleet_core::store::{MemoryStore, PgStore, UserStore, VehicleStore};
use tracing::{info, warn};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "fleet_api_server", about = "Fleet API server")]
struct Args {
    /// Port to listen on (0 = ephemeral). Overrides the port in `BIND_ADDR`.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// PostgreSQL connection URL. Without one, data is kept in memory.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Lifetime of issued tokens, in seconds.
    #[arg(long, env = "TOKEN_TTL_SECS")]
    token_ttl_secs: Option<i64>,

    /// Create an admin account from `ADMIN_USERNAME` / `ADMIN_PASSWORD`
    /// if it does not already exist.
    #[arg(long, default_value_t = false)]
    bootstrap_admin: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,fleet_api=debug,fleet_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env();
    if let Some(port) = args.port {
        let host = config
            .bind_addr
            .rsplit_once(':')
            .map_or("127.0.0.1", |(host, _)| host);
        config.bind_addr = format!("{host}:{port}");
    }
    if let Some(url) = args.database_url.clone().filter(|u| !u.is_empty()) {
        config.database_url = Some(url);
    }
    if let Some(ttl) = args.token_ttl_secs {
        config.token_ttl_secs = ttl;
    }

    match config.database_url.clone() {
        Some(url) => {
            info!(max_connections = args.max_connections, "connecting to PostgreSQL");
            let store = PgStore::connect(&url, args.max_connections).await?;
            serve(config, Arc::new(store), args.bootstrap_admin).await
        }
        None => {
            warn!("no DATABASE_URL configured, using in-memory store");
            serve(config, Arc::new(MemoryStore::new()), args.bootstrap_admin).await
        }
    }
}

async fn serve<S>(
    config: ApiConfig,
    store: Arc<S>,
    bootstrap_admin: bool,
) -> Result<(), Box<dyn std::error::Error>>
where
    S: UserStore + VehicleStore + 'static,
{
    if bootstrap_admin {
        bootstrap(store.as_ref()).await?;
    }

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, store)?;
    let app = fleet_api::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    Ok(())
}

async fn bootstrap(users: &dyn UserStore) -> Result<(), Box<dyn std::error::Error>> {
    let username = std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".into());
    let Ok(password) = std::env::var("ADMIN_PASSWORD") else {
        warn!("--bootstrap-admin given but ADMIN_PASSWORD is not set, skipping");
        return Ok(());
    };
    if ensure_admin(users, &username, &password).await? {
        info!(%username, "bootstrap admin created");
    } else {
        info!(%username, "bootstrap admin already exists");
    }
    Ok(())
}
