//! callboard-ps (Profile Schema) - Dynamic profile schema service
//!
//! Serves the field/option registries, resolved form schemas and stored
//! values for talent profiles and studios. Part of the Callboard platform.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use callboard_common::api::auth::load_shared_secret;
use callboard_common::config::{RootFolderInitializer, RootFolderResolver};
use callboard_common::db::init_database;
use callboard_ps::{build_router, AppState};

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "callboard-ps", about = "Callboard profile schema service")]
struct Args {
    /// Root folder holding callboard.db (overrides env and config file)
    #[arg(long)]
    root_folder: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init, before any
    // database delays
    info!(
        "Starting Callboard Profile Schema (callboard-ps) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let resolver = RootFolderResolver::new("profile-schema").with_cli_arg(args.root_folder);
    let root_folder = resolver.resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    // Load shared secret for admin API authentication
    let shared_secret = match load_shared_secret(&pool).await {
        Ok(secret) => {
            if secret == 0 {
                info!("Admin API authentication disabled (shared_secret = 0)");
            } else {
                info!("✓ Loaded shared secret for admin API authentication");
            }
            secret
        }
        Err(e) => {
            error!("Failed to load shared secret: {}", e);
            return Err(anyhow::anyhow!("{}", e));
        }
    };

    let cache_enabled: bool = sqlx::query_scalar::<_, String>(
        "SELECT value FROM settings WHERE key = 'schema_cache_enabled'",
    )
    .fetch_optional(&pool)
    .await?
    .map(|v| v == "true")
    .unwrap_or(true);

    let port: u16 = sqlx::query_scalar::<_, String>(
        "SELECT value FROM settings WHERE key = 'ps_listen_port'",
    )
    .fetch_optional(&pool)
    .await?
    .and_then(|v| v.parse().ok())
    .unwrap_or(5730);

    let state = AppState::new(pool, shared_secret, cache_enabled);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!("callboard-ps listening on http://127.0.0.1:{}", port);
    info!("Health check: http://127.0.0.1:{}/health", port);

    axum::serve(listener, app).await?;

    Ok(())
}
