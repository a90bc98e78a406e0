//! `yads-node`: the YADS REST server.
//!
//! # Quick start
//!
//! ```sh
//! # In-memory node on the default port, with the reference fixtures:
//! YADS_SEED=true yads-node
//!
//! # Persistent SQLite node:
//! YADS_DB=./yads.db yads-node
//!
//! # Custom bind address:
//! YADS_BIND=127.0.0.1:8080 yads-node
//! ```
//!
//! # Environment variables
//!
//! See [`NodeConfig`] for the full list.

use std::process::ExitCode;
use std::sync::Arc;

use yads_node::{build_router, load_fixtures, MemoryStorage, NodeConfig, SqliteStorage, Storage};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "yads_node=info,tower_http=debug".into()),
        )
        .init();

    let config = match NodeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let storage: Arc<dyn Storage> = match &config.db_path {
        Some(path) => match SqliteStorage::open(path) {
            Ok(s) => {
                tracing::info!("storage: SQLite at {path}");
                Arc::new(s)
            }
            Err(e) => {
                tracing::error!("failed to open SQLite database at {path}: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => {
            tracing::info!("storage: in-memory (data will not survive restart)");
            Arc::new(MemoryStorage::new())
        }
    };

    if config.seed {
        if let Err(e) = load_fixtures(storage.as_ref()).await {
            tracing::error!("seeding fixtures failed: {e}");
            return ExitCode::FAILURE;
        }
    }

    let bind_addr = config.bind_addr;
    let app = build_router(storage, config);

    let listener = match tokio::net::TcpListener::bind(bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("failed to bind {bind_addr}: {e}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("listening on {bind_addr}");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
