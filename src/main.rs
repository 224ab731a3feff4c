// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{env, net::SocketAddr, path::Path};

use nexus_ledger_server::api::router;
use nexus_ledger_server::config::{DATA_DIR_ENV, DEFAULT_DATA_DIR, LEDGER_DB_FILE};
use nexus_ledger_server::state::AppState;
use nexus_ledger_server::storage::LedgerDb;

#[tokio::main]
async fn main() {
    init_tracing();

    // Open (or create) the ledger database
    let data_dir = env::var(DATA_DIR_ENV).unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
    let db_path = Path::new(&data_dir).join(LEDGER_DB_FILE);
    let ledger = LedgerDb::open(&db_path).expect("Failed to open ledger database");
    tracing::info!(path = %db_path.display(), "Ledger database ready");

    let state = AppState::new(ledger);
    let app = router(state);

    // Parse bind address
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .expect("Failed to parse bind address");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind server address");

    tracing::info!(%addr, "Nexus ledger server listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed");
}

/// Install the tracing subscriber. `LOG_FORMAT=json` switches to JSON
/// output for log aggregation; the default is human-readable.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=debug"));

    match env::var("LOG_FORMAT").as_deref() {
        Ok("json") => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install ctrl-c handler");
    tracing::info!("Shutdown signal received");
}
