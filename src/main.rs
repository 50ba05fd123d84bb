// src/main.rs
mod api;
mod auth;
mod config;
mod db;
mod error;
mod importer;
mod models;
mod service;
mod upload;

use crate::config::{Config, StorageBackend};
use crate::db::{HoldingStore, MemoryStore, ScyllaStore};
use crate::service::HoldingService;
use chrono::Duration;
use env_logger::{Builder, Env};
use log::{error, info, warn};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };

    // `holdings_tracker issue-token <user_id>` prints a bearer token and exits
    let args: Vec<String> = std::env::args().collect();
    if let [_, command, user_id] = args.as_slice() {
        if command == "issue-token" {
            match auth::create_token(user_id, &config.jwt_secret, Duration::days(30)) {
                Ok(token) => println!("{}", token),
                Err(e) => error!("Failed to issue token: {}", e),
            }
            return;
        }
    }

    let store: Arc<dyn HoldingStore> = match config.storage {
        StorageBackend::Scylla => match ScyllaStore::connect(&config.scylla_node).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                error!("Failed to initialize database: {}", e);
                return;
            }
        },
        StorageBackend::Memory => {
            warn!("Using in-memory storage; holdings are lost on restart.");
            Arc::new(MemoryStore::new())
        }
    };

    info!("Starting the holdings tracker...");
    let service = Arc::new(HoldingService::new(store));
    let api = api::routes(
        service,
        Arc::new(config.jwt_secret.clone()),
        config.max_upload_bytes,
    );

    info!("Server running on http://{}", config.bind_addr);
    warp::serve(api).run(config.bind_addr).await;
}
