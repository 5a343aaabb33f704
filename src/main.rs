// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use std::env;
use std::sync::Arc;

use foodscope_node::{api, config::NodeConfig, service::RagService, version};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    tracing::info!("Starting {}", version::get_version_string());

    let config = NodeConfig::from_env();
    tracing::info!(
        "Artifacts: index={} chunks={}",
        config.index_path.display(),
        config.chunks_path.display()
    );

    let listen_addr = config.listen_addr.clone();
    let service = Arc::new(RagService::new(config));

    // Load everything up front; a missing artifact degrades the service
    // instead of aborting startup
    let state = service.initialize().await;
    tracing::info!("Service state after startup: {}", state.as_str());

    api::serve(service, &listen_addr).await
}
