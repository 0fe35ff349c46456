//! Shopwright HTTP 服务
//!
//! 启动: cargo run --bin shopwright-web --features web
//! POST http://127.0.0.1:8080/api/chat {"message": "find laptops under $1000"}

#![cfg(feature = "web")]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use shopwright::config::load_config_or_default;
use shopwright::core::{create_store_from_config, OrchestratorBuilder};
use shopwright::http::{router, AppState};
use shopwright::ratelimit::AdmissionController;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    shopwright::observability::init();

    let config_path = std::env::var("SHOPWRIGHT_CONFIG").ok().map(PathBuf::from);
    let cfg = load_config_or_default(config_path);
    let bind = cfg.server.bind.clone();

    let store = create_store_from_config(&cfg).await;
    let admission = AdmissionController::from_config(&cfg, store.clone());
    let orchestrator = OrchestratorBuilder::new(cfg).with_store(store).build();

    let app = router(AppState {
        orchestrator: Arc::new(orchestrator),
        admission: Arc::new(admission),
    });

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    tracing::info!("Shopwright listening on http://{}", bind);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("Server error")?;
    Ok(())
}
