//! Debug API Gateway
//! Web API Server

use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use debug_api_gateway::api;
use debug_api_gateway::catalog::Catalog;
use debug_api_gateway::models::Settings;
use debug_api_gateway::services::{ClientRegistry, Dispatcher, FileSwap, StaticTopology};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "debug_api_gateway=debug,tower_http=debug,axum=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Debug API Gateway...");

    let settings = Settings::load().context("Failed to load configuration")?;

    // 临时文件目录，启动时清理上次遗留的文件
    let file_swap = FileSwap::new(settings.spool.dir()).context("Failed to prepare spool directory")?;
    let sweeper = file_swap.spawn_sweeper(settings.spool.sweep_interval());
    tracing::info!("Spool directory: {}", file_swap.dir().display());

    let clients = ClientRegistry::from_settings(&settings).context("Failed to build HTTP clients")?;
    let catalog = Catalog::builtin(&clients).context("Invalid endpoint catalog")?;
    let verifier = StaticTopology::verifier(&settings.topology);

    let dispatcher = Dispatcher::new(
        Arc::new(catalog),
        verifier,
        Arc::new(clients),
        file_swap.clone(),
    )
    .with_token_ttl(settings.spool.ttl());

    let app = api::create_router(Arc::new(dispatcher));

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind address {}", addr))?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("API available at http://{}/debug_api", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    sweeper.abort();
    let removed = file_swap.purge();
    tracing::info!("Shutdown complete, removed {} spool files", removed);

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
