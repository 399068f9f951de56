// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

use std::net::SocketAddr;
use std::sync::Arc;

use mikrotik_telemetry::{
    AppState, Config, Result, RouterOsPort, RouterPorts, Sampler, SubscriptionRegistry,
    create_router, start_collection,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Загружаем .env файл
    dotenvy::dotenv().ok();

    // Инициализация логирования
    setup_tracing();

    let config = Config::from_env();

    tracing::info!(
        "Loaded configuration for {} router(s), {} watch(es)",
        config.routers.len(),
        config.watches.len()
    );
    for router in &config.routers {
        tracing::info!("  - Router '{}' at {}", router.name, router.address);
    }
    tracing::info!(
        "Polling bounds: {:?}..{:?}, queue capacity {}",
        config.polling.min_interval,
        config.polling.max_interval,
        config.polling.queue_capacity
    );

    let mut ports = RouterPorts::new();
    for router in &config.routers {
        ports.insert(router.name.clone(), Arc::new(RouterOsPort::new(router.clone())));
    }
    if ports.is_empty() {
        tracing::warn!("No routers configured, every watch will report not_found");
    } else {
        tracing::info!("Registered {} router port(s)", ports.len());
    }

    let sampler = Sampler::new(ports, config.polling.fetch_timeout);
    let registry = SubscriptionRegistry::new(sampler, config.polling);

    // Токен завершения (graceful shutdown)
    let shutdown = CancellationToken::new();

    // Ожидание Ctrl+C / SIGTERM
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            wait_for_signal().await;
            tracing::info!("Shutdown signal received");
            shutdown.cancel();
        }
    });

    let collectors = start_collection(&registry, &config.watches, &config.polling, &shutdown);

    let addr: SocketAddr = config.server_addr.parse().map_err(|e| {
        tracing::error!("Invalid server address: {}", e);
        e
    })?;

    let state = Arc::new(AppState {
        config,
        registry: registry.clone(),
    });
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        tracing::error!("Failed to bind address: {}", e);
        e
    })?;

    tracing::info!("MikroTik Telemetry starting on {}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  - GET /health  - Health check");
    tracing::info!("  - GET /metrics - Prometheus metrics");

    // Запуск сервера с graceful shutdown
    let server_shutdown = shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            server_shutdown.cancelled().await;
            tracing::info!("HTTP server shutting down");
        })
        .await;

    // Останавливаем все сессии опроса
    shutdown.cancel();
    registry.stop().await;
    for handle in collectors {
        if let Err(e) = handle.await {
            tracing::warn!("Collector task failed: {}", e);
        }
    }
    tracing::info!("Telemetry engine stopped");

    served.map_err(|e| {
        tracing::error!("Server error: {}", e);
        e
    })?;

    Ok(())
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("Cannot listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn setup_tracing() {
    // Если RUST_LOG не установлена, используем "info" по умолчанию
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
