//! gRPC server initialization and lifecycle management
//!
//! This module handles all server setup:
//! - Tracing initialization
//! - Store creation (image directory included)
//! - gRPC server configuration and startup
//! - Health check service (grpc.health.v1.Health)

use std::future::Future;
use std::sync::Arc;

use core_config::{Environment, FromEnv};
use domain_catalog::{DiskImageStore, InMemoryLaptopStore, InMemoryRatingStore};
use eyre::{Result, WrapErr};
use rpc::catalog::laptop_service_server::{LaptopServiceServer, SERVICE_NAME};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::codec::CompressionEncoding;
use tonic::transport::Server;
use tonic_health::server::health_reporter;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::CatalogConfig;
use crate::service::LaptopServiceImpl;

/// Run the gRPC server
///
/// 1. Sets up structured logging (JSON for prod, pretty for dev)
/// 2. Loads [`CatalogConfig`] from the environment
/// 3. Binds the listener and serves until Ctrl+C
///
/// # Errors
///
/// Returns an error if configuration is invalid, the image directory cannot
/// be created, binding fails or the server stops with an error.
pub async fn run() -> Result<()> {
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    let config = CatalogConfig::from_env().wrap_err("Failed to load catalog configuration")?;
    let addr = config.addr().wrap_err("Failed to parse server address")?;

    let listener = TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("Failed to bind {}", addr))?;
    info!("LaptopService listening on {}", addr);

    serve(config, listener, shutdown_signal()).await
}

/// Wire the stores into a [`LaptopServiceImpl`] as configured.
pub async fn build_service(config: &CatalogConfig) -> Result<LaptopServiceImpl> {
    let laptops = InMemoryLaptopStore::new().with_scan_delay(config.scan_delay);
    let images = DiskImageStore::create(&config.image_dir)
        .await
        .wrap_err_with(|| {
            format!(
                "Failed to create image directory {}",
                config.image_dir.display()
            )
        })?;
    info!(image_dir = %config.image_dir.display(), "Image store ready");

    Ok(LaptopServiceImpl::new(
        Arc::new(laptops),
        Arc::new(images),
        Arc::new(InMemoryRatingStore::new()),
    )
    .with_max_image_size(config.max_image_size)
    .with_stream_buffer(config.stream_buffer))
}

/// Serve the catalog on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(config: CatalogConfig, listener: TcpListener, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let service = build_service(&config).await?;

    let mut laptop_service = LaptopServiceServer::new(service);
    if config.compression {
        // zstd in both directions; clients that don't ask for it get plain frames
        laptop_service = laptop_service
            .accept_compressed(CompressionEncoding::Zstd)
            .send_compressed(CompressionEncoding::Zstd);
        info!("Using Zstd compression");
    }

    let (health_reporter, health_service) = health_reporter();
    health_reporter
        .set_service_status(SERVICE_NAME, tonic_health::ServingStatus::Serving)
        .await;
    // Empty service name is what generic health probes ask for
    health_reporter
        .set_service_status("", tonic_health::ServingStatus::Serving)
        .await;
    info!("Health check service enabled (grpc.health.v1.Health)");

    Server::builder()
        .layer(TraceLayer::new_for_grpc())
        .add_service(health_service)
        .add_service(laptop_service)
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
        .await
        .wrap_err("gRPC server failed")?;

    info!("LaptopService stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for Ctrl+C, shutting down");
    }
    info!("Shutdown signal received");
}
