//! Server mode
//!
//! Starts the HTTP server with all routes and, when enabled, the background
//! aggregation task.

use actix_web::{
    App, HttpServer,
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::analytics::AggregationScheduler;
use crate::api::services::{AppStartTime, configure};
use crate::runtime::lifetime;

/// Run the HTTP server
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server() -> Result<()> {
    let app_start_time = AppStartTime {
        start_datetime: chrono::Utc::now(),
    };

    let startup = lifetime::startup::prepare_startup().await.map_err(|e| {
        tracing::error!("Server startup failed: {}", e);
        e
    })?;

    let config = crate::config::get_config();

    let scheduler_handle = if config.aggregation.enabled {
        let scheduler = Arc::new(AggregationScheduler::new(
            startup.aggregation.clone(),
            &config.aggregation,
        ));
        Some(scheduler.spawn_background_task())
    } else {
        info!("Background aggregation disabled");
        None
    };

    let storage = startup.storage.clone();
    let rankings = startup.rankings.clone();
    let view_statistics = startup.view_statistics.clone();

    let cpu_count = config.server.cpu_count.clamp(1, 32);
    warn!("Using {} CPU cores for the server", cpu_count);

    // Clone db reference before storage moves into HttpServer closure
    let db_for_shutdown = storage.get_db().clone();

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    let server = HttpServer::new(move || {
        App::new()
            .wrap(Compress::default())
            .wrap(DefaultHeaders::new().add(("Connection", "keep-alive")))
            .app_data(web::Data::new(storage.clone()))
            .app_data(web::Data::new(rankings.clone()))
            .app_data(web::Data::new(view_statistics.clone()))
            .app_data(web::Data::new(app_start_time.clone()))
            .configure(configure)
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .workers(cpu_count)
    .disable_signals()
    .bind(&bind_address)?;

    warn!("Starting server at http://{}", bind_address);
    let server = server.run();
    let server_handle = server.handle();

    // Wait for server or shutdown signal
    tokio::select! {
        res = server => {
            res?;
        }
        _ = lifetime::shutdown::listen_for_shutdown(&db_for_shutdown) => {
            server_handle.stop(true).await;
            warn!("Graceful shutdown completed");
        }
    }

    if let Some(handle) = scheduler_handle {
        handle.abort();
    }

    Ok(())
}
