use actix::Actor;
use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use inventory_realtime_service::{
    handlers::{
        health::SERVICE_NAME, register_health, register_insights, register_inventory,
        register_websocket,
    },
    metrics,
    services::{ExpiryScannerConfig, PgInventoryStore},
    BroadcastGateway, BroadcastHub, Config, EventPublisher, ExpiryScanner, InventoryStore,
};
use std::io;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting {}", SERVICE_NAME);

    let config = Config::from_env().map_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let store: Arc<dyn InventoryStore> = match PgInventoryStore::connect(&config.database).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to inventory store");
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "Inventory store connection failed",
            ));
        }
    };

    // Constructed here, torn down with the actix system on shutdown.
    let hub = BroadcastHub::new().start();
    let publisher: Arc<dyn EventPublisher> = Arc::new(hub.clone());
    let gateway = BroadcastGateway::new(publisher.clone());

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let scanner = Arc::new(ExpiryScanner::new(
        store,
        publisher,
        ExpiryScannerConfig::from(&config.scanner),
    ));
    let scanner_handle = scanner.spawn(shutdown_rx);

    let addr = config.bind_address();
    let allowed_origins = config.cors.allowed_origins.clone();
    tracing::info!("Starting HTTP server on {}", addr);

    HttpServer::new(move || {
        let cors = allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST"])
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(hub.clone()))
            .app_data(web::Data::new(gateway.clone()))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(metrics::MetricsMiddleware)
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .configure(|cfg| {
                register_health(cfg);
                register_websocket(cfg);
                register_inventory(cfg);
                register_insights(cfg);
            })
    })
    .bind(&addr)?
    .run()
    .await?;

    tracing::info!("HTTP server stopped, shutting down expiry scanner");
    let _ = shutdown_tx.send(());
    let _ = scanner_handle.await;

    Ok(())
}
