use std::{sync::Arc, time::Duration};

use sea_orm::DatabaseConnection;
use storefront_api::{
    api::app_router,
    auth::{AuthConfig, AuthService},
    config::{init_tracing, load_config},
    db::{create_schema, establish_connection},
    events::{process_events, EventSender},
    AppState,
};
use tokio::sync::mpsc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    init_tracing(config.log_level(), config.log_json);

    info!(
        environment = %config.environment,
        "Starting storefront API server"
    );

    let db: Arc<DatabaseConnection> = Arc::new(establish_connection(&config).await?);

    if config.auto_migrate {
        info!("Ensuring database schema");
        create_schema(&db).await?;
    }

    let (tx, rx) = mpsc::channel(1024);
    let event_sender = EventSender::new(tx);
    tokio::spawn(process_events(rx));

    let auth = Arc::new(AuthService::new(AuthConfig::new(
        config.jwt_secret.clone(),
        config.auth_issuer.clone(),
        config.auth_audience.clone(),
        Duration::from_secs(config.jwt_expiration),
    )));

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(db, config, event_sender, auth));

    let app = app_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install shutdown signal handler: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
