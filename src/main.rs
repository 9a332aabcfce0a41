use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use forum_hub::{health_check, AppError, AppState, Settings, WebSocketServer};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[actix_web::main]
async fn main() -> forum_hub::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();

    // Load configuration
    let config = Settings::new()?;
    info!("Configuration loaded successfully ({})", config.environment);

    // Initialize application state; the fan-out engine runs once per process
    let (state, engine) = AppState::connect(config.clone()).await?;
    tokio::spawn(engine.run());

    // Create and bind the WebSocket listener
    let listener = TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    let ws_server = Arc::new(WebSocketServer::new(state.clone()));
    tokio::spawn(ws_server.run(listener));

    info!(
        "Health endpoint available at http://{}:{}/health",
        config.server.host, config.server.health_port
    );

    let state = web::Data::new(state);

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/health", web::get().to(health_check))
    })
    .bind((config.server.host.as_str(), config.server.health_port))?
    .workers(config.server.workers as usize)
    .run()
    .await
    .map_err(|e| AppError::InternalError(e.to_string()))?;

    Ok(())
}
