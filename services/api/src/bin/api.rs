//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{db, EntryListener, GeminiCorrectionAdapter, PgStore},
    config::Config,
    error::ApiError,
    web::{self, state::AppState},
};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use diary_tutor_core::EntryAnalyzer;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");
    info!(
        "GEMINI_API_KEY loaded: {}",
        if config.gemini_api_key.is_some() { "Yes" } else { "No" }
    );
    if config.trigger_token.is_none() {
        warn!("TRIGGER_TOKEN is not set. The entry-created webhook is disabled.");
    }

    // --- 2. Connect to Database & Run Migrations ---
    let pool = db::init_pool(&config.database_url).await?;
    let store = Arc::new(PgStore::new(pool.clone()));
    info!("Running database migrations...");
    store.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let corrector = Arc::new(GeminiCorrectionAdapter::new(
        config.gemini_api_key.as_deref(),
        &config.llm_base_url,
        config.correction_model.clone(),
    ));
    let analyzer = Arc::new(EntryAnalyzer::new(store.clone(), corrector));

    // --- 4. Start the Database Trigger Binding ---
    let shutdown = CancellationToken::new();
    let listener_task = {
        let listener = EntryListener::new(
            store.clone(),
            analyzer.clone(),
            config.entry_channel.clone(),
        );
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = listener.run(pool, shutdown).await {
                error!("Entry listener stopped: {:?}", e);
            }
        })
    };

    // --- 5. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(
        store.clone(),
        store,
        analyzer,
        config.clone(),
    ));

    // --- 6. Create the Web Router ---
    let mut app = web::router(app_state);
    match config.allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => {
            app = app.layer(
                CorsLayer::new()
                    .allow_origin(origin)
                    .allow_credentials(true)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]),
            );
        }
        Err(e) => warn!(
            "ALLOWED_ORIGIN '{}' is not a valid header value ({}); CORS disabled",
            config.allowed_origin, e
        ),
    }

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    if let Err(e) = listener_task.await {
        error!("Entry listener task panicked: {:?}", e);
    }

    Ok(())
}

/// Resolves on SIGINT or SIGTERM and cancels `token` so background tasks stop too.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {:?}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {:?}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, shutting down."),
        () = terminate => info!("Received SIGTERM, shutting down."),
    }
    token.cancel();
}
