use gameboard::{
    auth::TokenConfig, router, AppConfig, AppStateBuilder, InMemoryStore, PostgresStore, Store,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gameboard=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Gameboard service");

    let config = AppConfig::from_env();

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => match PostgresStore::connect(url, config.db_max_connections).await {
            Ok(store) => {
                info!("Connected to PostgreSQL");
                Arc::new(store)
            }
            Err(e) => {
                error!(error = %e, "Failed to connect to database");
                std::process::exit(1);
            }
        },
        None => {
            warn!("DATABASE_URL not set, using the in-memory store");
            Arc::new(InMemoryStore::new())
        }
    };

    let shutdown = CancellationToken::new();
    let bind_addr = config.bind_addr.clone();
    let app_state = AppStateBuilder::new()
        .with_store(store)
        .with_token_config(TokenConfig::new())
        .with_config(config)
        .with_shutdown(shutdown.clone())
        .build();

    let app = router(app_state);

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, addr = %bind_addr, "Failed to bind");
            std::process::exit(1);
        }
    };
    info!("Server running on http://{}", bind_addr);

    let signal = shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutting down");
            signal.cancel();
        })
        .await;

    if let Err(e) = served {
        error!(error = %e, "Server error");
    }
}
