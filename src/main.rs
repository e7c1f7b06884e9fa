use amplifi_connector::amplifi::AmplifiConnector;
use amplifi_connector::api::{cors_layer, create_router, AppState};
use amplifi_connector::auth::JwtKeys;
use amplifi_connector::config::{self, Settings};
use amplifi_connector::users::UserStore;
use anyhow::{Context, Result};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "amplifi_connector=info,tower_http=info".into()),
        )
        .init();

    info!("Amplifi Connector starting...");

    let settings = load_settings()?;

    info!(
        port = settings.server.port,
        api_url = %settings.amplifi.api_url,
        token_cache = %settings.amplifi.token_cache_path,
        database = %settings.database.path,
        "Configuration loaded"
    );

    let users = Arc::new(
        UserStore::new(&settings.database.path).context("Failed to open user database")?,
    );
    info!("User store initialized");

    let connector = Arc::new(
        AmplifiConnector::new(&settings.amplifi)
            .context("Failed to initialize Amplifi connector")?,
    );

    let state = AppState {
        connector,
        users,
        jwt: JwtKeys::new(
            &settings.auth.secret_key,
            settings.auth.access_token_expire_minutes,
        ),
    };

    let router = create_router(state)
        .layer(cors_layer(&settings.server))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", settings.server.port))
        .await
        .context("Failed to bind API port")?;
    info!(port = settings.server.port, "Amplifi Connector listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")?;

    info!("Amplifi Connector stopped");
    Ok(())
}

/// TOML file when AMPLIFI_CONNECTOR_CONFIG is set, otherwise the environment.
fn load_settings() -> Result<Settings> {
    match std::env::var("AMPLIFI_CONNECTOR_CONFIG") {
        Ok(path) => config::load_config(&path)
            .with_context(|| format!("Failed to load configuration from {}", path)),
        Err(_) => config::from_env().context("Failed to load configuration from environment"),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
