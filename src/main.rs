use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use visitor_tracker::analytics::build_resolver;
use visitor_tracker::api::{self, AppState};
use visitor_tracker::auth::AuthService;
use visitor_tracker::config::Config;
use visitor_tracker::logging;
use visitor_tracker::storage::open_store;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init_from_env();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        working_dir = %std::env::current_dir().unwrap_or_default().display(),
        "Loaded configuration"
    );

    // Initialize storage
    info!("Using {:?} storage", config.database.backend);
    let store = open_store(&config.database)?;
    store
        .ensure_schema()
        .await
        .context("failed to provision the visitors schema")?;
    info!("Database and table ready");

    let geo = build_resolver(&config.geo)?;
    info!("🌍 Geolocation resolver: {}", geo.name());

    let auth_service = Arc::new(AuthService::new(&config.auth));
    if auth_service.is_enabled() {
        info!("🔐 Visitor listing requires an admin API key");
    } else {
        warn!("🔓 ADMIN_API_KEYS is not set - the visitor listing is readable by anyone");
    }

    if let Some(ref static_dir) = config.frontend.static_dir {
        info!("🎨 Serving frontend from directory: {}", static_dir);
    } else {
        info!("🎨 Serving embedded frontend");
    }

    let app = api::create_router(
        AppState {
            store,
            geo,
            client_ip: config.client_ip.clone(),
        },
        auth_service,
        &config.frontend,
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("🚀 Server is running at http://{}", addr);
    info!("   - Admin page available at http://{}/admin.html", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
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
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
