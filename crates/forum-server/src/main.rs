mod config;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use forum_api::password::Argon2Scheme;
use forum_api::sessions::run_sweep_loop;
use forum_api::state::AppStateInner;
use forum_db::Database;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;

const DEFAULT_CATEGORIES: &[&str] = &["General", "Technology", "Sports", "Entertainment", "Science"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "forum=debug,forum_api=debug,forum_db=info,tower_http=debug".into()
            }),
        )
        .init();

    // Store is mandatory; failing to open it ends startup.
    let db = Database::open(&config.db_path)
        .with_context(|| format!("opening database at {}", config.db_path.display()))?;
    let seeded = db.ensure_categories(DEFAULT_CATEGORIES)?;
    if seeded > 0 {
        info!("Seeded {} default categories", seeded);
    }
    let db = Arc::new(db);

    let state = AppStateInner::new(
        db,
        Arc::new(Argon2Scheme),
        config.session_ttl,
        config.cookie_secure,
    )?;
    if !config.cookie_secure {
        warn!("FORUM_COOKIE_SECURE=false: session cookies will be sent over plain HTTP");
    }

    tokio::spawn(run_sweep_loop(state.sessions.clone(), config.sweep_interval));

    let app = with_server_layers(forum_api::router(state), config.request_timeout);

    info!("Forum server listening on {}", config.bind_address);
    info!(
        "Sessions last {} hours, swept every {} seconds, requests time out after {} seconds",
        config.session_ttl.as_secs() / 3600,
        config.sweep_interval.as_secs(),
        config.request_timeout.as_secs()
    );

    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

/// Request deadline and tracing around the forum routes. A request that
/// runs past `timeout` is answered with 408.
fn with_server_layers(app: Router, timeout: Duration) -> Router {
    app.layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
