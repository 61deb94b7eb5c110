use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;

use floe_api::{app, config::ServerConfig};
use floe_auth::MemorySessionStore;
use floe_core::{Hub, Queue};

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    floe_observability::init();

    let config = ServerConfig::from_env().context("invalid configuration")?;
    if config.admin_token.is_none() {
        tracing::warn!("FLOE_ADMIN_TOKEN not set; peer admin access disabled");
    }

    let queue = Arc::new(Queue::new());
    let hub = Arc::new(Hub::new(config.host_name.clone(), config.tags.clone(), Arc::clone(&queue)));
    let sessions = Arc::new(MemorySessionStore::new(config.session_lifetime));

    // Until an engine is attached, accepted events only go to the log.
    let events = queue.subscribe();
    tokio::task::spawn_blocking(move || {
        while let Ok(event) = events.recv() {
            tracing::info!(event_id = %event.id, tag = %event.tag, host = %event.host, "event accepted");
        }
    });

    let purged_from = Arc::clone(&sessions);
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(PURGE_INTERVAL);
        loop {
            tick.tick().await;
            let purged = purged_from.purge_expired(Utc::now());
            if purged > 0 {
                tracing::debug!(purged, "expired sessions dropped");
            }
        }
    });

    let triggers = app::triggers::builtin(&hub);
    let router = app::build_app(&config, hub, sessions, &triggers).context("failed to build router")?;

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!(addr = %listener.local_addr()?, base = %config.base_path, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
        .context("server error")
}
