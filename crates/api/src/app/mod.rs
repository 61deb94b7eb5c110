//! HTTP application wiring.
//!
//! - `dispatch.rs`: the adapter every API handler runs through
//! - `routes/`: the route table plus the generic node routes
//! - `triggers/`: pluggable event sources mounted under the push prefix
//! - `assets.rs`: static file serving
//! - `recover.rs` / `transcode.rs`: the outer panic and gzip layers
//! - `render.rs` / `errors.rs`: the JSON envelope and its failure modes

use std::sync::Arc;

use axum::{Router, extract::Request, http::Method, middleware::from_fn};

use floe_auth::SessionValidator;
use floe_core::Hub;

use crate::config::ServerConfig;
use crate::error::StartupError;
use crate::middleware::AuthState;

pub mod assets;
pub mod dispatch;
pub mod errors;
pub mod recover;
pub mod render;
pub mod routes;
pub mod transcode;
pub mod triggers;

use dispatch::Dispatcher;
use routes::RouteTable;
use triggers::Trigger;

/// Build the full HTTP router.
///
/// Fails before anything is served if a route is malformed or claimed twice.
pub fn build_app(
    config: &ServerConfig,
    hub: Arc<Hub>,
    sessions: Arc<dyn SessionValidator>,
    triggers: &[Arc<dyn Trigger>],
) -> Result<Router, StartupError> {
    recover::install_panic_hook();

    let auth = AuthState {
        sessions,
        admin: config.admin_token.clone(),
        session_lifetime: config.session_lifetime,
    };
    let queue = hub.queue();
    let dispatcher = Dispatcher::new(hub, auth);

    let mut table = RouteTable::new();
    routes::mount_system(&mut table, &dispatcher, &config.base_path)?;
    triggers::mount(&mut table, &dispatcher, &config.trigger_base(), triggers, &queue)?;

    for (path, handler) in assets::serve_files(&config.asset_path, &config.web_root)?.routes {
        table.add(Method::GET, &path, handler)?;
    }

    let preflight = dispatcher.mw(None, false);
    let fallback_preflight = preflight.clone();

    Ok(table
        .into_router(preflight)
        .fallback(move |req: Request| routes::system::fallback(fallback_preflight.clone(), req))
        .layer(from_fn(recover::recover))
        .layer(from_fn(transcode::transcode)))
}
