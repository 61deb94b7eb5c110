//! The route table: every path the server answers, collected before the
//! router is built so each one can also get an OPTIONS handler.

use std::collections::{BTreeMap, HashSet};

use axum::{
    Router,
    extract::Request,
    http::Method,
    routing::{MethodFilter, MethodRouter, on},
};

use crate::app::assets::WILDCARD;
use crate::app::dispatch::{Dispatcher, Endpoint, context_fn};
use crate::error::StartupError;

pub mod system;

#[derive(Default)]
pub struct RouteTable {
    routes: BTreeMap<String, MethodRouter>,
    seen: HashSet<(Method, String)>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `method path` through a dispatch endpoint.
    pub fn add_endpoint(&mut self, method: Method, path: &str, endpoint: Endpoint) -> Result<(), StartupError> {
        let filter = MethodFilter::try_from(method.clone())
            .map_err(|_| StartupError::UnsupportedMethod(method.to_string()))?;
        let auth = endpoint.requires_auth();
        let handler = on(filter, move |req: Request| endpoint.clone().call(req));

        self.add(method.clone(), path, handler)?;
        tracing::debug!(%method, path, auth, "route mounted");
        Ok(())
    }

    /// Route `method path` to a plain axum handler.
    pub fn add(&mut self, method: Method, path: &str, handler: MethodRouter) -> Result<(), StartupError> {
        check_path(path)?;
        if !self.seen.insert((method.clone(), path.to_string())) {
            return Err(StartupError::RouteConflict {
                method: method.to_string(),
                path: path.to_string(),
            });
        }

        let merged = match self.routes.remove(path) {
            Some(existing) => existing.merge(handler),
            None => handler,
        };
        self.routes.insert(path.to_string(), merged);
        Ok(())
    }

    /// Build the router, answering OPTIONS on every path with `preflight`.
    pub fn into_router(self, preflight: Endpoint) -> Router {
        self.routes
            .into_iter()
            .fold(Router::new(), |router, (path, handler)| {
                let preflight = preflight.clone();
                let handler = handler.options(move |req: Request| preflight.clone().call(req));
                router.route(&path, handler)
            })
    }
}

/// Rejects paths the router would refuse: no leading `/`, or parameter and
/// wildcard segments other than a trailing `/*filepath`.
fn check_path(path: &str) -> Result<(), StartupError> {
    let literal = path.strip_suffix(WILDCARD).unwrap_or(path);
    if !path.starts_with('/') || literal.contains([':', '*']) {
        return Err(StartupError::InvalidRoutePath(path.to_string()));
    }
    Ok(())
}

/// Mount the routes every node serves under `base`.
pub fn mount_system(table: &mut RouteTable, dispatcher: &Dispatcher, base: &str) -> Result<(), StartupError> {
    table.add_endpoint(
        Method::GET,
        &format!("{base}/health"),
        dispatcher.mw(Some(context_fn(system::health)), false),
    )?;
    table.add_endpoint(
        Method::GET,
        &format!("{base}/whoami"),
        dispatcher.mw(Some(context_fn(system::whoami)), true),
    )?;
    Ok(())
}
