//! Static file serving under a wildcard route.

use std::path::PathBuf;

use axum::{
    body::Body,
    extract::Request,
    http::{StatusCode, Uri, uri::PathAndQuery},
    response::{Redirect, Response},
    routing::{MethodRouter, get},
};
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::app::render::{Envelope, json_resp};
use crate::error::StartupError;

/// Required suffix of every static route.
pub const WILDCARD: &str = "/*filepath";

/// A mounted directory: every route it needs, with its handler.
///
/// The wildcard never matches an empty tail, so the mount root (`/app/`) is
/// routed separately and the bare prefix (`/app`) redirects to it.
pub struct StaticMount {
    pub routes: Vec<(String, MethodRouter)>,
}

/// Serve `root` under `path`, which must end with [`WILDCARD`].
pub fn serve_files(path: &str, root: impl Into<PathBuf>) -> Result<StaticMount, StartupError> {
    let Some(prefix) = path.strip_suffix(WILDCARD) else {
        return Err(StartupError::InvalidStaticPath(path.to_string()));
    };
    if !path.starts_with('/') {
        return Err(StartupError::InvalidRoutePath(path.to_string()));
    }
    let dir = ServeDir::new(root.into());

    let strip = prefix.to_string();
    let files = get(move |req: Request| {
        let dir = dir.clone();
        let strip = strip.clone();
        async move { serve(dir, &strip, req).await }
    });

    let index = format!("{prefix}/");
    let mut routes = vec![(path.to_string(), files.clone()), (index.clone(), files)];
    if !prefix.is_empty() {
        let redirect = get(move || {
            let index = index.clone();
            async move { Redirect::permanent(&index) }
        });
        routes.push((prefix.to_string(), redirect));
    }

    Ok(StaticMount { routes })
}

async fn serve(dir: ServeDir, prefix: &str, mut req: Request) -> Response {
    match strip_prefix(req.uri(), prefix) {
        Some(uri) => *req.uri_mut() = uri,
        None => return json_resp(StatusCode::BAD_REQUEST, &Envelope::message("bad path")),
    }

    match dir.oneshot(req).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}

/// The request URI relative to the mount point, query string kept.
fn strip_prefix(uri: &Uri, prefix: &str) -> Option<Uri> {
    let rest = uri.path().strip_prefix(prefix)?;
    let rest = if rest.starts_with('/') {
        rest.to_string()
    } else {
        format!("/{rest}")
    };
    let path_and_query = match uri.query() {
        Some(query) => format!("{rest}?{query}"),
        None => rest,
    };
    let path_and_query = path_and_query.parse::<PathAndQuery>().ok()?;
    Uri::builder().path_and_query(path_and_query).build().ok()
}
