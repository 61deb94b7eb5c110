use axum::{
    extract::Request,
    http::{Method, StatusCode},
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app::dispatch::{DispatchResult, Endpoint};
use crate::app::render::{Envelope, json_resp};
use crate::context::RequestContext;
use crate::middleware;

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Health<'a> {
    host: &'a str,
    tags: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct WhoAmI<'a> {
    user: &'a str,
    last_active: DateTime<Utc>,
}

pub async fn health(_req: Request, ctx: RequestContext) -> DispatchResult {
    let hub = ctx.hub();
    DispatchResult::ok(Health {
        host: hub.host_name(),
        tags: hub.tags(),
    })
}

pub async fn whoami(_req: Request, ctx: RequestContext) -> DispatchResult {
    match ctx.session() {
        Some(session) => DispatchResult::ok(WhoAmI {
            user: session.user(),
            last_active: session.last_active(),
        }),
        None => DispatchResult::fail(StatusCode::UNAUTHORIZED, "missing session"),
    }
}

/// Anything no route claimed: preflight for OPTIONS, 404 otherwise.
pub async fn fallback(preflight: Endpoint, req: Request) -> Response {
    if req.method() == Method::OPTIONS {
        return preflight.call(req).await;
    }

    tracing::debug!(method = %req.method(), uri = %req.uri(), "no route");
    let mut response = json_resp(StatusCode::NOT_FOUND, &Envelope::message("not found"));
    middleware::apply_defaults(&mut response, &middleware::cors_headers(req.headers()));
    response
}
