//! The dispatch adapter: turns a context-aware handler into a routed endpoint.
//!
//! ```text
//! request ─▶ log + CORS ─▶ [session resolver] ─▶ RequestContext ─▶ handler
//!                                                                    │
//!           response ◀─ cookie refresh ◀─ envelope (Rendered) ◀──────┘
//!                                        or as-is  (Delegated)
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    RequestPartsExt,
    extract::{Path, Request},
    http::{Method, StatusCode, Uri},
    response::Response,
};
use serde::Serialize;

use floe_core::Hub;

use crate::app::errors::encode_failure;
use crate::app::render::{Envelope, json_resp};
use crate::context::{RequestContext, RouteParams};
use crate::middleware::{self, AuthState};

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A business handler that sees the per-request context.
pub type ContextFn = Arc<dyn Fn(Request, RequestContext) -> BoxFuture<DispatchResult> + Send + Sync>;

/// Box an async fn or closure as a [`ContextFn`].
pub fn context_fn<F, Fut>(f: F) -> ContextFn
where
    F: Fn(Request, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DispatchResult> + Send + 'static,
{
    Arc::new(move |req, ctx| Box::pin(f(req, ctx)))
}

/// What a handler hands back to the adapter.
#[derive(Debug)]
pub enum DispatchResult {
    /// The handler built the whole response itself.
    Delegated(Response),
    /// The adapter renders `{Message, Payload}` with `code`.
    Rendered {
        code: StatusCode,
        message: String,
        payload: serde_json::Value,
    },
}

impl DispatchResult {
    pub fn rendered(code: StatusCode, message: impl Into<String>, payload: impl Serialize) -> Self {
        match serde_json::to_value(payload) {
            Ok(payload) => Self::Rendered {
                code,
                message: message.into(),
                payload,
            },
            Err(err) => Self::Delegated(encode_failure(&err)),
        }
    }

    /// 200 with the default `"OK"` message.
    pub fn ok(payload: impl Serialize) -> Self {
        Self::rendered(StatusCode::OK, "", payload)
    }

    pub fn fail(code: StatusCode, message: impl Into<String>) -> Self {
        Self::rendered(code, message, serde_json::Value::Null)
    }

    fn into_response(self) -> Response {
        match self {
            Self::Delegated(response) => response,
            Self::Rendered {
                code,
                mut message,
                payload,
            } => {
                if code == StatusCode::OK && message.is_empty() {
                    message = "OK".to_string();
                }
                json_resp(code, &Envelope::new(message, payload))
            }
        }
    }
}

/// Shared by every endpoint: the service handle and the session resolver.
#[derive(Clone)]
pub struct Dispatcher {
    hub: Arc<Hub>,
    auth: AuthState,
}

impl Dispatcher {
    pub fn new(hub: Arc<Hub>, auth: AuthState) -> Self {
        Self { hub, auth }
    }

    /// Wrap `handler` into an endpoint. `None` builds the preflight-only
    /// endpoint used for OPTIONS.
    pub fn mw(&self, handler: Option<ContextFn>, auth: bool) -> Endpoint {
        Endpoint {
            dispatcher: self.clone(),
            handler,
            auth,
        }
    }

    async fn dispatch(&self, handler: Option<&ContextFn>, auth: bool, req: Request) -> Response {
        let log = RequestLog::start(req.method(), req.uri());
        let defaults = middleware::cors_headers(req.headers());

        // No handler: the OPTIONS catch-all, the CORS headers are the answer.
        let Some(handler) = handler else {
            let mut response = json_resp(StatusCode::OK, "ok");
            middleware::apply_defaults(&mut response, &defaults);
            return log.finish(response);
        };

        let session = if auth {
            match self.auth.authenticate(req.headers()) {
                Ok(session) => Some(session),
                Err(mut response) => {
                    middleware::apply_defaults(&mut response, &defaults);
                    return log.finish(response);
                }
            }
        } else {
            None
        };
        let token = session.as_ref().map(|s| s.token().to_string());

        let (mut parts, body) = req.into_parts();
        let params: RouteParams = parts
            .extract::<Path<RouteParams>>()
            .await
            .map(|Path(params)| params)
            .unwrap_or_default();
        let req = Request::from_parts(parts, body);

        let ctx = RequestContext::new(params, session, Arc::clone(&self.hub));
        let mut response = handler(req, ctx).await.into_response();

        middleware::apply_defaults(&mut response, &defaults);
        if let Some(token) = token {
            middleware::refresh_cookie(response.headers_mut(), &token, self.auth.session_lifetime);
        }
        log.finish(response)
    }
}

/// A routed handler produced by [`Dispatcher::mw`].
#[derive(Clone)]
pub struct Endpoint {
    dispatcher: Dispatcher,
    handler: Option<ContextFn>,
    auth: bool,
}

impl Endpoint {
    pub fn requires_auth(&self) -> bool {
        self.auth
    }

    pub async fn call(self, req: Request) -> Response {
        self.dispatcher
            .dispatch(self.handler.as_ref(), self.auth, req)
            .await
    }
}

/// Brackets a request in the log. The closing line is written on drop, so it
/// appears even when the handler unwinds.
struct RequestLog {
    started: Instant,
    method: Method,
    uri: Uri,
    status: Option<StatusCode>,
}

impl RequestLog {
    fn start(method: &Method, uri: &Uri) -> Self {
        tracing::debug!(%method, %uri, "req");
        Self {
            started: Instant::now(),
            method: method.clone(),
            uri: uri.clone(),
            status: None,
        }
    }

    fn finish(mut self, response: Response) -> Response {
        self.status = Some(response.status());
        response
    }
}

impl Drop for RequestLog {
    fn drop(&mut self) {
        tracing::debug!(
            elapsed = ?self.started.elapsed(),
            method = %self.method,
            status = self.status.map(|s| s.as_u16()).unwrap_or(0),
            uri = %self.uri,
            "rsp"
        );
    }
}
