//! Triggers: external event sources that own a flat sub-path under the push
//! prefix and answer GET and/or POST there.
//!
//! A trigger hands back raw handlers that build their own response. The
//! registry runs them through the dispatch adapter, so they still get CORS,
//! logging, authentication and transcoding.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use axum::{extract::Request, http::Method, response::Response};

use floe_core::{Hub, Queue};

use crate::app::dispatch::{BoxFuture, ContextFn, DispatchResult, Dispatcher, context_fn};
use crate::app::routes::RouteTable;
use crate::context::RouteParams;
use crate::error::StartupError;

pub mod data;

pub use data::DataTrigger;

/// A handler that writes the complete response itself.
pub type RawHandler = Arc<dyn Fn(Request, RouteParams) -> BoxFuture<Response> + Send + Sync>;

pub fn raw_handler<F, Fut>(f: F) -> RawHandler
where
    F: Fn(Request, RouteParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |req, params| Box::pin(f(req, params)))
}

pub trait Trigger: Send + Sync {
    /// Literal path below the push prefix, e.g. `data`.
    fn sub_path(&self) -> &str;

    fn requires_auth(&self) -> bool;

    fn get_handler(&self, _queue: Arc<Queue>) -> Option<RawHandler> {
        None
    }

    fn post_handler(&self, _queue: Arc<Queue>) -> Option<RawHandler> {
        None
    }
}

/// The triggers every node runs.
pub fn builtin(hub: &Hub) -> Vec<Arc<dyn Trigger>> {
    vec![Arc::new(DataTrigger::new(hub.host_name()))]
}

fn adapt_raw(raw: RawHandler) -> ContextFn {
    context_fn(move |req, ctx| {
        let raw = Arc::clone(&raw);
        async move { DispatchResult::Delegated(raw(req, ctx.into_params()).await) }
    })
}

fn normalize(sub_path: &str) -> Result<String, StartupError> {
    let path = sub_path.trim_start_matches('/');
    let literal = !path.is_empty()
        && !path.contains("//")
        && !path.contains(|c: char| c == ':' || c == '*' || c.is_whitespace());
    if !literal {
        return Err(StartupError::InvalidTriggerPath(sub_path.to_string()));
    }
    Ok(path.to_string())
}

/// Mount every trigger in `triggers` under `base`.
pub fn mount(
    table: &mut RouteTable,
    dispatcher: &Dispatcher,
    base: &str,
    triggers: &[Arc<dyn Trigger>],
    queue: &Arc<Queue>,
) -> Result<(), StartupError> {
    let mut claimed = HashSet::new();

    for trigger in triggers {
        let sub_path = normalize(trigger.sub_path())?;
        if !claimed.insert(sub_path.clone()) {
            return Err(StartupError::DuplicateTrigger(sub_path));
        }

        let get = trigger.get_handler(Arc::clone(queue));
        let post = trigger.post_handler(Arc::clone(queue));
        if get.is_none() && post.is_none() {
            return Err(StartupError::EmptyTrigger(sub_path));
        }

        let path = format!("{}/{}", base.trim_end_matches('/'), sub_path);
        let auth = trigger.requires_auth();
        for (method, raw) in [(Method::GET, get), (Method::POST, post)] {
            if let Some(raw) = raw {
                table.add_endpoint(method, &path, dispatcher.mw(Some(adapt_raw(raw)), auth))?;
            }
        }
        tracing::info!(path = %path, auth, "trigger mounted");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{StatusCode, header},
        response::IntoResponse,
    };
    use chrono::Duration;
    use floe_auth::MemorySessionStore;
    use tower::ServiceExt;

    use crate::middleware::AuthState;

    struct Echo {
        path: &'static str,
        auth: bool,
        get: bool,
        post: bool,
    }

    impl Echo {
        fn at(path: &'static str) -> Self {
            Self {
                path,
                auth: false,
                get: true,
                post: false,
            }
        }
    }

    impl Trigger for Echo {
        fn sub_path(&self) -> &str {
            self.path
        }

        fn requires_auth(&self) -> bool {
            self.auth
        }

        fn get_handler(&self, _queue: Arc<Queue>) -> Option<RawHandler> {
            self.get.then(|| {
                raw_handler(|req: Request, _params| async move {
                    (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain")], req.uri().path().to_string())
                        .into_response()
                })
            })
        }

        fn post_handler(&self, _queue: Arc<Queue>) -> Option<RawHandler> {
            self.post
                .then(|| raw_handler(|_req, _params| async { StatusCode::CREATED.into_response() }))
        }
    }

    fn setup() -> (RouteTable, Dispatcher, Arc<Queue>) {
        let queue = Arc::new(Queue::new());
        let hub = Arc::new(Hub::new("h1", vec![], Arc::clone(&queue)));
        let dispatcher = Dispatcher::new(
            hub,
            AuthState {
                sessions: Arc::new(MemorySessionStore::new(Duration::hours(1))),
                admin: None,
                session_lifetime: Duration::hours(1),
            },
        );
        (RouteTable::new(), dispatcher, queue)
    }

    #[tokio::test]
    async fn raw_handlers_are_delegated_with_cors() {
        let (mut table, d, queue) = setup();
        let triggers: Vec<Arc<dyn Trigger>> = vec![Arc::new(Echo {
            post: true,
            ..Echo::at("echo")
        })];
        mount(&mut table, &d, "/api/push/", &triggers, &queue).unwrap();
        let app = table.into_router(d.mw(None, false));

        let resp = app
            .clone()
            .oneshot(axum::http::Request::get("/api/push/echo").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/plain");
        assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"/api/push/echo");

        let resp = app
            .oneshot(axum::http::Request::post("/api/push/echo").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn auth_policy_is_per_trigger() {
        let (mut table, d, queue) = setup();
        let triggers: Vec<Arc<dyn Trigger>> = vec![Arc::new(Echo {
            auth: true,
            ..Echo::at("secret")
        })];
        mount(&mut table, &d, "/api/push/", &triggers, &queue).unwrap();
        let app = table.into_router(d.mw(None, false));

        let resp = app
            .oneshot(axum::http::Request::get("/api/push/secret").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn colliding_sub_paths_are_rejected() {
        let (mut table, d, queue) = setup();
        let triggers: Vec<Arc<dyn Trigger>> = vec![Arc::new(Echo::at("x")), Arc::new(Echo::at("/x"))];

        let err = mount(&mut table, &d, "/api/push/", &triggers, &queue).unwrap_err();
        assert!(matches!(err, StartupError::DuplicateTrigger(p) if p == "x"));
    }

    #[test]
    fn triggers_without_handlers_are_rejected() {
        let (mut table, d, queue) = setup();
        let triggers: Vec<Arc<dyn Trigger>> = vec![Arc::new(Echo {
            get: false,
            ..Echo::at("idle")
        })];

        let err = mount(&mut table, &d, "/api/push/", &triggers, &queue).unwrap_err();
        assert!(matches!(err, StartupError::EmptyTrigger(_)));
    }

    #[test]
    fn sub_paths_must_be_literal() {
        for bad in ["", "/", ":id", "files/*rest", "a//b", "has space"] {
            assert!(
                matches!(normalize(bad), Err(StartupError::InvalidTriggerPath(_))),
                "{bad:?}"
            );
        }
        assert_eq!(normalize("/github/hook").unwrap(), "github/hook");
    }
}
