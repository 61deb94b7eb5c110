//! Panic containment.
//!
//! A handler that panics must not take the connection (or the process) with
//! it. The unwind is caught here and turned into a 500 envelope carrying the
//! panic message and the stack captured by the panic hook.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic::AssertUnwindSafe;
use std::sync::Once;

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use futures::FutureExt;

use crate::app::render::{Envelope, json_resp};
use crate::middleware;

thread_local! {
    static LAST_PANIC: RefCell<Option<String>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Record a backtrace for every panic on the panicking thread, then defer to
/// whatever hook was installed before.
pub fn install_panic_hook() {
    HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let trace = Backtrace::force_capture().to_string();
            let _ = LAST_PANIC.try_with(|slot| {
                if let Ok(mut slot) = slot.try_borrow_mut() {
                    *slot = Some(trace);
                }
            });
            previous(info);
        }));
    });
}

fn take_backtrace() -> Option<String> {
    LAST_PANIC
        .try_with(|slot| slot.try_borrow_mut().ok().and_then(|mut s| s.take()))
        .ok()
        .flatten()
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

pub async fn recover(req: Request, next: Next) -> Response {
    let uri = req.uri().clone();
    let defaults = middleware::cors_headers(req.headers());

    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => response,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            let trace = take_backtrace().unwrap_or_default();
            let detail = format!("{message}\n\n{trace}");

            tracing::error!(%uri, panic = %message, trace = %trace, "handler panicked");
            eprintln!("panic serving {uri}: {detail}");

            let mut response = json_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                &Envelope::new("internal server error", detail),
            );
            middleware::apply_defaults(&mut response, &defaults);
            response
        }
    }
}
