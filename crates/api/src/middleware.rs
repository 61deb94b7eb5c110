use std::sync::Arc;

use axum::{
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::{DateTime, Duration, Utc};
use time::OffsetDateTime;

use floe_auth::{AdminToken, Session, SessionValidator, pick_token, resolve_session};

use crate::app::render::{Envelope, json_resp};

/// Header carrying a bearer token from peers and API clients.
pub const AUTH_HEADER: &str = "x-floe-auth";

/// Cookie carrying the browser session token.
pub const COOKIE_NAME: &str = "floe-sesh";

const ALLOWED_METHODS: &str = "POST, GET, PUT, OPTIONS, DELETE";

/// Everything the session resolver needs, fixed at startup.
#[derive(Clone)]
pub struct AuthState {
    pub sessions: Arc<dyn SessionValidator>,
    pub admin: Option<AdminToken>,
    /// Sliding lifetime written into every refreshed cookie.
    pub session_lifetime: Duration,
}

impl AuthState {
    /// Resolve the caller's session.
    ///
    /// On failure the returned `Err` is the complete 401 response; the caller
    /// sends it as-is.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Session, Response> {
        let header = headers.get(AUTH_HEADER).and_then(|v| v.to_str().ok());
        let token = pick_token(header, || session_cookie(headers));

        resolve_session(token.as_deref(), self.admin.as_ref(), self.sessions.as_ref(), Utc::now())
            .map_err(|failure| {
                tracing::debug!(%failure, "request not authenticated");
                json_resp(StatusCode::UNAUTHORIZED, &Envelope::message(failure.to_string()))
            })
    }
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    tracing::debug!("no auth header, checking cookie");
    let jar = CookieJar::from_headers(headers);
    match jar.get(COOKIE_NAME) {
        Some(cookie) => Some(cookie.value().to_string()),
        None => {
            tracing::debug!("no session cookie");
            None
        }
    }
}

/// `Set-Cookie` value renewing the session for another `lifetime` from `now`.
pub fn session_cookie_header(token: &str, lifetime: Duration, now: DateTime<Utc>) -> Option<HeaderValue> {
    let expires = now + lifetime;
    // Round up so the cookie never expires before now + lifetime.
    let secs = expires.timestamp() + i64::from(expires.timestamp_subsec_nanos() > 0);
    let expires = OffsetDateTime::from_unix_timestamp(secs).ok()?;

    let cookie = Cookie::build((COOKIE_NAME, token.to_string()))
        .path("/")
        .expires(expires)
        .build();
    HeaderValue::from_str(&cookie.to_string()).ok()
}

/// Append a renewed session cookie to an outgoing response.
pub fn refresh_cookie(headers: &mut HeaderMap, token: &str, lifetime: Duration) {
    match session_cookie_header(token, lifetime, Utc::now()) {
        Some(value) => {
            headers.append(header::SET_COOKIE, value);
        }
        None => tracing::warn!("could not encode session cookie"),
    }
}

/// Permissive CORS headers plus the JSON content type, derived from the
/// request.
pub fn cors_headers(request: &HeaderMap) -> HeaderMap {
    let requested = request
        .get_all(header::ACCESS_CONTROL_REQUEST_HEADERS)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join(",");

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_str(&requested).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    headers
}

/// Fill in any of `defaults` the response did not set itself.
pub fn apply_defaults(response: &mut Response, defaults: &HeaderMap) {
    let headers = response.headers_mut();
    for (name, value) in defaults {
        if !headers.contains_key(name) {
            headers.insert(name.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use floe_auth::MemorySessionStore;

    fn state(admin: Option<&str>) -> (AuthState, Arc<MemorySessionStore>) {
        let store = Arc::new(MemorySessionStore::new(Duration::hours(1)));
        let state = AuthState {
            sessions: store.clone(),
            admin: admin.and_then(AdminToken::new),
            session_lifetime: Duration::hours(1),
        };
        (state, store)
    }

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut h = HeaderMap::new();
        for (k, v) in pairs {
            h.append(*k, HeaderValue::from_str(v).unwrap());
        }
        h
    }

    #[test]
    fn header_token_authenticates() {
        let (state, store) = state(None);
        let session = store.start("alice", Utc::now()).unwrap();

        let found = state
            .authenticate(&headers(&[(AUTH_HEADER, session.token())]))
            .unwrap();
        assert_eq!(found.user(), "alice");
    }

    #[test]
    fn cookie_token_authenticates() {
        let (state, store) = state(None);
        let session = store.start("bob", Utc::now()).unwrap();
        let cookie = format!("other=1; {COOKIE_NAME}={}", session.token());

        let found = state.authenticate(&headers(&[("cookie", cookie.as_str())])).unwrap();
        assert_eq!(found.user(), "bob");
    }

    #[test]
    fn header_beats_cookie() {
        let (state, _store) = state(Some("peer"));
        let cookie = format!("{COOKIE_NAME}=stale");

        let found = state
            .authenticate(&headers(&[(AUTH_HEADER, "peer"), ("cookie", cookie.as_str())]))
            .unwrap();
        assert_eq!(found.user(), floe_auth::ADMIN_USER);
    }

    #[test]
    fn failures_are_401() {
        let (state, _store) = state(None);
        let resp = state.authenticate(&HeaderMap::new()).unwrap_err();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = state.authenticate(&headers(&[(AUTH_HEADER, "bogus")])).unwrap_err();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn cookie_expiry_covers_the_full_lifetime() {
        let now = Utc::now();
        let value = session_cookie_header("tok", Duration::minutes(30), now).unwrap();
        let cookie = Cookie::parse(value.to_str().unwrap().to_string()).unwrap();

        assert_eq!(cookie.name(), COOKIE_NAME);
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.path(), Some("/"));
        let expires = cookie.expires_datetime().unwrap().unix_timestamp();
        assert!(expires >= (now + Duration::minutes(30)).timestamp());
    }

    #[test]
    fn cors_echoes_requested_headers() {
        let h = cors_headers(&headers(&[
            ("access-control-request-headers", "x-floe-auth"),
            ("access-control-request-headers", "content-type"),
        ]));
        assert_eq!(h[header::ACCESS_CONTROL_ALLOW_HEADERS], "x-floe-auth,content-type");
        assert_eq!(h[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(h[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn defaults_do_not_override_handler_headers() {
        let mut resp = Response::new(axum::body::Body::empty());
        resp.headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        apply_defaults(&mut resp, &cors_headers(&HeaderMap::new()));

        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/plain");
        assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
