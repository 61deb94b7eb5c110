use std::collections::HashMap;
use std::sync::Arc;

use floe_auth::Session;
use floe_core::Hub;

/// Named path parameters captured by the router.
pub type RouteParams = HashMap<String, String>;

/// Per-request state handed to a business handler.
///
/// Built fresh for every request and dropped with it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    params: RouteParams,
    session: Option<Session>,
    hub: Arc<Hub>,
}

impl RequestContext {
    pub fn new(params: RouteParams, session: Option<Session>, hub: Arc<Hub>) -> Self {
        Self { params, session, hub }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// `None` on routes mounted without authentication.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    pub fn into_params(self) -> RouteParams {
        self.params
    }
}
