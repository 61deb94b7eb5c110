//! `data`: accepts pushed JSON and turns it into an event.

use std::sync::Arc;

use axum::{
    extract::Request,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use floe_core::{Event, EventId, Queue};

use super::{RawHandler, Trigger, raw_handler};
use crate::app::render::{Envelope, decode_body, json_resp};

/// Body of a data push.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataPush {
    pub tag: String,
    #[serde(default)]
    pub opts: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Accepted {
    event: EventId,
}

pub struct DataTrigger {
    host: String,
}

impl DataTrigger {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }
}

impl Trigger for DataTrigger {
    fn sub_path(&self) -> &str {
        "data"
    }

    fn requires_auth(&self) -> bool {
        true
    }

    fn post_handler(&self, queue: Arc<Queue>) -> Option<RawHandler> {
        let host = self.host.clone();
        Some(raw_handler(move |req, _params| {
            let queue = Arc::clone(&queue);
            let host = host.clone();
            async move { accept(req, &queue, host).await }
        }))
    }
}

async fn accept(req: Request, queue: &Queue, host: String) -> Response {
    let push: DataPush = match decode_body(req).await {
        Ok(push) => push,
        Err(failure) => return failure.into_response(),
    };

    let event = Event::new(push.tag, host, push.opts);
    let id = event.id;
    if let Err(err) = queue.publish(event) {
        tracing::warn!(error = %err, event_id = %id, "could not publish pushed data");
        return json_resp(StatusCode::INTERNAL_SERVER_ERROR, &Envelope::message(err.to_string()));
    }

    json_resp(StatusCode::OK, &Envelope::new("OK", Accepted { event: id }))
}
