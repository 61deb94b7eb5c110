use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::EventId;

/// Something a trigger observed, on its way to the orchestration engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    /// Routing tag flows match against (e.g. `data`).
    pub tag: String,
    /// Host that accepted the event.
    pub host: String,
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl Event {
    pub fn new(tag: impl Into<String>, host: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: EventId::new(),
            tag: tag.into(),
            host: host.into(),
            payload,
            occurred_at: Utc::now(),
        }
    }
}
