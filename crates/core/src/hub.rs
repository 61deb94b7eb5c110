//! The service handle every request context carries.

use std::sync::Arc;

use crate::queue::Queue;

/// Identity of this node plus its handle on the event queue.
///
/// Cheap to share: wrap in an `Arc` once at startup and clone the `Arc`.
#[derive(Debug)]
pub struct Hub {
    host_name: String,
    tags: Vec<String>,
    queue: Arc<Queue>,
}

impl Hub {
    pub fn new(host_name: impl Into<String>, tags: Vec<String>, queue: Arc<Queue>) -> Self {
        Self {
            host_name: host_name.into(),
            tags,
            queue,
        }
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn queue(&self) -> Arc<Queue> {
        Arc::clone(&self.queue)
    }
}
