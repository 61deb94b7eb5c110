//! `floe-core`: the shared service handle and event plumbing.
//!
//! The orchestration engine itself lives elsewhere; this crate only carries the
//! pieces every request handler is handed: the [`Hub`] and its event [`Queue`].

pub mod error;
pub mod event;
pub mod hub;
pub mod id;
pub mod queue;

pub use error::{CoreError, CoreResult};
pub use event::Event;
pub use hub::Hub;
pub use id::EventId;
pub use queue::{Queue, Subscription};
