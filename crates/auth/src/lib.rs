//! `floe-auth`: session identity for the public API.
//!
//! Transport-agnostic: this crate decides *who* a token belongs to. Reading
//! headers and writing cookies is the API crate's job.

pub mod admin;
pub mod resolve;
pub mod session;
pub mod store;

pub use admin::AdminToken;
pub use resolve::{AuthFailure, pick_token, resolve_session};
pub use session::{ADMIN_USER, Session, SessionError, SessionValidator};
pub use store::MemorySessionStore;
