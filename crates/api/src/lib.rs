//! HTTP API: the public-facing server of a floe node.
//!
//! Every dynamic route goes through the dispatch adapter in [`app::dispatch`],
//! which layers CORS, logging, session resolution and envelope rendering around
//! a business handler. Responses are compressed by [`app::transcode`] and
//! panics are contained by [`app::recover`].

pub mod app;
pub mod config;
pub mod context;
pub mod error;
pub mod middleware;
