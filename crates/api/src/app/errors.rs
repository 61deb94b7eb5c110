//! Error responses that must not depend on the envelope encoder.

use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::app::render::{Envelope, json_resp};

/// A request body that could not be decoded. Answered with 400 and the
/// decoder's own error text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct DecodeFailure(pub String);

impl IntoResponse for DecodeFailure {
    fn into_response(self) -> Response {
        json_resp(StatusCode::BAD_REQUEST, &Envelope::message(self.0))
    }
}

/// 500 response for a body the encoder could not produce.
pub fn encode_failure(err: &dyn std::fmt::Display) -> Response {
    let text = err.to_string();
    tracing::error!(error = %text, "response encoding failed");

    let body = format!(r#"{{"Message":"Fail","Payload":"{}"}}"#, escape_json(&text));
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response()
}

fn escape_json(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if c.is_control() => out.push(' '),
            c => out.push(c),
        }
    }
    out
}
