//! The JSON envelope every generically rendered route answers with.

use axum::{
    extract::Request,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::app::errors::{DecodeFailure, encode_failure};

/// Upper bound on request bodies a handler will buffer for decoding.
pub const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// `{"Message": ..., "Payload": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Envelope<T = serde_json::Value> {
    pub message: String,
    pub payload: T,
}

impl Envelope {
    /// An envelope with a message and a null payload.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            payload: serde_json::Value::Null,
        }
    }
}

impl<T> Envelope<T> {
    pub fn new(message: impl Into<String>, payload: T) -> Self {
        Self {
            message: message.into(),
            payload,
        }
    }
}

/// Serialize `body` as indented JSON with status `code`.
///
/// Serialization failures turn into a 500 with a hand-built body.
pub fn json_resp<T: Serialize + ?Sized>(code: StatusCode, body: &T) -> Response {
    match serde_json::to_vec_pretty(body) {
        Ok(bytes) => (
            code,
            [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            bytes,
        )
            .into_response(),
        Err(err) => encode_failure(&err),
    }
}

/// Buffer and decode a JSON request body.
pub async fn decode_body<T: DeserializeOwned>(req: Request) -> Result<T, DecodeFailure> {
    let bytes = axum::body::to_bytes(req.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(|e| DecodeFailure(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| DecodeFailure(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use serde_json::json;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn envelope_uses_pascal_case_keys() {
        let resp = json_resp(StatusCode::OK, &Envelope::new("OK", json!([1, 2])));
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(body_json(resp).await, json!({ "Message": "OK", "Payload": [1, 2] }));
    }

    #[tokio::test]
    async fn message_only_envelope_has_null_payload() {
        let resp = json_resp(StatusCode::NOT_FOUND, &Envelope::message("not found"));
        assert_eq!(body_json(resp).await, json!({ "Message": "not found", "Payload": null }));
    }

    #[tokio::test]
    async fn decode_reports_the_parser_error() {
        #[derive(Debug, Deserialize)]
        struct Push {
            #[allow(dead_code)]
            tag: String,
        }

        let req = Request::new(Body::from("{\"tag\": 4"));
        let err = decode_body::<Push>(req).await.unwrap_err();
        assert!(!err.0.is_empty());
    }
}
