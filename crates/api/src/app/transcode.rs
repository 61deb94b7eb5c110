//! Transparent gzip for clients that ask for it.
//!
//! Every body runs through a single encoder that is finished once, so each
//! compressed response is a complete gzip stream no matter which layer
//! produced it. Bodies up to [`BUFFER_LIMIT`] are compressed in one piece;
//! longer ones are compressed as they stream.

use std::fmt::Display;
use std::io::{self, Write};

use axum::{
    body::{Body, BodyDataStream, Bytes},
    extract::Request,
    http::{HeaderMap, HeaderValue, Method, StatusCode, header, response::Parts},
    middleware::Next,
    response::Response,
};
use flate2::{Compression, write::GzEncoder};
use futures::{StreamExt, stream};

use crate::app::render::{Envelope, json_resp};

/// Largest body compressed before any of it is sent.
pub const BUFFER_LIMIT: usize = 1 << 20;

/// Whether the request advertises gzip support.
pub fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains("gzip"))
}

pub async fn transcode(req: Request, next: Next) -> Response {
    let gzip = accepts_gzip(req.headers()) && req.method() != Method::HEAD;
    let response = next.run(req).await;

    if !gzip || !compressible(&response) {
        return response;
    }
    gzip_response(response).await
}

fn compressible(response: &Response) -> bool {
    !matches!(response.status(), StatusCode::NO_CONTENT | StatusCode::NOT_MODIFIED)
        && !response.headers().contains_key(header::CONTENT_ENCODING)
}

async fn gzip_response(response: Response) -> Response {
    let (parts, body) = response.into_parts();
    let mut chunks = body.into_data_stream();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut read = 0;

    while read <= BUFFER_LIMIT {
        match chunks.next().await {
            Some(Ok(chunk)) => {
                read += chunk.len();
                if let Err(err) = encoder.write_all(&chunk) {
                    return body_failed(err);
                }
            }
            Some(Err(err)) => return body_failed(err),
            None => {
                return match encoder.finish() {
                    Ok(compressed) => gzipped(parts, Body::from(compressed)),
                    Err(err) => body_failed(err),
                };
            }
        }
    }

    tracing::debug!(read, "response body over buffer limit; streaming gzip");
    let head = Bytes::from(std::mem::take(encoder.get_mut()));
    let rest = stream::unfold(Some((encoder, chunks)), compress_next);
    let body = stream::once(async move { Ok(head) }).chain(rest);
    gzipped(parts, Body::from_stream(body))
}

type Streaming = Option<(GzEncoder<Vec<u8>>, BodyDataStream)>;

/// Compress the next chunk, or finish the encoder once the body ends. The
/// first error ends the stream.
async fn compress_next(state: Streaming) -> Option<(io::Result<Bytes>, Streaming)> {
    let (mut encoder, mut chunks) = state?;
    match chunks.next().await {
        Some(Ok(chunk)) => match encoder.write_all(&chunk) {
            Ok(()) => {
                let out = Bytes::from(std::mem::take(encoder.get_mut()));
                Some((Ok(out), Some((encoder, chunks))))
            }
            Err(err) => Some((Err(err), None)),
        },
        Some(Err(err)) => {
            tracing::error!(error = %err, "response body failed while streaming gzip");
            Some((Err(io::Error::other(err)), None))
        }
        None => Some((encoder.finish().map(Bytes::from), None)),
    }
}

fn gzipped(mut parts: Parts, body: Body) -> Response {
    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .insert(header::VARY, HeaderValue::from_static("Accept-Encoding"));
    parts
        .headers
        .insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
    Response::from_parts(parts, body)
}

fn body_failed(err: impl Display) -> Response {
    tracing::error!(error = %err, "response body failed before compression");
    json_resp(
        StatusCode::INTERNAL_SERVER_ERROR,
        &Envelope::message("response body failed"),
    )
}
