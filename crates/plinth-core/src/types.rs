//! Common types used throughout the pipeline.
//!
//! Requests and responses are plain `http` types with a `Full<Bytes>` body.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;

/// The HTTP request type used in the pipeline.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type used in the pipeline.
pub type Response = http::Response<Full<Bytes>>;

/// A boxed future, used for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Extension trait for building plain responses.
pub trait ResponseExt {
    /// Creates a text response with the given status code and message.
    fn text(status: StatusCode, message: &str) -> Response;

    /// Creates a JSON error response.
    fn json_error(status: StatusCode, code: &str, message: &str) -> Response;

    /// `404 Not Found`.
    fn not_found() -> Response {
        Self::text(StatusCode::NOT_FOUND, "Not Found")
    }

    /// `503 Service Unavailable`.
    fn unavailable() -> Response {
        Self::text(StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable")
    }
}

impl ResponseExt for Response {
    fn text(status: StatusCode, message: &str) -> Response {
        let mut response = http::Response::new(Full::new(Bytes::from(message.to_owned())));
        *response.status_mut() = status;
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }

    fn json_error(status: StatusCode, code: &str, message: &str) -> Response {
        let body = serde_json::json!({
            "error": {
                "code": code,
                "message": message
            }
        });

        let mut response = http::Response::new(Full::new(Bytes::from(body.to_string())));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}
