//! Test fixtures shared across the Plinth crates.
//!
//! # Example
//!
//! ```
//! use plinth_core::fixtures::{self, Trail};
//!
//! let trail = Trail::new();
//! let unit = fixtures::EchoUnit::new("users").with_trail(trail.clone());
//! let request = fixtures::request("/users/7");
//! assert_eq!(request.uri().path(), "/users/7");
//! ```

use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderValue, Method, StatusCode};
use http_body_util::{BodyExt, Full};
use parking_lot::Mutex;

use crate::error::PlinthResult;
use crate::handler::{Interceptor, Next, Unit};
use crate::types::{BoxFuture, Request, Response, ResponseExt};

/// Header set by [`EchoUnit`] naming the unit that answered.
pub const UNIT_HEADER: &str = "x-unit";

/// A shared, ordered log of events recorded by fixtures.
#[derive(Debug, Clone, Default)]
pub struct Trail(Arc<Mutex<Vec<String>>>);

impl Trail {
    /// Creates an empty trail.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    /// Returns a copy of every event so far.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Clears the trail.
    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

/// Builds a `GET` request for `path`.
#[must_use]
pub fn request(path: &str) -> Request {
    request_with(Method::GET, path)
}

/// Builds a request with the given method and path.
#[must_use]
pub fn request_with(method: Method, path: &str) -> Request {
    let mut request = http::Request::new(Full::new(Bytes::new()));
    *request.method_mut() = method;
    if let Ok(uri) = path.parse() {
        *request.uri_mut() = uri;
    }
    request
}

/// Collects a response body into a string.
pub async fn body_string(response: Response) -> String {
    match response.into_body().collect().await {
        Ok(collected) => String::from_utf8_lossy(&collected.to_bytes()).into_owned(),
        Err(never) => match never {},
    }
}

/// A unit answering `200` with `label:path` and an `x-unit` header.
#[derive(Debug, Clone)]
pub struct EchoUnit {
    label: String,
    trail: Option<Trail>,
}

impl EchoUnit {
    /// Creates an echo unit.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            trail: None,
        }
    }

    /// Records `init:<name>`, `service:<label>` and `destroy:<label>` events.
    #[must_use]
    pub fn with_trail(mut self, trail: Trail) -> Self {
        self.trail = Some(trail);
        self
    }

    fn record(&self, event: String) {
        if let Some(trail) = &self.trail {
            trail.push(event);
        }
    }
}

impl Unit for EchoUnit {
    fn init(&self, name: &str) -> PlinthResult<()> {
        self.record(format!("init:{name}"));
        Ok(())
    }

    fn service<'a>(&'a self, request: Request) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            self.record(format!("service:{}", self.label));
            let body = format!("{}:{}", self.label, request.uri().path());
            let mut response = Response::text(StatusCode::OK, &body);
            if let Ok(value) = HeaderValue::from_str(&self.label) {
                response.headers_mut().insert(UNIT_HEADER, value);
            }
            response
        })
    }

    fn destroy(&self) {
        self.record(format!("destroy:{}", self.label));
    }
}

/// An interceptor that records its label on the way in.
#[derive(Debug, Clone)]
pub struct RecordingInterceptor {
    label: String,
    trail: Trail,
}

impl RecordingInterceptor {
    /// Creates a recording interceptor.
    #[must_use]
    pub fn new(label: impl Into<String>, trail: Trail) -> Self {
        Self {
            label: label.into(),
            trail,
        }
    }
}

impl Interceptor for RecordingInterceptor {
    fn intercept<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            self.trail.push(self.label.clone());
            next.run(request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_unit() {
        let trail = Trail::new();
        let unit = EchoUnit::new("users").with_trail(trail.clone());

        let response = unit.service(request("/users/1")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(UNIT_HEADER).unwrap(), "users");
        assert_eq!(body_string(response).await, "users:/users/1");
        assert_eq!(trail.events(), vec!["service:users"]);
    }

    #[test]
    fn test_request_with_method() {
        let req = request_with(Method::POST, "/orders?limit=1");
        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.uri().path(), "/orders");
    }

    #[test]
    fn test_trail_clear() {
        let trail = Trail::new();
        trail.push("a");
        trail.clear();
        assert!(trail.events().is_empty());
    }
}
