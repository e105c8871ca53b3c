//! Named dispatch.
//!
//! A [`NamedDispatcher`] sends a request to a unit chosen by its registered
//! name instead of by path. Only interceptors mapped to that unit by name
//! (or to `*`) run, and only for the forward or include phase.

use std::fmt;
use std::sync::Arc;

use http::header::CONTENT_TYPE;
use http::StatusCode;
use plinth_core::{DispatchType, Request, Response, ResponseExt};

use crate::stage::DispatchHandler;

/// A dispatch capability bound to one unit.
#[derive(Clone)]
pub struct NamedDispatcher {
    stage: Arc<dyn DispatchHandler>,
    unit: String,
}

impl NamedDispatcher {
    /// Binds a dispatcher to `unit` on `stage`.
    #[must_use]
    pub fn new(stage: Arc<dyn DispatchHandler>, unit: impl Into<String>) -> Self {
        Self {
            stage,
            unit: unit.into(),
        }
    }

    /// Returns the target unit name.
    #[must_use]
    pub fn unit_name(&self) -> &str {
        &self.unit
    }

    /// Hands the request over to the unit; its response is returned as is.
    ///
    /// Answers `404` if the unit is not routed (for example before the
    /// context has started).
    pub async fn forward(&self, request: Request) -> Response {
        self.stage
            .dispatch_named(&self.unit, request, DispatchType::Forward)
            .await
            .unwrap_or_else(Response::not_found)
    }

    /// Runs the unit and keeps only its body and content type.
    ///
    /// The included unit cannot change the status or other headers of the
    /// including response.
    pub async fn include(&self, request: Request) -> Response {
        let Some(included) = self
            .stage
            .dispatch_named(&self.unit, request, DispatchType::Include)
            .await
        else {
            return Response::not_found();
        };

        let content_type = included.headers().get(CONTENT_TYPE).cloned();
        let mut response = http::Response::new(included.into_body());
        *response.status_mut() = StatusCode::OK;
        if let Some(content_type) = content_type {
            response.headers_mut().insert(CONTENT_TYPE, content_type);
        }
        response
    }
}

impl fmt::Debug for NamedDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedDispatcher")
            .field("unit", &self.unit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatchStage;
    use plinth_core::fixtures::{self, UNIT_HEADER};
    use plinth_core::{FnUnit, Handler};
    use plinth_registry::{Binding, NoClassLoader, RegistrationTable};

    fn stage() -> Arc<DispatchStage> {
        let mut table = RegistrationTable::new();
        table
            .register_unit(
                "teapot",
                Binding::unit(FnUnit::new(|request: Request| async move {
                    let seen = request
                        .extensions()
                        .get::<DispatchType>()
                        .map_or("none", |d| d.as_str());
                    let mut response = Response::text(StatusCode::IM_A_TEAPOT, seen);
                    response
                        .headers_mut()
                        .insert(UNIT_HEADER, http::HeaderValue::from_static("teapot"));
                    response
                })),
            )
            .unwrap();

        let stage = Arc::new(DispatchStage::new());
        stage.start().unwrap();
        stage
            .finalize_routing(Arc::new(table.freeze(&NoClassLoader).unwrap()))
            .unwrap();
        stage
    }

    #[tokio::test]
    async fn test_forward_keeps_unit_response() {
        let dispatcher = NamedDispatcher::new(stage(), "teapot");
        let response = dispatcher.forward(fixtures::request("/")).await;

        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert!(response.headers().contains_key(UNIT_HEADER));
        assert_eq!(fixtures::body_string(response).await, "forward");
    }

    #[tokio::test]
    async fn test_include_keeps_body_only() {
        let dispatcher = NamedDispatcher::new(stage(), "teapot");
        let response = dispatcher.include(fixtures::request("/")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key(UNIT_HEADER));
        assert!(response.headers().contains_key(CONTENT_TYPE));
        assert_eq!(fixtures::body_string(response).await, "include");
    }

    #[tokio::test]
    async fn test_unrouted_unit_is_not_found() {
        let dispatcher = NamedDispatcher::new(Arc::new(DispatchStage::new()), "teapot");
        assert_eq!(dispatcher.unit_name(), "teapot");

        let response = dispatcher.forward(fixtures::request("/")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
