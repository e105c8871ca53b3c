//! Dispatch stage.
//!
//! The innermost link of every pipeline. Until routing is finalised it
//! answers `503`; afterwards it resolves the request path to a unit, wraps
//! the unit in the matching interceptor chain and runs it.
//!
//! The routing index lives behind an `ArcSwapOption` so request tasks read
//! it without locking while the control thread installs or clears it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use http::StatusCode;
use parking_lot::RwLock;
use plinth_core::{
    BoxFuture, DispatchType, Handler, Next, PlinthResult, Request, Response, ResponseExt, Unit,
};
use plinth_registry::FrozenTable;

use crate::routing::{DispatchError, PathInContext, RoutingTable};
use crate::stage::DispatchHandler;

/// Stage routing requests to registered units.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use plinth_core::fixtures::EchoUnit;
/// use plinth_core::Handler;
/// use plinth_registry::{Binding, NoClassLoader, RegistrationTable};
/// use plinth_stages::{DispatchHandler, DispatchStage};
///
/// let mut table = RegistrationTable::new();
/// table.register_unit("a", Binding::unit(EchoUnit::new("a"))).unwrap();
///
/// let stage = DispatchStage::new();
/// stage.start().unwrap();
/// stage.finalize_routing(Arc::new(table.freeze(&NoClassLoader).unwrap())).unwrap();
/// assert!(stage.lookup_unit("a").is_some());
/// ```
#[derive(Default)]
pub struct DispatchStage {
    routing: ArcSwapOption<RoutingTable>,
    started: AtomicBool,
    error_unit: RwLock<Option<Arc<dyn Unit>>>,
}

impl DispatchStage {
    /// Creates a dispatch stage with no routing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once routing has been finalised.
    #[must_use]
    pub fn is_routed(&self) -> bool {
        self.routing.load().is_some()
    }

    /// Lists `(pattern, unit)` pairs of the current routing index.
    #[must_use]
    pub fn routes(&self) -> Vec<(String, String)> {
        self.routing.load_full().map_or_else(Vec::new, |routing| {
            routing
                .routes()
                .map(|(spec, unit)| (spec.pattern(), unit.to_string()))
                .collect()
        })
    }

    async fn route(routing: Arc<RoutingTable>, mut request: Request) -> Response {
        let dispatch = request
            .extensions()
            .get::<DispatchType>()
            .copied()
            .unwrap_or_default();
        let path = request.extensions().get::<PathInContext>().map_or_else(
            || request.uri().path().to_string(),
            |split| split.path().to_string(),
        );

        if let Some(route) = routing.resolve(&path) {
            let chain = routing.interceptors_for(&path, Some(route.unit_name), dispatch);
            tracing::debug!(
                unit = %route.unit_name,
                path = %path,
                dispatch = %dispatch,
                interceptors = chain.len(),
                "Dispatching"
            );
            let response = Next::chain(chain, &**route.unit).run(request).await;
            metrics::counter!(
                "plinth_dispatch_total",
                "unit" => route.unit_name.to_string(),
                "status" => response.status().as_u16().to_string()
            )
            .increment(1);
            return response;
        }

        metrics::counter!("plinth_dispatch_not_found_total").increment(1);
        match routing.error_unit() {
            Some(error_unit) => {
                tracing::debug!(path = %path, "No unit matched, using error handler");
                let chain = routing.interceptors_for(&path, None, DispatchType::Error);
                request.extensions_mut().insert(DispatchError {
                    status: StatusCode::NOT_FOUND,
                    path: path.clone(),
                });
                request.extensions_mut().insert(DispatchType::Error);
                Next::chain(chain, &**error_unit).run(request).await
            }
            None => {
                tracing::debug!(path = %path, "No unit matched");
                Response::not_found()
            }
        }
    }
}

impl Handler for DispatchStage {
    fn name(&self) -> &'static str {
        "dispatch"
    }

    fn handle<'a>(&'a self, request: Request) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            match self.routing.load_full() {
                Some(routing) => Self::route(routing, request).await,
                None => Response::unavailable(),
            }
        })
    }

    fn start(&self) -> PlinthResult<()> {
        self.started.store(true, Ordering::Release);
        Ok(())
    }

    fn stop(&self) {
        self.started.store(false, Ordering::Release);
    }
}

impl DispatchHandler for DispatchStage {
    fn lookup_unit(&self, name: &str) -> Option<Arc<dyn Unit>> {
        let routing = self.routing.load_full()?;
        routing.table().unit(name).cloned()
    }

    fn finalize_routing(&self, table: Arc<FrozenTable>) -> PlinthResult<()> {
        let error_unit = self.error_unit.read().clone();
        let routing = RoutingTable::build(table, error_unit);
        routing.init_all()?;

        let routes = routing.routes().count();
        if let Some(previous) = self.routing.swap(Some(Arc::new(routing))) {
            previous.destroy_all();
        }
        tracing::info!(routes, "Routing finalised");
        Ok(())
    }

    fn clear_routing(&self) {
        if let Some(routing) = self.routing.swap(None) {
            routing.destroy_all();
            tracing::debug!("Routing cleared");
        }
    }

    fn set_error_handler(&self, unit: Option<Arc<dyn Unit>>) {
        *self.error_unit.write() = unit;
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    fn dispatch_named<'a>(
        &'a self,
        name: &'a str,
        mut request: Request,
        dispatch: DispatchType,
    ) -> BoxFuture<'a, Option<Response>> {
        Box::pin(async move {
            let routing = self.routing.load_full()?;
            let unit = routing.table().unit(name)?;
            let chain = routing.interceptors_for_name(name, dispatch);
            tracing::debug!(unit = %name, dispatch = %dispatch, "Named dispatch");
            request.extensions_mut().insert(dispatch);
            Some(Next::chain(chain, &**unit).run(request).await)
        })
    }

    fn into_handler(self: Arc<Self>) -> Arc<dyn Handler> {
        self
    }
}

impl fmt::Debug for DispatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchStage")
            .field("routed", &self.is_routed())
            .field("started", &self.is_started())
            .finish_non_exhaustive()
    }
}
