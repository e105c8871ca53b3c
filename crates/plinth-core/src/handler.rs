//! Handler, unit and interceptor traits.
//!
//! - A [`Handler`] is one link of the assembled pipeline (a stage).
//! - A [`Unit`] is a named request-handling target registered with the
//!   context and reached through the dispatch stage.
//! - An [`Interceptor`] runs around units for the dispatch phases it was
//!   mapped to. Interceptors receive a [`Next`] and must call it exactly once
//!   unless they short-circuit.
//!
//! # Example
//!
//! ```ignore
//! use plinth_core::{BoxFuture, Interceptor, Next, Request, Response};
//!
//! struct Timing;
//!
//! impl Interceptor for Timing {
//!     fn intercept<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, Response> {
//!         Box::pin(async move {
//!             let start = std::time::Instant::now();
//!             let response = next.run(request).await;
//!             tracing::debug!(elapsed = ?start.elapsed(), "unit finished");
//!             response
//!         })
//!     }
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::error::PlinthResult;
use crate::types::{BoxFuture, Request, Response};

/// One link of the request pipeline.
///
/// Stages are shared behind `Arc` once installed and are read concurrently
/// by request-handling tasks, so every method takes `&self`.
pub trait Handler: Send + Sync + 'static {
    /// Returns the stage name used in logs and chain inspection.
    fn name(&self) -> &'static str;

    /// Handles a request, delegating to the next link or short-circuiting.
    fn handle<'a>(&'a self, request: Request) -> BoxFuture<'a, Response>;

    /// Returns the handler this link delegates to, if it wraps one.
    fn next_handler(&self) -> Option<Arc<dyn Handler>> {
        None
    }

    /// Starts this link. Called innermost first during the start sequence.
    fn start(&self) -> PlinthResult<()> {
        Ok(())
    }

    /// Stops this link. Called outermost first during teardown.
    fn stop(&self) {}
}

/// A named, independently addressable request-handling target.
pub trait Unit: Send + Sync + 'static {
    /// Called once when routing is finalised, in registration order.
    fn init(&self, _name: &str) -> PlinthResult<()> {
        Ok(())
    }

    /// Serves a request routed to this unit.
    fn service<'a>(&'a self, request: Request) -> BoxFuture<'a, Response>;

    /// Called once on teardown, in reverse registration order.
    fn destroy(&self) {}
}

/// A component that runs around units for cross-cutting concerns.
pub trait Interceptor: Send + Sync + 'static {
    /// Called once when routing is finalised, before any unit is initialised.
    fn init(&self, _name: &str) -> PlinthResult<()> {
        Ok(())
    }

    /// Processes a request, calling `next` to continue towards the unit.
    fn intercept<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, Response>;

    /// Called once on teardown.
    fn destroy(&self) {}
}

/// Callback to invoke the next interceptor, or the unit at the end.
///
/// Consumed by [`Next::run`], so it can be called at most once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        interceptor: &'a dyn Interceptor,
        next: Box<Next<'a>>,
    },
    Unit(&'a dyn Unit),
}

impl<'a> Next<'a> {
    /// Creates a terminal `Next` that invokes the unit.
    #[must_use]
    pub fn unit(unit: &'a dyn Unit) -> Self {
        Self {
            inner: NextInner::Unit(unit),
        }
    }

    /// Creates a `Next` that runs `interceptor` before `next`.
    #[must_use]
    pub fn new(interceptor: &'a dyn Interceptor, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                interceptor,
                next: Box::new(next),
            },
        }
    }

    /// Builds a chain where the first interceptor runs outermost.
    pub fn chain<I>(interceptors: I, unit: &'a dyn Unit) -> Self
    where
        I: IntoIterator<Item = &'a dyn Interceptor>,
        I::IntoIter: DoubleEndedIterator,
    {
        let mut next = Self::unit(unit);
        for interceptor in interceptors.into_iter().rev() {
            next = Self::new(interceptor, next);
        }
        next
    }

    /// Invokes the next interceptor or the unit.
    pub async fn run(self, request: Request) -> Response {
        match self.inner {
            NextInner::Chain { interceptor, next } => interceptor.intercept(request, *next).await,
            NextInner::Unit(unit) => unit.service(request).await,
        }
    }
}

/// A unit built from an async function.
///
/// # Example
///
/// ```
/// use plinth_core::{FnUnit, Response, ResponseExt};
/// use http::StatusCode;
///
/// let unit = FnUnit::new(|_req| async { Response::text(StatusCode::OK, "hello") });
/// ```
pub struct FnUnit<F> {
    func: F,
}

impl<F> FnUnit<F> {
    /// Creates a new function-based unit.
    pub fn new<Fut>(func: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self { func }
    }
}

impl<F, Fut> Unit for FnUnit<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn service<'a>(&'a self, request: Request) -> BoxFuture<'a, Response> {
        Box::pin((self.func)(request))
    }
}
