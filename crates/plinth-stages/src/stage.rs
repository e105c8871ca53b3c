//! Stage traits and chain inspection.
//!
//! The assembled pipeline is a linear chain of [`Handler`]s. Outermost to
//! innermost it is always session, access control, dispatch; either of the
//! first two may be absent. Wrapping stages implement [`WrapperStage`], the
//! innermost stage implements [`DispatchHandler`].

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use plinth_core::{
    BoxFuture, DispatchType, Handler, PlinthResult, Request, Response, ResponseExt, Unit,
};
use plinth_registry::FrozenTable;

/// The three pipeline stages, in chain order from outermost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// Session tracking.
    Session,
    /// Access control.
    Security,
    /// Routed dispatch to units.
    Dispatch,
}

impl StageKind {
    /// Returns the stage name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Security => "security",
            Self::Dispatch => "dispatch",
        }
    }

    /// Returns `true` for stages that may be disabled by the pipeline options.
    #[must_use]
    pub const fn is_optional(self) -> bool {
        !matches!(self, Self::Dispatch)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage that delegates to the next link or short-circuits.
pub trait WrapperStage: Handler {
    /// Sets the link this stage delegates to.
    fn set_next(&self, next: Arc<dyn Handler>);

    /// Clears the link this stage delegates to.
    fn clear_next(&self);

    /// Converts into a plain handler.
    fn into_handler(self: Arc<Self>) -> Arc<dyn Handler>;
}

/// The innermost stage: routes requests to registered units.
pub trait DispatchHandler: Handler {
    /// Returns the unit registered under `name` once routing is finalised.
    fn lookup_unit(&self, name: &str) -> Option<Arc<dyn Unit>>;

    /// Builds the routing index from a frozen registration table.
    ///
    /// Units and interceptors are initialised here.
    fn finalize_routing(&self, table: Arc<FrozenTable>) -> PlinthResult<()>;

    /// Drops the routing index, destroying units and interceptors.
    fn clear_routing(&self);

    /// Sets the unit serving requests that no mapping matches.
    ///
    /// Takes effect at the next routing finalisation.
    fn set_error_handler(&self, unit: Option<Arc<dyn Unit>>);

    /// Returns `true` between [`Handler::start`] and [`Handler::stop`].
    fn is_started(&self) -> bool;

    /// Sends a request straight to the unit `name`, bypassing path matching.
    ///
    /// Only interceptors mapped to that unit by name take part. Returns
    /// `None` if no such unit is routed.
    fn dispatch_named<'a>(
        &'a self,
        name: &'a str,
        request: Request,
        dispatch: DispatchType,
    ) -> BoxFuture<'a, Option<Response>>;

    /// Converts into a plain handler.
    fn into_handler(self: Arc<Self>) -> Arc<dyn Handler>;
}

/// The `next` link held by a wrapping stage.
///
/// Written once during assembly and read by every request afterwards.
/// `ArcSwapOption` needs a sized pointee, so the handler is boxed in a
/// second `Arc`.
#[derive(Default)]
pub struct NextLink(ArcSwapOption<Arc<dyn Handler>>);

impl NextLink {
    /// Creates an empty link.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the linked handler.
    pub fn set(&self, next: Arc<dyn Handler>) {
        self.0.store(Some(Arc::new(next)));
    }

    /// Clears the linked handler.
    pub fn clear(&self) {
        self.0.store(None);
    }

    /// Returns the linked handler.
    #[must_use]
    pub fn get(&self) -> Option<Arc<dyn Handler>> {
        self.0.load().as_deref().map(Arc::clone)
    }

    /// Hands `request` to the linked handler, or answers `404` if unlinked.
    pub async fn run(&self, stage: &'static str, request: Request) -> Response {
        let next = self.get();
        match next {
            Some(next) => next.handle(request).await,
            None => {
                tracing::warn!(stage, "Stage has no next handler");
                Response::not_found()
            }
        }
    }
}

impl fmt::Debug for NextLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(next) => f.debug_tuple("NextLink").field(&next.name()).finish(),
            None => f.write_str("NextLink(None)"),
        }
    }
}

/// Lists the stage names of a chain, outermost first.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use plinth_core::Handler;
/// use plinth_stages::{chain_names, DispatchHandler, DispatchStage, SessionStage, WrapperStage};
///
/// let dispatch = Arc::new(DispatchStage::new());
/// let session = Arc::new(SessionStage::new());
/// session.set_next(dispatch.into_handler());
///
/// assert_eq!(chain_names(&session.into_handler()), vec!["session", "dispatch"]);
/// ```
#[must_use]
pub fn chain_names(head: &Arc<dyn Handler>) -> Vec<&'static str> {
    let mut names = vec![head.name()];
    let mut current = head.next_handler();
    while let Some(handler) = current {
        names.push(handler.name());
        current = handler.next_handler();
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use plinth_core::fixtures;

    struct Leaf;

    impl Handler for Leaf {
        fn name(&self) -> &'static str {
            "leaf"
        }

        fn handle<'a>(&'a self, _request: Request) -> BoxFuture<'a, Response> {
            Box::pin(async { Response::text(http::StatusCode::OK, "leaf") })
        }
    }

    #[test]
    fn test_stage_kind_names() {
        assert_eq!(StageKind::Session.to_string(), "session");
        assert!(StageKind::Security.is_optional());
        assert!(!StageKind::Dispatch.is_optional());
    }

    #[tokio::test]
    async fn test_next_link_delegates() {
        let link = NextLink::new();
        link.set(Arc::new(Leaf));

        let response = link.run("test", fixtures::request("/")).await;
        assert_eq!(response.status(), http::StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unlinked_answers_not_found() {
        let link = NextLink::new();
        let response = link.run("test", fixtures::request("/")).await;
        assert_eq!(response.status(), http::StatusCode::NOT_FOUND);

        link.set(Arc::new(Leaf));
        link.clear();
        assert!(link.get().is_none());
    }

    #[tokio::test]
    async fn test_relink_keeps_handed_out_handler() {
        let link = NextLink::new();
        let first: Arc<dyn Handler> = Arc::new(Leaf);
        let second: Arc<dyn Handler> = Arc::new(Leaf);
        link.set(Arc::clone(&first));

        let held = link.get().unwrap();
        link.set(Arc::clone(&second));

        assert!(Arc::ptr_eq(&held, &first));
        assert!(Arc::ptr_eq(&link.get().unwrap(), &second));
        let response = held.handle(fixtures::request("/")).await;
        assert_eq!(response.status(), http::StatusCode::OK);
    }

    #[test]
    fn test_chain_names_single() {
        let leaf: Arc<dyn Handler> = Arc::new(Leaf);
        assert_eq!(chain_names(&leaf), vec!["leaf"]);
    }
}
