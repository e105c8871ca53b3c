//! Session stage.
//!
//! Resolves a session identifier for each request before access control
//! runs. The identifier travels in a cookie:
//!
//! 1. **Cookie present**: a well-formed identifier is reused
//! 2. **Cookie absent or malformed**: a new UUID v7 is issued and a
//!    `Set-Cookie` header is added to the response
//!
//! The resolved [`Session`] is stored as a request extension for the stages
//! and units further in. Storage and expiry of session data are not handled
//! here.

use std::fmt;
use std::sync::Arc;

use http::header::{COOKIE, SET_COOKIE};
use http::HeaderValue;
use plinth_core::{BoxFuture, Handler, Request, Response};
use uuid::Uuid;

use crate::stage::{NextLink, WrapperStage};

/// The default session cookie name.
pub const SESSION_COOKIE: &str = "PLINTHSESSION";

/// The session resolved for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    id: Uuid,
    is_new: bool,
}

impl Session {
    /// Returns the session identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Returns `true` if the identifier was issued for this request.
    #[must_use]
    pub const fn is_new(&self) -> bool {
        self.is_new
    }
}

/// Stage that attaches a [`Session`] to every request.
///
/// # Example
///
/// ```
/// use plinth_stages::SessionStage;
///
/// let stage = SessionStage::new().with_cookie_name("SID").with_cookie_path("/shop");
/// assert_eq!(stage.cookie_name(), "SID");
/// ```
pub struct SessionStage {
    cookie_name: String,
    cookie_path: String,
    next: NextLink,
}

impl Default for SessionStage {
    fn default() -> Self {
        Self {
            cookie_name: SESSION_COOKIE.to_string(),
            cookie_path: "/".to_string(),
            next: NextLink::new(),
        }
    }
}

impl SessionStage {
    /// Creates a session stage using the default cookie.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cookie name.
    #[must_use]
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Sets the cookie path.
    #[must_use]
    pub fn with_cookie_path(mut self, path: impl Into<String>) -> Self {
        self.cookie_path = path.into();
        self
    }

    /// Returns the cookie name.
    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    fn extract(&self, request: &Request) -> Option<Uuid> {
        request
            .headers()
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|header| header.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
    }

    fn set_cookie(&self, id: Uuid) -> Option<HeaderValue> {
        let cookie = format!(
            "{}={}; Path={}; HttpOnly; SameSite=Lax",
            self.cookie_name, id, self.cookie_path
        );
        HeaderValue::from_str(&cookie).ok()
    }
}

impl Handler for SessionStage {
    fn name(&self) -> &'static str {
        "session"
    }

    fn handle<'a>(&'a self, mut request: Request) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let session = match self.extract(&request) {
                Some(id) => Session { id, is_new: false },
                None => Session {
                    id: Uuid::now_v7(),
                    is_new: true,
                },
            };
            tracing::trace!(session = %session.id, is_new = session.is_new, "Resolved session");
            request.extensions_mut().insert(session);

            let mut response = self.next.run(self.name(), request).await;

            if session.is_new {
                if let Some(cookie) = self.set_cookie(session.id) {
                    response.headers_mut().append(SET_COOKIE, cookie);
                }
            }
            response
        })
    }

    fn next_handler(&self) -> Option<Arc<dyn Handler>> {
        self.next.get()
    }
}

impl WrapperStage for SessionStage {
    fn set_next(&self, next: Arc<dyn Handler>) {
        self.next.set(next);
    }

    fn clear_next(&self) {
        self.next.clear();
    }

    fn into_handler(self: Arc<Self>) -> Arc<dyn Handler> {
        self
    }
}

impl fmt::Debug for SessionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStage")
            .field("cookie_name", &self.cookie_name)
            .field("cookie_path", &self.cookie_path)
            .field("next", &self.next)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use plinth_core::fixtures;
    use plinth_core::ResponseExt;

    /// Echoes the session id it sees back in the body.
    struct SessionEcho;

    impl Handler for SessionEcho {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn handle<'a>(&'a self, request: Request) -> BoxFuture<'a, Response> {
            Box::pin(async move {
                let body = request
                    .extensions()
                    .get::<Session>()
                    .map(|s| s.id().to_string())
                    .unwrap_or_default();
                Response::text(StatusCode::OK, &body)
            })
        }
    }

    fn stage() -> SessionStage {
        let stage = SessionStage::new();
        stage.set_next(Arc::new(SessionEcho));
        stage
    }

    #[tokio::test]
    async fn test_issues_new_session() {
        let stage = stage();
        let response = stage.handle(fixtures::request("/")).await;

        let cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap().to_string();
        let id = fixtures::body_string(response).await;
        assert!(cookie.starts_with(&format!("{SESSION_COOKIE}={id}")));
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[tokio::test]
    async fn test_reuses_existing_session() {
        let stage = stage();
        let id = Uuid::now_v7();
        let mut request = fixtures::request("/");
        request.headers_mut().insert(
            COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {SESSION_COOKIE}={id}")).unwrap(),
        );

        let response = stage.handle(request).await;
        assert!(response.headers().get(SET_COOKIE).is_none());
        assert_eq!(fixtures::body_string(response).await, id.to_string());
    }

    #[tokio::test]
    async fn test_malformed_cookie_gets_replaced() {
        let stage = stage();
        let mut request = fixtures::request("/");
        request.headers_mut().insert(
            COOKIE,
            HeaderValue::from_str(&format!("{SESSION_COOKIE}=garbage")).unwrap(),
        );

        let response = stage.handle(request).await;
        assert!(response.headers().get(SET_COOKIE).is_some());
    }

    #[tokio::test]
    async fn test_custom_cookie_name() {
        let stage = SessionStage::new().with_cookie_name("SID");
        stage.set_next(Arc::new(SessionEcho));

        let response = stage.handle(fixtures::request("/")).await;
        let cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("SID="));
        assert!(cookie.contains("Path=/"));
    }
}
