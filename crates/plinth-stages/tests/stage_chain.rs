//! Stage chain integration tests.
//!
//! Wires session → security → dispatch by hand and drives requests through
//! the full chain.

use std::sync::Arc;

use http::header::SET_COOKIE;
use http::StatusCode;
use plinth_core::fixtures::{self, EchoUnit, RecordingInterceptor, Trail};
use plinth_core::{DispatchTypes, Handler};
use plinth_registry::{Binding, NoClassLoader, RegistrationTable};
use plinth_stages::{
    chain_names, DispatchHandler, DispatchStage, SecurityStage, SessionStage, WrapperStage,
};

fn chain(security: SecurityStage, trail: &Trail) -> Arc<dyn Handler> {
    let mut table = RegistrationTable::new();
    table
        .register_unit("home", Binding::unit(EchoUnit::new("home").with_trail(trail.clone())))
        .unwrap()
        .add_mapping("")
        .unwrap();
    table
        .register_unit("account", Binding::unit(EchoUnit::new("account")))
        .unwrap()
        .add_mapping("/account/*")
        .unwrap();
    table
        .register_interceptor(
            "log",
            Binding::interceptor(RecordingInterceptor::new("log", trail.clone())),
            DispatchTypes::REQUEST,
        )
        .unwrap()
        .add_path_mapping("/*")
        .unwrap();

    let dispatch = Arc::new(DispatchStage::new());
    dispatch.start().unwrap();
    dispatch
        .finalize_routing(Arc::new(table.freeze(&NoClassLoader).unwrap()))
        .unwrap();

    let security = Arc::new(security);
    security.set_next(dispatch.into_handler());
    let session = Arc::new(SessionStage::new());
    session.set_next(security.into_handler());
    session.into_handler()
}

#[tokio::test]
async fn test_full_chain_order() {
    let head = chain(SecurityStage::allow_all(), &Trail::new());
    assert_eq!(chain_names(&head), vec!["session", "security", "dispatch"]);
}

#[tokio::test]
async fn test_request_reaches_unit_with_session_cookie() {
    let trail = Trail::new();
    let head = chain(SecurityStage::allow_all(), &trail);

    let response = head.handle(fixtures::request("/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(SET_COOKIE));
    assert_eq!(fixtures::body_string(response).await, "home:/");
    assert_eq!(trail.events(), vec!["init:home", "log", "service:home"]);
}

#[tokio::test]
async fn test_security_short_circuits_before_dispatch() {
    let trail = Trail::new();
    let head = chain(SecurityStage::require_session(["/account/*"]).unwrap(), &trail);
    trail.clear();

    let response = head.handle(fixtures::request("/account/me")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(trail.events().is_empty());
}
