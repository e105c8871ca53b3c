//! Context lifecycle integration tests.
//!
//! Drives a [`ContextHandler`] through start, request handling, stop and
//! restart with the stock stages.

use std::sync::Arc;

use http::header::SET_COOKIE;
use http::StatusCode;
use plinth_context::{BindingCall, ContextHandler, PipelineOptions};
use plinth_core::fixtures::{self, EchoUnit, RecordingInterceptor, Trail, UNIT_HEADER};
use plinth_core::{
    DispatchType, DispatchTypes, FnUnit, LifecycleState, PlinthError, PlinthResult, Request,
    Response, ResponseExt, Unit,
};
use plinth_registry::{Binding, ClassRegistry};
use plinth_stages::{
    DispatchError, DispatchHandler, SecurityStage, StageFactory, WrapperStage,
};

fn started(options: PipelineOptions) -> ContextHandler {
    let mut context = ContextHandler::new(options);
    context.begin_start().unwrap();
    context.finish_start().unwrap();
    context
}

#[test]
fn test_dispatch_only_chain() {
    let context = started(PipelineOptions::NONE);
    assert_eq!(context.chain_names(), vec!["dispatch"]);
    assert_eq!(context.request_handler().unwrap().name(), "dispatch");
}

#[test]
fn test_security_wraps_dispatch() {
    let context = started(PipelineOptions::SECURITY);
    assert_eq!(context.chain_names(), vec!["security", "dispatch"]);
}

#[test]
fn test_session_wraps_security() {
    let context = started(PipelineOptions::SESSIONS | PipelineOptions::SECURITY);
    assert_eq!(context.chain_names(), vec!["session", "security", "dispatch"]);
}

#[test]
fn test_stage_creation_is_idempotent_before_start() {
    let mut context = ContextHandler::new(PipelineOptions::new(true, true));

    let session = context.session_stage().unwrap().unwrap();
    let security = context.security_stage().unwrap().unwrap();
    let dispatch = context.dispatch_stage().unwrap().unwrap();

    assert!(Arc::ptr_eq(&session, &context.session_stage().unwrap().unwrap()));
    assert!(Arc::ptr_eq(&security, &context.security_stage().unwrap().unwrap()));
    assert!(Arc::ptr_eq(&dispatch, &context.dispatch_stage().unwrap().unwrap()));
}

#[test]
fn test_no_stage_created_after_start() {
    let mut context = started(PipelineOptions::NONE);
    assert!(context.session_stage().unwrap().is_none());
    assert!(context.security_stage().unwrap().is_none());
    assert!(context.dispatch_stage().unwrap().is_some());
}

#[test]
fn test_register_unit_needs_starting() {
    let mut context = ContextHandler::new(PipelineOptions::NONE);

    let err = context
        .binding()
        .register_unit("late", Binding::unit(EchoUnit::new("late")))
        .err()
        .unwrap();
    assert!(matches!(
        err,
        PlinthError::IllegalLifecycleState {
            state: LifecycleState::Uninitialized,
            ..
        }
    ));

    context.begin_start().unwrap();
    context
        .binding()
        .register_unit("late", Binding::unit(EchoUnit::new("late")))
        .unwrap();
    context.finish_start().unwrap();
    assert!(context.find_unit("late").is_some());
}

#[test]
fn test_every_guarded_call_fails_after_finish_start() {
    let trail = Trail::new();
    let mut context = ContextHandler::new(PipelineOptions::NONE);
    context
        .binding()
        .register_interceptor(
            "audit",
            Binding::interceptor(RecordingInterceptor::new("audit", trail.clone())),
            DispatchTypes::REQUEST,
        )
        .unwrap();
    context.begin_start().unwrap();
    context
        .binding()
        .register_unit("a", Binding::unit(EchoUnit::new("a")))
        .unwrap();
    context.finish_start().unwrap();

    let mut binding = context.binding();
    let results = [
        binding
            .add_interceptor_mapping_for_unit_names("audit", DispatchTypes::REQUEST, true, ["a"])
            .err(),
        binding.add_unit_mapping("a", ["/a"]).err(),
        binding
            .register_interceptor(
                "late",
                Binding::interceptor(RecordingInterceptor::new("late", trail.clone())),
                DispatchTypes::REQUEST,
            )
            .err(),
        binding
            .register_unit("b", Binding::unit(EchoUnit::new("b")))
            .err(),
    ];
    for err in results {
        assert_eq!(err.unwrap().code(), "ILLEGAL_LIFECYCLE_STATE");
    }

    assert!(binding.find_unit("a").is_some());
    assert!(binding.find_interceptor("audit").is_some());
    assert!(binding.create_unit("a").is_none());
    assert!(!BindingCall::RegisterUnit.permits(LifecycleState::Started));
}

#[test]
fn test_resolve_unknown_target_is_absent() {
    let mut context = started(PipelineOptions::NONE);
    assert!(context.binding().resolve_path_dispatch("unknown-name").is_none());
}

#[tokio::test]
async fn test_end_to_end_with_both_stages() {
    let mut context = ContextHandler::new(PipelineOptions::SESSIONS | PipelineOptions::SECURITY);
    context.begin_start().unwrap();
    context
        .binding()
        .register_unit("A", Binding::unit(EchoUnit::new("A")))
        .unwrap()
        .add_mapping("/a")
        .unwrap();
    context.finish_start().unwrap();

    assert_eq!(context.find_unit("A").unwrap().mappings(), vec!["/a"]);
    assert_eq!(context.chain_names()[0], "session");

    let response = context.handle(fixtures::request("/a")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(SET_COOKIE));
    assert_eq!(fixtures::body_string(response).await, "A:/a");
}

#[tokio::test]
async fn test_end_to_end_without_optional_stages() {
    let context = started(PipelineOptions::NONE);
    assert_eq!(context.chain_names(), vec!["dispatch"]);

    let response = context.handle(fixtures::request("/nothing")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(!response.headers().contains_key(SET_COOKIE));
}

#[tokio::test]
async fn test_named_forward_after_start() {
    let mut context = ContextHandler::new(PipelineOptions::NONE);
    context
        .add_unit(Binding::unit(EchoUnit::new("report")), "/report")
        .unwrap();
    context.begin_start().unwrap();
    context.finish_start().unwrap();

    let dispatcher = context.binding().resolve_path_dispatch("unit-0").unwrap();
    let response = dispatcher.forward(fixtures::request("/elsewhere")).await;
    assert_eq!(response.headers().get(UNIT_HEADER).unwrap(), "report");
    assert_eq!(fixtures::body_string(response).await, "report:/elsewhere");
}

#[tokio::test]
async fn test_stop_and_restart_reuses_registrations() {
    let trail = Trail::new();
    let mut context = ContextHandler::new(PipelineOptions::SESSIONS);
    context
        .add_unit(Binding::unit(EchoUnit::new("a").with_trail(trail.clone())), "/a")
        .unwrap();

    context.begin_start().unwrap();
    context.finish_start().unwrap();
    context.begin_stop().unwrap();
    assert_eq!(
        context.handle(fixtures::request("/a")).await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
    context.finish_stop().unwrap();
    assert!(context.chain_names().is_empty());
    assert!(context.request_handler().is_none());

    context.begin_start().unwrap();
    context.finish_start().unwrap();
    assert_eq!(context.chain_names(), vec!["session", "dispatch"]);

    let response = context.handle(fixtures::request("/a")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        trail.events(),
        vec!["init:unit-0", "destroy:a", "init:unit-0", "service:a"]
    );
}

#[tokio::test]
async fn test_unresolvable_class_fails_start() {
    let mut context = ContextHandler::new(PipelineOptions::SESSIONS);
    context
        .add_unit(Binding::class_name("app.Missing"), "/m")
        .unwrap();

    context.begin_start().unwrap();
    let err = context.finish_start().unwrap_err();
    assert_eq!(err.code(), "CLASS_RESOLUTION");
    assert_eq!(context.state(), LifecycleState::Failed);
    assert!(context.request_handler().is_none());
    assert_eq!(
        context.handle(fixtures::request("/m")).await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );

    let err = context.begin_start().unwrap_err();
    assert_eq!(err.code(), "ILLEGAL_LIFECYCLE_STATE");
}

fn health_unit() -> Arc<dyn Unit> {
    Arc::new(EchoUnit::new("health"))
}

#[tokio::test]
async fn test_class_loader_resolves_names() {
    let mut classes = ClassRegistry::new();
    classes.register_unit_fn("app.Health", health_unit);

    let mut context = ContextHandler::new(PipelineOptions::NONE).with_class_loader(Arc::new(classes));
    let name = context
        .add_unit(Binding::class_name("app.Health"), "/health")
        .unwrap();
    assert_eq!(name, "app.Health");

    context.begin_start().unwrap();
    context.finish_start().unwrap();
    let response = context.handle(fixtures::request("/health")).await;
    assert_eq!(fixtures::body_string(response).await, "health:/health");
}

struct BrokenSecurity;

impl StageFactory for BrokenSecurity {
    fn new_session_stage(&self) -> PlinthResult<Arc<dyn WrapperStage>> {
        plinth_stages::DefaultStageFactory.new_session_stage()
    }

    fn new_security_stage(&self) -> PlinthResult<Arc<dyn WrapperStage>> {
        Err(PlinthError::configuration("policy file missing"))
    }

    fn new_dispatch_stage(&self) -> PlinthResult<Arc<dyn DispatchHandler>> {
        plinth_stages::DefaultStageFactory.new_dispatch_stage()
    }
}

#[test]
fn test_factory_failure_is_fatal_to_start() {
    let mut context = ContextHandler::new(PipelineOptions::SECURITY)
        .with_stage_factory(Arc::new(BrokenSecurity));

    let err = context.begin_start().unwrap_err();
    assert_eq!(err.code(), "CONFIGURATION");
    assert!(err.to_string().contains("security stage"));
    assert_eq!(context.state(), LifecycleState::Failed);
    assert!(context.chain_names().is_empty());
}

#[tokio::test]
async fn test_supplied_stage_is_used_even_when_disabled() {
    let mut context = ContextHandler::new(PipelineOptions::NONE);
    context
        .set_security_stage(Some(Arc::new(SecurityStage::deny_all())))
        .unwrap();
    context.begin_start().unwrap();
    context.finish_start().unwrap();

    assert_eq!(context.chain_names(), vec!["security", "dispatch"]);
    let response = context.handle(fixtures::request("/")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[test]
fn test_setters_refused_once_started() {
    let mut context = started(PipelineOptions::NONE);

    let err = context
        .set_session_stage(Some(Arc::new(plinth_stages::SessionStage::new())))
        .unwrap_err();
    assert_eq!(err.code(), "ILLEGAL_LIFECYCLE_STATE");
    assert!(context.set_security_stage(None).is_err());
    assert!(context.set_dispatch_stage(None).is_err());
    assert!(context.set_error_handler(None).is_err());
    assert!(context
        .set_stage_factory(Arc::new(plinth_stages::DefaultStageFactory))
        .is_err());

    context.begin_stop().unwrap();
    assert!(context.set_security_stage(None).is_err());
    context.finish_stop().unwrap();
    assert!(context.set_security_stage(None).is_ok());
}

#[test]
fn test_setters_refused_while_starting() {
    let mut context = ContextHandler::new(PipelineOptions::SESSIONS);
    context.begin_start().unwrap();
    let installed = context.session_stage().unwrap().unwrap();

    let err = context
        .set_session_stage(Some(Arc::new(plinth_stages::SessionStage::new())))
        .unwrap_err();
    assert!(matches!(
        err,
        PlinthError::IllegalLifecycleState {
            state: LifecycleState::Starting,
            ..
        }
    ));
    assert!(context.set_security_stage(None).is_err());
    assert!(context.set_dispatch_stage(None).is_err());
    assert!(context.set_error_handler(None).is_err());
    assert!(context
        .set_stage_factory(Arc::new(plinth_stages::DefaultStageFactory))
        .is_err());

    context.finish_start().unwrap();
    let slot = context.session_stage().unwrap().unwrap();
    let head = context.request_handler().unwrap();
    assert!(Arc::ptr_eq(&installed, &slot));
    assert_eq!(Arc::as_ptr(&slot).cast::<()>(), Arc::as_ptr(&head).cast::<()>());
    assert_eq!(context.chain_names(), vec!["session", "dispatch"]);
}

#[tokio::test]
async fn test_context_path() {
    let mut context = ContextHandler::new(PipelineOptions::NONE).with_context_path("/shop");
    context
        .add_unit(Binding::unit(EchoUnit::new("cart")), "/cart")
        .unwrap();
    context.begin_start().unwrap();
    context.finish_start().unwrap();

    let response = context.handle(fixtures::request("/shop/cart")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(fixtures::body_string(response).await, "cart:/shop/cart");

    let response = context.handle(fixtures::request("/cart")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_error_handler_serves_unmatched() {
    let handler = FnUnit::new(|request: Request| async move {
        let dispatch = request.extensions().get::<DispatchType>().copied();
        let missing = request
            .extensions()
            .get::<DispatchError>()
            .map_or_else(String::new, |e| e.path.clone());
        assert_eq!(dispatch, Some(DispatchType::Error));
        Response::text(StatusCode::NOT_FOUND, &format!("no page at {missing}"))
    });
    let mut context = ContextHandler::new(PipelineOptions::NONE).with_error_handler(Arc::new(handler));
    context.begin_start().unwrap();
    context.finish_start().unwrap();

    let response = context.handle(fixtures::request("/ghost")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(fixtures::body_string(response).await, "no page at /ghost");
}

#[tokio::test]
async fn test_interceptor_mapping_order() {
    let trail = Trail::new();
    let mut context = ContextHandler::new(PipelineOptions::NONE);
    {
        let mut binding = context.binding();
        for label in ["inner", "outer"] {
            binding
                .register_interceptor(
                    label,
                    Binding::interceptor(RecordingInterceptor::new(label, trail.clone())),
                    DispatchTypes::REQUEST,
                )
                .unwrap();
        }
        binding
            .add_interceptor_mapping_for_unit_names("inner", DispatchTypes::REQUEST, true, ["a"])
            .unwrap();
        binding
            .add_interceptor_mapping_for_unit_names("outer", DispatchTypes::REQUEST, false, ["a"])
            .unwrap();
        binding.add_unit_mapping("a", ["/a"]).unwrap();
    }
    context.begin_start().unwrap();
    context
        .binding()
        .register_unit("a", Binding::unit(EchoUnit::new("a").with_trail(trail.clone())))
        .unwrap();
    context.finish_start().unwrap();
    trail.clear();

    context.handle(fixtures::request("/a")).await;
    assert_eq!(trail.events(), vec!["outer", "inner", "service:a"]);
}

#[test]
fn test_mapping_to_unknown_unit_fails_start() {
    let mut context = ContextHandler::new(PipelineOptions::NONE);
    context.binding().add_unit_mapping("ghost", ["/ghost"]).unwrap();
    context.begin_start().unwrap();

    let err = context.finish_start().unwrap_err();
    assert_eq!(err.code(), "CONFIGURATION");
    assert_eq!(context.state(), LifecycleState::Failed);
}
