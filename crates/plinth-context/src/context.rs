//! The context handler.
//!
//! A [`ContextHandler`] owns everything one application needs to serve
//! requests: the pipeline options, the lifecycle state machine, the
//! registration table, the three stage slots and, once started, the
//! assembled chain.
//!
//! # Lifecycle
//!
//! | Call | From | To | Work |
//! |---|---|---|---|
//! | `begin_start` | uninitialized, stopped | starting | create stages, link and install the chain, start stages, run startup hooks |
//! | `finish_start` | starting | started | freeze registrations, finalize routing |
//! | `begin_stop` | started | stopping | run shutdown hooks, stop stages |
//! | `finish_stop` | stopping | stopped | clear routing, uninstall the chain, thaw registrations |
//!
//! Any error inside `begin_start` or `finish_start` moves the context to
//! `failed` and leaves no chain installed.

use std::fmt;
use std::sync::Arc;

use plinth_config::ContextConfig;
use plinth_core::{
    DispatchTypes, Handler, Interceptor, LifecycleState, PlinthError, PlinthResult, Request,
    Response, ResponseExt, Unit,
};
use plinth_registry::{
    Binding, ClassLoader, InterceptorHandle, NoClassLoader, PathSpec, UnitHandle,
};
use plinth_stages::{
    chain_names, DefaultStageFactory, DispatchHandler, PathInContext, StageFactory, StageKind,
    StageSlot, WrapperStage,
};

use crate::assembler::Pipeline;
use crate::binding::ContextBinding;
use crate::lifecycle::LifecycleMachine;
use crate::options::PipelineOptions;
use crate::registrations::Registrations;
use crate::starting::{ShutdownHook, Starting, StartupHook};

/// States in which stage and handler setters are accepted.
///
/// The chain is linked on entering `starting`, so slots are read-only from
/// then until `stopped`.
const CONFIGURABLE: &[LifecycleState] = &[LifecycleState::Uninitialized, LifecycleState::Stopped];

/// States in which the convenience registration calls are accepted.
const REGISTERING: &[LifecycleState] = &[LifecycleState::Uninitialized, LifecycleState::Starting];

/// A context: one application's pipeline and registrations.
///
/// # Example
///
/// ```
/// use plinth_context::{ContextHandler, PipelineOptions};
/// use plinth_core::fixtures::EchoUnit;
/// use plinth_registry::Binding;
///
/// let mut context = ContextHandler::new(PipelineOptions::SESSIONS | PipelineOptions::SECURITY)
///     .with_name("shop");
/// context.add_unit(Binding::unit(EchoUnit::new("home")), "/").unwrap();
///
/// context.begin_start().unwrap();
/// context.finish_start().unwrap();
/// assert_eq!(context.chain_names(), vec!["session", "security", "dispatch"]);
/// ```
pub struct ContextHandler {
    context_path: String,
    options: PipelineOptions,
    lifecycle: LifecycleMachine,
    registrations: Registrations,
    session: StageSlot<dyn WrapperStage>,
    security: StageSlot<dyn WrapperStage>,
    dispatch: StageSlot<dyn DispatchHandler>,
    factory: Arc<dyn StageFactory>,
    class_loader: Arc<dyn ClassLoader>,
    error_handler: Option<Arc<dyn Unit>>,
    pipeline: Option<Pipeline>,
    startup_hooks: Vec<(String, StartupHook)>,
    shutdown_hooks: Vec<(String, ShutdownHook)>,
}

impl ContextHandler {
    /// Creates a context with the given optional stages enabled.
    #[must_use]
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            context_path: String::new(),
            options,
            lifecycle: LifecycleMachine::new("default"),
            registrations: Registrations::default(),
            session: StageSlot::new(StageKind::Session),
            security: StageSlot::new(StageKind::Security),
            dispatch: StageSlot::new(StageKind::Dispatch),
            factory: Arc::new(DefaultStageFactory),
            class_loader: Arc::new(NoClassLoader),
            error_handler: None,
            pipeline: None,
            startup_hooks: Vec::new(),
            shutdown_hooks: Vec::new(),
        }
    }

    /// Creates a context from loaded configuration.
    #[must_use]
    pub fn from_config(config: &ContextConfig) -> Self {
        Self::new(PipelineOptions::from(config))
            .with_name(config.name.clone())
            .with_context_path(&config.context_path)
    }

    /// Sets the context name used in logs.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.lifecycle.rename(name);
        self
    }

    /// Sets the path prefix this context serves.
    ///
    /// `/` and the empty string both mean the root; a trailing `/` is dropped.
    #[must_use]
    pub fn with_context_path(mut self, path: &str) -> Self {
        let trimmed = path.trim_end_matches('/');
        self.context_path = if trimmed.is_empty() || trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };
        self
    }

    /// Sets the collaborator resolving class-name bindings.
    #[must_use]
    pub fn with_class_loader(mut self, loader: Arc<dyn ClassLoader>) -> Self {
        self.class_loader = loader;
        self
    }

    /// Sets the factory used for stages not supplied explicitly.
    #[must_use]
    pub fn with_stage_factory(mut self, factory: Arc<dyn StageFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Sets the unit serving requests no mapping matches.
    #[must_use]
    pub fn with_error_handler(mut self, unit: Arc<dyn Unit>) -> Self {
        self.error_handler = Some(unit);
        self
    }

    /// Adds a startup hook.
    ///
    /// Hooks run during every `begin_start`, in the order they were added,
    /// after the chain is installed. They receive a [`Starting`] token.
    #[must_use]
    pub fn on_startup<F>(self, hook: F) -> Self
    where
        F: Fn(&mut Starting<'_>) -> PlinthResult<()> + Send + Sync + 'static,
    {
        let name = format!("startup_hook_{}", self.startup_hooks.len());
        self.on_startup_named(name, hook)
    }

    /// Adds a named startup hook.
    #[must_use]
    pub fn on_startup_named<F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&mut Starting<'_>) -> PlinthResult<()> + Send + Sync + 'static,
    {
        self.startup_hooks.push((name.into(), Box::new(hook)));
        self
    }

    /// Adds a shutdown hook.
    ///
    /// Hooks run during `begin_stop`, in reverse order.
    #[must_use]
    pub fn on_shutdown<F>(self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let name = format!("shutdown_hook_{}", self.shutdown_hooks.len());
        self.on_shutdown_named(name, hook)
    }

    /// Adds a named shutdown hook.
    #[must_use]
    pub fn on_shutdown_named<F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shutdown_hooks.push((name.into(), Box::new(hook)));
        self
    }

    /// Returns the context name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.lifecycle.context()
    }

    /// Returns the context path. Empty for the root.
    #[must_use]
    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    /// Returns the construction-time options.
    #[must_use]
    pub const fn options(&self) -> PipelineOptions {
        self.options
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    // Stages

    /// Returns the session stage, creating it if enabled and not yet started.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the factory fails.
    pub fn session_stage(&mut self) -> PlinthResult<Option<Arc<dyn WrapperStage>>> {
        let factory = Arc::clone(&self.factory);
        self.session.get_or_create(
            self.options.enables(StageKind::Session),
            self.lifecycle.state(),
            || factory.new_session_stage(),
        )
    }

    /// Returns the access-control stage, creating it if enabled and not yet
    /// started.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the factory fails.
    pub fn security_stage(&mut self) -> PlinthResult<Option<Arc<dyn WrapperStage>>> {
        let factory = Arc::clone(&self.factory);
        self.security.get_or_create(
            self.options.enables(StageKind::Security),
            self.lifecycle.state(),
            || factory.new_security_stage(),
        )
    }

    /// Returns the dispatch stage, creating it if not yet started.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the factory fails.
    pub fn dispatch_stage(&mut self) -> PlinthResult<Option<Arc<dyn DispatchHandler>>> {
        let factory = Arc::clone(&self.factory);
        self.dispatch.get_or_create(
            self.options.enables(StageKind::Dispatch),
            self.lifecycle.state(),
            || factory.new_dispatch_stage(),
        )
    }

    /// Supplies the session stage, or clears it with `None`.
    ///
    /// # Errors
    ///
    /// Fails with `IllegalLifecycleState` unless uninitialized or stopped.
    pub fn set_session_stage(&mut self, stage: Option<Arc<dyn WrapperStage>>) -> PlinthResult<()> {
        self.lifecycle.require("set_session_stage", CONFIGURABLE)?;
        self.session.set(stage);
        Ok(())
    }

    /// Supplies the access-control stage, or clears it with `None`.
    ///
    /// # Errors
    ///
    /// Fails with `IllegalLifecycleState` unless uninitialized or stopped.
    pub fn set_security_stage(&mut self, stage: Option<Arc<dyn WrapperStage>>) -> PlinthResult<()> {
        self.lifecycle.require("set_security_stage", CONFIGURABLE)?;
        self.security.set(stage);
        Ok(())
    }

    /// Supplies the dispatch stage, or clears it with `None`.
    ///
    /// # Errors
    ///
    /// Fails with `IllegalLifecycleState` unless uninitialized or stopped.
    pub fn set_dispatch_stage(
        &mut self,
        stage: Option<Arc<dyn DispatchHandler>>,
    ) -> PlinthResult<()> {
        self.lifecycle.require("set_dispatch_stage", CONFIGURABLE)?;
        self.dispatch.set(stage);
        Ok(())
    }

    /// Replaces the stage factory.
    ///
    /// # Errors
    ///
    /// Fails with `IllegalLifecycleState` unless uninitialized or stopped.
    pub fn set_stage_factory(&mut self, factory: Arc<dyn StageFactory>) -> PlinthResult<()> {
        self.lifecycle.require("set_stage_factory", CONFIGURABLE)?;
        self.factory = factory;
        Ok(())
    }

    /// Replaces the error handler unit.
    ///
    /// # Errors
    ///
    /// Fails with `IllegalLifecycleState` unless uninitialized or stopped.
    pub fn set_error_handler(&mut self, unit: Option<Arc<dyn Unit>>) -> PlinthResult<()> {
        self.lifecycle.require("set_error_handler", CONFIGURABLE)?;
        self.error_handler = unit;
        Ok(())
    }

    // Registration

    /// Returns the lifecycle-checked registration facade.
    ///
    /// Named dispatch through the facade needs a dispatch stage; one exists
    /// once `begin_start` has run or [`Self::dispatch_stage`] was called.
    pub fn binding(&mut self) -> ContextBinding<'_> {
        let dispatch = self
            .pipeline
            .as_ref()
            .map(|pipeline| Arc::clone(pipeline.dispatch()))
            .or_else(|| self.dispatch.get());
        ContextBinding::new(&mut self.registrations, &self.lifecycle, dispatch)
    }

    /// Registers a unit mapped to `pattern` and returns the name it got.
    ///
    /// The name is the binding's class name, or `unit-N` for instances, made
    /// unique with a numeric suffix.
    ///
    /// # Errors
    ///
    /// Fails with `IllegalLifecycleState` outside `uninitialized` and
    /// `starting`, or with a configuration error for a malformed pattern.
    pub fn add_unit(&mut self, binding: Binding<dyn Unit>, pattern: &str) -> PlinthResult<String> {
        self.lifecycle.require("add_unit", REGISTERING)?;
        PathSpec::parse(pattern)?;
        let table = self
            .registrations
            .open_mut("add_unit", self.lifecycle.state())?;

        let base = binding
            .declared_class()
            .map_or_else(|| format!("unit-{}", table.unit_count()), str::to_string);
        let name = unique_name(base, |candidate| table.contains_unit(candidate));
        table.register_unit(name.clone(), binding)?.add_mapping(pattern)?;
        Ok(name)
    }

    /// Registers an interceptor mapped to `pattern` and returns the name it
    /// got.
    ///
    /// # Errors
    ///
    /// Fails with `IllegalLifecycleState` outside `uninitialized` and
    /// `starting`, or with a configuration error for a malformed pattern.
    pub fn add_interceptor(
        &mut self,
        binding: Binding<dyn Interceptor>,
        pattern: &str,
        dispatch_types: DispatchTypes,
    ) -> PlinthResult<String> {
        self.lifecycle.require("add_interceptor", REGISTERING)?;
        PathSpec::parse(pattern)?;
        let table = self
            .registrations
            .open_mut("add_interceptor", self.lifecycle.state())?;

        let base = binding
            .declared_class()
            .map_or_else(|| format!("interceptor-{}", table.interceptor_count()), str::to_string);
        let name = unique_name(base, |candidate| table.contains_interceptor(candidate));
        table
            .register_interceptor(name.clone(), binding, dispatch_types)?
            .add_path_mapping(pattern)?;
        Ok(name)
    }

    /// Looks up a unit registration.
    #[must_use]
    pub fn find_unit(&self, name: &str) -> Option<UnitHandle<'_>> {
        self.registrations.find_unit(name)
    }

    /// Looks up an interceptor registration.
    #[must_use]
    pub fn find_interceptor(&self, name: &str) -> Option<InterceptorHandle<'_>> {
        self.registrations.find_interceptor(name)
    }

    /// Drops every registration.
    ///
    /// # Errors
    ///
    /// Fails with `IllegalLifecycleState` unless uninitialized or stopped.
    pub fn clear_registrations(&mut self) -> PlinthResult<()> {
        self.lifecycle.require(
            "clear_registrations",
            &[LifecycleState::Uninitialized, LifecycleState::Stopped],
        )?;
        self.registrations.clear();
        tracing::debug!(context = %self.lifecycle.context(), "Cleared registrations");
        Ok(())
    }

    // Lifecycle

    /// Enters `starting`: creates and links the stages, installs the chain
    /// and runs the startup hooks.
    ///
    /// # Errors
    ///
    /// Fails with `IllegalLifecycleState` unless uninitialized or stopped.
    /// Any later error moves the context to `failed`.
    pub fn begin_start(&mut self) -> PlinthResult<()> {
        self.lifecycle.begin_start()?;
        if let Err(err) = self.install_pipeline() {
            self.abort_start(&err);
            return Err(err);
        }
        if let Err(err) = self.run_startup_hooks() {
            self.abort_start(&err);
            return Err(err);
        }
        Ok(())
    }

    /// Enters `started`: freezes the registrations and finalizes routing.
    ///
    /// # Errors
    ///
    /// Fails with `IllegalLifecycleState` unless starting. A resolution or
    /// initialisation error moves the context to `failed`.
    pub fn finish_start(&mut self) -> PlinthResult<()> {
        self.lifecycle
            .require("finish_start", &[LifecycleState::Starting])?;
        if let Err(err) = self.finalize() {
            self.abort_start(&err);
            return Err(err);
        }
        let (units, interceptors) = self.registrations.counts();
        tracing::info!(
            context = %self.lifecycle.context(),
            context_path = %self.context_path,
            units,
            interceptors,
            "Context started"
        );
        Ok(())
    }

    /// Enters `stopping`: runs the shutdown hooks and stops the stages.
    ///
    /// # Errors
    ///
    /// Fails with `IllegalLifecycleState` unless started.
    pub fn begin_stop(&mut self) -> PlinthResult<()> {
        self.lifecycle.begin_stop()?;
        for (name, hook) in self.shutdown_hooks.iter().rev() {
            tracing::debug!(context = %self.lifecycle.context(), hook = %name, "Running shutdown hook");
            hook();
        }
        if let Some(pipeline) = &self.pipeline {
            pipeline.stop_all();
        }
        Ok(())
    }

    /// Enters `stopped`: clears routing, uninstalls the chain and reopens the
    /// registrations for a restart.
    ///
    /// # Errors
    ///
    /// Fails with `IllegalLifecycleState` unless stopping.
    pub fn finish_stop(&mut self) -> PlinthResult<()> {
        self.lifecycle.finish_stop()?;
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.dispatch().clear_routing();
            pipeline.unlink();
        }
        self.registrations.thaw();
        tracing::info!(context = %self.lifecycle.context(), "Context stopped");
        Ok(())
    }

    fn install_pipeline(&mut self) -> PlinthResult<()> {
        let session = self.session_stage()?;
        let security = self.security_stage()?;
        let dispatch = self
            .dispatch_stage()?
            .ok_or_else(|| PlinthError::configuration("no dispatch stage available"))?;

        let pipeline = self
            .pipeline
            .insert(Pipeline::assemble(session, security, dispatch));
        tracing::debug!(
            context = %self.lifecycle.context(),
            stages = ?pipeline.names(),
            "Installed pipeline"
        );
        pipeline.start_all()
    }

    fn run_startup_hooks(&mut self) -> PlinthResult<()> {
        if self.startup_hooks.is_empty() {
            return Ok(());
        }
        let table = self
            .registrations
            .open_mut("begin_start", self.lifecycle.state())?;
        let mut starting = Starting::new(self.lifecycle.context(), table);
        for (name, hook) in &self.startup_hooks {
            tracing::debug!(context = %starting.context_name(), hook = %name, "Running startup hook");
            hook(&mut starting)?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> PlinthResult<()> {
        let frozen = self.registrations.freeze(self.class_loader.as_ref())?;
        self.lifecycle.finish_start()?;

        let Some(pipeline) = &self.pipeline else {
            return Ok(());
        };
        let dispatch = pipeline.dispatch();
        if dispatch.is_started() {
            dispatch.set_error_handler(self.error_handler.clone());
            dispatch.finalize_routing(frozen)?;
        }
        Ok(())
    }

    fn abort_start(&mut self, err: &PlinthError) {
        self.lifecycle.fail(err);
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.stop_all();
            pipeline.dispatch().clear_routing();
            pipeline.unlink();
        }
    }

    // Requests

    /// Returns the installed chain head for the transport.
    ///
    /// The head ignores the context path; use [`Self::handle`] to have it
    /// applied.
    #[must_use]
    pub fn request_handler(&self) -> Option<Arc<dyn Handler>> {
        self.pipeline.as_ref().map(|pipeline| Arc::clone(pipeline.head()))
    }

    /// Lists the installed stage names, outermost first.
    ///
    /// Empty while no chain is installed.
    #[must_use]
    pub fn chain_names(&self) -> Vec<&'static str> {
        self.pipeline
            .as_ref()
            .map_or_else(Vec::new, |pipeline| chain_names(pipeline.head()))
    }

    /// Serves a request through the installed chain.
    ///
    /// Answers `503` unless started and `404` for paths outside the context
    /// path.
    pub async fn handle(&self, mut request: Request) -> Response {
        let head = match &self.pipeline {
            Some(pipeline) if self.lifecycle.state() == LifecycleState::Started => {
                Arc::clone(pipeline.head())
            }
            _ => return Response::unavailable(),
        };
        let Some(split) = PathInContext::split(&self.context_path, request.uri().path()) else {
            return Response::not_found();
        };
        request.extensions_mut().insert(split);
        head.handle(request).await
    }
}

fn unique_name(base: String, taken: impl Fn(&str) -> bool) -> String {
    if !taken(&base) {
        return base;
    }
    let mut suffix = 1;
    loop {
        let candidate = format!("{base}-{suffix}");
        if !taken(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

impl Default for ContextHandler {
    fn default() -> Self {
        Self::new(PipelineOptions::NONE)
    }
}

impl fmt::Debug for ContextHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextHandler")
            .field("name", &self.name())
            .field("context_path", &self.context_path)
            .field("options", &self.options)
            .field("state", &self.state())
            .field("chain", &self.chain_names())
            .finish_non_exhaustive()
    }
}
