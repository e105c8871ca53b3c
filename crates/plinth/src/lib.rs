//! # Plinth
//!
//! **Lifecycle-gated request pipeline for hosting units**
//!
//! Plinth hosts request-handling units behind a fixed chain of stages:
//!
//! - **Registration** of units and interceptors by name, with path mappings
//! - **Lifecycle gating** so configuration calls are only accepted while it is safe
//! - **Optional stages** for session tracking and access control, chosen by a bitmask
//! - **Routed dispatch** with interceptor chains and named forward/include
//!
//! ## Quick Start
//!
//! ```
//! use plinth::prelude::*;
//! use plinth::core::fixtures::EchoUnit;
//!
//! let mut context = ContextHandler::new(PipelineOptions::SESSIONS | PipelineOptions::SECURITY);
//! context.add_unit(Binding::unit(EchoUnit::new("users")), "/users/*").unwrap();
//!
//! context.begin_start().unwrap();
//! context.finish_start().unwrap();
//! assert_eq!(context.chain_names(), vec!["session", "security", "dispatch"]);
//! ```
//!
//! ## Architecture
//!
//! The chain is assembled once per start and never reordered:
//!
//! ```text
//! Request → Session → Security → Dispatch → Interceptors → Unit
//! ```
//!
//! Either of the first two stages may be left out. Dispatch is always present.

#![doc(html_root_url = "https://docs.rs/plinth/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use plinth_core as core;

// Re-export registration types
pub use plinth_registry as registry;

// Re-export stage types
pub use plinth_stages as stages;

// Re-export context types
pub use plinth_context as context;

// Re-export configuration types
pub use plinth_config as config;

// Re-export logging and metrics setup
pub use plinth_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use plinth::prelude::*;
///
/// let context = ContextHandler::new(PipelineOptions::NONE);
/// assert_eq!(context.state(), LifecycleState::Uninitialized);
/// ```
pub mod prelude {
    pub use plinth_core::{
        DispatchType, DispatchTypes, FnUnit, Handler, Interceptor, LifecycleState, Next,
        PlinthError, PlinthResult, Request, Response, ResponseExt, Unit,
    };

    // Registration
    pub use plinth_registry::{Binding, ClassLoader, ClassRef, ClassRegistry};

    // Stages
    pub use plinth_stages::{
        AccessDecision, AccessPolicy, NamedDispatcher, SecurityStage, Session, SessionStage,
        StageFactory,
    };

    // Context
    pub use plinth_context::{ContextBinding, ContextHandler, PipelineOptions, Starting};

    // Configuration and telemetry
    pub use plinth_config::{ConfigLoader, PlinthConfig};
    pub use plinth_telemetry::{init_logging, LogConfig};
}
