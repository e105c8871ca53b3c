//! # Plinth Context
//!
//! Lifecycle-gated pipeline assembly for one application.
//!
//! A [`ContextHandler`] collects unit and interceptor registrations, creates
//! the optional session and access-control stages selected by its
//! [`PipelineOptions`], links them around the dispatch stage when it starts
//! and freezes the registrations once it has started.
//!
//! ```text
//!             begin_start                        finish_start
//! register ──────────────► session ─► security ─► dispatch ──► routing finalized
//! ```
//!
//! Application code registers through a [`ContextBinding`], which checks
//! every call against the lifecycle state. Code running inside the start
//! sequence gets a [`Starting`] token instead.
//!
//! ## Example
//!
//! ```
//! use plinth_context::{ContextHandler, PipelineOptions};
//! use plinth_core::fixtures::EchoUnit;
//! use plinth_registry::Binding;
//!
//! let mut context = ContextHandler::new(PipelineOptions::NONE)
//!     .on_startup(|starting| {
//!         starting
//!             .register_unit("health", Binding::unit(EchoUnit::new("health")))?
//!             .add_mapping("/health")?;
//!         Ok(())
//!     });
//!
//! context.begin_start().unwrap();
//! context.finish_start().unwrap();
//! assert_eq!(context.chain_names(), vec!["dispatch"]);
//! assert!(context.find_unit("health").is_some());
//! ```

#![doc(html_root_url = "https://docs.rs/plinth-context/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod assembler;
mod binding;
mod context;
mod lifecycle;
mod options;
mod registrations;
mod starting;

pub use assembler::Pipeline;
pub use binding::{BindingCall, ContextBinding};
pub use context::ContextHandler;
pub use lifecycle::LifecycleMachine;
pub use options::PipelineOptions;
pub use starting::{ShutdownHook, Starting, StartupHook};
