//! # Plinth Core
//!
//! Core types and traits for the Plinth request pipeline.
//!
//! This crate provides the vocabulary shared by every other Plinth crate:
//!
//! - [`PlinthError`] - The error type for registration, stage and lifecycle calls
//! - [`LifecycleState`] - The states a context moves through
//! - [`DispatchType`] / [`DispatchTypes`] - Request flows interceptors take part in
//! - [`Handler`] - One link of the assembled pipeline
//! - [`Unit`] / [`Interceptor`] / [`Next`] - Registered targets and the chain around them

#![doc(html_root_url = "https://docs.rs/plinth-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod dispatch;
mod error;
pub mod fixtures;
mod handler;
mod lifecycle;
mod types;

pub use dispatch::{DispatchType, DispatchTypes};
pub use error::{PlinthError, PlinthResult, RegistrationKind};
pub use handler::{FnUnit, Handler, Interceptor, Next, Unit};
pub use lifecycle::LifecycleState;
pub use types::{BoxFuture, Request, Response, ResponseExt};
