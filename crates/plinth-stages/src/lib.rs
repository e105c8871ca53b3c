//! # Plinth Stages
//!
//! The three pipeline stages and the factories that create them.
//!
//! Outermost to innermost, an assembled chain is always:
//!
//! 1. **Session** ([`SessionStage`]) - resolves the session identifier
//! 2. **Security** ([`SecurityStage`]) - access control
//! 3. **Dispatch** ([`DispatchStage`]) - routes to registered units
//!
//! The first two are optional and implement [`WrapperStage`]; dispatch is
//! always present and implements [`DispatchHandler`].

#![doc(html_root_url = "https://docs.rs/plinth-stages/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod dispatch;
mod factory;
mod named;
mod routing;
mod security;
mod session;
mod stage;

pub use dispatch::DispatchStage;
pub use factory::{slot_policy, DefaultStageFactory, SlotDecision, StageFactory, StageSlot};
pub use named::NamedDispatcher;
pub use routing::{DispatchError, PathInContext};
pub use security::{AccessDecision, AccessPolicy, SecurityStage};
pub use session::{Session, SessionStage, SESSION_COOKIE};
pub use stage::{chain_names, DispatchHandler, NextLink, StageKind, WrapperStage};
