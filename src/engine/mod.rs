//! Per-request authorization decisions.
//!
//! ## Components
//! - `capability`: per-route capability descriptors and their registry
//! - `decision`: the pure allow/deny state machine
//! - `error`: deny kinds and their JSON response bodies
//! - `middleware`: the axum middleware composing whitelist, resolver and
//!   decision
//! - `extractor`: handler-side [`Session`](extractor::Session) extractor

pub mod capability;
pub mod decision;
pub mod error;
pub mod extractor;
pub mod middleware;

pub use capability::{BypassMode, CapabilityDescriptor, CapabilityRegistry, RouteCapability};
pub use decision::{Decision, decide};
pub use error::{DenyKind, DenyStatus, DenyStatuses};
pub use extractor::Session;
pub use middleware::{AuthState, auth_middleware};
