//! Session state: the cached payload, the per-request view, the resolver
//! that builds that view from a raw token, and the service that issues and
//! revokes sessions.

pub mod models;
pub mod resolver;
pub mod service;

pub use models::{LogicSession, SessionPayload};
pub use resolver::{ResolveError, SessionResolver};
pub use service::{SessionAttrs, SessionService};
