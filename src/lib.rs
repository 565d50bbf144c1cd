//! authgate - Session authentication middleware for axum.
//!
//! Decides per inbound request whether the caller is authenticated, whether
//! their session is still live, and whether they hold a required role,
//! without the caller managing session state itself.
//!
//! # Modules
//!
//! - [`token`] - Encrypted session tokens (claims codec)
//! - [`cache`] - Expiring session cache with pluggable backing store
//! - [`whitelist`] - Path patterns exempt from auth
//! - [`session`] - Session payloads, resolution and lifecycle
//! - [`engine`] - Capability descriptors, the allow/deny state machine and
//!   the axum middleware
//! - [`config`] - YAML-loaded configuration
//! - [`logging`] - Tracing setup
//!
//! # Quick start
//!
//! ```no_run
//! use authgate::config::AuthConfig;
//! use authgate::engine::{AuthState, CapabilityDescriptor, RouteCapability, auth_middleware};
//! use axum::{Router, middleware, routing::get};
//!
//! let state = AuthState::from_config(&AuthConfig::with_secret("change-me")).unwrap();
//! state.whitelist.add(["/static/**", "/**.css"]);
//! state.registry.register(
//!     "/admin",
//!     CapabilityDescriptor::from_method(&RouteCapability::auth_roles(["ADMIN"])),
//! );
//!
//! let app: Router = Router::new()
//!     .route("/admin", get(|| async { "restricted" }))
//!     .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod logging;
pub mod session;
pub mod token;
pub mod whitelist;

// Convenient re-exports at crate root
pub use cache::{CacheBuilder, CacheError, CacheStore, ExpiringCache};
pub use config::AuthConfig;
pub use engine::{
    AuthState, BypassMode, CapabilityDescriptor, CapabilityRegistry, Decision, DenyKind,
    DenyStatuses, RouteCapability, Session, auth_middleware, decide,
};
pub use session::{LogicSession, SessionAttrs, SessionPayload, SessionResolver, SessionService};
pub use token::{Claims, TokenCodec, TokenError};
pub use whitelist::RouteWhitelist;
