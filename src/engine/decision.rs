//! The per-request allow/deny state machine.

use crate::session::LogicSession;

use super::capability::{BypassMode, CapabilityDescriptor};
use super::error::DenyKind;

/// Outcome of evaluating one request against its route descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Continue to the handler. `attach` says whether the resolved session
    /// payload should be placed in request-scoped context.
    Allow { attach: bool },
    /// Stop the pipeline and answer with the deny body.
    Deny(DenyKind),
}

/// Evaluate the state machine.
///
/// A route that requires no auth short-circuits to allow without looking at
/// the other categories. Otherwise ignore-login, then bypass, then the
/// login → token → role sequence, in that order.
pub fn decide(descriptor: &CapabilityDescriptor, session: &LogicSession) -> Decision {
    if !descriptor.requires_auth {
        return Decision::Allow { attach: true };
    }
    if descriptor.ignore_login {
        return Decision::Allow { attach: true };
    }
    match descriptor.bypass {
        BypassMode::AttachIfPresent => return Decision::Allow { attach: true },
        BypassMode::NoneRequired => return Decision::Allow { attach: false },
        BypassMode::None => {}
    }

    if !session.valid_login {
        return Decision::Deny(DenyKind::NotLoggedIn);
    }
    if !session.valid_token {
        return Decision::Deny(DenyKind::TokenInvalid);
    }

    let held_any = session
        .payload
        .as_ref()
        .is_some_and(|p| p.has_any_role(&descriptor.required_roles));
    if !held_any {
        return Decision::Deny(DenyKind::Forbidden);
    }

    Decision::Allow { attach: true }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::capability::RouteCapability;
    use crate::session::SessionPayload;

    fn logged_in(roles: &str) -> LogicSession {
        LogicSession {
            valid_login: true,
            valid_token: true,
            payload: Some(SessionPayload::new("u1", roles)),
        }
    }

    fn protected(roles: &[&str]) -> CapabilityDescriptor {
        CapabilityDescriptor::from_method(&RouteCapability::auth_roles(roles.iter().copied()))
    }

    #[test]
    fn test_no_auth_required_allows_anonymous() {
        let desc = CapabilityDescriptor::default();
        assert_eq!(
            decide(&desc, &LogicSession::anonymous()),
            Decision::Allow { attach: true }
        );
    }

    #[test]
    fn test_ignore_login_allows_unconditionally() {
        let mut desc = protected(&["ADMIN"]);
        desc.ignore_login = true;
        assert_eq!(
            decide(&desc, &LogicSession::anonymous()),
            Decision::Allow { attach: true }
        );
    }

    #[test]
    fn test_bypass_modes() {
        let mut desc = protected(&["ADMIN"]);
        desc.bypass = BypassMode::AttachIfPresent;
        assert_eq!(
            decide(&desc, &LogicSession::anonymous()),
            Decision::Allow { attach: true }
        );

        desc.bypass = BypassMode::NoneRequired;
        assert_eq!(
            decide(&desc, &LogicSession::anonymous()),
            Decision::Allow { attach: false }
        );
    }

    #[test]
    fn test_not_logged_in() {
        let desc = protected(&["ADMIN"]);
        assert_eq!(
            decide(&desc, &LogicSession::anonymous()),
            Decision::Deny(DenyKind::NotLoggedIn)
        );
    }

    #[test]
    fn test_invalid_token() {
        let desc = protected(&["ADMIN"]);
        let session = LogicSession {
            valid_login: true,
            valid_token: false,
            payload: Some(SessionPayload::new("u1", "ADMIN")),
        };
        assert_eq!(decide(&desc, &session), Decision::Deny(DenyKind::TokenInvalid));
    }

    #[test]
    fn test_role_intersection() {
        // roles {A,B} vs required {B,C}: allowed
        assert_eq!(
            decide(&protected(&["B", "C"]), &logged_in("A,B")),
            Decision::Allow { attach: true }
        );
        // roles {A,B} vs required {C,D}: denied
        assert_eq!(
            decide(&protected(&["C", "D"]), &logged_in("A,B")),
            Decision::Deny(DenyKind::Forbidden)
        );
    }

    #[test]
    fn test_empty_required_roles_denies() {
        assert_eq!(
            decide(&protected(&[]), &logged_in("ADMIN")),
            Decision::Deny(DenyKind::Forbidden)
        );
    }

    #[test]
    fn test_missing_payload_denies_role_check() {
        let session = LogicSession {
            valid_login: true,
            valid_token: true,
            payload: None,
        };
        assert_eq!(
            decide(&protected(&["ADMIN"]), &session),
            Decision::Deny(DenyKind::Forbidden)
        );
    }
}
