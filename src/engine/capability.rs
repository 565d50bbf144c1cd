//! Per-route capability descriptors.
//!
//! Routes declare their auth requirements once at registration time; the
//! middleware looks the resolved descriptor up by route identity on every
//! request. No runtime reflection, no hidden globals.

use dashmap::DashMap;

/// How a route bypasses the login/token/role checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BypassMode {
    /// No bypass: the full check sequence runs.
    #[default]
    None,
    /// Skip the checks but attach the session when one was resolved.
    AttachIfPresent,
    /// Skip the checks and do not attach anything.
    NoneRequired,
}

/// Capability markers declared at one level (route group or method).
/// `None` means "not declared here"; merging fills it from the other level.
#[derive(Debug, Clone, Default)]
pub struct RouteCapability {
    /// Requires auth, with these roles. Declared-but-empty still requires a
    /// role match and therefore denies everyone.
    pub auth: Option<Vec<String>>,
    pub ignore_login: Option<bool>,
    pub bypass: Option<BypassMode>,
}

impl RouteCapability {
    pub fn auth_roles<S: Into<String>, I: IntoIterator<Item = S>>(roles: I) -> Self {
        Self {
            auth: Some(roles.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub fn ignore_login() -> Self {
        Self {
            ignore_login: Some(true),
            ..Default::default()
        }
    }

    pub fn bypass(mode: BypassMode) -> Self {
        Self {
            bypass: Some(mode),
            ..Default::default()
        }
    }
}

/// The resolved auth requirements of one route.
#[derive(Debug, Clone, Default)]
pub struct CapabilityDescriptor {
    pub requires_auth: bool,
    pub ignore_login: bool,
    pub bypass: BypassMode,
    pub required_roles: Vec<String>,
}

impl CapabilityDescriptor {
    /// Merge group-level and method-level markers; the method wins per
    /// category wherever it declares one.
    pub fn merged(group: &RouteCapability, method: &RouteCapability) -> Self {
        let auth = method.auth.as_ref().or(group.auth.as_ref());
        Self {
            requires_auth: auth.is_some(),
            required_roles: auth.cloned().unwrap_or_default(),
            ignore_login: method.ignore_login.or(group.ignore_login).unwrap_or(false),
            bypass: method.bypass.or(group.bypass).unwrap_or_default(),
        }
    }

    pub fn from_method(method: &RouteCapability) -> Self {
        Self::merged(&RouteCapability::default(), method)
    }
}

/// Route identity → descriptor, filled once while routes are registered.
/// Unregistered routes have no descriptor and require no auth.
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    routes: DashMap<String, CapabilityDescriptor>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, route: impl Into<String>, descriptor: CapabilityDescriptor) {
        self.routes.insert(route.into(), descriptor);
    }

    pub fn lookup(&self, route: &str) -> Option<CapabilityDescriptor> {
        self.routes.get(route).map(|d| d.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_method_overrides_group() {
        let group = RouteCapability {
            auth: Some(vec!["USER".into()]),
            ignore_login: Some(false),
            bypass: Some(BypassMode::None),
        };
        let method = RouteCapability {
            auth: Some(vec!["ADMIN".into()]),
            ignore_login: Some(true),
            bypass: Some(BypassMode::AttachIfPresent),
        };
        let desc = CapabilityDescriptor::merged(&group, &method);
        assert!(desc.requires_auth);
        assert_eq!(desc.required_roles, vec!["ADMIN".to_string()]);
        assert!(desc.ignore_login);
        assert_eq!(desc.bypass, BypassMode::AttachIfPresent);
    }

    #[test]
    fn test_merge_falls_back_to_group() {
        let group = RouteCapability::auth_roles(["USER"]);
        let method = RouteCapability::default();
        let desc = CapabilityDescriptor::merged(&group, &method);
        assert!(desc.requires_auth);
        assert_eq!(desc.required_roles, vec!["USER".to_string()]);
        assert!(!desc.ignore_login);
        assert_eq!(desc.bypass, BypassMode::None);
    }

    #[test]
    fn test_undeclared_requires_nothing() {
        let desc =
            CapabilityDescriptor::merged(&RouteCapability::default(), &RouteCapability::default());
        assert!(!desc.requires_auth);
        assert!(desc.required_roles.is_empty());
    }

    #[test]
    fn test_registry_lookup() {
        let registry = CapabilityRegistry::new();
        registry.register(
            "/api/admin",
            CapabilityDescriptor::from_method(&RouteCapability::auth_roles(["ADMIN"])),
        );
        assert!(registry.lookup("/api/admin").unwrap().requires_auth);
        assert!(registry.lookup("/api/open").is_none());
    }
}
