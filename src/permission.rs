// ABOUTME: Permission check seam consulted before any deploy script runs.
// ABOUTME: Ships a grant table policy built from configuration.

use crate::types::{Capability, Identity, ProjectName};
use std::collections::{HashMap, HashSet};

/// Grants listed under this identity apply to everyone.
pub const ANY_IDENTITY: &str = "*";

/// What the capability is being exercised on.
#[derive(Debug, Clone, Copy)]
pub struct Resource<'a> {
    pub project: &'a ProjectName,
    pub build: Option<u64>,
}

/// Answers whether an identity holds a capability on a resource.
pub trait PermissionCheck: Send + Sync {
    fn allows(&self, identity: &Identity, capability: &Capability, resource: Resource<'_>) -> bool;
}

/// Identity to capability grants, e.g. loaded from `permissions:` in rigger.yml.
#[derive(Debug, Clone, Default)]
pub struct GrantTable {
    grants: HashMap<String, HashSet<Capability>>,
}

impl GrantTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, identity: impl Into<String>, capability: Capability) -> Self {
        self.grants
            .entry(identity.into())
            .or_default()
            .insert(capability);
        self
    }

    pub fn from_map(map: &HashMap<String, Vec<Capability>>) -> Self {
        map.iter()
            .flat_map(|(identity, caps)| caps.iter().map(move |cap| (identity, cap)))
            .fold(Self::new(), |table, (identity, cap)| {
                table.grant(identity.clone(), cap.clone())
            })
    }

    fn holds(&self, key: &str, capability: &Capability) -> bool {
        self.grants
            .get(key)
            .is_some_and(|caps| caps.contains(capability))
    }
}

impl PermissionCheck for GrantTable {
    fn allows(&self, identity: &Identity, capability: &Capability, resource: Resource<'_>) -> bool {
        let allowed =
            self.holds(identity.as_str(), capability) || self.holds(ANY_IDENTITY, capability);
        tracing::debug!(
            identity = %identity,
            capability = %capability,
            project = %resource.project,
            allowed,
            "permission check"
        );
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(project: &ProjectName) -> Resource<'_> {
        Resource {
            project,
            build: Some(1),
        }
    }

    #[test]
    fn explicit_grant_allows() {
        let project = ProjectName::new("web").unwrap();
        let table = GrantTable::new().grant("alice", Capability::trigger());
        assert!(table.allows(&Identity::new("alice"), &Capability::trigger(), resource(&project)));
        assert!(!table.allows(&Identity::new("bob"), &Capability::trigger(), resource(&project)));
    }

    #[test]
    fn wildcard_grant_applies_to_everyone() {
        let project = ProjectName::new("web").unwrap();
        let table = GrantTable::new().grant(ANY_IDENTITY, Capability::new("scm.tag"));
        assert!(table.allows(&Identity::new("carol"), &Capability::new("scm.tag"), resource(&project)));
        assert!(!table.allows(&Identity::new("carol"), &Capability::trigger(), resource(&project)));
    }

    #[test]
    fn from_map_collects_all_grants() {
        let mut map = HashMap::new();
        map.insert(
            "deployer".to_string(),
            vec![Capability::trigger(), Capability::new("scm.tag")],
        );
        let table = GrantTable::from_map(&map);
        let project = ProjectName::new("web").unwrap();
        assert!(table.allows(&Identity::new("deployer"), &Capability::new("scm.tag"), resource(&project)));
    }
}
