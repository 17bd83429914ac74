//! Resource type identities and catalog descriptors

use kube::api::ApiResource;
use std::fmt;

/// Concrete resource type. Two identities are equal only if every field
/// matches, so the same kind served by two group/versions stays distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceTypeIdentity {
    pub kind: String,
    /// API group (empty for the core group)
    pub group: String,
    pub version: String,
    /// Plural resource name, as used in API paths
    pub plural: String,
}

impl ResourceTypeIdentity {
    pub fn new(kind: &str, group: &str, version: &str, plural: &str) -> Self {
        ResourceTypeIdentity {
            kind: kind.to_string(),
            group: group.to_string(),
            version: version.to_string(),
            plural: plural.to_string(),
        }
    }

    /// Returns `v1` for the core group and `<group>/<version>` otherwise
    pub fn group_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    pub fn api_resource(&self) -> ApiResource {
        ApiResource {
            group: self.group.clone(),
            version: self.version.clone(),
            api_version: self.group_version(),
            kind: self.kind.clone(),
            plural: self.plural.clone(),
        }
    }
}

impl From<&ApiResource> for ResourceTypeIdentity {
    fn from(ar: &ApiResource) -> Self {
        ResourceTypeIdentity::new(&ar.kind, &ar.group, &ar.version, &ar.plural)
    }
}

impl fmt::Display for ResourceTypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.plural, self.group_version())
    }
}

/// Catalog entry: identity plus the names a user may refer to it by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTypeDescriptor {
    pub identity: ResourceTypeIdentity,
    /// Singular name, may be empty
    pub singular: String,
    pub short_names: Vec<String>,
    /// False for cluster-scoped types
    pub namespaced: bool,
}

impl ResourceTypeDescriptor {
    /// Every alias this descriptor is reachable under.
    pub fn aliases(&self) -> Vec<String> {
        let id = &self.identity;
        let mut keys = vec![
            id.plural.clone(),
            id.kind.to_lowercase(),
            format!("{}.{}", id.plural, id.group),
        ];
        keys.extend(self.short_names.iter().cloned());
        if !self.singular.is_empty() {
            keys.push(self.singular.clone());
        }
        keys
    }
}
