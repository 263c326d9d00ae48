//! Resource identity (group, version, kind)

use std::fmt;

use kube::Resource;

/// The (group, version, kind) triple identifying an API resource type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceIdentity {
    /// API group; empty for the core group
    pub group: String,
    /// API version (e.g. `v1beta1`)
    pub version: String,
    /// Kind in its canonical casing (e.g. `NodePool`)
    pub kind: String,
}

impl ResourceIdentity {
    /// Create an identity from its parts
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Resolve the identity of a statically typed resource
    pub fn of<K>() -> Self
    where
        K: Resource<DynamicType = ()>,
    {
        Self::new(K::group(&()), K::version(&()), K::kind(&()))
    }

    /// `group/version`, or just `version` for the core group
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}, Kind={}", self.group, self.version, self.kind)
    }
}
