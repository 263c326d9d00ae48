//! Mount path derivation
//!
//! Paths are the only coupling between the webhook server's router and the
//! cluster-side webhook configuration objects, so derivation is total and
//! stable: `/mutate-<group with dashes>-<version>-<lowercase kind>` and the
//! same with `/validate-`.

use crate::identity::ResourceIdentity;

/// The pair of mount paths a handler exposes. An empty path means the handler
/// does not serve that side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookPaths {
    /// Mutating (defaulting) path
    pub mutate: String,
    /// Validating path
    pub validate: String,
}

impl WebhookPaths {
    /// Both sides for the given identity
    pub fn for_identity(id: &ResourceIdentity) -> Self {
        Self {
            mutate: mutate_path(id),
            validate: validate_path(id),
        }
    }

    /// Only the validating side
    pub fn validate_only(id: &ResourceIdentity) -> Self {
        Self {
            mutate: String::new(),
            validate: validate_path(id),
        }
    }

    /// Non-empty paths in (mutate, validate) order
    pub fn exposed(&self) -> impl Iterator<Item = &str> {
        [self.mutate.as_str(), self.validate.as_str()]
            .into_iter()
            .filter(|p| !p.is_empty())
    }
}

fn suffix(id: &ResourceIdentity) -> String {
    format!(
        "{}-{}-{}",
        id.group.replace('.', "-"),
        id.version,
        id.kind.to_lowercase()
    )
}

/// Path of the mutating webhook for `id`
pub fn mutate_path(id: &ResourceIdentity) -> String {
    format!("/mutate-{}", suffix(id))
}

/// Path of the validating webhook for `id`
pub fn validate_path(id: &ResourceIdentity) -> String {
    format!("/validate-{}", suffix(id))
}
