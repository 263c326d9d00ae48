//! Handler contract
//!
//! Every webhook handler, controller-scoped or independent, implements
//! [`SetupWebhookWithManager`]. Bootstrap treats handlers as black boxes
//! beyond that one call. The admission side of a handler is expressed through
//! [`CustomDefaulter`] and [`CustomValidator`].

use std::sync::Arc;

use async_trait::async_trait;
use kube::api::DynamicObject;

#[cfg(test)]
use mockall::automock;

use crate::manager::WebhookManager;
use crate::path::WebhookPaths;
use crate::Error;

/// A handler that knows how to attach itself to the manager
#[cfg_attr(test, automock)]
pub trait SetupWebhookWithManager: Send + Sync {
    /// Register with the manager and return the mounted (mutate, validate) paths
    ///
    /// Either path may be empty when the handler does not serve that side.
    fn setup_webhook_with_manager(
        self: Arc<Self>,
        mgr: &WebhookManager,
    ) -> Result<WebhookPaths, Error>;
}

/// Defaulting (mutating) admission logic for one resource kind
#[async_trait]
pub trait CustomDefaulter: Send + Sync {
    /// Fill in defaults on `obj` in place; changes become a JSON patch
    async fn default_object(&self, obj: &mut DynamicObject) -> Result<(), Error>;
}

/// Validating admission logic for one resource kind
///
/// All checks admit by default.
#[async_trait]
pub trait CustomValidator: Send + Sync {
    /// Validate an object being created
    async fn validate_create(&self, _obj: &DynamicObject) -> Result<(), Error> {
        Ok(())
    }

    /// Validate an update from `old` to `new`
    async fn validate_update(
        &self,
        _old: &DynamicObject,
        _new: &DynamicObject,
    ) -> Result<(), Error> {
        Ok(())
    }

    /// Validate an object being deleted
    async fn validate_delete(&self, _obj: &DynamicObject) -> Result<(), Error> {
        Ok(())
    }
}
