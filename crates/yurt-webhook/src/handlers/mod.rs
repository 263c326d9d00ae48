//! Concrete webhook handlers
//!
//! Every handler serves one resource kind on both the mutating and the
//! validating side. Admission logic itself is pass-through; what matters to
//! the rest of the crate is that each handler registers through the manager
//! and reports the paths it mounted.
//!
//! [`build_registry`] is the single place that enumerates the handlers.

pub mod kinds;

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use kube::api::DynamicObject;
use kube::Client;
use tracing::trace;

use crate::handler::{CustomDefaulter, CustomValidator, SetupWebhookWithManager};
use crate::identity::ResourceIdentity;
use crate::manager::{Scheme, WebhookManager};
use crate::path::WebhookPaths;
use crate::registry::WebhookRegistry;
use crate::Error;

use kinds::*;

/// Defaulting and validating webhook for one resource kind
pub struct ResourceHandler {
    identity: ResourceIdentity,
    client: OnceLock<Client>,
}

impl ResourceHandler {
    /// Create a handler for `identity`
    pub fn new(identity: ResourceIdentity) -> Self {
        Self {
            identity,
            client: OnceLock::new(),
        }
    }

    /// Cluster client captured from the manager during setup
    pub fn client(&self) -> Option<&Client> {
        self.client.get()
    }
}

impl SetupWebhookWithManager for ResourceHandler {
    fn setup_webhook_with_manager(
        self: Arc<Self>,
        mgr: &WebhookManager,
    ) -> Result<WebhookPaths, Error> {
        if let Some(client) = mgr.client() {
            let _ = self.client.set(client);
        }

        let identity = self.identity.clone();
        mgr.webhook_for(identity)
            .with_defaulter(self.clone())
            .with_validator(self)
            .complete()
    }
}

#[async_trait]
impl CustomDefaulter for ResourceHandler {
    async fn default_object(&self, obj: &mut DynamicObject) -> Result<(), Error> {
        trace!(kind = %self.identity, name = ?obj.metadata.name, "Defaulting object");
        Ok(())
    }
}

#[async_trait]
impl CustomValidator for ResourceHandler {}

fn handler(identity: ResourceIdentity) -> Arc<ResourceHandler> {
    Arc::new(ResourceHandler::new(identity))
}

/// Scheme with every kind the handlers in [`build_registry`] serve
pub fn openyurt_scheme() -> Scheme {
    Scheme::new()
        .with(gateway_v1alpha1())
        .with(nodepool_v1alpha1())
        .with(nodepool_v1beta1())
        .with(staticpod_v1alpha1())
        .with(yurtappset_v1alpha1())
        .with(yurtappdaemon_v1alpha1())
        .with(pod_v1())
}

/// Enumerate the yurt-manager webhook handlers
pub fn build_registry() -> WebhookRegistry {
    let mut registry = WebhookRegistry::new();
    registry
        .add_controller_webhook(RAVEN_CONTROLLER, handler(gateway_v1alpha1()))
        .add_controller_webhook(NODEPOOL_CONTROLLER, handler(nodepool_v1alpha1()))
        .add_controller_webhook(NODEPOOL_CONTROLLER, handler(nodepool_v1beta1()))
        .add_controller_webhook(STATICPOD_CONTROLLER, handler(staticpod_v1alpha1()))
        .add_controller_webhook(YURTAPPSET_CONTROLLER, handler(yurtappset_v1alpha1()))
        .add_controller_webhook(YURTAPPDAEMON_CONTROLLER, handler(yurtappdaemon_v1alpha1()))
        .put_independent_webhook(POD_WEBHOOK, handler(pod_v1()));
    registry
}
