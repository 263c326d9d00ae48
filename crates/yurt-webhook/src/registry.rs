//! Webhook handler registry
//!
//! Two tables, filled once while the process is being assembled and read-only
//! afterwards:
//! - controller webhooks, keyed by the controller that owns them; each key
//!   holds handlers in the order they were added
//! - independent webhooks, keyed by a free-form name
//!
//! Both tables iterate in key order so bootstrap is deterministic.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::warn;

use crate::handler::SetupWebhookWithManager;

/// Shared handle to a webhook handler
pub type HandlerRef = Arc<dyn SetupWebhookWithManager>;

/// The two handler tables consumed by bootstrap
#[derive(Default, Clone)]
pub struct WebhookRegistry {
    controllers: BTreeMap<String, Vec<HandlerRef>>,
    independents: BTreeMap<String, HandlerRef>,
}

impl WebhookRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler to the webhooks of `controller`
    ///
    /// Adding the same handler twice registers it twice, which bootstrap
    /// reports as a duplicated path.
    pub fn add_controller_webhook(
        &mut self,
        controller: impl Into<String>,
        handler: HandlerRef,
    ) -> &mut Self {
        self.controllers
            .entry(controller.into())
            .or_default()
            .push(handler);
        self
    }

    /// Set the independent webhook called `name`
    pub fn put_independent_webhook(
        &mut self,
        name: impl Into<String>,
        handler: HandlerRef,
    ) -> &mut Self {
        let name = name.into();
        if self.independents.insert(name.clone(), handler).is_some() {
            warn!(webhook = %name, "Independent webhook registered twice, keeping the last one");
        }
        self
    }

    /// Controller webhooks in controller-name order
    pub fn controllers(&self) -> impl Iterator<Item = (&str, &[HandlerRef])> {
        self.controllers
            .iter()
            .map(|(name, handlers)| (name.as_str(), handlers.as_slice()))
    }

    /// Independent webhooks in name order
    pub fn independents(&self) -> impl Iterator<Item = (&str, &HandlerRef)> {
        self.independents
            .iter()
            .map(|(name, handler)| (name.as_str(), handler))
    }

    /// Total number of handlers across both tables
    pub fn len(&self) -> usize {
        self.independents.len() + self.controllers.values().map(Vec::len).sum::<usize>()
    }

    /// Whether no handler is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
