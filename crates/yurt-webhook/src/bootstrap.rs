//! Webhook bootstrap
//!
//! Walks the registry once, independents first and then controller webhooks,
//! applies the configured gates, lets each handler register itself with the
//! manager, and collects every mounted path into a [`MountPaths`] set.
//!
//! `setup_all` consumes the bootstrap value, so a bootstrap runs at most once.
//! A handler error aborts the pass and is returned. Two handlers mounting the
//! same path is a program bug with no safe recovery (one would silently shadow
//! the other's policy), so it panics.

use std::collections::BTreeSet;

use tracing::{info, warn};
use yurt_common::GenericConfig;

use crate::gate::{is_controller_enabled, is_webhook_enabled};
use crate::manager::WebhookManager;
use crate::registry::{HandlerRef, WebhookRegistry};
use crate::Error;

/// The frozen set of admission paths accepted by bootstrap
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountPaths {
    paths: BTreeSet<String>,
}

impl MountPaths {
    /// Whether `path` is mounted
    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    /// Number of mounted paths
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether nothing was mounted
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Mounted paths in lexical order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}

impl FromIterator<String> for MountPaths {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().filter(|p| !p.is_empty()).collect(),
        }
    }
}

/// One-shot bootstrap over a handler registry
pub struct WebhookBootstrap {
    registry: WebhookRegistry,
}

impl WebhookBootstrap {
    /// Prepare a bootstrap pass over `registry`
    pub fn new(registry: WebhookRegistry) -> Self {
        Self { registry }
    }

    /// Register every enabled handler with `mgr`
    ///
    /// # Panics
    ///
    /// Panics if two handlers return the same non-empty path.
    pub fn setup_all(
        self,
        config: &GenericConfig,
        mgr: &WebhookManager,
    ) -> Result<MountPaths, Error> {
        let mut accepted = BTreeSet::new();

        for (name, handler) in self.registry.independents() {
            if !is_webhook_enabled(name, &config.disabled_webhooks) {
                warn!(webhook = %name, "Webhook is disabled");
                continue;
            }
            setup_handler(name, handler, mgr, &mut accepted)?;
        }

        for (controller, handlers) in self.registry.controllers() {
            if !is_controller_enabled(controller, &config.controllers) {
                warn!(controller = %controller, "Webhook for controller is disabled");
                continue;
            }
            for (index, handler) in handlers.iter().enumerate() {
                let key = format!("{controller}[{index}]");
                setup_handler(&key, handler, mgr, &mut accepted)?;
            }
        }

        info!(count = accepted.len(), "Webhook paths registered");
        Ok(MountPaths { paths: accepted })
    }
}

fn setup_handler(
    key: &str,
    handler: &HandlerRef,
    mgr: &WebhookManager,
    accepted: &mut BTreeSet<String>,
) -> Result<(), Error> {
    let paths = handler
        .clone()
        .setup_webhook_with_manager(mgr)
        .map_err(|e| Error::handler_setup(key, e))?;

    for (side, path) in [("mutate", &paths.mutate), ("validate", &paths.validate)] {
        if path.is_empty() {
            continue;
        }
        if !accepted.insert(path.clone()) {
            panic!("webhook handler path {path} duplicated");
        }
        info!(handler = %key, path = %path, "Add webhook {} path", side);
    }
    Ok(())
}
