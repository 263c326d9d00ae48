//! Pure reconciliation of webhook configuration objects
//!
//! Given the current object from the cluster and a [`SyncTarget`], rewrite
//! every webhook entry so it points at this process's Service with the current
//! CA bundle. Entries whose service path is not mounted by this process are
//! dropped, so the API server never calls a path nobody serves.

use std::sync::Arc;

use k8s_openapi::api::admissionregistration::v1::{
    MutatingWebhook, MutatingWebhookConfiguration, ServiceReference, ValidatingWebhook,
    ValidatingWebhookConfiguration, WebhookClientConfig,
};
use k8s_openapi::ByteString;
use tracing::debug;
use yurt_common::WebhookConfig;

use crate::bootstrap::MountPaths;

/// Desired state for every webhook entry this process serves
#[derive(Debug, Clone)]
pub struct SyncTarget {
    ca_bundle: ByteString,
    service_name: String,
    service_namespace: String,
    service_port: i32,
    paths: Arc<MountPaths>,
}

impl SyncTarget {
    /// Build a target from webhook settings, the loaded CA, and the mounted paths
    pub fn new(config: &WebhookConfig, ca_bundle: Vec<u8>, paths: Arc<MountPaths>) -> Self {
        Self {
            ca_bundle: ByteString(ca_bundle),
            service_name: config.service_name.clone(),
            service_namespace: config.service_namespace.clone(),
            service_port: config.service_port,
            paths,
        }
    }

    fn serves(&self, client_config: &WebhookClientConfig) -> bool {
        client_config
            .service
            .as_ref()
            .and_then(|svc| svc.path.as_deref())
            .is_some_and(|path| self.paths.contains(path))
    }

    fn apply(&self, client_config: &mut WebhookClientConfig) {
        client_config.ca_bundle = Some(self.ca_bundle.clone());
        let path = client_config.service.as_ref().and_then(|svc| svc.path.clone());
        client_config.service = Some(ServiceReference {
            name: self.service_name.clone(),
            namespace: self.service_namespace.clone(),
            path,
            port: Some(self.service_port),
        });
    }
}

trait WebhookEntry: Clone + PartialEq {
    fn name(&self) -> &str;
    fn client_config_mut(&mut self) -> &mut WebhookClientConfig;
}

impl WebhookEntry for MutatingWebhook {
    fn name(&self) -> &str {
        &self.name
    }

    fn client_config_mut(&mut self) -> &mut WebhookClientConfig {
        &mut self.client_config
    }
}

impl WebhookEntry for ValidatingWebhook {
    fn name(&self) -> &str {
        &self.name
    }

    fn client_config_mut(&mut self) -> &mut WebhookClientConfig {
        &mut self.client_config
    }
}

fn sync_entries<W: WebhookEntry>(entries: &mut Option<Vec<W>>, target: &SyncTarget) -> bool {
    let Some(entries) = entries.as_mut() else {
        return false;
    };
    let before = entries.clone();

    entries.retain_mut(|entry| {
        if !target.serves(entry.client_config_mut()) {
            debug!(webhook = %entry.name(), "Dropping webhook entry for an unserved path");
            return false;
        }
        target.apply(entry.client_config_mut());
        true
    });

    *entries != before
}

/// Reconcile a mutating configuration in place; returns whether it changed
pub fn sync_mutating(obj: &mut MutatingWebhookConfiguration, target: &SyncTarget) -> bool {
    sync_entries(&mut obj.webhooks, target)
}

/// Reconcile a validating configuration in place; returns whether it changed
pub fn sync_validating(obj: &mut ValidatingWebhookConfiguration, target: &SyncTarget) -> bool {
    sync_entries(&mut obj.webhooks, target)
}

#[cfg(test)]
mod tests {
    use super::*;

    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    use crate::identity::ResourceIdentity;
    use crate::path::WebhookPaths;

    const CA: &[u8] = b"-----BEGIN CERTIFICATE-----\nca\n-----END CERTIFICATE-----\n";

    fn mounted() -> Arc<MountPaths> {
        let pool = ResourceIdentity::new("apps.openyurt.io", "v1beta1", "NodePool");
        let paths = WebhookPaths::for_identity(&pool);
        Arc::new(MountPaths::from_iter(paths.exposed().map(str::to_string)))
    }

    fn target() -> SyncTarget {
        SyncTarget::new(&WebhookConfig::default(), CA.to_vec(), mounted())
    }

    fn client_config(path: Option<&str>) -> WebhookClientConfig {
        WebhookClientConfig {
            ca_bundle: None,
            service: Some(ServiceReference {
                name: "stale-service".to_string(),
                namespace: "default".to_string(),
                path: path.map(str::to_string),
                port: None,
            }),
            url: None,
        }
    }

    fn mutating(entries: Vec<(&str, Option<&str>)>) -> MutatingWebhookConfiguration {
        MutatingWebhookConfiguration {
            metadata: ObjectMeta {
                name: Some("yurt-manager-mutating-webhook-configuration".to_string()),
                ..Default::default()
            },
            webhooks: Some(
                entries
                    .into_iter()
                    .map(|(name, path)| MutatingWebhook {
                        name: name.to_string(),
                        client_config: client_config(path),
                        admission_review_versions: vec!["v1".to_string()],
                        side_effects: "None".to_string(),
                        ..Default::default()
                    })
                    .collect(),
            ),
        }
    }

    #[test]
    fn served_entries_point_at_this_service() {
        let mut obj = mutating(vec![(
            "m.v1beta1.nodepool.kb.io",
            Some("/mutate-apps-openyurt-io-v1beta1-nodepool"),
        )]);

        assert!(sync_mutating(&mut obj, &target()));

        let entry = &obj.webhooks.as_ref().unwrap()[0];
        assert_eq!(entry.client_config.ca_bundle, Some(ByteString(CA.to_vec())));
        let svc = entry.client_config.service.as_ref().unwrap();
        assert_eq!(svc.name, "yurt-manager-webhook-service");
        assert_eq!(svc.namespace, "kube-system");
        assert_eq!(svc.port, Some(443));
        assert_eq!(
            svc.path.as_deref(),
            Some("/mutate-apps-openyurt-io-v1beta1-nodepool")
        );
    }

    #[test]
    fn unserved_and_pathless_entries_are_dropped() {
        let mut obj = mutating(vec![
            ("m.v1alpha1.raven.kb.io", Some("/mutate-raven-openyurt-io-v1alpha1-gateway")),
            ("no-path", None),
            (
                "m.v1beta1.nodepool.kb.io",
                Some("/mutate-apps-openyurt-io-v1beta1-nodepool"),
            ),
        ]);

        assert!(sync_mutating(&mut obj, &target()));

        let names: Vec<_> = obj
            .webhooks
            .unwrap()
            .into_iter()
            .map(|w| w.name)
            .collect();
        assert_eq!(names, vec!["m.v1beta1.nodepool.kb.io"]);
    }

    #[test]
    fn second_sync_is_a_no_op() {
        let mut obj = mutating(vec![(
            "m.v1beta1.nodepool.kb.io",
            Some("/mutate-apps-openyurt-io-v1beta1-nodepool"),
        )]);
        let target = target();

        assert!(sync_mutating(&mut obj, &target));
        assert!(!sync_mutating(&mut obj, &target));
    }

    #[test]
    fn configuration_without_webhooks_is_untouched() {
        let mut obj = ValidatingWebhookConfiguration::default();
        assert!(!sync_validating(&mut obj, &target()));
        assert!(obj.webhooks.is_none());
    }

    #[test]
    fn validating_entries_are_synced() {
        let mut obj = ValidatingWebhookConfiguration {
            webhooks: Some(vec![ValidatingWebhook {
                name: "v.v1beta1.nodepool.kb.io".to_string(),
                client_config: client_config(Some("/validate-apps-openyurt-io-v1beta1-nodepool")),
                ..Default::default()
            }]),
            ..Default::default()
        };

        assert!(sync_validating(&mut obj, &target()));
        let entry = &obj.webhooks.unwrap()[0];
        assert!(entry.client_config.ca_bundle.is_some());
    }
}
