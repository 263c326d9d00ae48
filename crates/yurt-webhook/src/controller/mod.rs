//! Webhook configuration controller
//!
//! Keeps the cluster-side `MutatingWebhookConfiguration` and
//! `ValidatingWebhookConfiguration` objects aligned with what this process
//! serves. The first fully successful sync fires the [`InitializedSignal`];
//! after that the controller re-syncs on a fixed interval until cancelled.

mod sync;

pub use sync::{sync_mutating, sync_validating, SyncTarget};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::admissionregistration::v1::{
    MutatingWebhookConfiguration, ValidatingWebhookConfiguration,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, PostParams};
use kube::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use yurt_common::{WebhookConfig, MANAGER_NAME};

#[cfg(test)]
use mockall::automock;

use crate::bootstrap::MountPaths;
use crate::signal::InitializedSignal;
use crate::Error;

/// Delay before retrying a failed sync
pub const RETRY_INTERVAL: Duration = Duration::from_secs(2);

/// A background controller that fires the initialized signal
#[async_trait]
pub trait WebhookConfigController: Send + Sync {
    /// Run until `token` is cancelled, firing `initialized` once ready
    async fn run(&self, token: CancellationToken, initialized: InitializedSignal);
}

/// Read/write access to the webhook configuration objects
///
/// Abstracted so the sync loop can be exercised without a cluster.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WebhookConfigStore: Send + Sync {
    /// Fetch a mutating configuration; `None` when it does not exist
    async fn get_mutating(
        &self,
        name: &str,
    ) -> Result<Option<MutatingWebhookConfiguration>, Error>;

    /// Replace a mutating configuration
    async fn replace_mutating(&self, obj: &MutatingWebhookConfiguration) -> Result<(), Error>;

    /// Fetch a validating configuration; `None` when it does not exist
    async fn get_validating(
        &self,
        name: &str,
    ) -> Result<Option<ValidatingWebhookConfiguration>, Error>;

    /// Replace a validating configuration
    async fn replace_validating(&self, obj: &ValidatingWebhookConfiguration) -> Result<(), Error>;
}

/// [`WebhookConfigStore`] backed by the Kubernetes API
pub struct KubeWebhookConfigStore {
    client: Client,
}

impl KubeWebhookConfigStore {
    /// Create a store using `client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(MANAGER_NAME.to_string()),
        ..Default::default()
    }
}

fn object_name(meta: &ObjectMeta) -> Result<&str, Error> {
    meta.name.as_deref().ok_or_else(|| {
        yurt_common::Error::internal("webhook configuration", "object has no name").into()
    })
}

#[async_trait]
impl WebhookConfigStore for KubeWebhookConfigStore {
    async fn get_mutating(
        &self,
        name: &str,
    ) -> Result<Option<MutatingWebhookConfiguration>, Error> {
        let api: Api<MutatingWebhookConfiguration> = Api::all(self.client.clone());
        Ok(api.get_opt(name).await?)
    }

    async fn replace_mutating(&self, obj: &MutatingWebhookConfiguration) -> Result<(), Error> {
        let api: Api<MutatingWebhookConfiguration> = Api::all(self.client.clone());
        api.replace(object_name(&obj.metadata)?, &post_params(), obj)
            .await?;
        Ok(())
    }

    async fn get_validating(
        &self,
        name: &str,
    ) -> Result<Option<ValidatingWebhookConfiguration>, Error> {
        let api: Api<ValidatingWebhookConfiguration> = Api::all(self.client.clone());
        Ok(api.get_opt(name).await?)
    }

    async fn replace_validating(&self, obj: &ValidatingWebhookConfiguration) -> Result<(), Error> {
        let api: Api<ValidatingWebhookConfiguration> = Api::all(self.client.clone());
        api.replace(object_name(&obj.metadata)?, &post_params(), obj)
            .await?;
        Ok(())
    }
}

/// Controller syncing CA bundle and service reference into webhook configurations
pub struct ConfigSyncController {
    store: Arc<dyn WebhookConfigStore>,
    paths: Arc<MountPaths>,
    config: WebhookConfig,
}

impl ConfigSyncController {
    /// Create a controller for the paths accepted by bootstrap
    pub fn new(
        store: Arc<dyn WebhookConfigStore>,
        paths: Arc<MountPaths>,
        config: WebhookConfig,
    ) -> Self {
        Self {
            store,
            paths,
            config,
        }
    }

    /// Create a controller talking to the cluster through `client`
    pub fn with_client(client: Client, paths: Arc<MountPaths>, config: WebhookConfig) -> Self {
        Self::new(Arc::new(KubeWebhookConfigStore::new(client)), paths, config)
    }

    async fn load_target(&self) -> Result<SyncTarget, Error> {
        let ca_path = self.config.ca_path();
        let ca = tokio::fs::read(&ca_path)
            .await
            .map_err(|e| yurt_common::Error::io(&ca_path, e))?;
        if ca.is_empty() {
            return Err(yurt_common::Error::config_field(
                "webhook.certDir",
                format!("{} is empty", ca_path.display()),
            )
            .into());
        }
        Ok(SyncTarget::new(&self.config, ca, self.paths.clone()))
    }

    /// Run one full sync of both configuration objects
    ///
    /// Both objects must exist; a missing one fails the sync so the caller
    /// retries until it is created.
    pub async fn sync_once(&self) -> Result<(), Error> {
        let target = self.load_target().await?;

        let name = &self.config.mutating_configuration_name;
        let mut obj = self
            .store
            .get_mutating(name)
            .await?
            .ok_or_else(|| Error::ConfigurationNotFound {
                kind: "MutatingWebhookConfiguration",
                name: name.clone(),
            })?;
        if sync_mutating(&mut obj, &target) {
            self.store.replace_mutating(&obj).await?;
            info!(configuration = %name, "Updated mutating webhook configuration");
        }

        let name = &self.config.validating_configuration_name;
        let mut obj = self
            .store
            .get_validating(name)
            .await?
            .ok_or_else(|| Error::ConfigurationNotFound {
                kind: "ValidatingWebhookConfiguration",
                name: name.clone(),
            })?;
        if sync_validating(&mut obj, &target) {
            self.store.replace_validating(&obj).await?;
            info!(configuration = %name, "Updated validating webhook configuration");
        }

        Ok(())
    }
}

#[async_trait]
impl WebhookConfigController for ConfigSyncController {
    async fn run(&self, token: CancellationToken, initialized: InitializedSignal) {
        info!(paths = self.paths.len(), "Starting webhook configuration controller");
        loop {
            let delay = match self.sync_once().await {
                Ok(()) => {
                    if initialized.fire() {
                        info!("Webhook configuration controller initialized");
                    }
                    self.config.resync_interval()
                }
                Err(e) => {
                    warn!(error = %e, "Failed to sync webhook configurations");
                    RETRY_INTERVAL
                }
            };

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
        debug!("Webhook configuration controller stopped");
    }
}
