//! Manager configuration
//!
//! Configuration is read from an optional YAML file and then overridden by
//! CLI flags / environment variables in the binary. `complete()` validates the
//! merged result into a [`CompletedConfig`], which is what the rest of the
//! process consumes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, DEFAULT_HEALTH_PORT, DEFAULT_SYSTEM_NAMESPACE, DEFAULT_WEBHOOK_PORT};

/// Wildcard entry matching every controller or webhook name
pub const WILDCARD: &str = "*";

/// Settings shared by all controllers and webhooks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenericConfig {
    /// Controllers to enable. `*` enables all, `-name` disables `name`.
    pub controllers: Vec<String>,
    /// Independent webhooks to disable. `*` disables all, `-name` keeps `name`.
    pub disabled_webhooks: Vec<String>,
}

impl Default for GenericConfig {
    fn default() -> Self {
        Self {
            controllers: vec![WILDCARD.to_string()],
            disabled_webhooks: Vec::new(),
        }
    }
}

/// Admission webhook server and cluster-side configuration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebhookConfig {
    /// Port the HTTPS webhook server listens on
    pub port: u16,
    /// Directory holding `tls.crt`, `tls.key` and `ca.crt`
    pub cert_dir: PathBuf,
    /// Service fronting the webhook server
    pub service_name: String,
    /// Namespace of the webhook Service
    pub service_namespace: String,
    /// Port exposed by the webhook Service
    pub service_port: i32,
    /// Name of the MutatingWebhookConfiguration kept in sync
    pub mutating_configuration_name: String,
    /// Name of the ValidatingWebhookConfiguration kept in sync
    pub validating_configuration_name: String,
    /// Seconds between cluster-side configuration re-syncs
    pub resync_interval_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_WEBHOOK_PORT,
            cert_dir: PathBuf::from("/tmp/yurt-manager-webhook-certs"),
            service_name: "yurt-manager-webhook-service".to_string(),
            service_namespace: DEFAULT_SYSTEM_NAMESPACE.to_string(),
            service_port: 443,
            mutating_configuration_name: "yurt-manager-mutating-webhook-configuration".to_string(),
            validating_configuration_name: "yurt-manager-validating-webhook-configuration"
                .to_string(),
            resync_interval_secs: 60,
        }
    }
}

impl WebhookConfig {
    /// Interval between cluster-side configuration re-syncs
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    /// Path of the serving certificate
    pub fn cert_path(&self) -> PathBuf {
        self.cert_dir.join("tls.crt")
    }

    /// Path of the serving private key
    pub fn key_path(&self) -> PathBuf {
        self.cert_dir.join("tls.key")
    }

    /// Path of the CA bundle injected into webhook configurations
    pub fn ca_path(&self) -> PathBuf {
        self.cert_dir.join("ca.crt")
    }
}

/// Health probe server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthConfig {
    /// Port for `/healthz` and `/readyz`
    pub port: u16,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_HEALTH_PORT,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Structured JSON lines
    #[default]
    Json,
    /// Human-readable text
    Text,
}

impl std::str::FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            other => Err(Error::config_field(
                "log.format",
                format!("unknown log format '{other}' (expected json or text)"),
            )),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogConfig {
    /// Output format
    pub format: LogFormat,
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set
    pub filter: Option<String>,
}

/// Full manager configuration as read from file and flags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagerConfig {
    /// Controller and webhook gates
    pub generic: GenericConfig,
    /// Webhook server settings
    pub webhook: WebhookConfig,
    /// Health server settings
    pub health: HealthConfig,
    /// Logging settings
    pub log: LogConfig,
}

impl ManagerConfig {
    /// Parse a configuration from YAML text. Missing fields take defaults.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::serialization(format!("invalid manager config: {e}")))
    }

    /// Load configuration from a YAML file, or defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_yaml(&content)
    }

    /// Validate the configuration and freeze it
    pub fn complete(self) -> Result<CompletedConfig> {
        if self.webhook.port == 0 {
            return Err(Error::config_field("webhook.port", "must be non-zero"));
        }
        if self.health.port == 0 {
            return Err(Error::config_field("health.port", "must be non-zero"));
        }
        if self.webhook.port == self.health.port {
            return Err(Error::config_field(
                "health.port",
                "must differ from webhook.port",
            ));
        }
        if self.webhook.resync_interval_secs == 0 {
            return Err(Error::config_field(
                "webhook.resyncIntervalSecs",
                "must be non-zero",
            ));
        }
        for (field, value) in [
            ("webhook.serviceName", &self.webhook.service_name),
            ("webhook.serviceNamespace", &self.webhook.service_namespace),
            (
                "webhook.mutatingConfigurationName",
                &self.webhook.mutating_configuration_name,
            ),
            (
                "webhook.validatingConfigurationName",
                &self.webhook.validating_configuration_name,
            ),
        ] {
            if value.trim().is_empty() {
                return Err(Error::config_field(field, "must not be empty"));
            }
        }
        if self
            .generic
            .controllers
            .iter()
            .chain(&self.generic.disabled_webhooks)
            .any(|entry| entry.trim().is_empty())
        {
            return Err(Error::config_field(
                "generic",
                "controller and webhook entries must not be empty",
            ));
        }

        Ok(CompletedConfig {
            generic: self.generic,
            webhook: self.webhook,
            health: self.health,
            log: self.log,
        })
    }
}

/// Validated configuration consumed by bootstrap and readiness
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedConfig {
    /// Controller and webhook gates
    pub generic: GenericConfig,
    /// Webhook server settings
    pub webhook: WebhookConfig,
    /// Health server settings
    pub health: HealthConfig,
    /// Logging settings
    pub log: LogConfig,
}

impl Default for CompletedConfig {
    fn default() -> Self {
        let defaults = ManagerConfig::default();
        Self {
            generic: defaults.generic,
            webhook: defaults.webhook,
            health: defaults.health,
            log: defaults.log,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[test]
    fn defaults_enable_every_controller() {
        let config = ManagerConfig::default();
        assert_eq!(config.generic.controllers, vec!["*".to_string()]);
        assert!(config.generic.disabled_webhooks.is_empty());
        assert_eq!(config.webhook.port, DEFAULT_WEBHOOK_PORT);
        assert_eq!(config.health.port, DEFAULT_HEALTH_PORT);
    }

    #[test]
    fn defaults_complete_cleanly() {
        let completed = ManagerConfig::default().complete().unwrap();
        assert_eq!(completed, CompletedConfig::default());
    }

    #[test]
    fn yaml_overrides_only_given_fields() {
        let yaml = r#"
generic:
  controllers: ["nodepool", "-raven"]
  disabledWebhooks: ["pod"]
webhook:
  port: 9443
  certDir: /var/run/certs
log:
  format: text
"#;
        let config = ManagerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.generic.controllers, vec!["nodepool", "-raven"]);
        assert_eq!(config.generic.disabled_webhooks, vec!["pod"]);
        assert_eq!(config.webhook.port, 9443);
        assert_eq!(config.webhook.cert_dir, PathBuf::from("/var/run/certs"));
        assert_eq!(
            config.webhook.service_name,
            WebhookConfig::default().service_name
        );
        assert_eq!(config.log.format, LogFormat::Text);
    }

    #[test]
    fn invalid_yaml_is_a_serialization_error() {
        let err = ManagerConfig::from_yaml("webhook: [not, a, map]").unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[test]
    fn load_without_path_gives_defaults() {
        assert_eq!(ManagerConfig::load(None).unwrap(), ManagerConfig::default());
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "health:\n  port: 8081\n").unwrap();

        let config = ManagerConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config.health.port, 8081);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ManagerConfig::load(Some(dir.path().join("absent.yaml").as_path())).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn cert_paths_live_under_cert_dir() {
        let webhook = WebhookConfig {
            cert_dir: PathBuf::from("/certs"),
            ..Default::default()
        };
        assert_eq!(webhook.cert_path(), PathBuf::from("/certs/tls.crt"));
        assert_eq!(webhook.key_path(), PathBuf::from("/certs/tls.key"));
        assert_eq!(webhook.ca_path(), PathBuf::from("/certs/ca.crt"));
    }

    #[rstest]
    #[case::zero_webhook_port(|c: &mut ManagerConfig| c.webhook.port = 0, "webhook.port")]
    #[case::zero_health_port(|c: &mut ManagerConfig| c.health.port = 0, "health.port")]
    #[case::port_clash(|c: &mut ManagerConfig| c.health.port = c.webhook.port, "health.port")]
    #[case::zero_resync(
        |c: &mut ManagerConfig| c.webhook.resync_interval_secs = 0,
        "webhook.resyncIntervalSecs"
    )]
    #[case::empty_service(
        |c: &mut ManagerConfig| c.webhook.service_name = " ".into(),
        "webhook.serviceName"
    )]
    #[case::empty_controller(
        |c: &mut ManagerConfig| c.generic.controllers.push(String::new()),
        "generic"
    )]
    fn complete_rejects_invalid_config(
        #[case] mutate: fn(&mut ManagerConfig),
        #[case] expected_field: &str,
    ) {
        let mut config = ManagerConfig::default();
        mutate(&mut config);

        match config.complete() {
            Err(Error::Config { field, .. }) => {
                assert_eq!(field.as_deref(), Some(expected_field))
            }
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[rstest]
    #[case("json", LogFormat::Json)]
    #[case("TEXT", LogFormat::Text)]
    fn log_format_parses_case_insensitively(#[case] input: &str, #[case] expected: LogFormat) {
        assert_eq!(input.parse::<LogFormat>().unwrap(), expected);
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
