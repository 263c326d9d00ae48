//! Common types for yurt-manager: configuration, errors, and logging setup

#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod telemetry;

pub use config::{
    CompletedConfig, GenericConfig, HealthConfig, LogConfig, ManagerConfig, WebhookConfig,
};
pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Name of the process, used as field manager and log service name
pub const MANAGER_NAME: &str = "yurt-manager";

/// Namespace the manager and its webhook Service run in by default
pub const DEFAULT_SYSTEM_NAMESPACE: &str = "kube-system";

/// Default port for the HTTPS admission webhook server
pub const DEFAULT_WEBHOOK_PORT: u16 = 10273;

/// Default port for the plain HTTP health probe server
pub const DEFAULT_HEALTH_PORT: u16 = 8000;
