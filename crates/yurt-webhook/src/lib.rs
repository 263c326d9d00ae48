//! Admission webhook bootstrap and readiness coordination for yurt-manager
//!
//! The flow through this crate:
//! - [`handlers::build_registry`] enumerates the webhook handlers
//! - [`WebhookBootstrap::setup_all`] applies the configured gates, registers
//!   each handler with the [`WebhookManager`], and freezes the accepted
//!   [`MountPaths`]
//! - [`ReadinessCoordinator::initialize`] starts the webhook configuration
//!   controller and bounds how long startup may wait for it
//! - [`ReadinessCoordinator::check`] and [`ReadinessCoordinator::wait_ready`]
//!   report readiness to probes and dependent subsystems

#![deny(missing_docs)]

pub mod bootstrap;
pub mod controller;
pub mod error;
pub mod gate;
pub mod handler;
pub mod handlers;
pub mod health;
pub mod identity;
pub mod manager;
pub mod path;
pub mod readiness;
pub mod registry;
pub mod signal;

#[cfg(test)]
mod test_logs;

pub use bootstrap::{MountPaths, WebhookBootstrap};
pub use controller::{ConfigSyncController, WebhookConfigController};
pub use error::Error;
pub use handler::SetupWebhookWithManager;
pub use health::{health_router, HealthProbe, WebhookServerProbe};
pub use identity::ResourceIdentity;
pub use manager::{Scheme, WebhookManager};
pub use path::WebhookPaths;
pub use readiness::ReadinessCoordinator;
pub use registry::WebhookRegistry;
pub use signal::InitializedSignal;
