//! Error types for webhook bootstrap and readiness

use std::time::Duration;

use thiserror::Error;

use crate::identity::ResourceIdentity;

/// Errors surfaced by webhook bootstrap, readiness, and handlers
///
/// A duplicated mount path is not represented here: it is a fatal program
/// error and panics instead of being returned.
#[derive(Debug, Error)]
pub enum Error {
    /// A handler failed to register itself with the manager
    #[error("unable to create webhook {handler}: {source}")]
    HandlerSetup {
        /// Handler key (independent name or `controller[index]`)
        handler: String,
        /// Why registration failed
        #[source]
        source: Box<Error>,
    },

    /// The manager's scheme does not know the resource
    #[error("no kind {identity} is registered in the scheme")]
    UnregisteredKind {
        /// The identity the handler asked for
        identity: ResourceIdentity,
    },

    /// The webhook configuration controller did not initialize in time
    #[error("failed to start webhook controller for waiting more than {}s", .timeout.as_secs())]
    StartupTimeout {
        /// The deadline that elapsed
        timeout: Duration,
    },

    /// The surrounding cancellation scope ended before initialization
    #[error("webhook initialization cancelled")]
    Cancelled,

    /// Readiness checked before the controller signalled initialization
    #[error("webhook controller has not initialized")]
    NotInitialized,

    /// A webhook configuration object to sync does not exist
    #[error("{kind} {name} not found")]
    ConfigurationNotFound {
        /// Kind of the missing object
        kind: &'static str,
        /// Name of the missing object
        name: String,
    },

    /// The downstream health probe failed
    #[error("webhook health check failed: {message}")]
    Health {
        /// Description of the failed check
        message: String,
    },

    /// Admission request could not be decoded or handled
    #[error("admission error: {message}")]
    Admission {
        /// Description of what failed
        message: String,
    },

    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Shared configuration or I/O error
    #[error(transparent)]
    Common(#[from] yurt_common::Error),
}

impl Error {
    /// Wrap an error with the key of the handler that produced it
    pub fn handler_setup(handler: impl Into<String>, source: Error) -> Self {
        Self::HandlerSetup {
            handler: handler.into(),
            source: Box::new(source),
        }
    }

    /// Create a health error with the given message
    pub fn health(msg: impl Into<String>) -> Self {
        Self::Health {
            message: msg.into(),
        }
    }

    /// Create an admission error with the given message
    pub fn admission(msg: impl Into<String>) -> Self {
        Self::Admission {
            message: msg.into(),
        }
    }
}
