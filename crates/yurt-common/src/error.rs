//! Error types shared across yurt-manager crates
//!
//! Errors carry enough context (field names, paths) to be actionable from a
//! single log line.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for shared yurt-manager operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Invalid or incomplete configuration
    #[error("config error{}: {message}", field_suffix(.field))]
    Config {
        /// Description of what's invalid
        message: String,
        /// The offending config field (e.g., "webhook.port")
        field: Option<String>,
    },

    /// Filesystem error
    #[error("io error for {}: {source}", .path.display())]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Where the error occurred (e.g., "telemetry", "bootstrap")
        context: String,
    },
}

impl Error {
    /// Create a config error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
            field: None,
        }
    }

    /// Create a config error pointing at a specific field
    pub fn config_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create an I/O error for the given path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Create an internal error with context
    pub fn internal(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }
}

fn field_suffix(field: &Option<String>) -> String {
    field.as_deref().map(|f| format!(" [{f}]")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_names_the_field() {
        let err = Error::config_field("webhook.port", "must be non-zero");
        assert_eq!(err.to_string(), "config error [webhook.port]: must be non-zero");

        let err = Error::config("no controllers");
        assert_eq!(err.to_string(), "config error: no controllers");
    }

    #[test]
    fn io_error_includes_path() {
        let err = Error::io(
            "/etc/yurt/config.yaml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/etc/yurt/config.yaml"));
        assert!(msg.contains("missing"));
    }

    #[test]
    fn internal_error_includes_context() {
        let err = Error::internal("telemetry", "subscriber already set");
        assert_eq!(
            err.to_string(),
            "internal error [telemetry]: subscriber already set"
        );
    }
}
