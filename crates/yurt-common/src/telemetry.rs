//! Logging initialization
//!
//! Sets up a `tracing` subscriber with an `EnvFilter` and either JSON
//! structured output (the default for in-cluster runs) or plain text.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::{LogConfig, LogFormat};
use crate::{Error, Result};

/// Filter used when neither `RUST_LOG` nor the config supplies one
pub const DEFAULT_LOG_FILTER: &str = "info,yurt=debug,kube=info,tower=warn,hyper=warn";

/// Build the filter: `RUST_LOG` wins, then the configured directive, then the default
fn build_filter(config: &LogConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directive = config.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER);
    EnvFilter::try_new(directive).map_err(|e| {
        Error::config_field("log.filter", format!("invalid filter '{directive}': {e}"))
    })
}

/// Install the global tracing subscriber
///
/// Fails if the filter directive is invalid or a subscriber is already set.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = build_filter(config)?;

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| Error::internal("telemetry", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }

    #[test]
    fn configured_filter_is_used_when_valid() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LogConfig {
            filter: Some("warn".to_string()),
            ..Default::default()
        };
        assert!(build_filter(&config).is_ok());
    }

    #[test]
    fn invalid_filter_is_a_config_error() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LogConfig {
            filter: Some("info,yurt=notalevel".to_string()),
            ..Default::default()
        };
        match build_filter(&config) {
            Err(Error::Config { field, .. }) => assert_eq!(field.as_deref(), Some("log.filter")),
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }
    }
}
