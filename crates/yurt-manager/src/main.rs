//! yurt-manager - edge controller manager hosting the OpenYurt admission webhooks

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use clap::{Parser, Subcommand};
use kube::Client;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use yurt_common::config::LogFormat;
use yurt_common::{telemetry, CompletedConfig, ManagerConfig, WebhookConfig};
use yurt_webhook::handlers::{build_registry, openyurt_scheme};
use yurt_webhook::{
    health_router, ConfigSyncController, InitializedSignal, ReadinessCoordinator,
    WebhookBootstrap, WebhookManager, WebhookServerProbe,
};

/// Grace period for in-flight admission requests on shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Interval between checks for the serving certificate before TLS starts
const CERT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// yurt-manager - controller manager for OpenYurt edge clusters
#[derive(Parser, Debug)]
#[command(name = "yurt-manager", version, about, long_about = None)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(long, env = "YURT_MANAGER_CONFIG")]
    config: Option<PathBuf>,

    /// Controllers to enable (`*` for all, `-name` to disable one)
    #[arg(long, env = "YURT_CONTROLLERS", value_delimiter = ',')]
    controllers: Option<Vec<String>>,

    /// Independent webhooks to disable (`*` for all, `-name` to keep one)
    #[arg(long, env = "YURT_DISABLED_WEBHOOKS", value_delimiter = ',')]
    disabled_webhooks: Option<Vec<String>>,

    /// Port for the HTTPS webhook server
    #[arg(long, env = "YURT_WEBHOOK_PORT")]
    webhook_port: Option<u16>,

    /// Directory holding tls.crt, tls.key and ca.crt
    #[arg(long, env = "YURT_WEBHOOK_CERT_DIR")]
    cert_dir: Option<PathBuf>,

    /// Port for /healthz and /readyz
    #[arg(long, env = "YURT_HEALTH_PORT")]
    health_port: Option<u16>,

    /// Log output format (json or text)
    #[arg(long, env = "YURT_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Serve webhooks and keep their cluster configuration in sync (default)
    Run,
    /// Print the webhook paths that would be mounted, without cluster access
    Paths,
}

impl Cli {
    /// Layer flag and environment overrides on top of the file configuration
    fn apply(self, mut config: ManagerConfig) -> ManagerConfig {
        if let Some(controllers) = self.controllers {
            config.generic.controllers = controllers;
        }
        if let Some(disabled) = self.disabled_webhooks {
            config.generic.disabled_webhooks = disabled;
        }
        if let Some(port) = self.webhook_port {
            config.webhook.port = port;
        }
        if let Some(dir) = self.cert_dir {
            config.webhook.cert_dir = dir;
        }
        if let Some(port) = self.health_port {
            config.health.port = port;
        }
        if let Some(format) = self.log_format {
            config.log.format = format;
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!("CRITICAL: Failed to install crypto provider: {:?}", e);
        std::process::exit(1);
    }

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run);
    let file_config = ManagerConfig::load(cli.config.as_deref())?;
    let config = cli.apply(file_config).complete()?;

    telemetry::init_logging(&config.log)?;

    match command {
        Commands::Run => run(config).await,
        Commands::Paths => print_paths(&config),
    }
}

/// Run bootstrap against an offline manager and print the accepted paths
fn print_paths(config: &CompletedConfig) -> anyhow::Result<()> {
    let mgr = WebhookManager::offline(openyurt_scheme());
    let paths = WebhookBootstrap::new(build_registry()).setup_all(&config.generic, &mgr)?;
    for path in paths.iter() {
        println!("{path}");
    }
    Ok(())
}

async fn run(config: CompletedConfig) -> anyhow::Result<()> {
    let client = Client::try_default()
        .await
        .context("failed to create kubernetes client")?;

    let mgr = WebhookManager::new(client.clone(), openyurt_scheme());
    let paths = WebhookBootstrap::new(build_registry())
        .setup_all(&config.generic, &mgr)
        .context("unable to set up webhooks")?;
    let paths = Arc::new(paths);
    info!(count = paths.len(), "Webhook bootstrap complete");

    let readiness = Arc::new(ReadinessCoordinator::new(
        InitializedSignal::new(),
        Arc::new(WebhookServerProbe::from_config(&config.webhook)),
    ));
    let shutdown = CancellationToken::new();

    let webhook_server = tokio::spawn(serve_webhooks(
        mgr.into_router(),
        config.webhook.clone(),
        shutdown.clone(),
    ));
    let health_server = tokio::spawn(serve_health(
        health_router(readiness.clone()),
        SocketAddr::from(([0, 0, 0, 0], config.health.port)),
        shutdown.clone(),
    ));

    let controller = Arc::new(ConfigSyncController::with_client(
        client,
        paths,
        config.webhook.clone(),
    ));
    if let Err(e) = readiness.initialize(controller, &shutdown).await {
        error!(error = %e, "Failed to initialize webhook");
        shutdown.cancel();
        readiness.shutdown().await;
        return Err(e.into());
    }

    {
        let readiness = readiness.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = readiness.wait_ready() => info!("Webhook server is ready"),
            }
        });
    }

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
        }
        _ = shutdown.cancelled() => {}
    }

    shutdown.cancel();
    readiness.shutdown().await;
    for task in [webhook_server, health_server] {
        if let Err(e) = task.await {
            error!(error = %e, "Server task failed");
        }
    }
    info!("yurt-manager stopped");
    Ok(())
}

/// Serve the admission router over TLS once the serving certificate exists
async fn serve_webhooks(router: Router, config: WebhookConfig, shutdown: CancellationToken) {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let tls = loop {
        match RustlsConfig::from_pem_file(config.cert_path(), config.key_path()).await {
            Ok(tls) => break tls,
            Err(e) => {
                warn!(
                    cert_dir = %config.cert_dir.display(),
                    error = %e,
                    "Serving certificate not available yet"
                );
            }
        }
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(CERT_POLL_INTERVAL) => {}
        }
    };

    let handle = Handle::new();
    {
        let handle = handle.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            shutdown.cancelled().await;
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        });
    }

    info!(addr = %addr, "Starting HTTPS webhook server");
    if let Err(e) = axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(router.into_make_service())
        .await
    {
        error!(error = %e, "Webhook server error");
        shutdown.cancel();
    }
}

/// Serve the probe endpoints over plain HTTP
async fn serve_health(router: Router, addr: SocketAddr, shutdown: CancellationToken) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %addr, error = %e, "Failed to bind health server");
            shutdown.cancel();
            return;
        }
    };

    info!(addr = %addr, "Starting health server");
    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await
    {
        error!(error = %e, "Health server error");
        shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file_configuration() {
        let file = ManagerConfig::from_yaml(
            "generic:\n  controllers: [nodepool]\nwebhook:\n  port: 9443\n",
        )
        .unwrap();
        let cli = Cli::parse_from([
            "yurt-manager",
            "--controllers",
            "*,-raven",
            "--disabled-webhooks",
            "pod",
            "--log-format",
            "text",
        ]);

        let config = cli.apply(file);
        assert_eq!(config.generic.controllers, vec!["*", "-raven"]);
        assert_eq!(config.generic.disabled_webhooks, vec!["pod"]);
        assert_eq!(config.webhook.port, 9443);
        assert_eq!(config.log.format, LogFormat::Text);
    }

    #[test]
    fn file_values_survive_without_flags() {
        let file = ManagerConfig::from_yaml("generic:\n  controllers: [nodepool]\n").unwrap();
        let config = Cli::parse_from(["yurt-manager"]).apply(file);
        assert_eq!(config.generic.controllers, vec!["nodepool"]);
    }

    #[test]
    fn paths_subcommand_parses() {
        let cli = Cli::parse_from(["yurt-manager", "paths"]);
        assert_eq!(cli.command, Some(Commands::Paths));
    }

    #[test]
    fn print_paths_runs_offline() {
        print_paths(&CompletedConfig::default()).unwrap();
    }
}
