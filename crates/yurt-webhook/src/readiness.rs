//! Webhook readiness coordination
//!
//! Two ways to wait for the webhook side of the process:
//! - [`ReadinessCoordinator::initialize`] gates process startup. It launches
//!   the webhook configuration controller and fails if the controller has not
//!   initialized within [`STARTUP_TIMEOUT`], so the process exits and restarts.
//! - [`ReadinessCoordinator::wait_ready`] gates subsystems inside the process.
//!   It polls [`ReadinessCoordinator::check`] until it passes, however long that
//!   takes, since missing cert material is expected to show up eventually.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::controller::WebhookConfigController;
use crate::health::HealthProbe;
use crate::signal::InitializedSignal;
use crate::Error;

/// Deadline for the controller to initialize after `initialize` is called
pub const STARTUP_TIMEOUT: Duration = Duration::from_secs(20);

/// Interval between readiness polls in `wait_ready`
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Failed polls after this much waiting are logged as warnings
pub const WARN_AFTER: Duration = Duration::from_secs(5);

struct ControllerTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Coordinates the webhook configuration controller and readiness checks
pub struct ReadinessCoordinator {
    signal: InitializedSignal,
    probe: Arc<dyn HealthProbe>,
    task: Mutex<Option<ControllerTask>>,
}

impl ReadinessCoordinator {
    /// Create a coordinator observing `signal` and delegating to `probe`
    pub fn new(signal: InitializedSignal, probe: Arc<dyn HealthProbe>) -> Self {
        Self {
            signal,
            probe,
            task: Mutex::new(None),
        }
    }

    /// The latch the controller fires on first successful sync
    pub fn signal(&self) -> &InitializedSignal {
        &self.signal
    }

    /// Launch `controller` within `scope` and wait for it to initialize
    ///
    /// The controller runs on a child of `scope`, so cancelling `scope` (or
    /// calling [`shutdown`](Self::shutdown)) stops it. Returns
    /// [`Error::StartupTimeout`] if the signal does not fire within
    /// [`STARTUP_TIMEOUT`] and [`Error::Cancelled`] if `scope` ends first.
    pub async fn initialize(
        &self,
        controller: Arc<dyn WebhookConfigController>,
        scope: &CancellationToken,
    ) -> Result<(), Error> {
        let token = scope.child_token();
        let handle = {
            let token = token.clone();
            let signal = self.signal.clone();
            tokio::spawn(async move { controller.run(token, signal).await })
        };

        let previous = self.task.lock().replace(ControllerTask { token, handle });
        if let Some(previous) = previous {
            warn!("Webhook controller initialized twice, stopping the previous instance");
            previous.token.cancel();
        }

        tokio::select! {
            biased;
            _ = self.signal.wait() => {
                info!("Webhook controller initialized");
                Ok(())
            }
            _ = scope.cancelled() => Err(Error::Cancelled),
            _ = tokio::time::sleep(STARTUP_TIMEOUT) => Err(Error::StartupTimeout {
                timeout: STARTUP_TIMEOUT,
            }),
        }
    }

    /// Non-blocking readiness check, safe to call from probe endpoints
    pub async fn check(&self) -> Result<(), Error> {
        if !self.signal.is_set() {
            return Err(Error::NotInitialized);
        }
        self.probe.check().await
    }

    /// Block until `check` passes
    ///
    /// Never fails; callers needing a bound must cancel from outside.
    pub async fn wait_ready(&self) {
        let start = Instant::now();
        loop {
            let elapsed = start.elapsed();
            match self.check().await {
                Ok(()) => return,
                Err(e) if elapsed > WARN_AFTER => {
                    warn!(elapsed = ?elapsed, error = %e, "Failed to wait webhook ready");
                }
                Err(_) => {}
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Stop the controller task and wait for it to exit
    pub async fn shutdown(&self) {
        let Some(task) = self.task.lock().take() else {
            return;
        };
        task.token.cancel();
        if let Err(e) = task.handle.await {
            error!(error = %e, "Webhook controller task failed");
        }
    }
}
