//! One-shot initialized latch
//!
//! Fired once by the webhook configuration controller after its first
//! successful sync. Any number of tasks may wait on it; waiters that arrive
//! after the transition return immediately.

use std::sync::Arc;

use tokio::sync::watch;

/// Broadcast latch that transitions from unset to set exactly once
#[derive(Clone, Debug)]
pub struct InitializedSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for InitializedSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl InitializedSignal {
    /// Create an unset latch
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Set the latch. Returns `true` only for the call that performed the transition.
    pub fn fire(&self) -> bool {
        self.tx.send_if_modified(|set| {
            if *set {
                false
            } else {
                *set = true;
                true
            }
        })
    }

    /// Whether the latch has been set, without waiting
    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until the latch is set
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|set| *set).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    #[test]
    fn fires_exactly_once() {
        let signal = InitializedSignal::new();
        assert!(!signal.is_set());
        assert!(signal.fire());
        assert!(!signal.fire());
        assert!(signal.is_set());
    }

    #[test]
    fn clones_share_state() {
        let signal = InitializedSignal::new();
        let observer = signal.clone();
        signal.fire();
        assert!(observer.is_set());
    }

    #[tokio::test]
    async fn late_waiter_returns_immediately() {
        let signal = InitializedSignal::new();
        signal.fire();
        tokio::time::timeout(Duration::from_millis(100), signal.wait())
            .await
            .expect("set latch should not block");
    }

    #[tokio::test]
    async fn all_waiters_observe_the_transition() {
        let signal = InitializedSignal::new();
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let signal = signal.clone();
                tokio::spawn(async move { signal.wait().await })
            })
            .collect();

        tokio::task::yield_now().await;
        signal.fire();

        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .expect("waiter should wake")
                .unwrap();
        }
    }
}
