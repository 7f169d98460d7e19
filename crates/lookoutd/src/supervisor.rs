//! Connection supervisor.
//!
//! A heartbeat slower than the detection poll probes the device and is
//! the authority on whether polling may run at all. Reachability
//! transitions start or suspend the detection loop; the loop's own
//! per-tick probe is only a fast-fail inside a running session.

use crate::poller::DetectionLoop;
use lookout_remote::DetectionClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub struct ConnectionSupervisor {
    client: Arc<dyn DetectionClient>,
    detection_loop: DetectionLoop,
    heartbeat: Duration,
    reachable: bool,
    reachable_tx: watch::Sender<bool>,
}

impl ConnectionSupervisor {
    pub fn new(
        client: Arc<dyn DetectionClient>,
        detection_loop: DetectionLoop,
        heartbeat: Duration,
    ) -> (Self, watch::Receiver<bool>) {
        let (reachable_tx, reachable_rx) = watch::channel(false);
        (
            Self {
                client,
                detection_loop,
                heartbeat,
                // Starts pessimistic: the first heartbeat decides.
                reachable: false,
                reachable_tx,
            },
            reachable_rx,
        )
    }

    /// Heartbeat until `shutdown` fires, then stop the detection loop.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.heartbeat);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            self.beat().await;
        }

        self.detection_loop.stop().await;
        tracing::info!("connection supervisor stopped");
    }

    /// One heartbeat: probe, then reconcile the loop with the result.
    async fn beat(&mut self) {
        let reachable = self.client.test_connection().await;

        match (self.reachable, reachable) {
            (false, true) => {
                tracing::info!("device reachable; starting recognition");
                self.start_loop().await;
            }
            (true, false) => {
                tracing::warn!("device unreachable; suspending detection");
                self.detection_loop.force_idle();
            }
            (true, true) => {
                // A transient blip may have made a session cancel itself
                // between heartbeats. Bring it back up.
                if !self.detection_loop.is_polling() {
                    self.start_loop().await;
                }
            }
            (false, false) => {}
        }

        self.reachable = reachable;
        self.reachable_tx.send_replace(reachable);
    }

    async fn start_loop(&mut self) {
        if let Err(err) = self.detection_loop.start().await {
            tracing::warn!(error = %err, "failed to start recognition; will retry on next heartbeat");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::tests::{known_detection, ScriptedClient};
    use crate::poller::DetectionStatus;
    use lookout_core::Store;
    use std::sync::atomic::Ordering;

    #[tokio::test(start_paused = true)]
    async fn test_reachable_transition_starts_polling() {
        let client = ScriptedClient::new([true], [known_detection("Ann")]);
        let store = Store::in_memory().into_shared();
        let (detection_loop, _status_rx) =
            DetectionLoop::new(client.clone(), store, Duration::from_secs(1));
        let (mut supervisor, reachable_rx) =
            ConnectionSupervisor::new(client.clone(), detection_loop, Duration::from_secs(10));

        supervisor.beat().await;
        assert!(*reachable_rx.borrow());
        assert!(supervisor.detection_loop.is_polling());
        assert_eq!(client.started.load(Ordering::SeqCst), 1);

        // Still reachable with a live session: no second start call.
        supervisor.beat().await;
        assert_eq!(client.started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_transition_forces_idle() {
        // Probe answers: supervisor start, one loop tick, then the
        // device is gone for everyone.
        let client = ScriptedClient::new([true, true, false], [known_detection("Ann")]);
        let store = Store::in_memory().into_shared();
        let (detection_loop, status_rx) =
            DetectionLoop::new(client.clone(), store.clone(), Duration::from_secs(1));
        let (mut supervisor, reachable_rx) =
            ConnectionSupervisor::new(client.clone(), detection_loop, Duration::from_secs(10));

        supervisor.beat().await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(supervisor.detection_loop.is_polling());

        supervisor.beat().await; // observes the outage
        assert!(!*reachable_rx.borrow());
        assert!(!supervisor.detection_loop.is_polling());
        assert_eq!(*status_rx.borrow(), DetectionStatus::None);

        // No further ticks: alert history stays frozen.
        let alerts = store.lock().unwrap().alerts().len();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(store.lock().unwrap().alerts().len(), alerts);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_restarts_recognition() {
        let client = ScriptedClient::new([false, true], [known_detection("Ann")]);
        let store = Store::in_memory().into_shared();
        let (detection_loop, _status_rx) =
            DetectionLoop::new(client.clone(), store, Duration::from_secs(1));
        let (mut supervisor, reachable_rx) =
            ConnectionSupervisor::new(client.clone(), detection_loop, Duration::from_secs(10));

        supervisor.beat().await;
        assert!(!*reachable_rx.borrow());
        assert!(!supervisor.detection_loop.is_polling());
        assert_eq!(client.started.load(Ordering::SeqCst), 0);

        supervisor.beat().await;
        assert!(*reachable_rx.borrow());
        assert!(supervisor.detection_loop.is_polling());
        assert_eq!(client.started.load(Ordering::SeqCst), 1);
    }
}
