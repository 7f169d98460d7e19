//! Detection polling loop.
//!
//! While recognition is active on the device, a 1 Hz tick fetches the
//! latest detection snapshot, publishes a transient status for the UI,
//! and records an alert for every unknown-face detection. The loop is
//! either Idle (no live session) or Polling (a spawned tick task holds
//! a cancellation token); a session whose device goes unreachable
//! cancels itself.

use chrono::Utc;
use lookout_core::types::NewAlert;
use lookout_core::SharedStore;
use lookout_remote::{Detection, DetectionClient, RemoteError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Transient classification of the most recent poll. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DetectionStatus {
    #[default]
    None,
    Known(String),
    Unknown(String),
}

/// Owns the recognition session and its tick task.
pub struct DetectionLoop {
    client: Arc<dyn DetectionClient>,
    store: SharedStore,
    status_tx: watch::Sender<DetectionStatus>,
    poll_interval: Duration,
    session: Option<CancellationToken>,
}

impl DetectionLoop {
    pub fn new(
        client: Arc<dyn DetectionClient>,
        store: SharedStore,
        poll_interval: Duration,
    ) -> (Self, watch::Receiver<DetectionStatus>) {
        let (status_tx, status_rx) = watch::channel(DetectionStatus::None);
        (
            Self {
                client,
                store,
                status_tx,
                poll_interval,
                session: None,
            },
            status_rx,
        )
    }

    /// Whether a live (not self-cancelled) session exists.
    pub fn is_polling(&self) -> bool {
        self.session.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    /// Start recognition on the device and begin polling. A no-op when
    /// already polling; if the device refuses to start, the loop stays
    /// Idle and the error propagates.
    pub async fn start(&mut self) -> Result<(), RemoteError> {
        if self.is_polling() {
            return Ok(());
        }
        self.client.start_recognition().await?;

        let token = CancellationToken::new();
        tokio::spawn(run_ticks(
            self.client.clone(),
            self.store.clone(),
            self.status_tx.clone(),
            token.clone(),
            self.poll_interval,
        ));
        self.session = Some(token);
        tracing::info!("recognition started; polling for detections");
        Ok(())
    }

    /// Stop recognition and polling. Cancellation is immediate: no tick
    /// fires after this returns, and any in-flight poll discards its
    /// result. The remote stop call is best-effort.
    pub async fn stop(&mut self) {
        self.force_idle();
        if let Err(err) = self.client.stop_recognition().await {
            tracing::warn!(error = %err, "failed to stop recognition on device");
        }
    }

    /// Cancel the session and clear transient state without contacting
    /// the device — used by the supervisor when the device is gone.
    pub fn force_idle(&mut self) {
        if let Some(token) = self.session.take() {
            token.cancel();
        }
        self.status_tx.send_replace(DetectionStatus::None);
    }
}

async fn run_ticks(
    client: Arc<dyn DetectionClient>,
    store: SharedStore,
    status_tx: watch::Sender<DetectionStatus>,
    token: CancellationToken,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    // A slow poll must not cause a burst of catch-up ticks.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        // Fast-fail inside a running session; the supervisor remains
        // the authority on overall reachability.
        if !client.test_connection().await {
            if !token.is_cancelled() {
                tracing::warn!("device unreachable mid-session; polling stopped");
                status_tx.send_replace(DetectionStatus::None);
                token.cancel();
            }
            break;
        }

        // The session may have been cancelled while the probe was in
        // flight; don't issue a pointless fetch.
        if token.is_cancelled() {
            break;
        }

        match client.latest_detection().await {
            // Session may have been cancelled while the request was in
            // flight; a late result must not leave any trace.
            _ if token.is_cancelled() => break,
            Ok(detection) => classify(&detection, &store, &status_tx),
            Err(err) => {
                tracing::warn!(error = %err, "detection poll failed");
                status_tx.send_replace(DetectionStatus::None);
            }
        }
    }
    tracing::debug!("detection tick task exited");
}

fn classify(
    detection: &Detection,
    store: &SharedStore,
    status_tx: &watch::Sender<DetectionStatus>,
) {
    if detection.is_known {
        let name = detection
            .name
            .clone()
            .unwrap_or_else(|| "Authorized person".to_string());
        status_tx.send_replace(DetectionStatus::Known(name));
    } else if detection.face_detected {
        status_tx.send_replace(DetectionStatus::Unknown("Unknown person".to_string()));

        let now = Utc::now();
        let image = detection.image_url.clone().unwrap_or_else(|| {
            format!(
                "https://api.dicebear.com/7.x/avataaars/svg?seed=Unknown{}",
                now.timestamp_millis()
            )
        });
        let alert = store.lock().unwrap().add_alert(NewAlert {
            time: now,
            kind: "Unknown Face".to_string(),
            image,
        });
        tracing::info!(alert_id = alert.id, "unknown face detected; alert recorded");
    } else {
        status_tx.send_replace(DetectionStatus::None);
    }
}
