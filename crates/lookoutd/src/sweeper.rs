//! Periodic guest-expiry sweep.
//!
//! Runs once immediately at startup and then on a fixed interval
//! (default one minute), removing guest faces whose access window has
//! passed.

use chrono::Utc;
use lookout_core::access::cleanup_expired_guests;
use lookout_core::SharedStore;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub async fn run(store: SharedStore, period: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let removed = {
            let mut store = store.lock().unwrap();
            cleanup_expired_guests(&mut store, Utc::now())
        };
        if !removed.is_empty() {
            tracing::info!(count = removed.len(), "guest expiry sweep removed faces");
        }
    }
    tracing::info!("guest expiry sweeper stopped");
}
