use anyhow::Result;
use lookout_core::{JsonFileAdapter, Store};
use lookout_remote::{DemoDetectionClient, DetectionClient, HttpDetectionClient};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod config;
mod poller;
mod supervisor;
mod sweeper;

use config::Config;
use poller::{DetectionLoop, DetectionStatus};
use supervisor::ConnectionSupervisor;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    tracing::info!(
        api_url = %config.api_url,
        state_path = %config.state_path.display(),
        demo = config.demo_mode,
        "lookoutd starting"
    );

    let store = Store::open(Box::new(JsonFileAdapter::new(&config.state_path)))?.into_shared();

    let client: Arc<dyn DetectionClient> = if config.demo_mode {
        tracing::info!("demo mode: detections will be fabricated locally");
        Arc::new(DemoDetectionClient::new())
    } else {
        Arc::new(HttpDetectionClient::new(
            config.api_url.clone(),
            config.api_timeout,
            config.ping_timeout,
        )?)
    };

    let (detection_loop, mut status_rx) =
        DetectionLoop::new(client.clone(), store.clone(), config.poll_interval);
    let (supervisor, _reachable_rx) =
        ConnectionSupervisor::new(client, detection_loop, config.heartbeat_interval);

    let shutdown = CancellationToken::new();
    let supervisor_task = tokio::spawn(supervisor.run(shutdown.clone()));
    let sweeper_task = tokio::spawn(sweeper::run(
        store.clone(),
        config.sweep_interval,
        shutdown.clone(),
    ));

    // Surface transient status transitions in the log.
    tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let status = status_rx.borrow_and_update().clone();
            match status {
                DetectionStatus::Known(name) => tracing::info!(%name, "known face in frame"),
                DetectionStatus::Unknown(label) => tracing::info!(%label, "unknown face in frame"),
                DetectionStatus::None => tracing::debug!("no face in frame"),
            }
        }
    });

    tracing::info!("lookoutd ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("lookoutd shutting down");
    shutdown.cancel();
    let _ = supervisor_task.await;
    let _ = sweeper_task.await;

    Ok(())
}
