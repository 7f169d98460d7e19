use std::path::PathBuf;
use std::time::Duration;

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Base URL of the recognition appliance (default: http://localhost:8000).
    pub api_url: String,
    /// Timeout applied to every device request.
    pub api_timeout: Duration,
    /// Shorter timeout for the connectivity probe.
    pub ping_timeout: Duration,
    /// Path to the JSON state file.
    pub state_path: PathBuf,
    /// Cadence of the detection poll while recognition is active.
    pub poll_interval: Duration,
    /// Cadence of the connection supervisor's heartbeat.
    pub heartbeat_interval: Duration,
    /// Cadence of the guest-expiry sweep.
    pub sweep_interval: Duration,
    /// Fabricate detections locally instead of talking to a device.
    pub demo_mode: bool,
}

impl Config {
    /// Load configuration from `LOOKOUT_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("lookout");

        let state_path = std::env::var("LOOKOUT_STATE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("state.json"));

        Self {
            api_url: std::env::var("LOOKOUT_API_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            api_timeout: Duration::from_secs(env_u64("LOOKOUT_API_TIMEOUT_SECS", 5)),
            ping_timeout: Duration::from_secs(env_u64("LOOKOUT_PING_TIMEOUT_SECS", 3)),
            state_path,
            poll_interval: Duration::from_millis(env_u64("LOOKOUT_POLL_INTERVAL_MS", 1000)),
            heartbeat_interval: Duration::from_secs(env_u64("LOOKOUT_HEARTBEAT_SECS", 10)),
            sweep_interval: Duration::from_secs(env_u64("LOOKOUT_SWEEP_SECS", 60)),
            demo_mode: std::env::var("LOOKOUT_DEMO_MODE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
