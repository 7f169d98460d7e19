use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use lookout_core::access::{cleanup_expired_guests, is_allowed_access};
use lookout_core::types::{FacePatch, NewFace, SettingsPatch, ValidationError};
use lookout_core::{AccessWindow, FaceKind, JsonFileAdapter, Store};
use lookout_remote::{
    DemoDetectionClient, DetectionClient, FaceUpdate, FaceUpload, HttpDetectionClient,
    RemoteError,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "lookout", about = "Lookout security dashboard CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a face locally and enroll it on the device
    Add {
        /// Display name
        #[arg(short, long)]
        name: String,
        /// Image reference stored locally (defaults to a generated avatar)
        #[arg(long)]
        image: Option<String>,
        /// Image files uploaded to the device for enrollment
        #[arg(long = "photo")]
        photos: Vec<PathBuf>,
        /// Mark as a guest with a bounded access window
        #[arg(long)]
        guest: bool,
        /// Access window start (RFC 3339 or YYYY-MM-DDTHH:MM, UTC)
        #[arg(long)]
        start: Option<String>,
        /// Access window end
        #[arg(long)]
        end: Option<String>,
    },
    /// List faces (sweeps expired guests first)
    List {
        /// List the device's face records instead of the local store
        #[arg(long)]
        remote: bool,
    },
    /// Remove a face locally and on the device
    Remove { id: u32 },
    /// Edit a face locally and on the device
    Update {
        id: u32,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(long)]
        image: Option<String>,
        /// Replacement image file sent to the device
        #[arg(long)]
        photo: Option<PathBuf>,
        /// Convert to a guest
        #[arg(long)]
        guest: bool,
        /// Convert to a permanent face
        #[arg(long, conflicts_with = "guest")]
        permanent: bool,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// Show alert history (most recent first)
    Alerts {
        /// Clear the whole history
        #[arg(long)]
        clear: bool,
    },
    /// Show or change notification settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Push the full local face list to the device
    Sync,
    /// Ping the device and report recognition status
    Status,
    /// Check whether a face is currently allowed access
    Access { id: u32 },
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    Set {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        telegram: Option<String>,
        #[arg(long)]
        notifications: Option<bool>,
        /// Detection sensitivity, 0-100
        #[arg(long)]
        sensitivity: Option<u8>,
        #[arg(long)]
        email_alerts: Option<bool>,
        #[arg(long)]
        telegram_alerts: Option<bool>,
    },
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DDTHH:MM`, read as UTC.
fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .map(|dt| dt.and_utc())
        .with_context(|| format!("invalid timestamp: {s}"))
}

/// Access window for a guest face. A guest always needs one here: a
/// windowless guest would be denied forever yet never swept (expiry
/// keys off the end bound), so it is rejected before reaching the
/// store. `FaceKind::Guest { window: None }` stays representable only
/// for previously persisted state.
fn parse_window(start: Option<&str>, end: Option<&str>) -> Result<AccessWindow> {
    match (start, end) {
        (Some(start), Some(end)) => Ok(AccessWindow::new(parse_time(start)?, parse_time(end)?)?),
        _ => bail!("a guest face needs both --start and --end"),
    }
}

/// Local mutations are never rolled back on a device failure; the
/// partial failure is reported and the next `sync` reconciles.
fn report_mirror(operation: &str, result: Result<(), RemoteError>) {
    match result {
        Ok(()) => {}
        Err(err) => eprintln!("warning: saved locally, but device {operation} failed: {err}"),
    }
}

fn env_url() -> String {
    std::env::var("LOOKOUT_API_URL").unwrap_or_else(|_| "http://localhost:8000".to_string())
}

fn env_state_path() -> PathBuf {
    std::env::var("LOOKOUT_STATE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share/lookout/state.json")
        })
}

fn build_client() -> Result<Box<dyn DetectionClient>> {
    let demo = std::env::var("LOOKOUT_DEMO_MODE")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if demo {
        return Ok(Box::new(DemoDetectionClient::new()));
    }
    Ok(Box::new(HttpDetectionClient::new(
        env_url(),
        Duration::from_secs(5),
        Duration::from_secs(3),
    )?))
}

fn describe_kind(kind: &FaceKind) -> String {
    match kind {
        FaceKind::Permanent => "permanent".to_string(),
        FaceKind::Guest { window: None } => "guest (no access window)".to_string(),
        FaceKind::Guest {
            window: Some(window),
        } => format!("guest ({} .. {})", window.start, window.end),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut store = Store::open(Box::new(JsonFileAdapter::new(env_state_path())))?;
    let client = build_client()?;

    match cli.command {
        Commands::Add {
            name,
            image,
            photos,
            guest,
            start,
            end,
        } => {
            if name.trim().is_empty() {
                bail!(ValidationError::EmptyName);
            }
            let window = if guest {
                Some(parse_window(start.as_deref(), end.as_deref())?)
            } else {
                if start.is_some() || end.is_some() {
                    bail!("--start/--end only apply to guest faces");
                }
                None
            };
            let kind = if guest {
                FaceKind::Guest { window }
            } else {
                FaceKind::Permanent
            };

            let image = image.unwrap_or_else(|| {
                format!("https://api.dicebear.com/7.x/avataaars/svg?seed={name}")
            });
            let face = store.add_face(NewFace {
                name: name.clone(),
                image,
                kind,
            });
            println!("added face {} ({})", face.id, face.name);

            report_mirror(
                "enrollment",
                client
                    .upload_face(FaceUpload {
                        name,
                        is_guest: guest,
                        start_time: window.map(|w| w.start),
                        end_time: window.map(|w| w.end),
                        images: photos,
                    })
                    .await,
            );
        }

        Commands::List { remote } => {
            if remote {
                let faces = client.list_faces().await?;
                for face in faces {
                    println!(
                        "{:>4}  {}  {}",
                        face.id,
                        face.name,
                        if face.is_guest { "guest" } else { "permanent" }
                    );
                }
            } else {
                // Rendering the face list doubles as an expiry sweep.
                let removed = cleanup_expired_guests(&mut store, Utc::now());
                if !removed.is_empty() {
                    println!("(removed {} expired guest(s))", removed.len());
                }
                for face in store.faces() {
                    println!("{:>4}  {}  {}", face.id, face.name, describe_kind(&face.kind));
                }
            }
        }

        Commands::Remove { id } => {
            if store.remove_face(id) {
                println!("removed face {id}");
            } else {
                println!("face {id} not found locally");
            }
            report_mirror("delete", client.delete_face(id).await);
        }

        Commands::Update {
            id,
            name,
            image,
            photo,
            guest,
            permanent,
            start,
            end,
        } => {
            let kind = if guest {
                Some(FaceKind::Guest {
                    window: Some(parse_window(start.as_deref(), end.as_deref())?),
                })
            } else if permanent {
                Some(FaceKind::Permanent)
            } else {
                if start.is_some() || end.is_some() {
                    bail!("--start/--end require --guest");
                }
                None
            };

            let Some(face) = store.update_face(
                id,
                FacePatch {
                    name,
                    image,
                    kind,
                },
            ) else {
                println!("face {id} not found locally");
                return Ok(());
            };
            println!("updated face {} ({})", face.id, face.name);

            let mut update = FaceUpdate::from_face(&face);
            update.new_image = photo;
            report_mirror("update", client.update_face(id, update).await);
        }

        Commands::Alerts { clear } => {
            if clear {
                store.clear_alerts();
                println!("alert history cleared");
            } else if store.alerts().is_empty() {
                println!("no alerts");
            } else {
                for alert in store.alerts() {
                    println!("{:>4}  {}  {}  {}", alert.id, alert.time, alert.kind, alert.image);
                }
            }
        }

        Commands::Settings { action } => match action {
            SettingsAction::Show => {
                let s = store.settings();
                println!("email:           {}", s.email);
                println!("telegram:        {}", s.telegram);
                println!("notifications:   {}", s.notifications);
                println!("sensitivity:     {}", s.sensitivity);
                println!("email alerts:    {}", s.email_alerts);
                println!("telegram alerts: {}", s.telegram_alerts);
            }
            SettingsAction::Set {
                email,
                telegram,
                notifications,
                sensitivity,
                email_alerts,
                telegram_alerts,
            } => {
                if let Some(sensitivity) = sensitivity {
                    if sensitivity > 100 {
                        bail!("sensitivity must be 0-100");
                    }
                }
                let settings = store.update_settings(SettingsPatch {
                    email,
                    telegram,
                    notifications,
                    sensitivity,
                    email_alerts,
                    telegram_alerts,
                });
                println!("settings updated");
                report_mirror("settings update", client.update_settings(&settings).await);
            }
        },

        Commands::Sync => {
            client.sync_faces(store.faces()).await?;
            println!("synced {} face(s) to device", store.faces().len());
        }

        Commands::Status => {
            if client.test_connection().await {
                match client.recognition_active().await {
                    Ok(true) => println!("device reachable, recognition running"),
                    Ok(false) => println!("device reachable, recognition stopped"),
                    Err(err) => println!("device reachable, status query failed: {err}"),
                }
            } else {
                println!("device unreachable");
            }
        }

        Commands::Access { id } => {
            if is_allowed_access(&store, id, Utc::now()) {
                println!("face {id}: access allowed");
            } else {
                println!("face {id}: access denied");
            }
        }
    }

    Ok(())
}
