//! Detection client contract and wire types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lookout_core::types::{Face, Settings};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    /// Connection refused, DNS failure, timeout — anything below HTTP.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("device returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("failed to read image {path}: {source}")]
    Image {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The most recent detection snapshot from the recognition service.
///
/// When no face is in frame, `face_detected` is false and the remaining
/// fields are null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub face_detected: bool,
    pub is_known: bool,
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Detection {
    /// A "nothing in frame" snapshot.
    pub fn none(timestamp: DateTime<Utc>) -> Self {
        Self {
            face_detected: false,
            is_known: false,
            name: None,
            image_url: None,
            timestamp,
        }
    }
}

/// A face record as the device reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteFace {
    pub id: u32,
    pub name: String,
    pub is_guest: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&Face> for RemoteFace {
    fn from(face: &Face) -> Self {
        let window = face.kind.window();
        Self {
            id: face.id,
            name: face.name.clone(),
            is_guest: face.kind.is_guest(),
            start_time: window.map(|w| w.start),
            end_time: window.map(|w| w.end),
            image_url: Some(face.image.clone()),
            created_at: Some(face.created_at),
        }
    }
}

/// Payload for enrolling a face on the device. Images are read from
/// disk and sent as multipart file parts.
#[derive(Debug, Clone)]
pub struct FaceUpload {
    pub name: String,
    pub is_guest: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub images: Vec<PathBuf>,
}

/// Payload for editing a face on the device. `new_image` switches the
/// request to multipart; otherwise plain JSON is sent.
#[derive(Debug, Clone)]
pub struct FaceUpdate {
    pub name: String,
    pub is_guest: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub new_image: Option<PathBuf>,
}

impl FaceUpdate {
    /// Mirror payload for a face as currently stored locally.
    pub fn from_face(face: &Face) -> Self {
        let window = face.kind.window();
        Self {
            name: face.name.clone(),
            is_guest: face.kind.is_guest(),
            start_time: window.map(|w| w.start),
            end_time: window.map(|w| w.end),
            new_image: None,
        }
    }
}

/// Everything the dashboard needs from the recognition appliance.
///
/// Any method except `test_connection` may fail; a failure must never
/// corrupt local store state, only surface as a reportable error.
#[async_trait]
pub trait DetectionClient: Send + Sync {
    /// Probe the device. Short timeout, never errors: unreachable,
    /// timed out or non-2xx all resolve to `false`.
    async fn test_connection(&self) -> bool;

    /// Fetch the most recent detection snapshot.
    async fn latest_detection(&self) -> Result<Detection, RemoteError>;

    /// Start the recognition process. Idempotent.
    async fn start_recognition(&self) -> Result<(), RemoteError>;

    /// Stop the recognition process. Idempotent.
    async fn stop_recognition(&self) -> Result<(), RemoteError>;

    /// Whether the recognition process is currently running.
    async fn recognition_active(&self) -> Result<bool, RemoteError>;

    /// All face records currently enrolled on the device.
    async fn list_faces(&self) -> Result<Vec<RemoteFace>, RemoteError>;

    /// Enroll a new face on the device.
    async fn upload_face(&self, upload: FaceUpload) -> Result<(), RemoteError>;

    /// Edit a face on the device.
    async fn update_face(&self, id: u32, update: FaceUpdate) -> Result<(), RemoteError>;

    /// Remove a face from the device.
    async fn delete_face(&self, id: u32) -> Result<(), RemoteError>;

    /// Push the full local face list for bulk reconciliation.
    async fn sync_faces(&self, faces: &[Face]) -> Result<(), RemoteError>;

    /// Push notification settings to the device.
    async fn update_settings(&self, settings: &Settings) -> Result<(), RemoteError>;
}
