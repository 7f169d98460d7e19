//! Offline substitute for the appliance.
//!
//! Fabricates detection snapshots and accepts mirror calls without any
//! network I/O, behind the same [`DetectionClient`] contract as the
//! real device. Used for demo sessions and tests only; the production
//! HTTP client never routes through this code.

use crate::client::{
    Detection, DetectionClient, FaceUpdate, FaceUpload, RemoteError, RemoteFace,
};
use async_trait::async_trait;
use chrono::Utc;
use lookout_core::types::{Face, Settings};
use std::sync::Mutex;

fn avatar(seed: &str) -> String {
    format!("https://api.dicebear.com/7.x/avataaars/svg?seed={seed}")
}

struct DemoState {
    active: bool,
    faces: Vec<RemoteFace>,
    last: Detection,
}

/// Fabricating [`DetectionClient`]: always reachable, never errors.
pub struct DemoDetectionClient {
    state: Mutex<DemoState>,
}

impl Default for DemoDetectionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoDetectionClient {
    /// Starts with a small seeded face list, recognition inactive.
    pub fn new() -> Self {
        let faces = ["John Doe", "Jane Smith", "Mike Johnson"]
            .iter()
            .enumerate()
            .map(|(i, name)| RemoteFace {
                id: i as u32 + 1,
                name: (*name).to_string(),
                is_guest: i == 1,
                start_time: None,
                end_time: None,
                image_url: Some(avatar(name)),
                created_at: Some(Utc::now()),
            })
            .collect();

        Self {
            state: Mutex::new(DemoState {
                active: false,
                faces,
                last: Detection::none(Utc::now()),
            }),
        }
    }

    /// Roll a fresh fabricated detection: 70% chance something is in
    /// frame, and half of those are a known face from the seeded list.
    fn fabricate(state: &mut DemoState) -> Detection {
        let roll = fastrand::f32();
        state.last = if roll < 0.7 {
            let is_known = roll < 0.35 && !state.faces.is_empty();
            let name = is_known
                .then(|| state.faces[fastrand::usize(..state.faces.len())].name.clone());
            Detection {
                face_detected: true,
                is_known,
                image_url: name
                    .as_deref()
                    .map(avatar)
                    .or_else(|| Some(avatar("Unknown"))),
                name,
                timestamp: Utc::now(),
            }
        } else {
            Detection::none(Utc::now())
        };
        state.last.clone()
    }
}

#[async_trait]
impl DetectionClient for DemoDetectionClient {
    async fn test_connection(&self) -> bool {
        true
    }

    async fn latest_detection(&self) -> Result<Detection, RemoteError> {
        let mut state = self.state.lock().unwrap();
        if state.active {
            Ok(Self::fabricate(&mut state))
        } else {
            Ok(state.last.clone())
        }
    }

    async fn start_recognition(&self) -> Result<(), RemoteError> {
        self.state.lock().unwrap().active = true;
        Ok(())
    }

    async fn stop_recognition(&self) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.active = false;
        // Inactive means nothing in frame; a stale snapshot must not
        // keep reporting a face.
        state.last = Detection::none(Utc::now());
        Ok(())
    }

    async fn recognition_active(&self) -> Result<bool, RemoteError> {
        Ok(self.state.lock().unwrap().active)
    }

    async fn list_faces(&self) -> Result<Vec<RemoteFace>, RemoteError> {
        Ok(self.state.lock().unwrap().faces.clone())
    }

    async fn upload_face(&self, upload: FaceUpload) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        let id = state.faces.iter().map(|f| f.id).max().unwrap_or(0) + 1;
        let image_url = Some(avatar(&upload.name));
        state.faces.push(RemoteFace {
            id,
            name: upload.name,
            is_guest: upload.is_guest,
            start_time: upload.start_time,
            end_time: upload.end_time,
            image_url,
            created_at: Some(Utc::now()),
        });
        Ok(())
    }

    async fn update_face(&self, id: u32, update: FaceUpdate) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        if let Some(face) = state.faces.iter_mut().find(|f| f.id == id) {
            face.name = update.name;
            face.is_guest = update.is_guest;
            face.start_time = update.start_time;
            face.end_time = update.end_time;
            if update.new_image.is_some() {
                face.image_url = Some(avatar(&face.name));
            }
        }
        Ok(())
    }

    async fn delete_face(&self, id: u32) -> Result<(), RemoteError> {
        self.state.lock().unwrap().faces.retain(|f| f.id != id);
        Ok(())
    }

    async fn sync_faces(&self, faces: &[Face]) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.faces = faces.iter().map(RemoteFace::from).collect();
        Ok(())
    }

    async fn update_settings(&self, _settings: &Settings) -> Result<(), RemoteError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inactive_yields_no_detection() {
        let client = DemoDetectionClient::new();
        let detection = client.latest_detection().await.unwrap();
        assert!(!detection.face_detected);
        assert!(detection.name.is_none());
        assert!(detection.image_url.is_none());

        // Stopping after a run of fabricated detections clears the last
        // snapshot too, even if it had a face in frame.
        client.start_recognition().await.unwrap();
        for _ in 0..20 {
            client.latest_detection().await.unwrap();
        }
        client.stop_recognition().await.unwrap();
        let detection = client.latest_detection().await.unwrap();
        assert!(!detection.face_detected);
        assert!(detection.name.is_none());
        assert!(detection.image_url.is_none());
    }

    #[tokio::test]
    async fn test_start_stop_idempotent() {
        let client = DemoDetectionClient::new();
        client.start_recognition().await.unwrap();
        client.start_recognition().await.unwrap();
        assert!(client.recognition_active().await.unwrap());
        client.stop_recognition().await.unwrap();
        client.stop_recognition().await.unwrap();
        assert!(!client.recognition_active().await.unwrap());
    }

    #[tokio::test]
    async fn test_active_detection_is_well_formed() {
        let client = DemoDetectionClient::new();
        client.start_recognition().await.unwrap();
        for _ in 0..50 {
            let d = client.latest_detection().await.unwrap();
            if d.face_detected {
                assert!(d.image_url.is_some());
                if d.is_known {
                    assert!(d.name.is_some());
                }
            } else {
                assert!(d.name.is_none());
                assert!(d.image_url.is_none());
            }
        }
    }

    #[tokio::test]
    async fn test_upload_assigns_next_id() {
        let client = DemoDetectionClient::new();
        client
            .upload_face(FaceUpload {
                name: "Ann".into(),
                is_guest: false,
                start_time: None,
                end_time: None,
                images: vec![],
            })
            .await
            .unwrap();
        let faces = client.list_faces().await.unwrap();
        assert_eq!(faces.last().unwrap().id, 4);

        client.delete_face(4).await.unwrap();
        assert_eq!(client.list_faces().await.unwrap().len(), 3);
    }
}
