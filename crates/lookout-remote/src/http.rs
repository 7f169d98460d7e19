//! HTTP implementation of [`DetectionClient`] against the appliance's
//! REST API.
//!
//! Every request carries the configured timeout so a hung device cannot
//! stall a caller; the ping probe uses its own, shorter timeout.

use crate::client::{
    Detection, DetectionClient, FaceUpdate, FaceUpload, RemoteError, RemoteFace,
};
use async_trait::async_trait;
use lookout_core::types::{Face, Settings};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct StatusResponse {
    active: bool,
}

#[derive(Debug, Serialize)]
struct SettingsRequest<'a> {
    sensitivity: u8,
    email_alerts: bool,
    telegram_alerts: bool,
    email: &'a str,
    telegram: &'a str,
}

/// REST client for the recognition appliance.
pub struct HttpDetectionClient {
    http: reqwest::Client,
    base_url: String,
    ping_timeout: Duration,
}

impl HttpDetectionClient {
    /// `base_url` is the device root, e.g. `http://192.168.1.20:8000`.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        ping_timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self {
            http,
            base_url,
            ping_timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn ensure_ok(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Status { status, body })
    }

    async fn post_empty(&self, path: &str) -> Result<(), RemoteError> {
        let response = self.http.post(self.url(path)).send().await?;
        Self::ensure_ok(response).await?;
        Ok(())
    }
}

async fn image_part(path: &Path) -> Result<Part, RemoteError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| RemoteError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    Ok(Part::bytes(bytes).file_name(file_name))
}

fn guest_fields(
    mut form: Form,
    is_guest: bool,
    start: Option<chrono::DateTime<chrono::Utc>>,
    end: Option<chrono::DateTime<chrono::Utc>>,
) -> Form {
    form = form.text("is_guest", is_guest.to_string());
    if is_guest {
        if let Some(start) = start {
            form = form.text("start_time", start.to_rfc3339());
        }
        if let Some(end) = end {
            form = form.text("end_time", end.to_rfc3339());
        }
    }
    form
}

#[async_trait]
impl DetectionClient for HttpDetectionClient {
    async fn test_connection(&self) -> bool {
        let result = self
            .http
            .get(self.url("/ping"))
            .timeout(self.ping_timeout)
            .send()
            .await;
        match result {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                tracing::debug!(error = %err, "device ping failed");
                false
            }
        }
    }

    async fn latest_detection(&self) -> Result<Detection, RemoteError> {
        let response = self.http.get(self.url("/detection/latest")).send().await?;
        Ok(Self::ensure_ok(response).await?.json().await?)
    }

    async fn start_recognition(&self) -> Result<(), RemoteError> {
        self.post_empty("/recognition/start").await
    }

    async fn stop_recognition(&self) -> Result<(), RemoteError> {
        self.post_empty("/recognition/stop").await
    }

    async fn recognition_active(&self) -> Result<bool, RemoteError> {
        let response = self.http.get(self.url("/status")).send().await?;
        let status: StatusResponse = Self::ensure_ok(response).await?.json().await?;
        Ok(status.active)
    }

    async fn list_faces(&self) -> Result<Vec<RemoteFace>, RemoteError> {
        let response = self.http.get(self.url("/faces")).send().await?;
        Ok(Self::ensure_ok(response).await?.json().await?)
    }

    async fn upload_face(&self, upload: FaceUpload) -> Result<(), RemoteError> {
        let mut form = Form::new().text("name", upload.name.clone());
        form = guest_fields(form, upload.is_guest, upload.start_time, upload.end_time);
        for (i, path) in upload.images.iter().enumerate() {
            form = form.part(format!("image_{i}"), image_part(path).await?);
        }

        let response = self
            .http
            .post(self.url("/faces/upload"))
            .multipart(form)
            .send()
            .await?;
        Self::ensure_ok(response).await?;
        Ok(())
    }

    async fn update_face(&self, id: u32, update: FaceUpdate) -> Result<(), RemoteError> {
        let url = self.url(&format!("/faces/{id}"));

        // Replacing the image requires multipart; a metadata-only edit
        // is plain JSON.
        let response = if let Some(path) = &update.new_image {
            let mut form = Form::new().text("name", update.name.clone());
            form = guest_fields(form, update.is_guest, update.start_time, update.end_time);
            form = form.part("image", image_part(path).await?);
            self.http.put(url).multipart(form).send().await?
        } else {
            let body = json!({
                "name": update.name,
                "is_guest": update.is_guest,
                "start_time": update.start_time,
                "end_time": update.end_time,
            });
            self.http.put(url).json(&body).send().await?
        };
        Self::ensure_ok(response).await?;
        Ok(())
    }

    async fn delete_face(&self, id: u32) -> Result<(), RemoteError> {
        let response = self
            .http
            .delete(self.url(&format!("/faces/{id}")))
            .send()
            .await?;
        Self::ensure_ok(response).await?;
        Ok(())
    }

    async fn sync_faces(&self, faces: &[Face]) -> Result<(), RemoteError> {
        let faces: Vec<RemoteFace> = faces.iter().map(RemoteFace::from).collect();
        let response = self
            .http
            .post(self.url("/faces/sync"))
            .json(&json!({ "faces": faces }))
            .send()
            .await?;
        Self::ensure_ok(response).await?;
        Ok(())
    }

    async fn update_settings(&self, settings: &Settings) -> Result<(), RemoteError> {
        let body = SettingsRequest {
            sensitivity: settings.sensitivity,
            email_alerts: settings.email_alerts,
            telegram_alerts: settings.telegram_alerts,
            email: &settings.email,
            telegram: &settings.telegram,
        };
        let response = self.http.post(self.url("/settings")).json(&body).send().await?;
        Self::ensure_ok(response).await?;
        Ok(())
    }
}
