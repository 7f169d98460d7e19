use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("guest access window ends before it starts ({start} > {end})")]
    WindowInverted {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("face name must not be empty")]
    EmptyName,
}

/// Bounded time interval during which a guest face is granted access.
///
/// Both bounds always exist together; a guest without a window is
/// represented as `FaceKind::Guest { window: None }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl AccessWindow {
    /// Construct a window, rejecting `start > end`.
    ///
    /// Ordering is validated here, at the add/edit boundary — the store
    /// accepts whatever window it is handed.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::WindowInverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Whether `now` falls inside the window. Both ends are inclusive.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        now >= self.start && now <= self.end
    }
}

/// Whether a face is a permanent resident or a time-bounded guest.
///
/// Guest access-window fields only exist on the guest variant, so a
/// permanent face structurally cannot carry a stale window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FaceKind {
    Permanent,
    Guest {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        window: Option<AccessWindow>,
    },
}

impl FaceKind {
    pub fn is_guest(&self) -> bool {
        matches!(self, FaceKind::Guest { .. })
    }

    pub fn window(&self) -> Option<&AccessWindow> {
        match self {
            FaceKind::Guest { window } => window.as_ref(),
            FaceKind::Permanent => None,
        }
    }
}

/// A known identity enrolled in the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub id: u32,
    pub name: String,
    /// Reference to a representative image. The store never owns image
    /// bytes, only the reference.
    pub image: String,
    #[serde(flatten)]
    pub kind: FaceKind,
    pub created_at: DateTime<Utc>,
}

/// Face fields supplied by the caller; `id` and `created_at` are
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct NewFace {
    pub name: String,
    pub image: String,
    pub kind: FaceKind,
}

/// Partial face update. Absent fields are left untouched; `id` and
/// `created_at` are not representable here and so can never be patched.
#[derive(Debug, Clone, Default)]
pub struct FacePatch {
    pub name: Option<String>,
    pub image: Option<String>,
    pub kind: Option<FaceKind>,
}

/// One unknown-face detection, recorded for the alert history panel.
/// Alerts are immutable; the collection is only appended to (newest
/// first) or cleared wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: u32,
    pub time: DateTime<Utc>,
    /// Classification label, e.g. "Unknown Face".
    #[serde(rename = "type")]
    pub kind: String,
    /// Reference to a snapshot image of the detection.
    pub image: String,
}

#[derive(Debug, Clone)]
pub struct NewAlert {
    pub time: DateTime<Utc>,
    pub kind: String,
    pub image: String,
}

/// Notification settings mirrored to the remote device. A single
/// instance lives in the store for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub email: String,
    pub telegram: String,
    pub notifications: bool,
    /// Detection sensitivity, 0–100.
    pub sensitivity: u8,
    pub email_alerts: bool,
    pub telegram_alerts: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            email: String::new(),
            telegram: String::new(),
            notifications: false,
            sensitivity: 70,
            email_alerts: false,
            telegram_alerts: false,
        }
    }
}

/// Partial settings update, shallow-merged field by field.
#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub email: Option<String>,
    pub telegram: Option<String>,
    pub notifications: Option<bool>,
    pub sensitivity: Option<u8>,
    pub email_alerts: Option<bool>,
    pub telegram_alerts: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn test_window_rejects_inverted_bounds() {
        assert!(AccessWindow::new(at(9), at(8)).is_err());
        assert!(AccessWindow::new(at(8), at(8)).is_ok());
    }

    #[test]
    fn test_window_is_closed_interval() {
        let w = AccessWindow::new(at(8), at(9)).unwrap();
        assert!(w.contains(at(8)));
        assert!(w.contains(at(9)));
        assert!(!w.contains(at(7)));
        assert!(!w.contains(at(10)));
    }

    #[test]
    fn test_face_kind_serde_tagging() {
        let face = Face {
            id: 1,
            name: "Ann".into(),
            image: "img://ann".into(),
            kind: FaceKind::Permanent,
            created_at: at(0),
        };
        let json = serde_json::to_value(&face).unwrap();
        assert_eq!(json["kind"], "permanent");
        assert!(json.get("window").is_none());

        let back: Face = serde_json::from_value(json).unwrap();
        assert_eq!(back, face);
    }
}
