//! lookout-remote — Boundary to the recognition appliance.
//!
//! The dashboard never does inference itself: it talks to a Raspberry Pi
//! running the recognition service over a small REST API. Everything
//! behind [`DetectionClient`] may fail independently of local state;
//! callers report such failures, they never roll back the local store.

pub mod client;
pub mod demo;
pub mod http;

pub use client::{Detection, DetectionClient, FaceUpdate, FaceUpload, RemoteError, RemoteFace};
pub use demo::DemoDetectionClient;
pub use http::HttpDetectionClient;
