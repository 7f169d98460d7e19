//! lookout-core — Local state for the Lookout security dashboard.
//!
//! Holds the persisted face/alert/settings store and the guest
//! access-window evaluation that drives automatic guest expiry.

pub mod access;
pub mod store;
pub mod types;

pub use store::{JsonFileAdapter, PersistenceAdapter, SharedStore, Store, StoreError};
pub use types::{AccessWindow, Alert, Face, FaceKind, Settings, ValidationError};
