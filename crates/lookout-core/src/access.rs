//! Guest access evaluation and expiry.
//!
//! Permanent faces always have access. Guest faces are allowed only
//! inside their access window (closed interval), and are removed from
//! the store once the window has passed. Both checks take `now` as an
//! argument so the policy is testable against a simulated clock.

use crate::store::Store;
use crate::types::FaceKind;
use chrono::{DateTime, Utc};

/// Whether the face with `face_id` is currently allowed access.
///
/// Missing faces are denied. Guests without a window are denied — a
/// window is required for any guest access, and a guest whose window
/// has not started yet is likewise not allowed in early.
pub fn is_allowed_access(store: &Store, face_id: u32, now: DateTime<Utc>) -> bool {
    let Some(face) = store.face(face_id) else {
        return false;
    };
    match &face.kind {
        FaceKind::Permanent => true,
        FaceKind::Guest { window } => window.is_some_and(|w| w.contains(now)),
    }
}

/// Remove every guest face whose window ended strictly before `now`.
///
/// The removal set is computed before any mutation so the scan never
/// walks a collection it is shrinking. Returns the removed ids; running
/// the sweep again immediately removes nothing.
pub fn cleanup_expired_guests(store: &mut Store, now: DateTime<Utc>) -> Vec<u32> {
    let expired: Vec<u32> = store
        .faces()
        .iter()
        .filter(|f| f.kind.window().is_some_and(|w| w.end < now))
        .map(|f| f.id)
        .collect();

    for id in &expired {
        store.remove_face(*id);
        tracing::info!(face_id = id, "expired guest removed");
    }
    expired
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use crate::types::{AccessWindow, NewFace};
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap()
    }

    fn add_permanent(store: &mut Store, name: &str) -> u32 {
        store
            .add_face(NewFace {
                name: name.into(),
                image: format!("img://{name}"),
                kind: FaceKind::Permanent,
            })
            .id
    }

    fn add_guest(store: &mut Store, name: &str, window: Option<AccessWindow>) -> u32 {
        store
            .add_face(NewFace {
                name: name.into(),
                image: format!("img://{name}"),
                kind: FaceKind::Guest { window },
            })
            .id
    }

    #[test]
    fn test_missing_face_denied() {
        let store = Store::in_memory();
        assert!(!is_allowed_access(&store, 1, at(12, 0)));
    }

    #[test]
    fn test_permanent_always_allowed() {
        let mut store = Store::in_memory();
        let id = add_permanent(&mut store, "Ann");
        assert!(is_allowed_access(&store, id, at(0, 0)));
        assert!(is_allowed_access(&store, id, at(23, 59)));
    }

    #[test]
    fn test_guest_without_window_denied() {
        let mut store = Store::in_memory();
        let id = add_guest(&mut store, "Bob", None);
        assert!(!is_allowed_access(&store, id, at(12, 0)));
    }

    #[test]
    fn test_guest_window_inclusive_at_both_ends() {
        let mut store = Store::in_memory();
        let window = AccessWindow::new(at(8, 0), at(9, 0)).unwrap();
        let id = add_guest(&mut store, "Bob", Some(window));

        assert!(is_allowed_access(&store, id, at(8, 0)));
        assert!(is_allowed_access(&store, id, at(8, 30)));
        assert!(is_allowed_access(&store, id, at(9, 0)));
        assert!(!is_allowed_access(&store, id, at(7, 59)));
        assert!(!is_allowed_access(&store, id, at(9, 1)));
    }

    #[test]
    fn test_not_yet_active_guest_denied() {
        let mut store = Store::in_memory();
        let window = AccessWindow::new(at(14, 0), at(16, 0)).unwrap();
        let id = add_guest(&mut store, "Bob", Some(window));
        assert!(!is_allowed_access(&store, id, at(12, 0)));
    }

    #[test]
    fn test_cleanup_removes_exactly_expired_guests() {
        let mut store = Store::in_memory();
        let ann = add_permanent(&mut store, "Ann");
        let expired = add_guest(
            &mut store,
            "Bob",
            Some(AccessWindow::new(at(8, 0), at(9, 0)).unwrap()),
        );
        let active = add_guest(
            &mut store,
            "Cid",
            Some(AccessWindow::new(at(8, 0), at(18, 0)).unwrap()),
        );
        let unbounded = add_guest(&mut store, "Dee", None);

        let removed = cleanup_expired_guests(&mut store, at(10, 0));
        assert_eq!(removed, vec![expired]);
        assert!(store.face(ann).is_some());
        assert!(store.face(active).is_some());
        assert!(store.face(unbounded).is_some());

        // Second sweep is a no-op.
        assert!(cleanup_expired_guests(&mut store, at(10, 0)).is_empty());
    }

    #[test]
    fn test_cleanup_end_boundary_is_strict() {
        let mut store = Store::in_memory();
        let id = add_guest(
            &mut store,
            "Bob",
            Some(AccessWindow::new(at(8, 0), at(9, 0)).unwrap()),
        );
        // endTime == now is not yet expired
        assert!(cleanup_expired_guests(&mut store, at(9, 0)).is_empty());
        assert!(store.face(id).is_some());
        assert_eq!(cleanup_expired_guests(&mut store, at(9, 1)), vec![id]);
    }

    #[test]
    fn test_add_allow_expire_scenario() {
        let mut store = Store::in_memory();
        let ann = add_permanent(&mut store, "Ann");
        assert_eq!(ann, 1);

        let window = AccessWindow::new(at(8, 0), at(9, 0)).unwrap();
        let bob = add_guest(&mut store, "Bob", Some(window));
        assert_eq!(bob, 2);

        assert!(is_allowed_access(&store, bob, at(8, 30)));

        cleanup_expired_guests(&mut store, at(10, 0));
        assert!(store.face(bob).is_none());
        assert!(store.face(ann).is_some());
        assert_eq!(store.faces().len(), 1);
    }
}
