//! The overdue predicate.
//!
//! A key is overdue when it is checked out and its current checkout started
//! more than 24 hours ago. The predicate is recomputed on demand against an
//! explicit clock, never cached.

use chrono::{DateTime, Duration, Utc};

use crate::entities::checkout_event::{self, EventAction};
use crate::entities::key::{self, KeyStatus};

/// How long a checkout may run before it counts as overdue.
pub const OVERDUE_THRESHOLD_HOURS: i64 = 24;

/// The most recent event for a key. Ties on the timestamp are not
/// explicitly broken.
#[must_use]
pub fn latest_event_for<'a>(
    events: &'a [checkout_event::Model],
    key_id: &str,
) -> Option<&'a checkout_event::Model> {
    events
        .iter()
        .filter(|e| e.key_id == key_id)
        .max_by_key(|e| e.occurred_at)
}

/// True iff the key is checked out, its most recent event is a `checkout`,
/// and that checkout is strictly older than the threshold as of `now`.
#[must_use]
pub fn is_overdue(
    key: &key::Model,
    events: &[checkout_event::Model],
    now: DateTime<Utc>,
) -> bool {
    if key.status != KeyStatus::CheckedOut {
        return false;
    }
    let Some(latest) = latest_event_for(events, &key.id) else {
        return false;
    };
    if latest.action != EventAction::Checkout {
        return false;
    }
    now - latest.occurred_at > Duration::hours(OVERDUE_THRESHOLD_HOURS)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::entities::key::PropertyType;
    use chrono::TimeZone;

    fn key_with_status(status: KeyStatus) -> key::Model {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap();
        key::Model {
            id: "k1".to_string(),
            property_code: "APT001".to_string(),
            address: "Rua das Flores, 123".to_string(),
            property_type: PropertyType::Apartment,
            cabinet: "A1".to_string(),
            status,
            scan_code: "QR_APT001".to_string(),
            created_at: created,
            updated_at: created,
        }
    }

    fn event(action: EventAction, occurred_at: DateTime<Utc>) -> checkout_event::Model {
        checkout_event::Model {
            id: "e1".to_string(),
            key_id: "k1".to_string(),
            user_id: "u1".to_string(),
            action,
            occurred_at,
            note: None,
            was_overdue: None,
        }
    }

    #[test]
    fn overdue_flips_exactly_past_the_24_hour_mark() {
        let checkout_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single().unwrap();
        let key = key_with_status(KeyStatus::CheckedOut);
        let events = vec![event(EventAction::Checkout, checkout_at)];

        let just_before = checkout_at + Duration::hours(23) + Duration::minutes(59);
        assert!(!is_overdue(&key, &events, just_before));

        let at_threshold = checkout_at + Duration::hours(24);
        assert!(!is_overdue(&key, &events, at_threshold));

        let just_after = checkout_at + Duration::hours(24) + Duration::minutes(1);
        assert!(is_overdue(&key, &events, just_after));
    }

    #[test]
    fn available_keys_are_never_overdue() {
        let checkout_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single().unwrap();
        let key = key_with_status(KeyStatus::Available);
        let events = vec![event(EventAction::Checkout, checkout_at)];
        assert!(!is_overdue(&key, &events, checkout_at + Duration::days(7)));
    }

    #[test]
    fn a_later_return_clears_the_overdue_state() {
        let checkout_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single().unwrap();
        let key = key_with_status(KeyStatus::CheckedOut);
        let mut returned = event(EventAction::Return, checkout_at + Duration::hours(2));
        returned.id = "e2".to_string();
        let events = vec![event(EventAction::Checkout, checkout_at), returned];
        assert!(!is_overdue(&key, &events, checkout_at + Duration::days(7)));
    }

    #[test]
    fn keys_with_no_events_are_not_overdue() {
        let key = key_with_status(KeyStatus::CheckedOut);
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).single().unwrap();
        assert!(!is_overdue(&key, &[], now));
    }
}
