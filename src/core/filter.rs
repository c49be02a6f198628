//! Status/search/type filtering of the key set.

use chrono::{DateTime, Utc};

use crate::core::overdue;
use crate::entities::checkout_event;
use crate::entities::key::{self, KeyStatus, PropertyType};

/// Which status bucket to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusBucket {
    /// Every key
    #[default]
    All,
    /// Keys in their cabinet slot
    Available,
    /// Keys currently held by a user
    CheckedOut,
    /// Checked-out keys past the overdue threshold
    Overdue,
}

/// A key-list filter. The default keeps everything.
#[derive(Debug, Clone, Default)]
pub struct KeyFilter {
    /// Status bucket to keep
    pub status: StatusBucket,
    /// Case-insensitive substring matched against property code and address
    pub search: Option<String>,
    /// Keep only keys of this property type
    pub property_type: Option<PropertyType>,
}

/// Applies `filter` to a key/event snapshot as of `now`. The `Overdue`
/// bucket evaluates the overdue predicate per key.
#[must_use]
pub fn filter_keys(
    keys: &[key::Model],
    events: &[checkout_event::Model],
    filter: &KeyFilter,
    now: DateTime<Utc>,
) -> Vec<key::Model> {
    let search = filter
        .search
        .as_ref()
        .map(|s| s.to_lowercase())
        .filter(|s| !s.is_empty());

    keys.iter()
        .filter(|key| match filter.status {
            StatusBucket::All => true,
            StatusBucket::Available => key.status == KeyStatus::Available,
            StatusBucket::CheckedOut => key.status == KeyStatus::CheckedOut,
            StatusBucket::Overdue => overdue::is_overdue(key, events, now),
        })
        .filter(|key| {
            search.as_ref().is_none_or(|needle| {
                key.property_code.to_lowercase().contains(needle)
                    || key.address.to_lowercase().contains(needle)
            })
        })
        .filter(|key| {
            filter
                .property_type
                .is_none_or(|wanted| key.property_type == wanted)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::TimeZone;

    fn sample_keys() -> Vec<key::Model> {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap();
        let build = |id: &str, code: &str, address: &str, tipo: PropertyType, status: KeyStatus| {
            key::Model {
                id: id.to_string(),
                property_code: code.to_string(),
                address: address.to_string(),
                property_type: tipo,
                cabinet: "A1".to_string(),
                status,
                scan_code: format!("QR_{code}"),
                created_at: created,
                updated_at: created,
            }
        };
        vec![
            build(
                "1",
                "APT001",
                "Rua das Flores, 123",
                PropertyType::Apartment,
                KeyStatus::Available,
            ),
            build(
                "2",
                "CASA001",
                "Rua do Sol, 789",
                PropertyType::House,
                KeyStatus::CheckedOut,
            ),
        ]
    }

    fn codes(keys: &[key::Model]) -> Vec<&str> {
        keys.iter().map(|k| k.property_code.as_str()).collect()
    }

    #[test]
    fn status_bucket_keeps_only_matching_keys() {
        let keys = sample_keys();
        let filter = KeyFilter {
            status: StatusBucket::Available,
            ..KeyFilter::default()
        };
        let found = filter_keys(&keys, &[], &filter, Utc::now());
        assert_eq!(codes(&found), vec!["APT001"]);
    }

    #[test]
    fn search_matches_the_property_code_case_insensitively() {
        let keys = sample_keys();
        let filter = KeyFilter {
            search: Some("apt".to_string()),
            ..KeyFilter::default()
        };
        let found = filter_keys(&keys, &[], &filter, Utc::now());
        assert_eq!(codes(&found), vec!["APT001"]);
    }

    #[test]
    fn search_matches_the_address_too() {
        let keys = sample_keys();
        let filter = KeyFilter {
            search: Some("do sol".to_string()),
            ..KeyFilter::default()
        };
        let found = filter_keys(&keys, &[], &filter, Utc::now());
        assert_eq!(codes(&found), vec!["CASA001"]);
    }

    #[test]
    fn property_type_filter_keeps_only_that_type() {
        let keys = sample_keys();
        let filter = KeyFilter {
            property_type: Some(PropertyType::House),
            ..KeyFilter::default()
        };
        let found = filter_keys(&keys, &[], &filter, Utc::now());
        assert_eq!(codes(&found), vec!["CASA001"]);
    }

    #[test]
    fn overdue_bucket_uses_the_predicate_per_key() {
        use crate::entities::checkout_event::EventAction;

        let keys = sample_keys();
        let checkout_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single().unwrap();
        let events = vec![checkout_event::Model {
            id: "e1".to_string(),
            key_id: "2".to_string(),
            user_id: "u1".to_string(),
            action: EventAction::Checkout,
            occurred_at: checkout_at,
            note: None,
            was_overdue: None,
        }];
        let filter = KeyFilter {
            status: StatusBucket::Overdue,
            ..KeyFilter::default()
        };

        let before = filter_keys(&keys, &events, &filter, checkout_at + chrono::Duration::hours(23));
        assert!(before.is_empty());

        let after = filter_keys(&keys, &events, &filter, checkout_at + chrono::Duration::hours(25));
        assert_eq!(codes(&after), vec!["CASA001"]);
    }

    #[test]
    fn the_default_filter_keeps_everything() {
        let keys = sample_keys();
        let found = filter_keys(&keys, &[], &KeyFilter::default(), Utc::now());
        assert_eq!(found.len(), 2);
    }
}
