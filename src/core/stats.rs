//! Dashboard counts.

use chrono::{DateTime, Utc};

use crate::core::overdue;
use crate::entities::checkout_event;
use crate::entities::key::{self, KeyStatus};

/// Presentation-ready counts over the current key set.
///
/// `available + checked_out + maintenance` always equals `total`; `overdue`
/// counts the subset of `checked_out` past the 24-hour threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardStats {
    /// All tracked keys
    pub total: usize,
    /// Keys in their cabinet slot
    pub available: usize,
    /// Keys currently held by a user
    pub checked_out: usize,
    /// Keys withdrawn by an admin
    pub maintenance: usize,
    /// Checked-out keys past the overdue threshold
    pub overdue: usize,
}

/// Computes the dashboard counts for a key/event snapshot as of `now`.
#[must_use]
pub fn dashboard_stats(
    keys: &[key::Model],
    events: &[checkout_event::Model],
    now: DateTime<Utc>,
) -> DashboardStats {
    let total = keys.len();
    let available = keys.iter().filter(|k| k.status == KeyStatus::Available).count();
    let checked_out = keys
        .iter()
        .filter(|k| k.status == KeyStatus::CheckedOut)
        .count();
    let maintenance = keys
        .iter()
        .filter(|k| k.status == KeyStatus::Maintenance)
        .count();
    let overdue = keys
        .iter()
        .filter(|k| overdue::is_overdue(k, events, now))
        .count();

    DashboardStats {
        total,
        available,
        checked_out,
        maintenance,
        overdue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::remote_store;
    use chrono::Utc;

    fn assert_counts_sum(stats: DashboardStats) {
        assert_eq!(
            stats.available + stats.checked_out + stats.maintenance,
            stats.total
        );
    }

    #[tokio::test]
    async fn seeded_dataset_counts() -> crate::errors::Result<()> {
        let store = remote_store().await?;
        let keys = store.list_keys().await.value;
        let events = store.list_events().await.value;
        let stats = dashboard_stats(&keys, &events, Utc::now());

        assert_eq!(stats.total, 5);
        assert_eq!(stats.available, 3);
        assert_eq!(stats.checked_out, 2);
        assert_eq!(stats.maintenance, 0);
        // both fixture checkouts date from 2024 and have long run overdue
        assert_eq!(stats.overdue, 2);
        assert_counts_sum(stats);
        Ok(())
    }

    #[test]
    fn empty_snapshot_counts_to_zero() {
        let stats = dashboard_stats(&[], &[], Utc::now());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.overdue, 0);
        assert_counts_sum(stats);
    }
}
