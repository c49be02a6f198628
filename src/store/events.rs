//! Checkout event operations on the data access facade.
//!
//! The event log is append-only: there is no update or removal surface.
//! Events are appended by the custody operations and disappear only when
//! their key or user is removed.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};
use tracing::warn;
use uuid::Uuid;

use crate::entities::CheckoutEvent;
use crate::entities::checkout_event::{self, EventAction};
use crate::errors::Result;
use crate::store::{DataStore, EntityKind, Sourced, WriteTarget, classify_write_err};

/// Fields of an event append. The id is generated by the store.
#[derive(Debug, Clone)]
pub struct NewEvent {
    /// Key this event concerns
    pub key_id: String,
    /// User who took or returned the key
    pub user_id: String,
    /// Whether the key was taken or returned
    pub action: EventAction,
    /// When the event happened
    pub occurred_at: DateTime<Utc>,
    /// Optional free-text note
    pub note: Option<String>,
    /// Whether the checkout had run overdue, captured at return time
    pub was_overdue: Option<bool>,
}

impl DataStore {
    /// The full custody log, newest-first. Never fails: a remote error is
    /// logged and the fallback snapshot is served instead.
    pub async fn list_events(&self) -> Sourced<Vec<checkout_event::Model>> {
        if let Some(db) = self.remote_for(EntityKind::Events) {
            match CheckoutEvent::find()
                .order_by_desc(checkout_event::Column::OccurredAt)
                .all(db)
                .await
            {
                Ok(rows) => return Sourced::remote(rows),
                Err(e) => {
                    warn!(
                        "listing checkout events from the remote store failed; serving fallback data: {e}"
                    );
                }
            }
            return Sourced::degraded(self.fallback.events_snapshot());
        }
        Sourced::fallback(self.fallback.events_snapshot())
    }

    /// The most recent event for a key, the record that determines who holds
    /// it. Ties on the timestamp are not explicitly broken.
    pub async fn latest_event_for_key(
        &self,
        key_id: &str,
    ) -> Option<Sourced<checkout_event::Model>> {
        if let Some(db) = self.remote_for(EntityKind::Events) {
            match CheckoutEvent::find()
                .filter(checkout_event::Column::KeyId.eq(key_id))
                .order_by_desc(checkout_event::Column::OccurredAt)
                .limit(1)
                .one(db)
                .await
            {
                Ok(found) => return found.map(Sourced::remote),
                Err(e) => {
                    warn!(
                        "fetching the latest event for key {key_id} failed; scanning fallback data: {e}"
                    );
                    return self
                        .fallback
                        .latest_event_for_key(key_id)
                        .map(Sourced::degraded);
                }
            }
        }
        self.fallback
            .latest_event_for_key(key_id)
            .map(Sourced::fallback)
    }

    /// Appends to the custody log. Only the custody operations call this.
    pub(crate) async fn append_event(&self, new: NewEvent) -> Result<checkout_event::Model> {
        match self.write_target(EntityKind::Events)? {
            WriteTarget::Remote(db) => {
                let model = checkout_event::ActiveModel {
                    id: Set(Uuid::new_v4().to_string()),
                    key_id: Set(new.key_id),
                    user_id: Set(new.user_id),
                    action: Set(new.action),
                    occurred_at: Set(new.occurred_at),
                    note: Set(new.note),
                    was_overdue: Set(new.was_overdue),
                }
                .insert(db)
                .await
                .map_err(classify_write_err)?;
                self.changes.notify(EntityKind::Events);
                Ok(model)
            }
            WriteTarget::Fallback => Ok(self.fallback.insert_event(&new)),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::test_utils::remote_store;

    #[tokio::test]
    async fn event_list_is_newest_first() -> Result<()> {
        let store = remote_store().await?;
        let events = store.list_events().await.value;
        assert_eq!(events.len(), 2);
        for pair in events.windows(2) {
            assert!(pair[0].occurred_at >= pair[1].occurred_at);
        }
        Ok(())
    }

    #[tokio::test]
    async fn latest_event_resolves_the_current_holder() -> Result<()> {
        let store = remote_store().await?;
        let apt002 = store
            .find_key_by_property_code("APT002")
            .await
            .unwrap()
            .value;

        let latest = store.latest_event_for_key(&apt002.id).await.unwrap().value;
        assert_eq!(latest.action, EventAction::Checkout);

        let holder = store.get_user_by_id(&latest.user_id).await.unwrap().value;
        assert_eq!(holder.name, "João Silva");
        Ok(())
    }

    #[tokio::test]
    async fn keys_without_events_have_no_latest_event() -> Result<()> {
        let store = remote_store().await?;
        let apt001 = store
            .find_key_by_property_code("APT001")
            .await
            .unwrap()
            .value;
        assert!(store.latest_event_for_key(&apt001.id).await.is_none());
        Ok(())
    }
}
