//! Checkout, return, and maintenance transitions.
//!
//! These operations are the only way a key's status moves: each one appends
//! to the custody log first and then transitions the key, so the log and the
//! status stay coherent.

use chrono::{DateTime, Utc};

use crate::core::auth;
use crate::core::overdue;
use crate::entities::checkout_event::{self, EventAction};
use crate::entities::key::KeyStatus;
use crate::entities::user;
use crate::errors::{Error, Result};
use crate::store::{DataStore, NewEvent};

/// Takes an available key: appends a `checkout` event and marks the key
/// `checked_out`.
pub async fn check_out_key(
    store: &DataStore,
    acting: &user::Model,
    key_id: &str,
    note: Option<String>,
) -> Result<checkout_event::Model> {
    if !acting.active {
        return Err(Error::Unauthorized {
            action: "check out keys",
        });
    }
    let key = store
        .get_key_by_id(key_id)
        .await
        .map(|found| found.value)
        .ok_or_else(|| Error::KeyNotFound {
            id: key_id.to_string(),
        })?;
    if key.status != KeyStatus::Available {
        return Err(Error::KeyNotAvailable { status: key.status });
    }

    let event = store
        .append_event(NewEvent {
            key_id: key.id.clone(),
            user_id: acting.id.clone(),
            action: EventAction::Checkout,
            occurred_at: Utc::now(),
            note,
            was_overdue: None,
        })
        .await?;
    store.transition_key_status(&key.id, KeyStatus::CheckedOut).await?;
    Ok(event)
}

/// Returns a checked-out key as of now. See [`return_key_at`].
pub async fn return_key(
    store: &DataStore,
    acting: &user::Model,
    key_id: &str,
    note: Option<String>,
) -> Result<checkout_event::Model> {
    return_key_at(store, acting, key_id, note, Utc::now()).await
}

/// Returns a checked-out key as of the given instant: captures whether the
/// active checkout had run overdue, appends a `return` event carrying that
/// flag, and marks the key `available`.
pub async fn return_key_at(
    store: &DataStore,
    acting: &user::Model,
    key_id: &str,
    note: Option<String>,
    now: DateTime<Utc>,
) -> Result<checkout_event::Model> {
    if !acting.active {
        return Err(Error::Unauthorized {
            action: "return keys",
        });
    }
    let key = store
        .get_key_by_id(key_id)
        .await
        .map(|found| found.value)
        .ok_or_else(|| Error::KeyNotFound {
            id: key_id.to_string(),
        })?;
    if key.status != KeyStatus::CheckedOut {
        return Err(Error::KeyNotCheckedOut { status: key.status });
    }

    let events = store.list_events().await.value;
    let was_overdue = overdue::is_overdue(&key, &events, now);

    let event = store
        .append_event(NewEvent {
            key_id: key.id.clone(),
            user_id: acting.id.clone(),
            action: EventAction::Return,
            occurred_at: now,
            note,
            was_overdue: Some(was_overdue),
        })
        .await?;
    store.transition_key_status(&key.id, KeyStatus::Available).await?;
    Ok(event)
}

/// Withdraws a key from circulation. Admin-gated; enters `maintenance` from
/// either `available` or `checked_out` and is a no-op when already there.
/// No transition leads back out.
pub async fn set_maintenance(
    store: &DataStore,
    acting: &user::Model,
    key_id: &str,
) -> Result<()> {
    if !auth::can_manage(acting) {
        return Err(Error::Unauthorized {
            action: "manage keys",
        });
    }
    let key = store
        .get_key_by_id(key_id)
        .await
        .map(|found| found.value)
        .ok_or_else(|| Error::KeyNotFound {
            id: key_id.to_string(),
        })?;
    if key.status == KeyStatus::Maintenance {
        return Ok(());
    }
    store.transition_key_status(&key.id, KeyStatus::Maintenance).await?;
    Ok(())
}
