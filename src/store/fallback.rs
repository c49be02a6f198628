//! In-memory fallback store.
//!
//! A session-local substitute for the remote store, seeded with the fixture
//! dataset. Collections are process-scoped and never persisted; ids are
//! monotonic time-based tokens so they sort after the small fixture ids.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{PoisonError, RwLock};

use chrono::Utc;

use crate::entities::checkout_event;
use crate::entities::key::{self, KeyStatus};
use crate::entities::user;
use crate::errors::{ConstraintViolation, Error, Result};
use crate::store::events::NewEvent;
use crate::store::keys::{KeyPatch, NewKey};
use crate::store::seed;
use crate::store::users::{NewUser, UserPatch};

pub(crate) struct FallbackStore {
    users: RwLock<Vec<user::Model>>,
    keys: RwLock<Vec<key::Model>>,
    events: RwLock<Vec<checkout_event::Model>>,
    id_seq: AtomicI64,
}

impl FallbackStore {
    /// Builds the store pre-populated with the fixture dataset.
    pub(crate) fn seeded() -> Self {
        let secret_hash = seed::fixture_secret_hash();
        Self {
            users: RwLock::new(seed::fixture_users(&secret_hash)),
            keys: RwLock::new(seed::fixture_keys()),
            events: RwLock::new(seed::fixture_events()),
            id_seq: AtomicI64::new(Utc::now().timestamp_millis()),
        }
    }

    fn next_id(&self) -> String {
        self.id_seq.fetch_add(1, Ordering::Relaxed).to_string()
    }

    pub(crate) fn users_snapshot(&self) -> Vec<user::Model> {
        let mut users = self
            .users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        users
    }

    pub(crate) fn keys_snapshot(&self) -> Vec<key::Model> {
        let mut keys = self
            .keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        keys.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        keys
    }

    /// Newest-first, matching the ordering contract of the event list.
    pub(crate) fn events_snapshot(&self) -> Vec<checkout_event::Model> {
        let mut events = self
            .events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        events.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        events
    }

    pub(crate) fn find_user(&self, id: &str) -> Option<user::Model> {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|u| u.id == id)
            .cloned()
    }

    pub(crate) fn find_key(&self, id: &str) -> Option<key::Model> {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|k| k.id == id)
            .cloned()
    }

    pub(crate) fn find_key_by_property_code(&self, code: &str) -> Option<key::Model> {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|k| k.property_code == code)
            .cloned()
    }

    pub(crate) fn find_key_by_scan_code(&self, code: &str) -> Option<key::Model> {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|k| k.scan_code == code)
            .cloned()
    }

    pub(crate) fn latest_event_for_key(&self, key_id: &str) -> Option<checkout_event::Model> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.key_id == key_id)
            .max_by_key(|e| e.occurred_at)
            .cloned()
    }

    pub(crate) fn insert_user(&self, new: &NewUser, secret_hash: String) -> Result<user::Model> {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        if users.iter().any(|u| u.email == new.email) {
            return Err(Error::Constraint(ConstraintViolation::DuplicateEmail));
        }
        let user = user::Model {
            id: self.next_id(),
            name: new.name.clone(),
            email: new.email.clone(),
            secret_hash,
            role: new.role,
            active: new.active,
            created_at: Utc::now(),
        };
        users.push(user.clone());
        Ok(user)
    }

    pub(crate) fn insert_key(&self, new: &NewKey) -> Result<key::Model> {
        let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        if keys.iter().any(|k| k.property_code == new.property_code) {
            return Err(Error::Constraint(ConstraintViolation::DuplicatePropertyCode));
        }
        if keys.iter().any(|k| k.scan_code == new.scan_code) {
            return Err(Error::Constraint(ConstraintViolation::DuplicateScanCode));
        }
        let now = Utc::now();
        let key = key::Model {
            id: self.next_id(),
            property_code: new.property_code.clone(),
            address: new.address.clone(),
            property_type: new.property_type,
            cabinet: new.cabinet.clone(),
            status: KeyStatus::Available,
            scan_code: new.scan_code.clone(),
            created_at: now,
            updated_at: now,
        };
        keys.push(key.clone());
        Ok(key)
    }

    pub(crate) fn insert_event(&self, new: &NewEvent) -> checkout_event::Model {
        let event = checkout_event::Model {
            id: self.next_id(),
            key_id: new.key_id.clone(),
            user_id: new.user_id.clone(),
            action: new.action,
            occurred_at: new.occurred_at,
            note: new.note.clone(),
            was_overdue: new.was_overdue,
        };
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        event
    }

    pub(crate) fn update_user(
        &self,
        id: &str,
        patch: &UserPatch,
        secret_hash: Option<String>,
    ) -> Result<bool> {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(email) = &patch.email {
            if users.iter().any(|u| u.email == *email && u.id != id) {
                return Err(Error::Constraint(ConstraintViolation::DuplicateEmail));
            }
        }
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(false);
        };
        if let Some(name) = &patch.name {
            user.name = name.clone();
        }
        if let Some(email) = &patch.email {
            user.email = email.clone();
        }
        if let Some(hash) = secret_hash {
            user.secret_hash = hash;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        if let Some(active) = patch.active {
            user.active = active;
        }
        Ok(true)
    }

    pub(crate) fn update_key(&self, id: &str, patch: &KeyPatch) -> Result<bool> {
        let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(code) = &patch.property_code {
            if keys.iter().any(|k| k.property_code == *code && k.id != id) {
                return Err(Error::Constraint(ConstraintViolation::DuplicatePropertyCode));
            }
        }
        if let Some(code) = &patch.scan_code {
            if keys.iter().any(|k| k.scan_code == *code && k.id != id) {
                return Err(Error::Constraint(ConstraintViolation::DuplicateScanCode));
            }
        }
        let Some(key) = keys.iter_mut().find(|k| k.id == id) else {
            return Ok(false);
        };
        if let Some(code) = &patch.property_code {
            key.property_code = code.clone();
        }
        if let Some(address) = &patch.address {
            key.address = address.clone();
        }
        if let Some(property_type) = patch.property_type {
            key.property_type = property_type;
        }
        if let Some(cabinet) = &patch.cabinet {
            key.cabinet = cabinet.clone();
        }
        if let Some(code) = &patch.scan_code {
            key.scan_code = code.clone();
        }
        key.updated_at = Utc::now();
        Ok(true)
    }

    pub(crate) fn set_key_status(&self, id: &str, status: KeyStatus) -> bool {
        let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        let Some(key) = keys.iter_mut().find(|k| k.id == id) else {
            return false;
        };
        key.status = status;
        key.updated_at = Utc::now();
        true
    }

    pub(crate) fn remove_user(&self, id: &str) -> bool {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        let before = users.len();
        users.retain(|u| u.id != id);
        let removed = users.len() < before;
        if removed {
            // mirror the remote foreign-key cascade
            self.events
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|e| e.user_id != id);
        }
        removed
    }

    pub(crate) fn remove_key(&self, id: &str) -> bool {
        let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        let before = keys.len();
        keys.retain(|k| k.id != id);
        let removed = keys.len() < before;
        if removed {
            // mirror the remote foreign-key cascade
            self.events
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|e| e.key_id != id);
        }
        removed
    }
}
