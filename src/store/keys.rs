//! Key operations on the data access facade.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::warn;
use uuid::Uuid;

use crate::core::auth;
use crate::entities::Key;
use crate::entities::key::{self, KeyStatus, PropertyType};
use crate::entities::user;
use crate::errors::{Error, Result};
use crate::store::{DataStore, EntityKind, Sourced, WriteTarget, classify_write_err};

/// Fields of a key registration request. Id, timestamps, and the initial
/// `available` status are generated by the store.
#[derive(Debug, Clone)]
pub struct NewKey {
    /// Human-chosen property code, unique
    pub property_code: String,
    /// Free-text address of the property
    pub address: String,
    /// Kind of property the key opens
    pub property_type: PropertyType,
    /// Storage-cabinet slot label
    pub cabinet: String,
    /// Unique scan code for QR lookups
    pub scan_code: String,
}

/// Partial update of a key. Only fields that are present are written; the
/// last-updated timestamp is refreshed by every update. Status is absent on
/// purpose: it moves only through the custody operations.
#[derive(Debug, Clone, Default)]
pub struct KeyPatch {
    /// New property code
    pub property_code: Option<String>,
    /// New address
    pub address: Option<String>,
    /// New property type
    pub property_type: Option<PropertyType>,
    /// New cabinet slot label
    pub cabinet: Option<String>,
    /// New scan code
    pub scan_code: Option<String>,
}

impl DataStore {
    /// All keys, oldest-created-first. Never fails: a remote error is logged
    /// and the fallback snapshot is served instead.
    pub async fn list_keys(&self) -> Sourced<Vec<key::Model>> {
        if let Some(db) = self.remote_for(EntityKind::Keys) {
            match Key::find()
                .order_by_asc(key::Column::CreatedAt)
                .all(db)
                .await
            {
                Ok(rows) => return Sourced::remote(rows),
                Err(e) => {
                    warn!("listing keys from the remote store failed; serving fallback data: {e}");
                }
            }
            return Sourced::degraded(self.fallback.keys_snapshot());
        }
        Sourced::fallback(self.fallback.keys_snapshot())
    }

    /// One key by id, or `None`. A clean remote miss is a genuine not-found;
    /// a remote *error* degrades to scanning the fallback collection, which
    /// the provenance makes visible.
    pub async fn get_key_by_id(&self, id: &str) -> Option<Sourced<key::Model>> {
        if let Some(db) = self.remote_for(EntityKind::Keys) {
            match Key::find_by_id(id.to_owned()).one(db).await {
                Ok(found) => return found.map(Sourced::remote),
                Err(e) => {
                    warn!(
                        "fetching key {id} from the remote store failed; scanning fallback data: {e}"
                    );
                    return self.fallback.find_key(id).map(Sourced::degraded);
                }
            }
        }
        self.fallback.find_key(id).map(Sourced::fallback)
    }

    /// Resolves a key by its human-chosen property code.
    pub async fn find_key_by_property_code(&self, code: &str) -> Option<Sourced<key::Model>> {
        if let Some(db) = self.remote_for(EntityKind::Keys) {
            match Key::find()
                .filter(key::Column::PropertyCode.eq(code))
                .one(db)
                .await
            {
                Ok(found) => return found.map(Sourced::remote),
                Err(e) => {
                    warn!(
                        "looking up key {code} from the remote store failed; scanning fallback data: {e}"
                    );
                    return self.fallback.find_key_by_property_code(code).map(Sourced::degraded);
                }
            }
        }
        self.fallback
            .find_key_by_property_code(code)
            .map(Sourced::fallback)
    }

    /// Resolves a key by its scan code, the lookup behind the QR flow.
    pub async fn find_key_by_scan_code(&self, code: &str) -> Option<Sourced<key::Model>> {
        if let Some(db) = self.remote_for(EntityKind::Keys) {
            match Key::find()
                .filter(key::Column::ScanCode.eq(code))
                .one(db)
                .await
            {
                Ok(found) => return found.map(Sourced::remote),
                Err(e) => {
                    warn!(
                        "looking up scan code {code} from the remote store failed; scanning fallback data: {e}"
                    );
                    return self.fallback.find_key_by_scan_code(code).map(Sourced::degraded);
                }
            }
        }
        self.fallback
            .find_key_by_scan_code(code)
            .map(Sourced::fallback)
    }

    /// Registers a key with status `available`. Admin-gated; duplicate
    /// property or scan codes are rejected with a specific constraint reason.
    pub async fn add_key(&self, acting: &user::Model, new: NewKey) -> Result<key::Model> {
        if !auth::can_manage(acting) {
            return Err(Error::Unauthorized {
                action: "manage keys",
            });
        }
        match self.write_target(EntityKind::Keys)? {
            WriteTarget::Remote(db) => {
                let now = Utc::now();
                let model = key::ActiveModel {
                    id: Set(Uuid::new_v4().to_string()),
                    property_code: Set(new.property_code),
                    address: Set(new.address),
                    property_type: Set(new.property_type),
                    cabinet: Set(new.cabinet),
                    status: Set(KeyStatus::Available),
                    scan_code: Set(new.scan_code),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(db)
                .await
                .map_err(classify_write_err)?;
                self.changes.notify(EntityKind::Keys);
                Ok(model)
            }
            WriteTarget::Fallback => self.fallback.insert_key(&new),
        }
    }

    /// Applies a partial update to a key, refreshing its last-updated
    /// timestamp. Admin-gated. Returns false when the id does not exist;
    /// remote failures surface as errors.
    pub async fn update_key(&self, acting: &user::Model, id: &str, patch: KeyPatch) -> Result<bool> {
        if !auth::can_manage(acting) {
            return Err(Error::Unauthorized {
                action: "manage keys",
            });
        }
        match self.write_target(EntityKind::Keys)? {
            WriteTarget::Remote(db) => {
                let Some(existing) = Key::find_by_id(id.to_owned()).one(db).await? else {
                    return Ok(false);
                };
                let mut active_model: key::ActiveModel = existing.into();
                if let Some(code) = patch.property_code {
                    active_model.property_code = Set(code);
                }
                if let Some(address) = patch.address {
                    active_model.address = Set(address);
                }
                if let Some(property_type) = patch.property_type {
                    active_model.property_type = Set(property_type);
                }
                if let Some(cabinet) = patch.cabinet {
                    active_model.cabinet = Set(cabinet);
                }
                if let Some(code) = patch.scan_code {
                    active_model.scan_code = Set(code);
                }
                active_model.updated_at = Set(Utc::now());
                active_model.update(db).await.map_err(classify_write_err)?;
                self.changes.notify(EntityKind::Keys);
                Ok(true)
            }
            WriteTarget::Fallback => self.fallback.update_key(id, &patch),
        }
    }

    /// Removes a key. Admin-gated. Dependent checkout events go with it: the
    /// remote store cascades via its foreign key, and the fallback store
    /// mirrors that cascade explicitly.
    pub async fn remove_key(&self, acting: &user::Model, id: &str) -> Result<bool> {
        if !auth::can_manage(acting) {
            return Err(Error::Unauthorized {
                action: "manage keys",
            });
        }
        match self.write_target(EntityKind::Keys)? {
            WriteTarget::Remote(db) => {
                let outcome = Key::delete_by_id(id.to_owned()).exec(db).await?;
                let removed = outcome.rows_affected > 0;
                if removed {
                    self.changes.notify(EntityKind::Keys);
                    self.changes.notify(EntityKind::Events);
                }
                Ok(removed)
            }
            WriteTarget::Fallback => Ok(self.fallback.remove_key(id)),
        }
    }

    /// Moves a key through the custody state machine. Not part of the
    /// management surface: only the custody operations drive it.
    pub(crate) async fn transition_key_status(&self, id: &str, status: KeyStatus) -> Result<bool> {
        match self.write_target(EntityKind::Keys)? {
            WriteTarget::Remote(db) => {
                let Some(existing) = Key::find_by_id(id.to_owned()).one(db).await? else {
                    return Ok(false);
                };
                let mut active_model: key::ActiveModel = existing.into();
                active_model.status = Set(status);
                active_model.updated_at = Set(Utc::now());
                active_model.update(db).await?;
                self.changes.notify(EntityKind::Keys);
                Ok(true)
            }
            WriteTarget::Fallback => Ok(self.fallback.set_key_status(id, status)),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::entities::CheckoutEvent;
    use crate::errors::ConstraintViolation;
    use crate::test_utils::{remote_admin, remote_broker, remote_store};
    use sea_orm::EntityTrait;

    fn new_key(code: &str) -> NewKey {
        NewKey {
            property_code: code.to_string(),
            address: "Rua Teste, 10".to_string(),
            property_type: PropertyType::House,
            cabinet: "D1".to_string(),
            scan_code: format!("QR_{code}"),
        }
    }

    #[tokio::test]
    async fn add_key_starts_available_and_rejects_duplicates() -> Result<()> {
        let store = remote_store().await?;
        let admin = remote_admin(&store).await;

        let created = store.add_key(&admin, new_key("NEW001")).await?;
        assert_eq!(created.status, KeyStatus::Available);

        let duplicate_code = store.add_key(&admin, new_key("NEW001")).await;
        assert!(matches!(
            duplicate_code,
            Err(Error::Constraint(ConstraintViolation::DuplicatePropertyCode))
        ));

        let mut clashing_scan = new_key("NEW002");
        clashing_scan.scan_code = "QR_NEW001".to_string();
        let duplicate_scan = store.add_key(&admin, clashing_scan).await;
        assert!(matches!(
            duplicate_scan,
            Err(Error::Constraint(ConstraintViolation::DuplicateScanCode))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn key_management_requires_the_admin_role() -> Result<()> {
        let store = remote_store().await?;
        let broker = remote_broker(&store).await;

        let result = store.add_key(&broker, new_key("NEW001")).await;
        assert!(matches!(result, Err(Error::Unauthorized { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn update_key_touches_only_present_fields_and_the_timestamp() -> Result<()> {
        let store = remote_store().await?;
        let admin = remote_admin(&store).await;
        let apt001 = store
            .find_key_by_property_code("APT001")
            .await
            .unwrap()
            .value;

        let patch = KeyPatch {
            cabinet: Some("A9".to_string()),
            ..KeyPatch::default()
        };
        assert!(store.update_key(&admin, &apt001.id, patch).await?);

        let updated = store.get_key_by_id(&apt001.id).await.unwrap().value;
        assert_eq!(updated.cabinet, "A9");
        assert_eq!(updated.property_code, apt001.property_code);
        assert_eq!(updated.status, apt001.status);
        assert!(updated.updated_at > apt001.updated_at);
        Ok(())
    }

    #[tokio::test]
    async fn remove_key_cascades_its_events() -> Result<()> {
        let store = remote_store().await?;
        let admin = remote_admin(&store).await;
        let apt002 = store
            .find_key_by_property_code("APT002")
            .await
            .unwrap()
            .value;

        assert!(store.remove_key(&admin, &apt002.id).await?);
        assert!(store.get_key_by_id(&apt002.id).await.is_none());

        let db = store.remote_for(EntityKind::Events).unwrap();
        let remaining = CheckoutEvent::find().all(db).await?;
        assert!(remaining.iter().all(|e| e.key_id != apt002.id));
        Ok(())
    }

    #[tokio::test]
    async fn scan_code_lookup_resolves_the_key() -> Result<()> {
        let store = remote_store().await?;
        let found = store.find_key_by_scan_code("QR_CASA001").await.unwrap();
        assert!(found.is_authoritative());
        assert_eq!(found.value.property_code, "CASA001");
        assert!(store.find_key_by_scan_code("QR_NOPE").await.is_none());
        Ok(())
    }
}
