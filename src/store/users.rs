//! User operations on the data access facade.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use tracing::warn;
use uuid::Uuid;

use crate::core::auth;
use crate::entities::User;
use crate::entities::user::{self, Role};
use crate::errors::{Error, Result};
use crate::store::{DataStore, EntityKind, Sourced, WriteTarget, classify_write_err};

/// Fields of a user creation request; id and creation timestamp are
/// generated by the store, and the secret is hashed before it is stored.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Display name
    pub name: String,
    /// Login email, unique
    pub email: String,
    /// Login secret in plaintext; hashed on the way in, never stored
    pub secret: String,
    /// Role gating management operations
    pub role: Role,
    /// Whether the user may log in
    pub active: bool,
}

/// Partial update of a user. Only fields that are present are written.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    /// New display name
    pub name: Option<String>,
    /// New login email
    pub email: Option<String>,
    /// New login secret in plaintext; hashed on the way in
    pub secret: Option<String>,
    /// New role
    pub role: Option<Role>,
    /// New active flag
    pub active: Option<bool>,
}

impl UserPatch {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.secret.is_none()
            && self.role.is_none()
            && self.active.is_none()
    }
}

impl DataStore {
    /// All users, oldest-created-first. Never fails: a remote error is
    /// logged and the fallback snapshot is served instead.
    pub async fn list_users(&self) -> Sourced<Vec<user::Model>> {
        if let Some(db) = self.remote_for(EntityKind::Users) {
            match User::find()
                .order_by_asc(user::Column::CreatedAt)
                .all(db)
                .await
            {
                Ok(rows) => return Sourced::remote(rows),
                Err(e) => {
                    warn!("listing users from the remote store failed; serving fallback data: {e}");
                }
            }
            return Sourced::degraded(self.fallback.users_snapshot());
        }
        Sourced::fallback(self.fallback.users_snapshot())
    }

    /// One user by id, or `None`. A clean remote miss is a genuine
    /// not-found; a remote *error* degrades to scanning the fallback
    /// collection, which the provenance makes visible.
    pub async fn get_user_by_id(&self, id: &str) -> Option<Sourced<user::Model>> {
        if let Some(db) = self.remote_for(EntityKind::Users) {
            match User::find_by_id(id.to_owned()).one(db).await {
                Ok(found) => return found.map(Sourced::remote),
                Err(e) => {
                    warn!("fetching user {id} from the remote store failed; scanning fallback data: {e}");
                    return self.fallback.find_user(id).map(Sourced::degraded);
                }
            }
        }
        self.fallback.find_user(id).map(Sourced::fallback)
    }

    /// Creates a user. Admin-gated; a duplicate email is rejected with a
    /// specific constraint reason.
    pub async fn add_user(&self, acting: &user::Model, new: NewUser) -> Result<user::Model> {
        if !auth::can_manage(acting) {
            return Err(Error::Unauthorized {
                action: "manage users",
            });
        }
        let secret_hash = auth::hash_secret(&new.secret)?;
        match self.write_target(EntityKind::Users)? {
            WriteTarget::Remote(db) => {
                let model = user::ActiveModel {
                    id: Set(Uuid::new_v4().to_string()),
                    name: Set(new.name),
                    email: Set(new.email),
                    secret_hash: Set(secret_hash),
                    role: Set(new.role),
                    active: Set(new.active),
                    created_at: Set(Utc::now()),
                }
                .insert(db)
                .await
                .map_err(classify_write_err)?;
                self.changes.notify(EntityKind::Users);
                Ok(model)
            }
            WriteTarget::Fallback => self.fallback.insert_user(&new, secret_hash),
        }
    }

    /// Applies a partial update to a user. Admin-gated. Returns false when
    /// the id does not exist; remote failures surface as errors.
    pub async fn update_user(
        &self,
        acting: &user::Model,
        id: &str,
        patch: UserPatch,
    ) -> Result<bool> {
        if !auth::can_manage(acting) {
            return Err(Error::Unauthorized {
                action: "manage users",
            });
        }
        if patch.is_empty() {
            return Ok(self.get_user_by_id(id).await.is_some());
        }
        let secret_hash = match &patch.secret {
            Some(secret) => Some(auth::hash_secret(secret)?),
            None => None,
        };
        match self.write_target(EntityKind::Users)? {
            WriteTarget::Remote(db) => {
                let Some(existing) = User::find_by_id(id.to_owned()).one(db).await? else {
                    return Ok(false);
                };
                let mut active_model: user::ActiveModel = existing.into();
                if let Some(name) = patch.name {
                    active_model.name = Set(name);
                }
                if let Some(email) = patch.email {
                    active_model.email = Set(email);
                }
                if let Some(hash) = secret_hash {
                    active_model.secret_hash = Set(hash);
                }
                if let Some(role) = patch.role {
                    active_model.role = Set(role);
                }
                if let Some(active) = patch.active {
                    active_model.active = Set(active);
                }
                active_model.update(db).await.map_err(classify_write_err)?;
                self.changes.notify(EntityKind::Users);
                Ok(true)
            }
            WriteTarget::Fallback => self.fallback.update_user(id, &patch, secret_hash),
        }
    }

    /// Removes a user. Self-removal is rejected before anything else is
    /// attempted; then the admin gate applies. Dependent checkout events go
    /// with the user (remote foreign-key cascade, mirrored by the fallback).
    pub async fn remove_user(&self, acting: &user::Model, id: &str) -> Result<bool> {
        if acting.id == id {
            return Err(Error::SelfRemoval);
        }
        if !auth::can_manage(acting) {
            return Err(Error::Unauthorized {
                action: "manage users",
            });
        }
        match self.write_target(EntityKind::Users)? {
            WriteTarget::Remote(db) => {
                let outcome = User::delete_by_id(id.to_owned()).exec(db).await?;
                let removed = outcome.rows_affected > 0;
                if removed {
                    self.changes.notify(EntityKind::Users);
                    self.changes.notify(EntityKind::Events);
                }
                Ok(removed)
            }
            WriteTarget::Fallback => Ok(self.fallback.remove_user(id)),
        }
    }
}
