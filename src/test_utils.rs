//! Shared test utilities for `KeyTrack`.
//!
//! Provides the standard store setups: a facade over an in-memory SQLite
//! database standing in for the remote store, and a pure-fallback facade
//! with no remote at all.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use crate::entities::user;
use crate::errors::Result;
use crate::store::DataStore;

/// A facade over a freshly provisioned and seeded in-memory "remote" store.
/// This is the standard setup for the remote-mode integration tests.
pub(crate) async fn remote_store() -> Result<Arc<DataStore>> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    let store = Arc::new(DataStore::with_remote(db));
    store.initialize().await;
    Ok(store)
}

/// A facade with no remote backing; reads serve the seeded fixtures and
/// writes are rejected.
pub(crate) async fn local_store() -> Arc<DataStore> {
    let store = Arc::new(DataStore::local());
    store.initialize().await;
    store
}

/// The seeded fixture admin (Maria Santos) as stored remotely.
pub(crate) async fn remote_admin(store: &DataStore) -> user::Model {
    find_remote_user(store, "maria@imobiliaria.com").await
}

/// The seeded fixture broker (João Silva) as stored remotely.
pub(crate) async fn remote_broker(store: &DataStore) -> user::Model {
    find_remote_user(store, "joao@imobiliaria.com").await
}

async fn find_remote_user(store: &DataStore, email: &str) -> user::Model {
    store
        .list_users()
        .await
        .value
        .into_iter()
        .find(|u| u.email == email)
        .unwrap()
}

/// The seeded fixture admin (Maria Santos) from the fallback collections.
pub(crate) fn fallback_admin(store: &DataStore) -> user::Model {
    store
        .fallback
        .users_snapshot()
        .into_iter()
        .find(|u| u.email == "maria@imobiliaria.com")
        .unwrap()
}
