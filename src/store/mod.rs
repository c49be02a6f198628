//! Data access facade.
//!
//! [`DataStore`] presents one entity-shaped API over two possible backing
//! stores: the remote persistent store and an in-memory fallback seeded with
//! fixture data. Which store answers is decided per entity table by a
//! tri-state mode resolved at initialization (and on explicit re-probe).
//!
//! The propagation contract is deliberately asymmetric: read paths never fail
//! visibly (they degrade to fallback data and say so via [`Source`]), while
//! write paths always surface failures so callers know when persistence did
//! not happen.

pub(crate) mod changes;
pub(crate) mod events;
pub(crate) mod fallback;
pub(crate) mod keys;
pub(crate) mod schema;
pub(crate) mod seed;
pub(crate) mod users;

pub use changes::Subscription;
pub use events::NewEvent;
pub use keys::{KeyPatch, NewKey};
pub use users::{NewUser, UserPatch};

use std::sync::{PoisonError, RwLock};

use chrono::Utc;
use sea_orm::{Database, DatabaseConnection, DbErr, EntityTrait, QuerySelect};
use tracing::{debug, info, warn};

use crate::config;
use crate::core::filter::{self, KeyFilter};
use crate::core::stats::{self, DashboardStats};
use crate::entities::key;
use crate::entities::user;
use crate::entities::{CheckoutEvent, Key, User};
use crate::errors::{ConstraintViolation, Error, Result};
use crate::store::changes::ChangeHub;
use crate::store::fallback::FallbackStore;

/// The three entity tables the facade mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// Brokerage staff accounts
    Users,
    /// Tracked property keys
    Keys,
    /// The append-only custody log
    Events,
}

impl EntityKind {
    pub(crate) fn table_name(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Keys => "keys",
            Self::Events => "checkout_events",
        }
    }
}

/// Which store answers for an entity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableMode {
    /// Not probed yet; reads serve fallback data, writes are routed as if
    /// the table were pinned to fallback
    #[default]
    Unknown,
    /// The remote table answered the probe and is authoritative
    Remote,
    /// Pinned to the in-memory fallback for the session
    Fallback,
}

/// Where a read's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Authoritative remote data
    Remote,
    /// Fallback data, chosen by the table mode
    Fallback,
    /// Fallback data served because a remote operation failed; possibly
    /// stale or unrelated to the remote rows
    Degraded,
}

/// A value plus its provenance, so callers and tests can assert whether a
/// read was authoritative, a mode-selected fallback, or a degraded answer.
#[derive(Debug, Clone)]
pub struct Sourced<T> {
    /// The value itself
    pub value: T,
    /// Where it came from
    pub source: Source,
}

impl<T> Sourced<T> {
    pub(crate) fn remote(value: T) -> Self {
        Self {
            value,
            source: Source::Remote,
        }
    }

    pub(crate) fn fallback(value: T) -> Self {
        Self {
            value,
            source: Source::Fallback,
        }
    }

    pub(crate) fn degraded(value: T) -> Self {
        Self {
            value,
            source: Source::Degraded,
        }
    }

    /// True when the value came from the remote store.
    pub fn is_authoritative(&self) -> bool {
        self.source == Source::Remote
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Modes {
    users: TableMode,
    keys: TableMode,
    events: TableMode,
}

impl Modes {
    fn all(mode: TableMode) -> Self {
        Self {
            users: mode,
            keys: mode,
            events: mode,
        }
    }

    fn none_remote(self) -> bool {
        self.users != TableMode::Remote
            && self.keys != TableMode::Remote
            && self.events != TableMode::Remote
    }
}

/// Routing decision for a write.
pub(crate) enum WriteTarget<'a> {
    /// The remote table is authoritative; write through the gateway
    Remote(&'a DatabaseConnection),
    /// Table pinned to fallback for the session; mutate the local collection
    Fallback,
}

/// The facade over the remote store and the in-memory fallback.
///
/// Constructed once by the application's composition root and shared via
/// `Arc`; it holds no state beyond the connection, the per-table modes, the
/// fallback collections, and the change hub.
pub struct DataStore {
    remote: Option<DatabaseConnection>,
    modes: RwLock<Modes>,
    pub(crate) fallback: FallbackStore,
    pub(crate) changes: ChangeHub,
}

impl DataStore {
    fn build(remote: Option<DatabaseConnection>) -> Self {
        Self {
            remote,
            modes: RwLock::new(Modes::default()),
            fallback: FallbackStore::seeded(),
            changes: ChangeHub::new(),
        }
    }

    /// A store with no remote backing; every table is served from memory.
    #[must_use]
    pub fn local() -> Self {
        Self::build(None)
    }

    /// A store backed by an already-established remote connection.
    #[must_use]
    pub fn with_remote(db: DatabaseConnection) -> Self {
        Self::build(Some(db))
    }

    /// Builds a store from the environment. A missing `DATABASE_URL` or a
    /// failed connection degrades to the local store with a log line; this
    /// constructor never fails.
    pub async fn from_env() -> Self {
        config::load_env();
        let Some(url) = config::database_url() else {
            info!("DATABASE_URL not set; running on the in-memory fallback store");
            return Self::local();
        };
        match Database::connect(&url).await {
            Ok(db) => Self::with_remote(db),
            Err(e) => {
                warn!("connecting to the remote store failed; running on the in-memory fallback store: {e}");
                Self::local()
            }
        }
    }

    /// Probes the remote tables, provisions them if none are reachable,
    /// records the per-table modes, and seeds the fixture dataset when the
    /// remote users table is empty.
    ///
    /// Idempotent and infallible: every failure pins the affected table to
    /// fallback mode and logs.
    pub async fn initialize(&self) {
        let Some(db) = &self.remote else {
            info!("remote store not configured; fixture data will be served from memory");
            self.store_modes(Modes::all(TableMode::Fallback));
            return;
        };

        let mut modes = Self::probe_all(db).await;
        if modes.none_remote() {
            info!("no remote tables reachable, attempting to provision them");
            schema::provision(db).await;
            modes = Self::probe_all(db).await;
        }
        self.store_modes(modes);

        if modes.users == TableMode::Remote {
            if let Err(e) = seed::seed_remote_if_empty(db).await {
                warn!("seeding the remote store failed: {e}");
            }
        }

        info!(
            "table modes after initialization: users {:?}, keys {:?}, events {:?}",
            modes.users, modes.keys, modes.events
        );
    }

    /// Re-evaluates the per-table modes on demand. A table that has become
    /// reachable since startup is promoted only through this call.
    pub async fn reprobe(&self) {
        let Some(db) = &self.remote else {
            self.store_modes(Modes::all(TableMode::Fallback));
            return;
        };
        let modes = Self::probe_all(db).await;
        self.store_modes(modes);
    }

    /// The current mode of an entity table.
    #[must_use]
    pub fn mode(&self, kind: EntityKind) -> TableMode {
        let modes = self.modes.read().unwrap_or_else(PoisonError::into_inner);
        match kind {
            EntityKind::Users => modes.users,
            EntityKind::Keys => modes.keys,
            EntityKind::Events => modes.events,
        }
    }

    fn store_modes(&self, modes: Modes) {
        *self.modes.write().unwrap_or_else(PoisonError::into_inner) = modes;
    }

    /// The remote connection, but only when the table is in remote mode.
    pub(crate) fn remote_for(&self, kind: EntityKind) -> Option<&DatabaseConnection> {
        if self.mode(kind) == TableMode::Remote {
            self.remote.as_ref()
        } else {
            None
        }
    }

    /// Routes a write. With no remote store configured at all, writes are
    /// rejected outright: silently accepting data that will not persist is
    /// worse than an explicit error.
    pub(crate) fn write_target(&self, kind: EntityKind) -> Result<WriteTarget<'_>> {
        let Some(db) = &self.remote else {
            return Err(Error::NotConfigured);
        };
        match self.mode(kind) {
            TableMode::Remote => Ok(WriteTarget::Remote(db)),
            TableMode::Unknown | TableMode::Fallback => Ok(WriteTarget::Fallback),
        }
    }

    async fn probe_all(db: &DatabaseConnection) -> Modes {
        Modes {
            users: Self::probe(db, EntityKind::Users).await,
            keys: Self::probe(db, EntityKind::Keys).await,
            events: Self::probe(db, EntityKind::Events).await,
        }
    }

    /// A trivial capped read against one table. A distinguishable
    /// missing-table error pins the table quietly; anything else pins it too
    /// but is logged as a failure.
    async fn probe(db: &DatabaseConnection, kind: EntityKind) -> TableMode {
        let outcome = match kind {
            EntityKind::Users => User::find().limit(1).all(db).await.map(|_| ()),
            EntityKind::Keys => Key::find().limit(1).all(db).await.map(|_| ()),
            EntityKind::Events => CheckoutEvent::find().limit(1).all(db).await.map(|_| ()),
        };
        match outcome {
            Ok(()) => {
                debug!("{} table reachable", kind.table_name());
                TableMode::Remote
            }
            Err(e) if is_missing_table(&e) => {
                info!(
                    "{} table missing in the remote store; pinned to fallback",
                    kind.table_name()
                );
                TableMode::Fallback
            }
            Err(e) => {
                warn!(
                    "probing the {} table failed; pinned to fallback: {e}",
                    kind.table_name()
                );
                TableMode::Fallback
            }
        }
    }

    /// Presentation-ready dashboard counts over the current key/event set.
    pub async fn dashboard_stats(&self) -> DashboardStats {
        let keys = self.list_keys().await.value;
        let events = self.list_events().await.value;
        stats::dashboard_stats(&keys, &events, Utc::now())
    }

    /// Applies a status/search/type filter to the current key set.
    pub async fn filter_keys(&self, filter: &KeyFilter) -> Vec<key::Model> {
        let keys = self.list_keys().await.value;
        let events = self.list_events().await.value;
        filter::filter_keys(&keys, &events, filter, Utc::now())
    }

    /// Checks an email/secret pair against the current user set. See
    /// [`crate::core::auth::authenticate_user`].
    pub async fn authenticate_user(
        &self,
        email: &str,
        secret: &str,
    ) -> Result<Option<user::Model>> {
        crate::core::auth::authenticate_user(self, email, secret).await
    }
}

/// Whether a probe error means the table does not exist, as opposed to a
/// transient failure. Covers the Postgres and SQLite phrasings.
fn is_missing_table(err: &DbErr) -> bool {
    let msg = err.to_string().to_lowercase();
    msg.contains("does not exist") || msg.contains("no such table")
}

/// Maps a gateway write error onto the failure taxonomy: uniqueness breaches
/// become specific [`ConstraintViolation`]s, everything else stays a
/// database error.
pub(crate) fn classify_write_err(err: DbErr) -> Error {
    let msg = err.to_string().to_lowercase();
    if msg.contains("unique") || msg.contains("duplicate") {
        if msg.contains("email") {
            return Error::Constraint(ConstraintViolation::DuplicateEmail);
        }
        if msg.contains("property_code") {
            return Error::Constraint(ConstraintViolation::DuplicatePropertyCode);
        }
        if msg.contains("scan_code") {
            return Error::Constraint(ConstraintViolation::DuplicateScanCode);
        }
    }
    Error::Database(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{fallback_admin, local_store, remote_store};

    #[tokio::test]
    async fn unconfigured_store_serves_fixture_reads_and_rejects_writes() {
        let store = local_store().await;

        // read path: seeded fixtures, no error
        let keys = store.list_keys().await;
        assert_eq!(keys.source, Source::Fallback);
        assert_eq!(keys.value.len(), 5);
        let users = store.list_users().await;
        assert_eq!(users.source, Source::Fallback);
        assert_eq!(users.value.len(), 4);

        // write path: explicit failure, not a silent local append
        let admin = fallback_admin(&store);
        let result = store
            .add_key(
                &admin,
                NewKey {
                    property_code: "NEW001".to_string(),
                    address: "Rua Teste, 10".to_string(),
                    property_type: crate::entities::key::PropertyType::House,
                    cabinet: "D1".to_string(),
                    scan_code: "QR_NEW001".to_string(),
                },
            )
            .await;
        assert!(matches!(result, Err(Error::NotConfigured)));
        assert_eq!(store.list_keys().await.value.len(), 5);
    }

    #[tokio::test]
    async fn initialize_provisions_and_seeds_an_empty_remote() -> Result<()> {
        let store = remote_store().await?;

        assert_eq!(store.mode(EntityKind::Users), TableMode::Remote);
        assert_eq!(store.mode(EntityKind::Keys), TableMode::Remote);
        assert_eq!(store.mode(EntityKind::Events), TableMode::Remote);

        let keys = store.list_keys().await;
        assert!(keys.is_authoritative());
        assert_eq!(keys.value.len(), 5);
        assert_eq!(store.list_events().await.value.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn initialize_is_idempotent() -> Result<()> {
        let store = remote_store().await?;
        store.initialize().await;
        store.initialize().await;
        assert_eq!(store.list_users().await.value.len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn reprobe_reevaluates_modes() -> Result<()> {
        let db = sea_orm::Database::connect("sqlite::memory:").await?;
        let store = DataStore::with_remote(db);
        assert_eq!(store.mode(EntityKind::Keys), TableMode::Unknown);

        // no tables yet: probe pins everything to fallback
        store.reprobe().await;
        assert_eq!(store.mode(EntityKind::Keys), TableMode::Fallback);

        // once the tables exist a re-probe promotes them
        if let Some(db) = &store.remote {
            schema::create_tables(db).await?;
        }
        store.reprobe().await;
        assert_eq!(store.mode(EntityKind::Keys), TableMode::Remote);
        Ok(())
    }
}
