//! Table provisioning for the remote store.
//!
//! Tables are generated from the entity definitions with SeaORM's
//! `Schema::create_table_from_entity`, so the remote schema always matches the
//! Rust struct definitions without manual SQL. Provisioning is best-effort:
//! the caller treats a failure as "remote unavailable", never as fatal.

use crate::entities::{CheckoutEvent, Key, User};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Schema};
use tracing::{debug, info};

/// Permissive row-level access policies for Postgres deployments. Ignored on
/// other backends; failures are swallowed because the statements require
/// privileges an anonymous deployment may not have.
const POSTGRES_POLICIES: &[&str] = &[
    "ALTER TABLE users ENABLE ROW LEVEL SECURITY;",
    "ALTER TABLE keys ENABLE ROW LEVEL SECURITY;",
    "ALTER TABLE checkout_events ENABLE ROW LEVEL SECURITY;",
    "CREATE POLICY allow_all_users ON users FOR ALL USING (true);",
    "CREATE POLICY allow_all_keys ON keys FOR ALL USING (true);",
    "CREATE POLICY allow_all_checkout_events ON checkout_events FOR ALL USING (true);",
];

/// Creates all necessary tables from the entity definitions.
pub(crate) async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    // Users and keys first: checkout_events carries foreign keys to both.
    let mut user_table = schema.create_table_from_entity(User);
    user_table.if_not_exists();
    db.execute(builder.build(&user_table)).await?;

    let mut key_table = schema.create_table_from_entity(Key);
    key_table.if_not_exists();
    db.execute(builder.build(&key_table)).await?;

    let mut event_table = schema.create_table_from_entity(CheckoutEvent);
    event_table.if_not_exists();
    db.execute(builder.build(&event_table)).await?;

    Ok(())
}

/// Best-effort provisioning: creates the tables and, on Postgres, applies the
/// permissive access policies. Never fails; every error is logged and
/// swallowed so initialization can degrade to fallback mode instead.
pub(crate) async fn provision(db: &DatabaseConnection) {
    match create_tables(db).await {
        Ok(()) => info!("remote tables ensured"),
        Err(e) => {
            info!("could not provision remote tables: {e}");
            return;
        }
    }

    if db.get_database_backend() == DatabaseBackend::Postgres {
        for sql in POSTGRES_POLICIES {
            if let Err(e) = db.execute_unprepared(sql).await {
                debug!("policy statement failed (may already exist): {e}");
            }
        }
    }
}
