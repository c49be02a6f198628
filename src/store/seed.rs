//! Fixture dataset for the brokerage demo.
//!
//! The same dataset seeds two places: the in-memory fallback store is always
//! built from it, and the remote store receives one copy (with freshly
//! generated ids) the first time initialization finds its users table empty.
//! Fallback rows keep the small positional ids so the two seeded checkout
//! events can cross-reference their key and user.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QuerySelect, Set};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::auth;
use crate::entities::checkout_event::{self, EventAction};
use crate::entities::key::{self, KeyStatus, PropertyType};
use crate::entities::user::{self, Role};
use crate::entities::User;
use crate::errors::Result;

/// Login secret shared by every fixture user.
pub(crate) const FIXTURE_SECRET: &str = "123456";

fn fixture_date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

fn fixture_moment(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Hashes the shared fixture secret once. A hashing failure is not worth
/// aborting startup over; it would only break demo logins.
pub(crate) fn fixture_secret_hash() -> String {
    match auth::hash_secret(FIXTURE_SECRET) {
        Ok(hash) => hash,
        Err(e) => {
            warn!("hashing the fixture secret failed: {e}");
            String::new()
        }
    }
}

/// The four demo staff accounts.
pub(crate) fn fixture_users(secret_hash: &str) -> Vec<user::Model> {
    let account = |id: &str, name: &str, email: &str, role: Role, created: DateTime<Utc>| {
        user::Model {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            secret_hash: secret_hash.to_string(),
            role,
            active: true,
            created_at: created,
        }
    };

    vec![
        account(
            "1",
            "João Silva",
            "joao@imobiliaria.com",
            Role::Broker,
            fixture_date(2024, 1, 10),
        ),
        account(
            "2",
            "Maria Santos",
            "maria@imobiliaria.com",
            Role::Admin,
            fixture_date(2024, 1, 10),
        ),
        account(
            "3",
            "Pedro Costa",
            "pedro@imobiliaria.com",
            Role::Broker,
            fixture_date(2024, 1, 12),
        ),
        account(
            "4",
            "Eduardo Armito",
            "eduarmito790@gmail.com",
            Role::Admin,
            fixture_date(2024, 1, 8),
        ),
    ]
}

/// The five demo keys. APT002 and COM001 start checked out, matching the two
/// fixture events.
pub(crate) fn fixture_keys() -> Vec<key::Model> {
    let entry = |id: &str,
                 code: &str,
                 address: &str,
                 property_type: PropertyType,
                 cabinet: &str,
                 status: KeyStatus,
                 created: DateTime<Utc>,
                 updated: DateTime<Utc>| key::Model {
        id: id.to_string(),
        property_code: code.to_string(),
        address: address.to_string(),
        property_type,
        cabinet: cabinet.to_string(),
        status,
        scan_code: format!("QR_{code}"),
        created_at: created,
        updated_at: updated,
    };

    vec![
        entry(
            "1",
            "APT001",
            "Rua das Flores, 123 - Apto 101",
            PropertyType::Apartment,
            "A1",
            KeyStatus::Available,
            fixture_date(2024, 1, 15),
            fixture_date(2024, 1, 15),
        ),
        entry(
            "2",
            "APT002",
            "Av. Central, 456 - Apto 205",
            PropertyType::Apartment,
            "A2",
            KeyStatus::CheckedOut,
            fixture_date(2024, 1, 16),
            fixture_date(2024, 3, 10),
        ),
        entry(
            "3",
            "CASA001",
            "Rua do Sol, 789",
            PropertyType::House,
            "B1",
            KeyStatus::Available,
            fixture_date(2024, 1, 20),
            fixture_date(2024, 1, 20),
        ),
        entry(
            "4",
            "COM001",
            "Rua Comercial, 321 - Loja 1",
            PropertyType::Commercial,
            "C1",
            KeyStatus::CheckedOut,
            fixture_date(2024, 2, 1),
            fixture_date(2024, 3, 5),
        ),
        entry(
            "5",
            "APT003",
            "Rua Nova, 654 - Apto 302",
            PropertyType::Apartment,
            "A3",
            KeyStatus::Available,
            fixture_date(2024, 2, 10),
            fixture_date(2024, 2, 10),
        ),
    ]
}

/// The two demo checkout events behind the checked-out fixture keys.
/// `key_id`/`user_id` reference the positional fixture ids.
pub(crate) fn fixture_events() -> Vec<checkout_event::Model> {
    vec![
        checkout_event::Model {
            id: "1".to_string(),
            key_id: "2".to_string(),
            user_id: "1".to_string(),
            action: EventAction::Checkout,
            occurred_at: fixture_moment(2024, 3, 10, 9, 30),
            note: Some("Visita agendada para 14h".to_string()),
            was_overdue: None,
        },
        checkout_event::Model {
            id: "2".to_string(),
            key_id: "4".to_string(),
            user_id: "3".to_string(),
            action: EventAction::Checkout,
            occurred_at: fixture_moment(2024, 3, 5, 10, 15),
            note: Some("Vistoria do imóvel".to_string()),
            was_overdue: Some(true),
        },
    ]
}

/// Seeds the remote store with the fixture dataset if its users table is
/// empty. Remote rows get freshly generated uuids; the seeded events are
/// remapped to the remote ids of their key and user.
pub(crate) async fn seed_remote_if_empty(db: &DatabaseConnection) -> Result<()> {
    let existing = User::find().limit(1).all(db).await?;
    if !existing.is_empty() {
        debug!("remote store already holds data, skipping fixture seed");
        return Ok(());
    }

    info!("seeding remote store with the fixture dataset");
    let secret_hash = fixture_secret_hash();

    let mut user_ids = HashMap::new();
    for fixture in fixture_users(&secret_hash) {
        let remote_id = Uuid::new_v4().to_string();
        user_ids.insert(fixture.id, remote_id.clone());
        user::ActiveModel {
            id: Set(remote_id),
            name: Set(fixture.name),
            email: Set(fixture.email),
            secret_hash: Set(fixture.secret_hash),
            role: Set(fixture.role),
            active: Set(fixture.active),
            created_at: Set(fixture.created_at),
        }
        .insert(db)
        .await?;
    }

    let mut key_ids = HashMap::new();
    for fixture in fixture_keys() {
        let remote_id = Uuid::new_v4().to_string();
        key_ids.insert(fixture.id, remote_id.clone());
        key::ActiveModel {
            id: Set(remote_id),
            property_code: Set(fixture.property_code),
            address: Set(fixture.address),
            property_type: Set(fixture.property_type),
            cabinet: Set(fixture.cabinet),
            status: Set(fixture.status),
            scan_code: Set(fixture.scan_code),
            created_at: Set(fixture.created_at),
            updated_at: Set(fixture.updated_at),
        }
        .insert(db)
        .await?;
    }

    for fixture in fixture_events() {
        let (Some(key_id), Some(user_id)) =
            (key_ids.get(&fixture.key_id), user_ids.get(&fixture.user_id))
        else {
            continue;
        };
        checkout_event::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            key_id: Set(key_id.clone()),
            user_id: Set(user_id.clone()),
            action: Set(fixture.action),
            occurred_at: Set(fixture.occurred_at),
            note: Set(fixture.note),
            was_overdue: Set(fixture.was_overdue),
        }
        .insert(db)
        .await?;
    }

    info!("fixture dataset seeded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{CheckoutEvent, Key};
    use sea_orm::Database;

    #[tokio::test]
    async fn seeding_is_guarded_by_the_empty_check() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        crate::store::schema::create_tables(&db).await?;

        seed_remote_if_empty(&db).await?;
        seed_remote_if_empty(&db).await?;

        let users = User::find().all(&db).await?;
        let keys = Key::find().all(&db).await?;
        let events = CheckoutEvent::find().all(&db).await?;
        assert_eq!(users.len(), 4);
        assert_eq!(keys.len(), 5);
        assert_eq!(events.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn seeded_events_reference_remote_ids() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        crate::store::schema::create_tables(&db).await?;
        seed_remote_if_empty(&db).await?;

        let keys = Key::find().all(&db).await?;
        let events = CheckoutEvent::find().all(&db).await?;
        for event in &events {
            assert!(keys.iter().any(|k| k.id == event.key_id));
        }
        Ok(())
    }
}
