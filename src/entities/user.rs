//! User entity - Represents brokerage staff allowed to handle keys.
//!
//! Users authenticate by email and secret and carry a role that gates the
//! management operations. Credential secrets are stored as Argon2id hashes,
//! never as plaintext.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the user (uuid in remote mode, numeric token in fallback mode)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Display name (e.g., "Maria Santos")
    pub name: String,
    /// Login email, unique across the user set
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2id PHC-format hash of the login secret
    pub secret_hash: String,
    /// Role gating management operations
    pub role: Role,
    /// Whether the user may log in and handle keys
    pub active: bool,
    /// When the account was created
    pub created_at: DateTimeUtc,
}

/// Role of a brokerage user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access: user and key management plus custody operations
    #[sea_orm(string_value = "admin")]
    Admin,
    /// Custody operations only
    #[sea_orm(string_value = "broker")]
    Broker,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has many checkout events
    #[sea_orm(has_many = "super::checkout_event::Entity")]
    CheckoutEvents,
}

impl Related<super::checkout_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CheckoutEvents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
