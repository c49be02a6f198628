//! Key entity - Represents a tracked physical property key.
//!
//! Each key belongs to a property (identified by its human-chosen property
//! code), lives in a labelled cabinet slot, and carries a unique scan code for
//! the QR lookup flow. Status is driven by checkout/return operations, never
//! patched directly.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Key database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "keys")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Human-chosen property code (e.g., "APT001"), unique
    #[sea_orm(unique)]
    pub property_code: String,
    /// Free-text address of the property
    pub address: String,
    /// Kind of property the key opens
    pub property_type: PropertyType,
    /// Storage-cabinet slot label (e.g., "A1")
    pub cabinet: String,
    /// Current custody status
    pub status: KeyStatus,
    /// Unique scan code for QR lookups (e.g., "QR_APT001")
    #[sea_orm(unique)]
    pub scan_code: String,
    /// When the key was registered
    pub created_at: DateTimeUtc,
    /// When the key was last updated, refreshed by every update
    pub updated_at: DateTimeUtc,
}

/// Kind of property a key opens.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    /// Apartment unit
    #[sea_orm(string_value = "apartment")]
    Apartment,
    /// Stand-alone house
    #[sea_orm(string_value = "house")]
    House,
    /// Commercial space
    #[sea_orm(string_value = "commercial")]
    Commercial,
    /// Undeveloped land
    #[sea_orm(string_value = "land")]
    Land,
}

/// Custody status of a key.
///
/// `available --checkout--> checked_out --return--> available`;
/// `maintenance` is entered by an explicit admin action and has no exit
/// transition.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum KeyStatus {
    /// In its cabinet slot, ready to be taken
    #[sea_orm(string_value = "available")]
    Available,
    /// Held by a user
    #[sea_orm(string_value = "checked_out")]
    CheckedOut,
    /// Withdrawn from circulation by an admin
    #[sea_orm(string_value = "maintenance")]
    Maintenance,
}

/// Defines relationships between Key and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One key has many checkout events
    #[sea_orm(has_many = "super::checkout_event::Entity")]
    CheckoutEvents,
}

impl Related<super::checkout_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CheckoutEvents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
