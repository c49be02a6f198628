//! Checkout event entity - The append-only custody log.
//!
//! Each event records a key being taken or returned by a user at an instant.
//! The most recent `checkout` event for a checked-out key with no later
//! `return` determines who currently holds it. Events are never updated or
//! deleted individually; they go away only when their key is removed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Checkout event database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "checkout_events")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the event
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Key this event concerns
    pub key_id: String,
    /// User who took or returned the key
    pub user_id: String,
    /// Whether the key was taken or returned
    pub action: EventAction,
    /// When the event happened
    pub occurred_at: DateTimeUtc,
    /// Optional free-text note (e.g., "showing scheduled for 2pm")
    pub note: Option<String>,
    /// Whether the checkout had run overdue, captured at return time
    pub was_overdue: Option<bool>,
}

/// What a checkout event records.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Key taken from its cabinet slot
    #[sea_orm(string_value = "checkout")]
    Checkout,
    /// Key put back
    #[sea_orm(string_value = "return")]
    Return,
}

/// Defines relationships between CheckoutEvent and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each event belongs to one key; removed with it
    #[sea_orm(
        belongs_to = "super::key::Entity",
        from = "Column::KeyId",
        to = "super::key::Column::Id",
        on_delete = "Cascade"
    )]
    Key,
    /// Each event belongs to one user; removed with them
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::key::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Key.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
