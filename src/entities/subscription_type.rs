//! Subscription type entity - a reusable plan (lesson count and price).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Subscription plan database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscription_types")]
pub struct Model {
    /// Unique identifier for the plan
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g., "Basic")
    pub name: String,
    /// Lessons granted when the plan is paid
    pub lessons_count: i32,
    /// Price of the plan
    pub price: f64,
}

/// Defines relationships between `SubscriptionType` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One plan is used by many subscriptions
    #[sea_orm(has_many = "super::subscription::Entity")]
    Subscriptions,
}

impl Related<super::subscription::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subscriptions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
