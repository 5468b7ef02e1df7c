//! Subscription entity - the lesson-credit balance of one student.
//!
//! Each child has at most one subscription. `lessons_remaining` stays within
//! `0..=plan.lessons_count` and reaching zero clears `paid`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Subscription database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    /// Unique identifier for the subscription
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Student owning this balance
    #[sea_orm(unique)]
    pub child_id: i64,
    /// Plan the balance was issued from
    pub sub_type_id: i64,
    /// Lessons left before the next payment
    pub lessons_remaining: i32,
    /// Price cached at issue/payment time
    pub price: f64,
    /// Whether the current balance has been paid for
    pub paid: bool,
}

/// Defines relationships between Subscription and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each subscription belongs to one child
    #[sea_orm(
        belongs_to = "super::child::Entity",
        from = "Column::ChildId",
        to = "super::child::Column::Id",
        on_delete = "Cascade"
    )]
    Child,
    /// Each subscription uses one plan; plans in use cannot be deleted
    #[sea_orm(
        belongs_to = "super::subscription_type::Entity",
        from = "Column::SubTypeId",
        to = "super::subscription_type::Column::Id",
        on_delete = "Restrict"
    )]
    SubscriptionType,
}

impl Related<super::child::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Child.def()
    }
}

impl Related<super::subscription_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubscriptionType.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
