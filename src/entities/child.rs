//! Child entity - a student record.
//!
//! Minors are linked to a parent account. Adult students have no parent and
//! instead link to their own login account.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Recorded gender of a student
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(1))")]
pub enum Gender {
    /// Boy
    #[sea_orm(string_value = "M")]
    #[serde(rename = "M")]
    Male,
    /// Girl
    #[sea_orm(string_value = "F")]
    #[serde(rename = "F")]
    Female,
    /// Not specified
    #[default]
    #[sea_orm(string_value = "U")]
    #[serde(rename = "U")]
    Unspecified,
}

/// Child database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "children")]
pub struct Model {
    /// Unique identifier for the student
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning parent account, for minors
    pub parent_id: Option<i64>,
    /// Whether this student is an adult with their own login
    pub is_adult: bool,
    /// Linked login account, for adults
    #[sea_orm(unique)]
    pub account_id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<Date>,
    pub gender: Gender,
    #[sea_orm(column_type = "Text")]
    pub notes: String,
}

impl Model {
    /// "First Last", trimmed when the last name is empty.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Defines relationships between Child and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Parent account of a minor
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::ParentId",
        to = "super::account::Column::Id",
        on_delete = "Cascade"
    )]
    Parent,
    /// Login account of an adult student
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id",
        on_delete = "SetNull"
    )]
    Account,
    /// At most one subscription per child
    #[sea_orm(has_one = "super::subscription::Entity")]
    Subscription,
    /// Session participations
    #[sea_orm(has_many = "super::session_participant::Entity")]
    Participations,
}

impl Related<super::subscription::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subscription.def()
    }
}

impl Related<super::training_session::Entity> for Entity {
    fn to() -> RelationDef {
        super::session_participant::Relation::TrainingSession.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::session_participant::Relation::Child.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
