//! Training session entity - one scheduled class occurrence.

use chrono::Duration;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Training session database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "training_sessions")]
pub struct Model {
    /// Unique identifier for the session
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Studio-local start time
    pub start: DateTime,
    /// Length of the class in minutes
    pub duration_minutes: i32,
    /// Free-text notes shown on the session card
    pub notes: String,
}

impl Model {
    /// Start plus duration.
    #[must_use]
    pub fn end(&self) -> DateTime {
        self.start + Duration::minutes(i64::from(self.duration_minutes))
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Participant rows
    #[sea_orm(has_many = "super::session_participant::Entity")]
    Participants,
}

impl Related<super::child::Entity> for Entity {
    fn to() -> RelationDef {
        super::session_participant::Relation::Child.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::session_participant::Relation::TrainingSession.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
