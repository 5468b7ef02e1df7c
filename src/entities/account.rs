//! Account entity - a login identity owned by the upstream auth layer.
//!
//! Passwords and sessions live outside this service; an account here is the
//! record the authenticated request resolves to, plus its group memberships.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    /// Unique identifier, also the value the auth proxy puts in the identity header
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Login name, unique across all accounts
    #[sea_orm(unique)]
    pub username: String,
    /// Contact address (may be empty for adult student accounts)
    pub email: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Staff accounts are always administrators
    pub is_staff: bool,
    /// When the account was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Account and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One account belongs to many groups
    #[sea_orm(has_many = "super::account_group::Entity")]
    Groups,
}

impl Related<super::account_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
