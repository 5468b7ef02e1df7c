//! Group membership of an account. The set of groups is fixed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Groups an account can belong to
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum Group {
    /// Studio administrators
    #[sea_orm(string_value = "Admin")]
    Admin,
    /// Parents of minor students
    #[sea_orm(string_value = "Parent")]
    Parent,
    /// Adult students with their own login
    #[sea_orm(string_value = "Student")]
    Student,
}

/// Membership row; an account joins each group at most once
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "account_groups")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Member account
    pub account_id: i64,
    /// Group joined
    pub group: Group,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each membership belongs to one account
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id",
        on_delete = "Cascade"
    )]
    Account,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
