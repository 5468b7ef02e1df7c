//! Role resolution from account flags and group membership.
//!
//! Roles are computed on every request and never stored.

use crate::entities::Group;
use serde::Serialize;

/// The three mutually exclusive roles
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Staff flag or Admin group; takes precedence over everything else
    Admin,
    /// Parent group and not an admin
    Parent,
    /// Neither admin nor parent, typically an adult student's own account
    Student,
}

impl Role {
    /// Resolves the role for an account.
    #[must_use]
    pub fn resolve(is_staff: bool, groups: &[Group]) -> Self {
        if is_staff || groups.contains(&Group::Admin) {
            Self::Admin
        } else if groups.contains(&Group::Parent) {
            Self::Parent
        } else {
            Self::Student
        }
    }

    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    #[must_use]
    pub const fn is_parent(self) -> bool {
        matches!(self, Self::Parent)
    }
}

/// Role flags handed to every view.
///
/// `is_student` also requires membership in the Student group, so an account
/// with no groups at all gets no flag set.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RoleFlags {
    #[serde(rename = "IS_ADMIN")]
    pub is_admin: bool,
    #[serde(rename = "IS_PARENT")]
    pub is_parent: bool,
    #[serde(rename = "IS_STUDENT")]
    pub is_student: bool,
}

impl RoleFlags {
    #[must_use]
    pub fn new(role: Role, groups: &[Group]) -> Self {
        Self {
            is_admin: role.is_admin(),
            is_parent: role.is_parent(),
            is_student: role == Role::Student && groups.contains(&Group::Student),
        }
    }
}
