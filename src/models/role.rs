//! Role extension tables
//!
//! Trainers, students, parents and admins each have a 1:1 extension table
//! keyed by user id. The `users.role` column and these tables are kept in step
//! by role assignment; [`RoleProfile`] reports whether they agree.

use serde::{Deserialize, Serialize};

use super::UserRole;

/// A role extension table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleTable {
    Trainer,
    Student,
    Parent,
    Admin,
}

impl RoleTable {
    pub const ALL: [RoleTable; 4] = [
        RoleTable::Trainer,
        RoleTable::Student,
        RoleTable::Parent,
        RoleTable::Admin,
    ];

    /// SQL table name. Only ever interpolated from this closed set.
    pub fn table_name(&self) -> &'static str {
        match self {
            RoleTable::Trainer => "trainers",
            RoleTable::Student => "students",
            RoleTable::Parent => "parents",
            RoleTable::Admin => "admin",
        }
    }

    /// Extension table for a role; plain users have none
    pub fn for_role(role: UserRole) -> Option<Self> {
        match role {
            UserRole::User => None,
            UserRole::Trainer => Some(RoleTable::Trainer),
            UserRole::Student => Some(RoleTable::Student),
            UserRole::Parent => Some(RoleTable::Parent),
            UserRole::Admin => Some(RoleTable::Admin),
        }
    }

    pub fn role(&self) -> UserRole {
        match self {
            RoleTable::Trainer => UserRole::Trainer,
            RoleTable::Student => UserRole::Student,
            RoleTable::Parent => UserRole::Parent,
            RoleTable::Admin => UserRole::Admin,
        }
    }
}

/// A user's role column together with the extension tables that reference it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleProfile {
    pub user_id: i64,
    pub role: UserRole,
    /// Sorted, without duplicates
    pub extensions: Vec<RoleTable>,
}

impl RoleProfile {
    /// True when the extension rows are exactly the one the role implies
    pub fn is_consistent(&self) -> bool {
        let expected: Vec<RoleTable> = RoleTable::for_role(self.role).into_iter().collect();
        self.extensions == expected
    }
}
