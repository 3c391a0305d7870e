//! Roles supplied by the external identity service and the actors that
//! carry them.

use common::UserId;
use serde::{Deserialize, Serialize};

use crate::text_enum::text_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Coordinator,
    Requester,
    Maintenance,
}

text_enum!(Role, "role" {
    Admin => "admin",
    Coordinator => "coordinator",
    Requester => "requester",
    Maintenance => "maintenance",
});

impl Role {
    /// Approve, reject and read the approval queue.
    pub fn can_review(&self) -> bool {
        matches!(self, Role::Admin | Role::Coordinator)
    }

    /// Cancel someone else's approved reservation.
    pub fn can_force_cancel(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Read every reservation rather than only one's own.
    pub fn sees_all_reservations(&self) -> bool {
        matches!(self, Role::Admin | Role::Coordinator)
    }
}

/// A user acting on the engine, with the role resolved for this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}
