//! The entity performing an operation, as supplied by the auth boundary.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    /// Unauthenticated caller. Carries the nil id and never owns anything.
    pub fn anonymous() -> Self {
        Self::new(Uuid::nil(), Role::Anonymous)
    }

    pub fn is_authenticated(&self) -> bool {
        self.role != Role::Anonymous && !self.id.is_nil()
    }

    /// Ownership is only ever granted to authenticated actors.
    pub fn owns(&self, owner_id: Uuid) -> bool {
        self.is_authenticated() && self.id == owner_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_never_owns_the_nil_id() {
        let actor = Actor::anonymous();
        assert!(!actor.is_authenticated());
        assert!(!actor.owns(Uuid::nil()));
    }

    #[test]
    fn nil_id_with_a_role_is_not_authenticated() {
        let actor = Actor::new(Uuid::nil(), Role::Admin);
        assert!(!actor.is_authenticated());
    }
}
