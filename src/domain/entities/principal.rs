//! Authenticated identity of a request caller.

use uuid::Uuid;

use crate::domain::entities::user::Tier;

/// Identity attached to every request by the auth middleware.
///
/// Threaded explicitly through services as a parameter; handlers read it
/// from request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Anonymous,
    User {
        id: Uuid,
        tier: Tier,
        is_admin: bool,
    },
}

impl Principal {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::Anonymous)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Principal::User { is_admin: true, .. })
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Principal::Anonymous => None,
            Principal::User { id, .. } => Some(*id),
        }
    }

    pub fn tier(&self) -> Option<Tier> {
        match self {
            Principal::Anonymous => None,
            Principal::User { tier, .. } => Some(*tier),
        }
    }
}
