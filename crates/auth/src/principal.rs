use stowline_core::{ClientId, SessionId, UserId};

use crate::{JwtClaims, Permission, Role, permissions_for};

/// A fully resolved principal for authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub session_id: SessionId,
    pub role: Role,
    /// Client the principal belongs to; `None` for staff accounts.
    pub client_id: Option<ClientId>,
    pub permissions: Vec<Permission>,
}

impl Principal {
    pub fn from_claims(claims: &JwtClaims) -> Self {
        Self {
            user_id: claims.sub,
            session_id: claims.sid,
            role: claims.role.clone(),
            client_id: claims.client_id,
            permissions: permissions_for(&claims.role),
        }
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}
