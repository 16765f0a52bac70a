use stowline_auth::Principal;
use stowline_core::ClientId;

use crate::app::errors::ApiError;

/// Authenticated identity for a request.
///
/// Inserted by the auth middleware; every protected handler extracts it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Which clients' records a read may see.
    ///
    /// Staff may narrow to one client; client accounts always see their own
    /// and asking for another client is forbidden.
    pub fn read_scope(&self, requested: Option<ClientId>) -> Result<ClientScope, ApiError> {
        if self.principal.is_staff() {
            return Ok(requested.map_or(ClientScope::All, ClientScope::Client));
        }
        let own = self.own_client()?;
        match requested {
            Some(other) if other != own => Err(ApiError::Forbidden("cannot access another client's records".to_string())),
            _ => Ok(ClientScope::Client(own)),
        }
    }

    /// The client a write applies to: the caller's own, or (staff) the one named.
    pub fn write_client(&self, requested: Option<ClientId>) -> Result<ClientId, ApiError> {
        if self.principal.is_staff() {
            return requested.ok_or_else(|| ApiError::validation("client_id is required"));
        }
        let own = self.own_client()?;
        match requested {
            Some(other) if other != own => Err(ApiError::Forbidden("cannot act for another client".to_string())),
            _ => Ok(own),
        }
    }

    /// Hide records owned by other clients (reported as not found).
    pub fn ensure_visible(&self, owner: ClientId, what: &str) -> Result<(), ApiError> {
        if self.read_scope(None)?.includes(owner) {
            Ok(())
        } else {
            Err(ApiError::not_found(what))
        }
    }

    fn own_client(&self) -> Result<ClientId, ApiError> {
        self.principal
            .client_id
            .ok_or_else(|| ApiError::Forbidden("account is not linked to a client".to_string()))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClientScope {
    All,
    Client(ClientId),
}

impl ClientScope {
    pub fn client_id(&self) -> Option<ClientId> {
        match self {
            ClientScope::All => None,
            ClientScope::Client(c) => Some(*c),
        }
    }

    pub fn includes(&self, owner: ClientId) -> bool {
        match self {
            ClientScope::All => true,
            ClientScope::Client(c) => *c == owner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stowline_auth::{Role, permissions_for};
    use stowline_core::{SessionId, UserId};

    fn ctx(role: Role, client_id: Option<ClientId>) -> PrincipalContext {
        PrincipalContext::new(Principal {
            user_id: UserId::new(),
            session_id: SessionId::new(),
            permissions: permissions_for(&role),
            role,
            client_id,
        })
    }

    #[test]
    fn client_reads_are_pinned_to_own_client() {
        let own = ClientId::new();
        let c = ctx(Role::CLIENT, Some(own));
        assert_eq!(c.read_scope(None), Ok(ClientScope::Client(own)));
        assert!(matches!(c.read_scope(Some(ClientId::new())), Err(ApiError::Forbidden(_))));
        assert!(matches!(c.ensure_visible(ClientId::new(), "bill"), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn staff_may_filter_or_see_all() {
        let c = ctx(Role::ADMIN, None);
        let other = ClientId::new();
        assert_eq!(c.read_scope(None), Ok(ClientScope::All));
        assert_eq!(c.read_scope(Some(other)), Ok(ClientScope::Client(other)));
        assert!(c.write_client(None).is_err());
        assert_eq!(c.write_client(Some(other)), Ok(other));
    }
}
