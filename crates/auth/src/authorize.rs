use thiserror::Error;

use crate::{Permission, Principal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),

    #[error("client account is not linked to a client")]
    MissingClient,
}

/// Authorize a principal for one permission.
///
/// - No IO
/// - No panics
/// - Pure policy check
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let granted = principal
        .permissions
        .iter()
        .any(|p| p.is_wildcard() || p == required);

    if !granted {
        return Err(AuthzError::Forbidden(required.as_str().to_string()));
    }

    if !principal.is_staff() && principal.client_id.is_none() {
        return Err(AuthzError::MissingClient);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{BILLS_WRITE, INVENTORY_READ, SCAN_LOOKUP};
    use crate::{Role, permissions_for};
    use stowline_core::{ClientId, SessionId, UserId};

    fn principal(role: Role, client_id: Option<ClientId>) -> Principal {
        Principal {
            user_id: UserId::new(),
            session_id: SessionId::new(),
            permissions: permissions_for(&role),
            role,
            client_id,
        }
    }

    #[test]
    fn admin_wildcard_grants_everything() {
        let p = principal(Role::ADMIN, None);
        assert!(authorize(&p, &BILLS_WRITE).is_ok());
    }

    #[test]
    fn client_cannot_write_bills() {
        let p = principal(Role::CLIENT, Some(ClientId::new()));
        assert!(authorize(&p, &INVENTORY_READ).is_ok());
        assert_eq!(
            authorize(&p, &BILLS_WRITE),
            Err(AuthzError::Forbidden("bills.write".to_string()))
        );
    }

    #[test]
    fn client_role_without_client_is_rejected() {
        let p = principal(Role::CLIENT, None);
        assert_eq!(authorize(&p, &SCAN_LOOKUP), Err(AuthzError::MissingClient));
    }

    #[test]
    fn unknown_role_has_no_permissions() {
        let p = principal(Role::new("viewer"), Some(ClientId::new()));
        assert!(authorize(&p, &INVENTORY_READ).is_err());
    }
}
