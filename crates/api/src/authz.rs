//! API-side authorization guard.
//!
//! Handlers call `require` before touching the store so domain crates and
//! infra stay auth-agnostic.

use stowline_auth::{Permission, authorize};

use crate::app::errors::ApiError;
use crate::context::PrincipalContext;

pub fn require(principal: &PrincipalContext, permission: &Permission) -> Result<(), ApiError> {
    authorize(principal.principal(), permission)?;
    Ok(())
}

/// Staff-only operations (warehouse or admin).
pub fn require_staff(principal: &PrincipalContext) -> Result<(), ApiError> {
    if principal.principal().is_staff() {
        Ok(())
    } else {
        Err(ApiError::Forbidden("staff only".to_string()))
    }
}
