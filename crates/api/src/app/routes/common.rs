use core::str::FromStr;

use serde::Deserialize;

use stowline_core::{ClientId, DomainError};

use crate::app::errors::ApiError;

/// Parse a path identifier, reporting which kind of id was malformed.
pub fn parse_id<T>(raw: &str, what: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse().map_err(|_| ApiError::validation(format!("invalid {what} id")))
}

/// `?client_id=` filter accepted by staff list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ScopeQuery {
    #[serde(default)]
    pub client_id: Option<ClientId>,
}
