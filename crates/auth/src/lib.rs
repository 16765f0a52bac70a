//! `stowline-auth` — authentication/authorization boundary.
//!
//! This crate is decoupled from HTTP and storage.

pub mod account;
pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use account::{Account, AccountStatus, normalize_email};
pub use authorize::{AuthzError, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256Jwt, JwtValidator};
pub use password::{Argon2Hasher, PasswordError, PasswordHasher, PasswordPolicy, generate_temporary_password};
pub use permissions::{Permission, permissions_for};
pub use principal::Principal;
pub use roles::Role;
