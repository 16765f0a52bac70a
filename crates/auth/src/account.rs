//! Portal accounts (login identities).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stowline_core::{ClientId, DomainError, UserId};

use crate::{PasswordError, PasswordHasher, PasswordPolicy, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Disabled,
}

/// A login identity. Client accounts carry the client they act for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub client_id: Option<ClientId>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub password_changed_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn new(
        email: &str,
        display_name: impl Into<String>,
        role: Role,
        client_id: Option<ClientId>,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let email = normalize_email(email)?;
        if !role.is_staff() && client_id.is_none() {
            return Err(DomainError::validation("client accounts must reference a client"));
        }
        Ok(Self {
            id: UserId::new(),
            email,
            display_name: display_name.into(),
            role,
            client_id,
            password_hash,
            status: AccountStatus::Active,
            created_at: now,
            password_changed_at: None,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// Verify the current password, apply the policy and store a new hash.
    pub fn change_password(
        &mut self,
        hasher: &dyn PasswordHasher,
        policy: &PasswordPolicy,
        current: &str,
        new: &str,
        now: DateTime<Utc>,
    ) -> Result<(), PasswordError> {
        if !hasher.verify_password(current, &self.password_hash)? {
            return Err(PasswordError::Mismatch);
        }
        policy.check(new, Some(current))?;
        self.password_hash = hasher.hash_password(new)?;
        self.password_changed_at = Some(now);
        Ok(())
    }
}

/// Lowercase/trim an email address and check its basic shape.
pub fn normalize_email(raw: &str) -> Result<String, DomainError> {
    let email = raw.trim().to_ascii_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    };
    if !valid || email.len() > 254 {
        return Err(DomainError::validation("invalid email address"));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Argon2Hasher;

    fn account(hasher: &Argon2Hasher, password: &str) -> Account {
        Account::new(
            "Ops@Example.com ",
            "Ops",
            Role::CLIENT,
            Some(ClientId::new()),
            hasher.hash_password(password).unwrap(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn email_is_normalized() {
        let hasher = Argon2Hasher::development();
        assert_eq!(account(&hasher, "start123x").email, "ops@example.com");
    }

    #[test]
    fn rejects_bad_emails() {
        for bad in ["", "no-at", "a@b", "a@.com", "a b@c.com", "a@b@c.com"] {
            assert!(normalize_email(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn client_role_requires_client() {
        let err = Account::new("a@b.com", "A", Role::CLIENT, None, String::new(), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn change_password_requires_current() {
        let hasher = Argon2Hasher::development();
        let policy = PasswordPolicy::default();
        let mut acct = account(&hasher, "start123x");

        let err = acct
            .change_password(&hasher, &policy, "wrong123x", "next456yy", Utc::now())
            .unwrap_err();
        assert_eq!(err, PasswordError::Mismatch);

        acct.change_password(&hasher, &policy, "start123x", "next456yy", Utc::now())
            .unwrap();
        assert!(hasher.verify_password("next456yy", &acct.password_hash).unwrap());
        assert!(acct.password_changed_at.is_some());
    }
}
