use serde::Deserialize;

use stowline_auth::normalize_email;
use stowline_core::{DomainError, DomainResult};

/// Raw contact-form body.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub message: String,
    /// Hidden honeypot field; humans leave it empty.
    #[serde(default)]
    pub website: Option<String>,
}

/// Validated message ready to relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub message: String,
}

impl ContactSubmission {
    pub fn is_spam(&self) -> bool {
        self.website.as_deref().is_some_and(|w| !w.trim().is_empty())
    }

    pub fn validate(self) -> DomainResult<ContactMessage> {
        let name = self.name.trim().to_string();
        if name.is_empty() || name.chars().count() > 100 {
            return Err(DomainError::validation("name must be 1-100 characters"));
        }
        let email = normalize_email(&self.email)?;
        let message = self.message.trim().to_string();
        let len = message.chars().count();
        if !(10..=5000).contains(&len) {
            return Err(DomainError::validation("message must be 10-5000 characters"));
        }

        let clean = |v: Option<String>, max: usize| -> DomainResult<Option<String>> {
            match v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
                Some(s) if s.chars().count() > max => {
                    Err(DomainError::validation(format!("field exceeds {max} characters")))
                }
                other => Ok(other),
            }
        };

        Ok(ContactMessage {
            name,
            email,
            company: clean(self.company, 200)?,
            phone: clean(self.phone, 40)?,
            message,
        })
    }
}

impl ContactMessage {
    pub fn subject(&self) -> String {
        match &self.company {
            Some(c) => format!("New contact request from {} ({})", self.name, c),
            None => format!("New contact request from {}", self.name),
        }
    }

    pub fn text_body(&self) -> String {
        let mut body = format!("Name: {}\nEmail: {}\n", self.name, self.email);
        if let Some(c) = &self.company {
            body.push_str(&format!("Company: {c}\n"));
        }
        if let Some(p) = &self.phone {
            body.push_str(&format!("Phone: {p}\n"));
        }
        body.push('\n');
        body.push_str(&self.message);
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> ContactSubmission {
        ContactSubmission {
            name: " Dana ".to_string(),
            email: "Dana@Shop.io".to_string(),
            company: Some("Shop Co".to_string()),
            phone: None,
            message: "We ship 2k orders a month.".to_string(),
            website: None,
        }
    }

    #[test]
    fn validates_and_formats() {
        let msg = submission().validate().unwrap();
        assert_eq!(msg.name, "Dana");
        assert_eq!(msg.email, "dana@shop.io");
        assert_eq!(msg.subject(), "New contact request from Dana (Shop Co)");
        assert!(msg.text_body().contains("Company: Shop Co"));
    }

    #[test]
    fn short_message_is_rejected() {
        let mut s = submission();
        s.message = "hi".to_string();
        assert!(s.validate().is_err());
    }

    #[test]
    fn honeypot_marks_spam() {
        let mut s = submission();
        assert!(!s.is_spam());
        s.website = Some("http://spam.example".to_string());
        assert!(s.is_spam());
    }
}
