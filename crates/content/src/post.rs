use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stowline_core::{DomainError, DomainResult, PostId};

const MAX_SLUG_LEN: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: PostId,
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub body: String,
    pub tags: Vec<String>,
    /// Unpublished posts are hidden from the public listing.
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlogPost {
    pub fn is_published(&self, now: DateTime<Utc>) -> bool {
        self.published_at.is_some_and(|p| p <= now)
    }

    /// Overwrite content from a re-imported draft, keeping identity.
    pub fn update_from(&mut self, draft: PostDraft, now: DateTime<Utc>) {
        self.title = draft.title;
        self.excerpt = draft.excerpt;
        self.body = draft.body;
        self.tags = draft.tags;
        self.published_at = draft.published_at;
        self.updated_at = now;
    }
}

/// One post as supplied to the import endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PostDraft {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl PostDraft {
    /// Trim fields, derive the slug and dedupe tags. Returns the slug.
    pub fn normalize(&mut self) -> DomainResult<String> {
        self.title = self.title.trim().to_string();
        self.body = self.body.trim().to_string();
        if self.title.is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }
        if self.body.is_empty() {
            return Err(DomainError::validation("body cannot be empty"));
        }

        let slug = match self.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => slugify(s),
            None => slugify(&self.title),
        };
        if slug.is_empty() {
            return Err(DomainError::validation("could not derive a slug"));
        }
        self.slug = Some(slug.clone());

        self.excerpt = self.excerpt.take().map(|e| e.trim().to_string()).filter(|e| !e.is_empty());

        let mut tags: Vec<String> = self
            .tags
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        tags.sort();
        tags.dedup();
        self.tags = tags;

        Ok(slug)
    }

    pub fn into_post(self, slug: String, now: DateTime<Utc>) -> BlogPost {
        BlogPost {
            id: PostId::new(),
            slug,
            title: self.title,
            excerpt: self.excerpt,
            body: self.body,
            tags: self.tags,
            published_at: self.published_at,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Lowercase ASCII alphanumerics; every other run of characters becomes `-`.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        while slug.ends_with('-') {
            slug.pop();
        }
    }
    slug
}
