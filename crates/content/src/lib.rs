//! Marketing-site content: blog posts and contact-form messages.

pub mod contact;
pub mod post;

pub use contact::{ContactMessage, ContactSubmission};
pub use post::{BlogPost, PostDraft, slugify};
