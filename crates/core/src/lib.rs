//! `stowline-core` — shared domain primitives for the fulfillment portal.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod money;
pub mod period;

pub use error::{DomainError, DomainResult};
pub use id::{AsnId, BillId, BillItemId, ClientId, PostId, QuoteId, ScanId, SessionId, SkuId, UserId};
pub use money::Money;
pub use period::BillingPeriod;
