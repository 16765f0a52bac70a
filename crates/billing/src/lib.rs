//! Billing domain: monthly client bills, pricing quotes and repricing.
//!
//! Deterministic domain logic only (no IO, no HTTP, no storage).

pub mod bill;
pub mod quote;
pub mod reprice;

pub use bill::{Bill, BillItem, BillStatus, NewBillItem};
pub use quote::{PopulateOutcome, Quote, QuoteLine, populate_from_quote};
pub use reprice::{RepriceOutcome, RepriceScope, reprice};
