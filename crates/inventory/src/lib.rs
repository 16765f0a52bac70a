//! Inventory domain: barcode classification, SKU catalog and stock ledger.
//!
//! Pure domain logic (no IO, no HTTP, no storage).

pub mod barcode;
pub mod ledger;
pub mod sku;

pub use barcode::{BarcodeKind, Carrier, Classification, classify};
pub use ledger::{LedgerEntry, LedgerReason, on_hand, post_entry};
pub use sku::{NewSku, Sku};
