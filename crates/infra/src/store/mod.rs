//! Storage seam for the hosted relational backend.
//!
//! Each concern gets a small async trait; `PortalStore` is their union so the
//! API can hold a single `Arc<dyn PortalStore>`. Uniqueness rules (one bill
//! per client and month, unique emails, SKUs and slugs) are enforced here and
//! surface as `StoreError::Conflict`.
//!
//! Bills and ASNs are saved with a compare-and-swap on `version`: a save
//! succeeds only if the stored version still equals the caller's, and then
//! bumps both. A lost race surfaces as `StoreError::Conflict`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use stowline_auth::Account;
use stowline_billing::{Bill, Quote};
use stowline_content::BlogPost;
use stowline_core::{AsnId, BillId, ClientId, DomainError, QuoteId, ScanId, SkuId, UserId};
use stowline_inventory::{BarcodeKind, Classification, LedgerEntry, Sku};
use stowline_receiving::{Asn, AsnStatus};

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    /// A write was rejected by a domain rule checked inside the store.
    #[error(transparent)]
    Rejected(#[from] DomainError),

    #[error("backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub(crate) fn stale(what: &str) -> StoreError {
    StoreError::Conflict(format!("{what} was modified concurrently; reload and retry"))
}

/// A 3PL client company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientRecord {
    pub id: ClientId,
    pub company_name: String,
    pub contact_name: String,
    pub contact_email: String,
    pub created_at: DateTime<Utc>,
}

/// One barcode scan, kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanRecord {
    pub id: ScanId,
    pub code: String,
    pub kind: BarcodeKind,
    pub matched: bool,
    pub client_id: Option<ClientId>,
    pub scanned_by: UserId,
    pub scanned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationEntry {
    /// SHA-256 of target language and source text.
    pub key: String,
    pub source_text: String,
    pub target_lang: String,
    pub translated_text: String,
    pub created_at: DateTime<Utc>,
}

/// Pending OAuth authorization (state nonce → client).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthState {
    pub state: String,
    pub client_id: ClientId,
    pub shop: String,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn insert_account(&self, account: Account) -> StoreResult<()>;
    async fn account(&self, id: UserId) -> StoreResult<Option<Account>>;
    async fn account_by_email(&self, email: &str) -> StoreResult<Option<Account>>;
    async fn update_account(&self, account: &Account) -> StoreResult<()>;
}

#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn insert_client(&self, client: ClientRecord) -> StoreResult<()>;
    /// Insert a client together with its login; neither is kept if either fails.
    async fn onboard_client(&self, client: ClientRecord, account: Account) -> StoreResult<()>;
    async fn client(&self, id: ClientId) -> StoreResult<Option<ClientRecord>>;
    async fn list_clients(&self) -> StoreResult<Vec<ClientRecord>>;
}

#[async_trait]
pub trait SkuStore: Send + Sync {
    async fn insert_sku(&self, sku: Sku) -> StoreResult<()>;
    async fn sku(&self, id: SkuId) -> StoreResult<Option<Sku>>;
    /// `None` lists every client's SKUs.
    async fn list_skus(&self, client_id: Option<ClientId>) -> StoreResult<Vec<Sku>>;
    async fn find_skus(&self, client_id: Option<ClientId>, scan: &Classification) -> StoreResult<Vec<Sku>>;
    async fn sku_by_code(&self, client_id: ClientId, code: &str) -> StoreResult<Option<Sku>>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Validate and append atomically; returns the new on-hand quantity.
    async fn append_ledger(&self, entry: LedgerEntry) -> StoreResult<i64>;
    /// All-or-nothing append; returns each entry's resulting on-hand in order.
    async fn append_ledger_batch(&self, entries: Vec<LedgerEntry>) -> StoreResult<Vec<i64>>;
    async fn ledger(&self, sku_id: SkuId) -> StoreResult<Vec<LedgerEntry>>;
    async fn on_hand(&self, client_id: Option<ClientId>) -> StoreResult<HashMap<SkuId, i64>>;
}

#[async_trait]
pub trait BillStore: Send + Sync {
    async fn insert_bill(&self, bill: Bill) -> StoreResult<()>;
    async fn bill(&self, id: BillId) -> StoreResult<Option<Bill>>;
    async fn list_bills(&self, client_id: Option<ClientId>) -> StoreResult<Vec<Bill>>;
    /// Compare-and-swap on `bill.version`; bumps it on success.
    async fn save_bill(&self, bill: &mut Bill) -> StoreResult<()>;
}

#[async_trait]
pub trait QuoteStore: Send + Sync {
    async fn insert_quote(&self, quote: Quote) -> StoreResult<()>;
    async fn quote(&self, id: QuoteId) -> StoreResult<Option<Quote>>;
    /// With a client, lists that client's quotes plus general rate cards.
    async fn list_quotes(&self, client_id: Option<ClientId>) -> StoreResult<Vec<Quote>>;
}

#[async_trait]
pub trait AsnStore: Send + Sync {
    async fn insert_asn(&self, asn: Asn) -> StoreResult<()>;
    async fn asn(&self, id: AsnId) -> StoreResult<Option<Asn>>;
    async fn list_asns(&self, client_id: Option<ClientId>, status: Option<AsnStatus>) -> StoreResult<Vec<Asn>>;
    /// Compare-and-swap on `asn.version`; bumps it on success.
    async fn save_asn(&self, asn: &mut Asn) -> StoreResult<()>;
    async fn asns_by_tracking(&self, client_id: Option<ClientId>, code: &str) -> StoreResult<Vec<Asn>>;
}

#[async_trait]
pub trait ScanLog: Send + Sync {
    async fn record_scan(&self, scan: ScanRecord) -> StoreResult<()>;
    async fn recent_scans(&self, limit: usize) -> StoreResult<Vec<ScanRecord>>;
}

#[async_trait]
pub trait BlogStore: Send + Sync {
    async fn post_by_slug(&self, slug: &str) -> StoreResult<Option<BlogPost>>;
    /// Insert or replace by slug.
    async fn save_post(&self, post: BlogPost) -> StoreResult<()>;
    async fn list_posts(&self) -> StoreResult<Vec<BlogPost>>;
}

#[async_trait]
pub trait TranslationStore: Send + Sync {
    async fn translation(&self, key: &str) -> StoreResult<Option<TranslationEntry>>;
    async fn put_translation(&self, entry: TranslationEntry) -> StoreResult<()>;
}

#[async_trait]
pub trait OAuthStateStore: Send + Sync {
    async fn put_oauth_state(&self, state: OAuthState) -> StoreResult<()>;
    /// Remove and return a state; each state can be redeemed once.
    async fn take_oauth_state(&self, state: &str) -> StoreResult<Option<OAuthState>>;
}

/// Everything the portal persists.
pub trait PortalStore:
    AccountStore
    + ClientStore
    + SkuStore
    + LedgerStore
    + BillStore
    + QuoteStore
    + AsnStore
    + ScanLog
    + BlogStore
    + TranslationStore
    + OAuthStateStore
{
}

impl<T> PortalStore for T where
    T: AccountStore
        + ClientStore
        + SkuStore
        + LedgerStore
        + BillStore
        + QuoteStore
        + AsnStore
        + ScanLog
        + BlogStore
        + TranslationStore
        + OAuthStateStore
{
}
