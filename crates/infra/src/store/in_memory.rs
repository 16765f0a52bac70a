use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use stowline_auth::Account;
use stowline_billing::{Bill, Quote};
use stowline_content::BlogPost;
use stowline_core::{AsnId, BillId, ClientId, QuoteId, SkuId, UserId};
use stowline_inventory::{Classification, LedgerEntry, Sku, post_entry};
use stowline_receiving::{Asn, AsnStatus};

use super::{
    AccountStore, AsnStore, BillStore, BlogStore, ClientRecord, ClientStore, LedgerStore, OAuthState,
    OAuthStateStore, QuoteStore, ScanLog, ScanRecord, SkuStore, StoreError, StoreResult, TranslationEntry,
    TranslationStore, stale,
};

/// In-memory store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    accounts: RwLock<HashMap<UserId, Account>>,
    clients: RwLock<HashMap<ClientId, ClientRecord>>,
    skus: RwLock<HashMap<SkuId, Sku>>,
    ledger: RwLock<Vec<LedgerEntry>>,
    bills: RwLock<HashMap<BillId, Bill>>,
    quotes: RwLock<HashMap<QuoteId, Quote>>,
    asns: RwLock<HashMap<AsnId, Asn>>,
    scans: RwLock<Vec<ScanRecord>>,
    posts: RwLock<HashMap<String, BlogPost>>,
    translations: RwLock<HashMap<String, TranslationEntry>>,
    oauth_states: RwLock<HashMap<String, OAuthState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn read<T>(lock: &RwLock<T>) -> StoreResult<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| StoreError::Backend("lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> StoreResult<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| StoreError::Backend("lock poisoned".to_string()))
}

fn in_scope(client_id: Option<ClientId>, owner: ClientId) -> bool {
    client_id.is_none_or(|c| c == owner)
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn insert_account(&self, account: Account) -> StoreResult<()> {
        let mut map = write(&self.accounts)?;
        if map.values().any(|a| a.email == account.email) {
            return Err(StoreError::Conflict(format!("email already registered: {}", account.email)));
        }
        map.insert(account.id, account);
        Ok(())
    }

    async fn account(&self, id: UserId) -> StoreResult<Option<Account>> {
        Ok(read(&self.accounts)?.get(&id).cloned())
    }

    async fn account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        Ok(read(&self.accounts)?.values().find(|a| a.email == email).cloned())
    }

    async fn update_account(&self, account: &Account) -> StoreResult<()> {
        let mut map = write(&self.accounts)?;
        let slot = map.get_mut(&account.id).ok_or(StoreError::NotFound)?;
        *slot = account.clone();
        Ok(())
    }
}

#[async_trait]
impl ClientStore for InMemoryStore {
    async fn insert_client(&self, client: ClientRecord) -> StoreResult<()> {
        let mut map = write(&self.clients)?;
        if map.contains_key(&client.id) {
            return Err(StoreError::Conflict("client already exists".to_string()));
        }
        map.insert(client.id, client);
        Ok(())
    }

    async fn onboard_client(&self, client: ClientRecord, account: Account) -> StoreResult<()> {
        let mut accounts = write(&self.accounts)?;
        let mut clients = write(&self.clients)?;
        if clients.contains_key(&client.id) {
            return Err(StoreError::Conflict("client already exists".to_string()));
        }
        if accounts.values().any(|a| a.email == account.email) {
            return Err(StoreError::Conflict(format!("email already registered: {}", account.email)));
        }
        clients.insert(client.id, client);
        accounts.insert(account.id, account);
        Ok(())
    }

    async fn client(&self, id: ClientId) -> StoreResult<Option<ClientRecord>> {
        Ok(read(&self.clients)?.get(&id).cloned())
    }

    async fn list_clients(&self) -> StoreResult<Vec<ClientRecord>> {
        let mut all: Vec<ClientRecord> = read(&self.clients)?.values().cloned().collect();
        all.sort_by(|a, b| a.company_name.cmp(&b.company_name));
        Ok(all)
    }
}

#[async_trait]
impl SkuStore for InMemoryStore {
    async fn insert_sku(&self, sku: Sku) -> StoreResult<()> {
        let mut map = write(&self.skus)?;
        if map.values().any(|s| s.client_id == sku.client_id && s.sku == sku.sku) {
            return Err(StoreError::Conflict(format!("sku already exists: {}", sku.sku)));
        }
        map.insert(sku.id, sku);
        Ok(())
    }

    async fn sku(&self, id: SkuId) -> StoreResult<Option<Sku>> {
        Ok(read(&self.skus)?.get(&id).cloned())
    }

    async fn list_skus(&self, client_id: Option<ClientId>) -> StoreResult<Vec<Sku>> {
        let mut out: Vec<Sku> = read(&self.skus)?
            .values()
            .filter(|s| in_scope(client_id, s.client_id))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.sku.cmp(&b.sku));
        Ok(out)
    }

    async fn find_skus(&self, client_id: Option<ClientId>, scan: &Classification) -> StoreResult<Vec<Sku>> {
        Ok(read(&self.skus)?
            .values()
            .filter(|s| in_scope(client_id, s.client_id) && s.matches(scan))
            .cloned()
            .collect())
    }

    async fn sku_by_code(&self, client_id: ClientId, code: &str) -> StoreResult<Option<Sku>> {
        Ok(read(&self.skus)?
            .values()
            .find(|s| s.client_id == client_id && s.sku == code)
            .cloned())
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn append_ledger(&self, entry: LedgerEntry) -> StoreResult<i64> {
        let mut ledger = write(&self.ledger)?;
        let current: i64 = ledger
            .iter()
            .filter(|e| e.sku_id == entry.sku_id)
            .map(|e| e.delta)
            .sum();
        let next = post_entry(current, &entry)?;
        ledger.push(entry);
        Ok(next)
    }

    async fn append_ledger_batch(&self, entries: Vec<LedgerEntry>) -> StoreResult<Vec<i64>> {
        let mut ledger = write(&self.ledger)?;
        let mut balances: HashMap<SkuId, i64> = HashMap::new();
        let mut out = Vec::with_capacity(entries.len());
        for entry in &entries {
            let current = match balances.get(&entry.sku_id) {
                Some(b) => *b,
                None => ledger
                    .iter()
                    .filter(|e| e.sku_id == entry.sku_id)
                    .map(|e| e.delta)
                    .sum(),
            };
            let next = post_entry(current, entry)?;
            balances.insert(entry.sku_id, next);
            out.push(next);
        }
        ledger.extend(entries);
        Ok(out)
    }

    async fn ledger(&self, sku_id: SkuId) -> StoreResult<Vec<LedgerEntry>> {
        Ok(read(&self.ledger)?
            .iter()
            .filter(|e| e.sku_id == sku_id)
            .cloned()
            .collect())
    }

    async fn on_hand(&self, client_id: Option<ClientId>) -> StoreResult<HashMap<SkuId, i64>> {
        let mut totals = HashMap::new();
        for e in read(&self.ledger)?.iter().filter(|e| in_scope(client_id, e.client_id)) {
            *totals.entry(e.sku_id).or_insert(0) += e.delta;
        }
        Ok(totals)
    }
}

#[async_trait]
impl BillStore for InMemoryStore {
    async fn insert_bill(&self, bill: Bill) -> StoreResult<()> {
        let mut map = write(&self.bills)?;
        if map
            .values()
            .any(|b| b.client_id == bill.client_id && b.period == bill.period)
        {
            return Err(StoreError::Conflict(format!(
                "a bill for {} already exists for this client",
                bill.period
            )));
        }
        map.insert(bill.id, bill);
        Ok(())
    }

    async fn bill(&self, id: BillId) -> StoreResult<Option<Bill>> {
        Ok(read(&self.bills)?.get(&id).cloned())
    }

    async fn list_bills(&self, client_id: Option<ClientId>) -> StoreResult<Vec<Bill>> {
        let mut out: Vec<Bill> = read(&self.bills)?
            .values()
            .filter(|b| in_scope(client_id, b.client_id))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.period.cmp(&a.period));
        Ok(out)
    }

    async fn save_bill(&self, bill: &mut Bill) -> StoreResult<()> {
        let mut map = write(&self.bills)?;
        let slot = map.get_mut(&bill.id).ok_or(StoreError::NotFound)?;
        if slot.version != bill.version {
            return Err(stale("bill"));
        }
        bill.version += 1;
        *slot = bill.clone();
        Ok(())
    }
}

#[async_trait]
impl QuoteStore for InMemoryStore {
    async fn insert_quote(&self, quote: Quote) -> StoreResult<()> {
        write(&self.quotes)?.insert(quote.id, quote);
        Ok(())
    }

    async fn quote(&self, id: QuoteId) -> StoreResult<Option<Quote>> {
        Ok(read(&self.quotes)?.get(&id).cloned())
    }

    async fn list_quotes(&self, client_id: Option<ClientId>) -> StoreResult<Vec<Quote>> {
        let mut out: Vec<Quote> = read(&self.quotes)?
            .values()
            .filter(|q| match client_id {
                Some(c) => q.applies_to(c),
                None => true,
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }
}

#[async_trait]
impl AsnStore for InMemoryStore {
    async fn insert_asn(&self, asn: Asn) -> StoreResult<()> {
        write(&self.asns)?.insert(asn.id, asn);
        Ok(())
    }

    async fn asn(&self, id: AsnId) -> StoreResult<Option<Asn>> {
        Ok(read(&self.asns)?.get(&id).cloned())
    }

    async fn list_asns(&self, client_id: Option<ClientId>, status: Option<AsnStatus>) -> StoreResult<Vec<Asn>> {
        let mut out: Vec<Asn> = read(&self.asns)?
            .values()
            .filter(|a| in_scope(client_id, a.client_id))
            .filter(|a| status.is_none_or(|s| a.status == s))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn save_asn(&self, asn: &mut Asn) -> StoreResult<()> {
        let mut map = write(&self.asns)?;
        let slot = map.get_mut(&asn.id).ok_or(StoreError::NotFound)?;
        if slot.version != asn.version {
            return Err(stale("ASN"));
        }
        asn.version += 1;
        *slot = asn.clone();
        Ok(())
    }

    async fn asns_by_tracking(&self, client_id: Option<ClientId>, code: &str) -> StoreResult<Vec<Asn>> {
        Ok(read(&self.asns)?
            .values()
            .filter(|a| in_scope(client_id, a.client_id) && a.matches_tracking(code))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ScanLog for InMemoryStore {
    async fn record_scan(&self, scan: ScanRecord) -> StoreResult<()> {
        write(&self.scans)?.push(scan);
        Ok(())
    }

    async fn recent_scans(&self, limit: usize) -> StoreResult<Vec<ScanRecord>> {
        Ok(read(&self.scans)?.iter().rev().take(limit).cloned().collect())
    }
}

#[async_trait]
impl BlogStore for InMemoryStore {
    async fn post_by_slug(&self, slug: &str) -> StoreResult<Option<BlogPost>> {
        Ok(read(&self.posts)?.get(slug).cloned())
    }

    async fn save_post(&self, post: BlogPost) -> StoreResult<()> {
        write(&self.posts)?.insert(post.slug.clone(), post);
        Ok(())
    }

    async fn list_posts(&self) -> StoreResult<Vec<BlogPost>> {
        let mut out: Vec<BlogPost> = read(&self.posts)?.values().cloned().collect();
        out.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(out)
    }
}

#[async_trait]
impl TranslationStore for InMemoryStore {
    async fn translation(&self, key: &str) -> StoreResult<Option<TranslationEntry>> {
        Ok(read(&self.translations)?.get(key).cloned())
    }

    async fn put_translation(&self, entry: TranslationEntry) -> StoreResult<()> {
        write(&self.translations)?.insert(entry.key.clone(), entry);
        Ok(())
    }
}

#[async_trait]
impl OAuthStateStore for InMemoryStore {
    async fn put_oauth_state(&self, state: OAuthState) -> StoreResult<()> {
        write(&self.oauth_states)?.insert(state.state.clone(), state);
        Ok(())
    }

    async fn take_oauth_state(&self, state: &str) -> StoreResult<Option<OAuthState>> {
        Ok(write(&self.oauth_states)?.remove(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stowline_auth::Role;
    use stowline_core::{BillingPeriod, DomainError};
    use stowline_inventory::{LedgerReason, NewSku, classify};

    fn sku(client_id: ClientId, code: &str) -> Sku {
        NewSku {
            sku: code.to_string(),
            name: code.to_string(),
            upc: Some("036000291452".to_string()),
            ean: None,
            fnsku: None,
        }
        .into_sku(client_id, Utc::now())
        .unwrap()
    }

    fn entry(s: &Sku, delta: i64, reason: LedgerReason) -> LedgerEntry {
        LedgerEntry {
            client_id: s.client_id,
            sku_id: s.id,
            delta,
            reason,
            reference: None,
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn one_bill_per_client_and_period() {
        let store = InMemoryStore::new();
        let client = ClientId::new();
        let period = BillingPeriod::new(2024, 7).unwrap();

        store.insert_bill(Bill::new(client, period, Utc::now())).await.unwrap();
        let err = store.insert_bill(Bill::new(client, period, Utc::now())).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        store
            .insert_bill(Bill::new(ClientId::new(), period, Utc::now()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn stale_bill_save_is_a_conflict() {
        let store = InMemoryStore::new();
        let bill = Bill::new(ClientId::new(), BillingPeriod::new(2024, 7).unwrap(), Utc::now());
        store.insert_bill(bill.clone()).await.unwrap();

        let mut first = store.bill(bill.id).await.unwrap().unwrap();
        let mut second = first.clone();
        first.notes = Some("first".to_string());
        store.save_bill(&mut first).await.unwrap();
        assert_eq!(first.version, 1);

        second.notes = Some("second".to_string());
        let err = store.save_bill(&mut second).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(second.version, 0);

        let stored = store.bill(bill.id).await.unwrap().unwrap();
        assert_eq!(stored.notes.as_deref(), Some("first"));
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn ledger_batch_is_all_or_nothing() {
        let store = InMemoryStore::new();
        let client = ClientId::new();
        let a = sku(client, "A-1");
        let b = sku(client, "B-1");
        store.insert_sku(a.clone()).await.unwrap();
        store.insert_sku(b.clone()).await.unwrap();
        store.append_ledger(entry(&b, i64::MAX, LedgerReason::Adjustment)).await.unwrap();

        let err = store
            .append_ledger_batch(vec![entry(&a, 4, LedgerReason::Receipt), entry(&b, 1, LedgerReason::Receipt)])
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::Rejected(DomainError::invariant("stock overflow")));
        assert!(store.ledger(a.id).await.unwrap().is_empty());

        let balances = store
            .append_ledger_batch(vec![entry(&a, 4, LedgerReason::Receipt), entry(&a, 3, LedgerReason::Receipt)])
            .await
            .unwrap();
        assert_eq!(balances, vec![4, 7]);
    }

    #[tokio::test]
    async fn onboarding_keeps_nothing_on_email_conflict() {
        let store = InMemoryStore::new();
        let existing = ClientId::new();
        let taken = Account::new("ops@acme.test", "Ops", Role::CLIENT, Some(existing), "hash".into(), Utc::now()).unwrap();
        store.insert_account(taken).await.unwrap();

        let client = ClientRecord {
            id: ClientId::new(),
            company_name: "Acme".to_string(),
            contact_name: "Ops".to_string(),
            contact_email: "ops@acme.test".to_string(),
            created_at: Utc::now(),
        };
        let login =
            Account::new("ops@acme.test", "Ops", Role::CLIENT, Some(client.id), "hash".into(), Utc::now()).unwrap();
        let err = store.onboard_client(client.clone(), login).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store.client(client.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ledger_rejects_negative_stock() {
        let store = InMemoryStore::new();
        let s = sku(ClientId::new(), "A-1");
        store.insert_sku(s.clone()).await.unwrap();

        assert_eq!(store.append_ledger(entry(&s, 5, LedgerReason::Receipt)).await, Ok(5));
        let err = store.append_ledger(entry(&s, -6, LedgerReason::Shipment)).await.unwrap_err();
        assert_eq!(err, StoreError::Rejected(DomainError::invariant("stock cannot go negative")));
        assert_eq!(store.on_hand(Some(s.client_id)).await.unwrap()[&s.id], 5);
    }

    #[tokio::test]
    async fn sku_lookup_is_client_scoped() {
        let store = InMemoryStore::new();
        let a = ClientId::new();
        let b = ClientId::new();
        store.insert_sku(sku(a, "A-1")).await.unwrap();
        store.insert_sku(sku(b, "B-1")).await.unwrap();

        let scan = classify("036000291452");
        assert_eq!(store.find_skus(Some(a), &scan).await.unwrap().len(), 1);
        assert_eq!(store.find_skus(None, &scan).await.unwrap().len(), 2);

        let dup = store.insert_sku(sku(a, "a-1")).await.unwrap_err();
        assert!(matches!(dup, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn oauth_state_redeems_once() {
        let store = InMemoryStore::new();
        store
            .put_oauth_state(OAuthState {
                state: "abc".to_string(),
                client_id: ClientId::new(),
                shop: "demo.myshopify.com".to_string(),
                expires_at: Utc::now(),
            })
            .await
            .unwrap();
        assert!(store.take_oauth_state("abc").await.unwrap().is_some());
        assert!(store.take_oauth_state("abc").await.unwrap().is_none());
    }
}
