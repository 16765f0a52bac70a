//! Postgres-backed portal store.
//!
//! Bills, quotes, ASNs and posts are stored as JSONB documents; the columns
//! beside them hold what queries filter on and what uniqueness constraints
//! need. Ledger appends lock the SKU row so the non-negative stock check and
//! the insert happen in one transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgExecutor, Row};
use uuid::Uuid;

use stowline_auth::{Account, AccountStatus, Role};
use stowline_billing::{Bill, Quote};
use stowline_content::BlogPost;
use stowline_core::{AsnId, BillId, ClientId, QuoteId, ScanId, SkuId, UserId};
use stowline_inventory::{Classification, LedgerEntry, Sku, post_entry};
use stowline_receiving::{Asn, AsnStatus};

use super::{
    AccountStore, AsnStore, BillStore, BlogStore, ClientRecord, ClientStore, LedgerStore, OAuthState,
    OAuthStateStore, QuoteStore, ScanLog, ScanRecord, SkuStore, StoreError, StoreResult, TranslationEntry,
    TranslationStore, stale,
};

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(include_str!("../../migrations/0001_init.sql"))
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

impl PostgresStore {
    /// Tell a lost compare-and-swap apart from a missing row.
    async fn stale_or_missing(&self, exists_sql: &'static str, id: Uuid, what: &str) -> StoreError {
        match sqlx::query_scalar::<_, bool>(exists_sql).bind(id).fetch_one(&self.pool).await {
            Ok(true) => stale(what),
            Ok(false) => StoreError::NotFound,
            Err(e) => map_sqlx_error("stale_or_missing", e),
        }
    }
}

fn version_param(version: u64) -> StoreResult<i64> {
    i64::try_from(version).map_err(|_| StoreError::Backend(format!("version {version} out of range")))
}

async fn insert_account_row<'e, E: PgExecutor<'e>>(exec: E, a: &Account) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO accounts
            (id, email, display_name, role, client_id, password_hash, status, created_at, password_changed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(*a.id.as_uuid())
    .bind(&a.email)
    .bind(&a.display_name)
    .bind(a.role.as_str())
    .bind(uuid_of(a.client_id))
    .bind(&a.password_hash)
    .bind(tag(&a.status)?)
    .bind(a.created_at)
    .bind(a.password_changed_at)
    .execute(exec)
    .await
    .map_err(|e| map_sqlx_error("insert_account", e))?;
    Ok(())
}

async fn insert_client_row<'e, E: PgExecutor<'e>>(exec: E, c: &ClientRecord) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO clients (id, company_name, contact_name, contact_email, created_at) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(*c.id.as_uuid())
    .bind(&c.company_name)
    .bind(&c.contact_name)
    .bind(&c.contact_email)
    .bind(c.created_at)
    .execute(exec)
    .await
    .map_err(|e| map_sqlx_error("insert_client", e))?;
    Ok(())
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

fn decode_err(operation: &str) -> impl Fn(sqlx::Error) -> StoreError + '_ {
    move |e| StoreError::Backend(format!("failed to decode row in {operation}: {e}"))
}

fn doc<T: DeserializeOwned>(row: &PgRow, operation: &str) -> StoreResult<T> {
    let Json(value): Json<T> = row.try_get("doc").map_err(decode_err(operation))?;
    Ok(value)
}

/// Serde name of a unit enum value (`receipt`, `product_upc`, ...).
fn tag<T: Serialize>(value: &T) -> StoreResult<String> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => Ok(s),
        Ok(other) => Err(StoreError::Backend(format!("expected string tag, got {other}"))),
        Err(e) => Err(StoreError::Backend(e.to_string())),
    }
}

fn from_tag<T: DeserializeOwned>(raw: String) -> StoreResult<T> {
    serde_json::from_value(serde_json::Value::String(raw)).map_err(|e| StoreError::Backend(e.to_string()))
}

fn uuid_of(client_id: Option<ClientId>) -> Option<Uuid> {
    client_id.map(|c| *c.as_uuid())
}

fn account_from_row(row: &PgRow) -> StoreResult<Account> {
    let d = decode_err("account");
    let role: String = row.try_get("role").map_err(&d)?;
    let status: String = row.try_get("status").map_err(&d)?;
    let client_id: Option<Uuid> = row.try_get("client_id").map_err(&d)?;
    Ok(Account {
        id: UserId::from_uuid(row.try_get("id").map_err(&d)?),
        email: row.try_get("email").map_err(&d)?,
        display_name: row.try_get("display_name").map_err(&d)?,
        role: Role::new(role),
        client_id: client_id.map(ClientId::from_uuid),
        password_hash: row.try_get("password_hash").map_err(&d)?,
        status: from_tag::<AccountStatus>(status)?,
        created_at: row.try_get("created_at").map_err(&d)?,
        password_changed_at: row.try_get("password_changed_at").map_err(&d)?,
    })
}

fn client_from_row(row: &PgRow) -> StoreResult<ClientRecord> {
    let d = decode_err("client");
    Ok(ClientRecord {
        id: ClientId::from_uuid(row.try_get("id").map_err(&d)?),
        company_name: row.try_get("company_name").map_err(&d)?,
        contact_name: row.try_get("contact_name").map_err(&d)?,
        contact_email: row.try_get("contact_email").map_err(&d)?,
        created_at: row.try_get("created_at").map_err(&d)?,
    })
}

fn sku_from_row(row: &PgRow) -> StoreResult<Sku> {
    let d = decode_err("sku");
    Ok(Sku {
        id: SkuId::from_uuid(row.try_get("id").map_err(&d)?),
        client_id: ClientId::from_uuid(row.try_get("client_id").map_err(&d)?),
        sku: row.try_get("sku").map_err(&d)?,
        name: row.try_get("name").map_err(&d)?,
        upc: row.try_get("upc").map_err(&d)?,
        ean: row.try_get("ean").map_err(&d)?,
        fnsku: row.try_get("fnsku").map_err(&d)?,
        created_at: row.try_get("created_at").map_err(&d)?,
    })
}

fn ledger_from_row(row: &PgRow) -> StoreResult<LedgerEntry> {
    let d = decode_err("ledger");
    let reason: String = row.try_get("reason").map_err(&d)?;
    Ok(LedgerEntry {
        client_id: ClientId::from_uuid(row.try_get("client_id").map_err(&d)?),
        sku_id: SkuId::from_uuid(row.try_get("sku_id").map_err(&d)?),
        delta: row.try_get("delta").map_err(&d)?,
        reason: from_tag(reason)?,
        reference: row.try_get("reference").map_err(&d)?,
        occurred_at: row.try_get("occurred_at").map_err(&d)?,
    })
}

const SKU_COLUMNS: &str = "id, client_id, sku, name, upc, ean, fnsku, created_at";

#[async_trait]
impl AccountStore for PostgresStore {
    async fn insert_account(&self, a: Account) -> StoreResult<()> {
        insert_account_row(&self.pool, &a).await
    }

    async fn account(&self, id: UserId) -> StoreResult<Option<Account>> {
        let row = sqlx::query("SELECT * FROM accounts WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("account", e))?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let row = sqlx::query("SELECT * FROM accounts WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("account_by_email", e))?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn update_account(&self, a: &Account) -> StoreResult<()> {
        let done = sqlx::query(
            r#"
            UPDATE accounts
            SET display_name = $2, role = $3, password_hash = $4, status = $5, password_changed_at = $6
            WHERE id = $1
            "#,
        )
        .bind(*a.id.as_uuid())
        .bind(&a.display_name)
        .bind(a.role.as_str())
        .bind(&a.password_hash)
        .bind(tag(&a.status)?)
        .bind(a.password_changed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_account", e))?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl ClientStore for PostgresStore {
    async fn insert_client(&self, c: ClientRecord) -> StoreResult<()> {
        insert_client_row(&self.pool, &c).await
    }

    async fn onboard_client(&self, client: ClientRecord, account: Account) -> StoreResult<()> {
        let op = "onboard_client";
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error(op, e))?;
        insert_client_row(&mut *tx, &client).await?;
        insert_account_row(&mut *tx, &account).await?;
        tx.commit().await.map_err(|e| map_sqlx_error(op, e))?;
        Ok(())
    }

    async fn client(&self, id: ClientId) -> StoreResult<Option<ClientRecord>> {
        let row = sqlx::query("SELECT * FROM clients WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("client", e))?;
        row.as_ref().map(client_from_row).transpose()
    }

    async fn list_clients(&self) -> StoreResult<Vec<ClientRecord>> {
        let rows = sqlx::query("SELECT * FROM clients ORDER BY company_name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_clients", e))?;
        rows.iter().map(client_from_row).collect()
    }
}

#[async_trait]
impl SkuStore for PostgresStore {
    async fn insert_sku(&self, s: Sku) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO skus (id, client_id, sku, name, upc, ean, fnsku, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(*s.id.as_uuid())
        .bind(*s.client_id.as_uuid())
        .bind(&s.sku)
        .bind(&s.name)
        .bind(&s.upc)
        .bind(&s.ean)
        .bind(&s.fnsku)
        .bind(s.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_sku", e))?;
        Ok(())
    }

    async fn sku(&self, id: SkuId) -> StoreResult<Option<Sku>> {
        let row = sqlx::query(&format!("SELECT {SKU_COLUMNS} FROM skus WHERE id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("sku", e))?;
        row.as_ref().map(sku_from_row).transpose()
    }

    async fn list_skus(&self, client_id: Option<ClientId>) -> StoreResult<Vec<Sku>> {
        let rows = sqlx::query(&format!(
            "SELECT {SKU_COLUMNS} FROM skus WHERE ($1::uuid IS NULL OR client_id = $1) ORDER BY sku"
        ))
        .bind(uuid_of(client_id))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_skus", e))?;
        rows.iter().map(sku_from_row).collect()
    }

    async fn find_skus(&self, client_id: Option<ClientId>, scan: &Classification) -> StoreResult<Vec<Sku>> {
        let upc_in_ean = scan.code.strip_prefix('0').unwrap_or(&scan.code).to_string();
        let rows = sqlx::query(&format!(
            r#"
            SELECT {SKU_COLUMNS} FROM skus
            WHERE ($1::uuid IS NULL OR client_id = $1)
              AND (sku = $2 OR upc = $2 OR ean = $2 OR fnsku = $2 OR upc = $3)
            "#
        ))
        .bind(uuid_of(client_id))
        .bind(&scan.code)
        .bind(upc_in_ean)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_skus", e))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let sku = sku_from_row(row)?;
            if sku.matches(scan) {
                out.push(sku);
            }
        }
        Ok(out)
    }

    async fn sku_by_code(&self, client_id: ClientId, code: &str) -> StoreResult<Option<Sku>> {
        let row = sqlx::query(&format!("SELECT {SKU_COLUMNS} FROM skus WHERE client_id = $1 AND sku = $2"))
            .bind(*client_id.as_uuid())
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("sku_by_code", e))?;
        row.as_ref().map(sku_from_row).transpose()
    }
}

#[async_trait]
impl LedgerStore for PostgresStore {
    async fn append_ledger(&self, entry: LedgerEntry) -> StoreResult<i64> {
        let mut balances = self.append_ledger_batch(vec![entry]).await?;
        balances
            .pop()
            .ok_or_else(|| StoreError::Backend("append_ledger: empty batch result".to_string()))
    }

    async fn append_ledger_batch(&self, entries: Vec<LedgerEntry>) -> StoreResult<Vec<i64>> {
        let op = "append_ledger_batch";
        let mut sku_ids: Vec<Uuid> = entries.iter().map(|e| *e.sku_id.as_uuid()).collect();
        sku_ids.sort();
        sku_ids.dedup();

        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error(op, e))?;

        // Lock in id order so concurrent batches cannot deadlock.
        let locked: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM skus WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(&sku_ids[..])
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(op, e))?;
        if locked.len() != sku_ids.len() {
            return Err(StoreError::NotFound);
        }

        let rows = sqlx::query(
            "SELECT sku_id, COALESCE(SUM(delta), 0)::BIGINT AS on_hand FROM inventory_ledger WHERE sku_id = ANY($1) GROUP BY sku_id",
        )
        .bind(&sku_ids[..])
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error(op, e))?;
        let d = decode_err(op);
        let mut balances: HashMap<Uuid, i64> = HashMap::with_capacity(rows.len());
        for row in &rows {
            balances.insert(row.try_get("sku_id").map_err(&d)?, row.try_get("on_hand").map_err(&d)?);
        }

        let mut out = Vec::with_capacity(entries.len());
        for entry in &entries {
            let id = *entry.sku_id.as_uuid();
            let next = post_entry(balances.get(&id).copied().unwrap_or(0), entry)?;
            balances.insert(id, next);
            out.push(next);

            sqlx::query(
                r#"
                INSERT INTO inventory_ledger (client_id, sku_id, delta, reason, reference, occurred_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(*entry.client_id.as_uuid())
            .bind(id)
            .bind(entry.delta)
            .bind(tag(&entry.reason)?)
            .bind(&entry.reference)
            .bind(entry.occurred_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(op, e))?;
        }

        tx.commit().await.map_err(|e| map_sqlx_error(op, e))?;
        Ok(out)
    }

    async fn ledger(&self, sku_id: SkuId) -> StoreResult<Vec<LedgerEntry>> {
        let rows = sqlx::query("SELECT * FROM inventory_ledger WHERE sku_id = $1 ORDER BY seq")
            .bind(*sku_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ledger", e))?;
        rows.iter().map(ledger_from_row).collect()
    }

    async fn on_hand(&self, client_id: Option<ClientId>) -> StoreResult<HashMap<SkuId, i64>> {
        let rows = sqlx::query(
            r#"
            SELECT sku_id, SUM(delta)::BIGINT AS on_hand FROM inventory_ledger
            WHERE ($1::uuid IS NULL OR client_id = $1)
            GROUP BY sku_id
            "#,
        )
        .bind(uuid_of(client_id))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("on_hand", e))?;

        let d = decode_err("on_hand");
        let mut out = HashMap::with_capacity(rows.len());
        for row in &rows {
            let id: Uuid = row.try_get("sku_id").map_err(&d)?;
            out.insert(SkuId::from_uuid(id), row.try_get("on_hand").map_err(&d)?);
        }
        Ok(out)
    }
}

#[async_trait]
impl BillStore for PostgresStore {
    async fn insert_bill(&self, bill: Bill) -> StoreResult<()> {
        sqlx::query("INSERT INTO bills (id, client_id, period, status, doc, updated_at) VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(*bill.id.as_uuid())
            .bind(*bill.client_id.as_uuid())
            .bind(bill.period.to_string())
            .bind(bill.status.as_str())
            .bind(Json(&bill))
            .bind(bill.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_bill", e))?;
        Ok(())
    }

    async fn bill(&self, id: BillId) -> StoreResult<Option<Bill>> {
        let row = sqlx::query("SELECT doc FROM bills WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("bill", e))?;
        row.as_ref().map(|r| doc(r, "bill")).transpose()
    }

    async fn list_bills(&self, client_id: Option<ClientId>) -> StoreResult<Vec<Bill>> {
        let rows = sqlx::query("SELECT doc FROM bills WHERE ($1::uuid IS NULL OR client_id = $1) ORDER BY period DESC")
            .bind(uuid_of(client_id))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_bills", e))?;
        rows.iter().map(|r| doc(r, "list_bills")).collect()
    }

    async fn save_bill(&self, bill: &mut Bill) -> StoreResult<()> {
        let expected = bill.version;
        let mut next = bill.clone();
        next.version = expected + 1;
        let done = sqlx::query(
            "UPDATE bills SET status = $2, doc = $3, updated_at = $4, version = $5 WHERE id = $1 AND version = $6",
        )
        .bind(*bill.id.as_uuid())
        .bind(bill.status.as_str())
        .bind(Json(&next))
        .bind(bill.updated_at)
        .bind(version_param(next.version)?)
        .bind(version_param(expected)?)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_bill", e))?;
        if done.rows_affected() == 0 {
            return Err(self.stale_or_missing("SELECT EXISTS (SELECT 1 FROM bills WHERE id = $1)", *bill.id.as_uuid(), "bill").await);
        }
        *bill = next;
        Ok(())
    }
}

#[async_trait]
impl QuoteStore for PostgresStore {
    async fn insert_quote(&self, quote: Quote) -> StoreResult<()> {
        sqlx::query("INSERT INTO quotes (id, client_id, doc, created_at) VALUES ($1, $2, $3, $4)")
            .bind(*quote.id.as_uuid())
            .bind(uuid_of(quote.client_id))
            .bind(Json(&quote))
            .bind(quote.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_quote", e))?;
        Ok(())
    }

    async fn quote(&self, id: QuoteId) -> StoreResult<Option<Quote>> {
        let row = sqlx::query("SELECT doc FROM quotes WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("quote", e))?;
        row.as_ref().map(|r| doc(r, "quote")).transpose()
    }

    async fn list_quotes(&self, client_id: Option<ClientId>) -> StoreResult<Vec<Quote>> {
        let rows = sqlx::query(
            r#"
            SELECT doc FROM quotes
            WHERE ($1::uuid IS NULL OR client_id IS NULL OR client_id = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(uuid_of(client_id))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_quotes", e))?;
        rows.iter().map(|r| doc(r, "list_quotes")).collect()
    }
}

#[async_trait]
impl AsnStore for PostgresStore {
    async fn insert_asn(&self, asn: Asn) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO asns (id, client_id, status, tracking_numbers, doc, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(*asn.id.as_uuid())
        .bind(*asn.client_id.as_uuid())
        .bind(asn.status.as_str())
        .bind(&asn.tracking_numbers)
        .bind(Json(&asn))
        .bind(asn.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_asn", e))?;
        Ok(())
    }

    async fn asn(&self, id: AsnId) -> StoreResult<Option<Asn>> {
        let row = sqlx::query("SELECT doc FROM asns WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("asn", e))?;
        row.as_ref().map(|r| doc(r, "asn")).transpose()
    }

    async fn list_asns(&self, client_id: Option<ClientId>, status: Option<AsnStatus>) -> StoreResult<Vec<Asn>> {
        let rows = sqlx::query(
            r#"
            SELECT doc FROM asns
            WHERE ($1::uuid IS NULL OR client_id = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(uuid_of(client_id))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_asns", e))?;
        rows.iter().map(|r| doc(r, "list_asns")).collect()
    }

    async fn save_asn(&self, asn: &mut Asn) -> StoreResult<()> {
        let expected = asn.version;
        let mut next = asn.clone();
        next.version = expected + 1;
        let done = sqlx::query("UPDATE asns SET status = $2, doc = $3, version = $4 WHERE id = $1 AND version = $5")
            .bind(*asn.id.as_uuid())
            .bind(asn.status.as_str())
            .bind(Json(&next))
            .bind(version_param(next.version)?)
            .bind(version_param(expected)?)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("save_asn", e))?;
        if done.rows_affected() == 0 {
            return Err(self.stale_or_missing("SELECT EXISTS (SELECT 1 FROM asns WHERE id = $1)", *asn.id.as_uuid(), "ASN").await);
        }
        *asn = next;
        Ok(())
    }

    async fn asns_by_tracking(&self, client_id: Option<ClientId>, code: &str) -> StoreResult<Vec<Asn>> {
        let rows = sqlx::query(
            "SELECT doc FROM asns WHERE ($1::uuid IS NULL OR client_id = $1) AND $2 = ANY(tracking_numbers)",
        )
        .bind(uuid_of(client_id))
        .bind(code)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("asns_by_tracking", e))?;
        rows.iter().map(|r| doc(r, "asns_by_tracking")).collect()
    }
}

#[async_trait]
impl ScanLog for PostgresStore {
    async fn record_scan(&self, scan: ScanRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO scan_log (id, code, kind, matched, client_id, scanned_by, scanned_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(*scan.id.as_uuid())
        .bind(&scan.code)
        .bind(scan.kind.as_str())
        .bind(scan.matched)
        .bind(uuid_of(scan.client_id))
        .bind(*scan.scanned_by.as_uuid())
        .bind(scan.scanned_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("record_scan", e))?;
        Ok(())
    }

    async fn recent_scans(&self, limit: usize) -> StoreResult<Vec<ScanRecord>> {
        let rows = sqlx::query("SELECT * FROM scan_log ORDER BY scanned_at DESC LIMIT $1")
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("recent_scans", e))?;

        let d = decode_err("recent_scans");
        rows.iter()
            .map(|row| -> StoreResult<ScanRecord> {
                let kind: String = row.try_get("kind").map_err(&d)?;
                let client_id: Option<Uuid> = row.try_get("client_id").map_err(&d)?;
                Ok(ScanRecord {
                    id: ScanId::from_uuid(row.try_get("id").map_err(&d)?),
                    code: row.try_get("code").map_err(&d)?,
                    kind: from_tag(kind)?,
                    matched: row.try_get("matched").map_err(&d)?,
                    client_id: client_id.map(ClientId::from_uuid),
                    scanned_by: UserId::from_uuid(row.try_get("scanned_by").map_err(&d)?),
                    scanned_at: row.try_get("scanned_at").map_err(&d)?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl BlogStore for PostgresStore {
    async fn post_by_slug(&self, slug: &str) -> StoreResult<Option<BlogPost>> {
        let row = sqlx::query("SELECT doc FROM blog_posts WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("post_by_slug", e))?;
        row.as_ref().map(|r| doc(r, "post_by_slug")).transpose()
    }

    async fn save_post(&self, post: BlogPost) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO blog_posts (slug, doc, published_at) VALUES ($1, $2, $3)
            ON CONFLICT (slug) DO UPDATE SET doc = EXCLUDED.doc, published_at = EXCLUDED.published_at
            "#,
        )
        .bind(&post.slug)
        .bind(Json(&post))
        .bind(post.published_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_post", e))?;
        Ok(())
    }

    async fn list_posts(&self) -> StoreResult<Vec<BlogPost>> {
        let rows = sqlx::query("SELECT doc FROM blog_posts ORDER BY published_at DESC NULLS LAST")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_posts", e))?;
        rows.iter().map(|r| doc(r, "list_posts")).collect()
    }
}

#[async_trait]
impl TranslationStore for PostgresStore {
    async fn translation(&self, key: &str) -> StoreResult<Option<TranslationEntry>> {
        let row = sqlx::query("SELECT * FROM translations WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("translation", e))?;
        let d = decode_err("translation");
        row.map(|row| -> StoreResult<TranslationEntry> {
            Ok(TranslationEntry {
                key: row.try_get("key").map_err(&d)?,
                source_text: row.try_get("source_text").map_err(&d)?,
                target_lang: row.try_get("target_lang").map_err(&d)?,
                translated_text: row.try_get("translated_text").map_err(&d)?,
                created_at: row.try_get("created_at").map_err(&d)?,
            })
        })
        .transpose()
    }

    async fn put_translation(&self, t: TranslationEntry) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO translations (key, source_text, target_lang, translated_text, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (key) DO NOTHING
            "#,
        )
        .bind(&t.key)
        .bind(&t.source_text)
        .bind(&t.target_lang)
        .bind(&t.translated_text)
        .bind(t.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("put_translation", e))?;
        Ok(())
    }
}

#[async_trait]
impl OAuthStateStore for PostgresStore {
    async fn put_oauth_state(&self, s: OAuthState) -> StoreResult<()> {
        sqlx::query("INSERT INTO oauth_states (state, client_id, shop, expires_at) VALUES ($1, $2, $3, $4)")
            .bind(&s.state)
            .bind(*s.client_id.as_uuid())
            .bind(&s.shop)
            .bind(s.expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("put_oauth_state", e))?;
        Ok(())
    }

    async fn take_oauth_state(&self, state: &str) -> StoreResult<Option<OAuthState>> {
        let row = sqlx::query("DELETE FROM oauth_states WHERE state = $1 RETURNING *")
            .bind(state)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("take_oauth_state", e))?;
        let d = decode_err("take_oauth_state");
        row.map(|row| -> StoreResult<OAuthState> {
            Ok(OAuthState {
                state: row.try_get("state").map_err(&d)?,
                client_id: ClientId::from_uuid(row.try_get("client_id").map_err(&d)?),
                shop: row.try_get("shop").map_err(&d)?,
                expires_at: row.try_get("expires_at").map_err(&d)?,
            })
        })
        .transpose()
    }
}
