//! Service wiring and multi-step workflows.
//!
//! `AppServices` owns the store and every outbound collaborator. Handlers
//! stay thin: single-record reads and writes go straight to `store()`, and
//! anything touching more than one record lives here.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use stowline_auth::{
    Account, Argon2Hasher, Hs256Jwt, JwtClaims, JwtValidator, PasswordHasher, PasswordPolicy, Role,
    generate_temporary_password, normalize_email,
};
use stowline_billing::{Bill, PopulateOutcome, RepriceOutcome, RepriceScope, populate_from_quote, reprice};
use stowline_core::{AsnId, BillId, ClientId, Money, QuoteId, ScanId, SessionId, SkuId, UserId};
use stowline_infra::gateway::{ChatGateway, ChatMessage, ChatStream, ChatTranslator, LogMailer, Mailer, OutboundEmail};
use stowline_infra::shopify::{OAuthStart, ShopifyOAuth};
use stowline_infra::store::{ClientRecord, ScanRecord};
use stowline_infra::{InMemoryStore, PortalStore, SessionRegistry, Translated, TranslationCache};
use stowline_inventory::{BarcodeKind, Carrier, LedgerEntry, LedgerReason, Sku, classify};
use stowline_receiving::{Asn, AsnStatus, ReceivedCount, Resolution};
use stowline_content::{ContactSubmission, PostDraft};

use crate::app::errors::{ApiError, ApiResult};
use crate::config::{AppConfig, Environment};
use crate::context::PrincipalContext;

const TEMP_PASSWORD_LEN: usize = 16;
const MAX_CHAT_MESSAGES: usize = 40;
const MAX_CHAT_CHARS: usize = 4000;

const CHAT_SYSTEM_PROMPT: &str = "You are the assistant for a third-party logistics fulfillment company. \
Answer questions about receiving, storage, pick and pack, shipping, returns and pricing. \
Keep answers short and suggest the contact form for quotes or account-specific questions.";

pub struct AppServices {
    store: Arc<dyn PortalStore>,
    hasher: Arc<dyn PasswordHasher>,
    policy: PasswordPolicy,
    jwt: Arc<Hs256Jwt>,
    jwt_ttl: Duration,
    sessions: Arc<SessionRegistry>,
    chat: Option<Arc<dyn ChatGateway>>,
    translations: Option<TranslationCache<dyn PortalStore>>,
    mailer: Arc<dyn Mailer>,
    contact_to: String,
    shopify: Option<ShopifyOAuth>,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub session_id: SessionId,
    pub account: Account,
}

#[derive(Debug, Clone)]
pub struct NewClient {
    pub company_name: String,
    pub contact_name: String,
    pub contact_email: String,
}

#[derive(Debug, Clone)]
pub struct CreatedClient {
    pub client: ClientRecord,
    pub account: Account,
    /// Shown once to the admin; only the hash is stored.
    pub temporary_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum ScanMatch {
    Sku(Sku),
    Asn(Asn),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanOutcome {
    pub code: String,
    #[serde(rename = "type")]
    pub kind: BarcodeKind,
    pub carrier: Option<Carrier>,
    pub check_digit_valid: Option<bool>,
    pub matches: Vec<ScanMatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostedReceipt {
    pub sku: String,
    pub sku_id: SkuId,
    pub quantity: i64,
    pub on_hand: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiptOutcome {
    pub asn: Asn,
    pub posted: Vec<PostedReceipt>,
    /// ASN lines whose SKU is not in the client's catalog.
    pub unmatched_skus: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportError {
    pub index: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: Vec<String>,
    pub updated: Vec<String>,
    pub errors: Vec<ImportError>,
}

/// Where repricing rates come from.
#[derive(Debug, Clone)]
pub enum RateSource {
    Explicit(BTreeMap<String, Money>),
    Quote(QuoteId),
}

impl AppServices {
    /// In-memory defaults: development hasher, logging mailer, no AI gateway
    /// and no Shopify app.
    pub fn new(store: Arc<dyn PortalStore>, jwt_secret: &str, jwt_ttl: Duration, sessions: SessionRegistry) -> Self {
        Self {
            store,
            hasher: Arc::new(Argon2Hasher::development()),
            policy: PasswordPolicy::default(),
            jwt: Arc::new(Hs256Jwt::new(jwt_secret)),
            jwt_ttl,
            sessions: Arc::new(sessions),
            chat: None,
            translations: None,
            mailer: Arc::new(LogMailer),
            contact_to: "ops@localhost".to_string(),
            shopify: None,
        }
    }

    pub fn with_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Chat also backs translation.
    pub fn with_chat(mut self, chat: Arc<dyn ChatGateway>) -> Self {
        let translator = Arc::new(ChatTranslator::new(chat.clone()));
        self.translations = Some(TranslationCache::new(self.store.clone(), translator));
        self.chat = Some(chat);
        self
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>, contact_to: impl Into<String>) -> Self {
        self.mailer = mailer;
        self.contact_to = contact_to.into();
        self
    }

    pub fn with_shopify(mut self, shopify: ShopifyOAuth) -> Self {
        self.shopify = Some(shopify);
        self
    }

    pub fn store(&self) -> &dyn PortalStore {
        self.store.as_ref()
    }

    pub fn jwt_validator(&self) -> Arc<dyn JwtValidator> {
        self.jwt.clone()
    }

    pub fn sessions(&self) -> Arc<SessionRegistry> {
        self.sessions.clone()
    }

    // -------------------------
    // Accounts
    // -------------------------

    /// Check credentials, issue a token and open an idle-tracked session.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<LoginOutcome> {
        let invalid = || ApiError::unauthorized("invalid email or password");

        let email = normalize_email(email).map_err(|_| invalid())?;
        let account = self.store.account_by_email(&email).await?.ok_or_else(invalid)?;
        if !account.is_active() || !self.hasher.verify_password(password, &account.password_hash)? {
            tracing::info!(user_id = %account.id, "login rejected");
            return Err(invalid());
        }

        let now = Utc::now();
        let sid = SessionId::new();
        let claims = JwtClaims::new(account.id, account.role.clone(), account.client_id, sid, now, self.jwt_ttl);
        let token = self.jwt.issue(&claims)?;
        self.sessions.open(sid, account.id);
        tracing::info!(user_id = %account.id, role = %account.role.as_str(), "login");

        Ok(LoginOutcome { token, expires_at: now + self.jwt_ttl, session_id: sid, account })
    }

    pub fn logout(&self, sid: SessionId) -> bool {
        self.sessions.end(sid)
    }

    pub async fn change_password(&self, user_id: UserId, current: &str, new: &str) -> ApiResult<()> {
        let mut account = self.store.account(user_id).await?.ok_or_else(|| ApiError::not_found("account"))?;
        account.change_password(self.hasher.as_ref(), &self.policy, current, new, Utc::now())?;
        self.store.update_account(&account).await?;
        tracing::info!(user_id = %user_id, "password changed");
        Ok(())
    }

    /// Create the first admin account; returns `false` if it already exists.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> ApiResult<bool> {
        let email = normalize_email(email)?;
        if self.store.account_by_email(&email).await?.is_some() {
            return Ok(false);
        }
        self.policy.check(password, None)?;
        let hash = self.hasher.hash_password(password)?;
        let account = Account::new(&email, "Administrator", Role::ADMIN, None, hash, Utc::now())?;
        self.store.insert_account(account).await?;
        tracing::info!(email = %email, "bootstrap admin created");
        Ok(true)
    }

    /// New client company plus its first login, with a temporary password.
    pub async fn create_client(&self, input: NewClient) -> ApiResult<CreatedClient> {
        let company_name = input.company_name.trim().to_string();
        if company_name.is_empty() {
            return Err(ApiError::validation("company_name cannot be empty"));
        }
        let contact_name = input.contact_name.trim().to_string();
        if contact_name.is_empty() {
            return Err(ApiError::validation("contact_name cannot be empty"));
        }
        let contact_email = normalize_email(&input.contact_email)?;
        if self.store.account_by_email(&contact_email).await?.is_some() {
            return Err(ApiError::Conflict(format!("an account for {contact_email} already exists")));
        }

        let now = Utc::now();
        let client = ClientRecord {
            id: ClientId::new(),
            company_name,
            contact_name: contact_name.clone(),
            contact_email: contact_email.clone(),
            created_at: now,
        };
        let temporary_password = generate_temporary_password(TEMP_PASSWORD_LEN);
        let hash = self.hasher.hash_password(&temporary_password)?;
        let account = Account::new(&contact_email, contact_name, Role::CLIENT, Some(client.id), hash, now)?;

        self.store.onboard_client(client.clone(), account.clone()).await?;
        tracing::info!(client_id = %client.id, "client created");

        Ok(CreatedClient { client, account, temporary_password })
    }

    pub async fn ensure_client(&self, id: ClientId) -> ApiResult<()> {
        match self.store.client(id).await? {
            Some(_) => Ok(()),
            None => Err(ApiError::not_found("client")),
        }
    }

    // -------------------------
    // Scanning
    // -------------------------

    pub async fn scan(&self, ctx: &PrincipalContext, raw: &str) -> ApiResult<ScanOutcome> {
        if raw.trim().is_empty() {
            return Err(ApiError::validation("code cannot be empty"));
        }
        let scope = ctx.read_scope(None)?;
        let classification = classify(raw);

        let matches: Vec<ScanMatch> = match classification.kind {
            BarcodeKind::Tracking => self
                .store
                .asns_by_tracking(scope.client_id(), &classification.code)
                .await?
                .into_iter()
                .map(ScanMatch::Asn)
                .collect(),
            kind if kind.is_product() => self
                .store
                .find_skus(scope.client_id(), &classification)
                .await?
                .into_iter()
                .map(ScanMatch::Sku)
                .collect(),
            _ => Vec::new(),
        };

        let record = ScanRecord {
            id: ScanId::new(),
            code: classification.code.clone(),
            kind: classification.kind,
            matched: !matches.is_empty(),
            client_id: ctx.principal().client_id,
            scanned_by: ctx.principal().user_id,
            scanned_at: Utc::now(),
        };
        self.store.record_scan(record).await?;
        tracing::debug!(kind = %classification.kind, matches = matches.len(), "scan");

        Ok(ScanOutcome {
            code: classification.code,
            kind: classification.kind,
            carrier: classification.carrier,
            check_digit_valid: classification.check_digit_valid,
            matches,
        })
    }

    // -------------------------
    // Inventory
    // -------------------------

    pub async fn visible_sku(&self, ctx: &PrincipalContext, id: SkuId) -> ApiResult<Sku> {
        let sku = self.store.sku(id).await?.ok_or_else(|| ApiError::not_found("SKU"))?;
        ctx.ensure_visible(sku.client_id, "SKU")?;
        Ok(sku)
    }

    /// Manual stock movement; returns the new on-hand.
    pub async fn adjust_stock(
        &self,
        ctx: &PrincipalContext,
        id: SkuId,
        delta: i64,
        reason: LedgerReason,
        reference: Option<String>,
    ) -> ApiResult<i64> {
        if reason == LedgerReason::Receipt {
            return Err(ApiError::validation("receipts are posted by receiving an ASN"));
        }
        let sku = self.visible_sku(ctx, id).await?;
        let entry = LedgerEntry {
            client_id: sku.client_id,
            sku_id: sku.id,
            delta,
            reason,
            reference: reference.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
            occurred_at: Utc::now(),
        };
        let on_hand = self.store.append_ledger(entry).await?;
        tracing::info!(sku_id = %sku.id, delta, on_hand, "stock adjusted");
        Ok(on_hand)
    }

    // -------------------------
    // Receiving
    // -------------------------

    pub async fn visible_asn(&self, ctx: &PrincipalContext, id: AsnId) -> ApiResult<Asn> {
        let asn = self.store.asn(id).await?.ok_or_else(|| ApiError::not_found("ASN"))?;
        ctx.ensure_visible(asn.client_id, "ASN")?;
        Ok(asn)
    }

    /// Record dock counts. A clean receipt books inventory right away; a
    /// discrepancy waits for review.
    pub async fn receive_asn(
        &self,
        ctx: &PrincipalContext,
        id: AsnId,
        counts: Vec<ReceivedCount>,
    ) -> ApiResult<ReceiptOutcome> {
        let before = self.visible_asn(ctx, id).await?;
        let mut asn = before.clone();
        let now = Utc::now();
        asn.receive(counts, now)?;
        self.store.save_asn(&mut asn).await?;
        tracing::info!(asn_id = %asn.id, status = asn.status.as_str(), "ASN received");

        if asn.status == AsnStatus::Received {
            self.post_receipts(before, asn, now).await
        } else {
            Ok(ReceiptOutcome { asn, posted: Vec::new(), unmatched_skus: Vec::new() })
        }
    }

    /// Resolve a discrepancy, close the ASN and book the final quantities.
    pub async fn review_asn(
        &self,
        ctx: &PrincipalContext,
        id: AsnId,
        resolution: Resolution,
        note: Option<String>,
    ) -> ApiResult<ReceiptOutcome> {
        let before = self.visible_asn(ctx, id).await?;
        let mut asn = before.clone();
        let now = Utc::now();
        asn.review(resolution, note, now)?;
        self.store.save_asn(&mut asn).await?;
        tracing::info!(asn_id = %asn.id, "ASN reviewed");
        self.post_receipts(before, asn, now).await
    }

    /// Acknowledge a clean receipt. Inventory was already booked on receive.
    pub async fn close_asn(&self, ctx: &PrincipalContext, id: AsnId) -> ApiResult<Asn> {
        let mut asn = self.visible_asn(ctx, id).await?;
        asn.close(Utc::now())?;
        self.store.save_asn(&mut asn).await?;
        Ok(asn)
    }

    /// Book `asn`'s final quantities in one ledger batch. The saved status
    /// change is what claims the posting; if the batch fails the ASN is put
    /// back to `before` so the receipt can be retried.
    async fn post_receipts(&self, before: Asn, asn: Asn, now: DateTime<Utc>) -> ApiResult<ReceiptOutcome> {
        let mut matched = Vec::new();
        let mut entries = Vec::new();
        let mut unmatched_skus = Vec::new();
        for (code, quantity) in asn.final_quantities() {
            let sku = match self.store.sku_by_code(asn.client_id, &code).await {
                Ok(Some(sku)) => sku,
                Ok(None) => {
                    unmatched_skus.push(code);
                    continue;
                }
                Err(e) => return Err(self.restore_asn(before, &asn, e.into()).await),
            };
            entries.push(LedgerEntry {
                client_id: asn.client_id,
                sku_id: sku.id,
                delta: quantity,
                reason: LedgerReason::Receipt,
                reference: Some(format!("ASN {}", asn.reference)),
                occurred_at: now,
            });
            matched.push((code, sku.id, quantity));
        }

        let balances = if entries.is_empty() {
            Vec::new()
        } else {
            match self.store.append_ledger_batch(entries).await {
                Ok(balances) => balances,
                Err(e) => return Err(self.restore_asn(before, &asn, e.into()).await),
            }
        };
        let posted = matched
            .into_iter()
            .zip(balances)
            .map(|((sku, sku_id, quantity), on_hand)| PostedReceipt { sku, sku_id, quantity, on_hand })
            .collect();

        if !unmatched_skus.is_empty() {
            tracing::warn!(asn_id = %asn.id, skus = ?unmatched_skus, "received SKUs missing from catalog");
        }
        Ok(ReceiptOutcome { asn, posted, unmatched_skus })
    }

    /// Put an ASN back to its pre-transition state after a failed posting
    /// and hand back the original error.
    async fn restore_asn(&self, before: Asn, saved: &Asn, err: ApiError) -> ApiError {
        let mut rollback = Asn { version: saved.version, ..before };
        match self.store.save_asn(&mut rollback).await {
            Ok(()) => tracing::warn!(asn_id = %saved.id, "receipt posting failed; ASN status restored"),
            Err(e) => tracing::error!(asn_id = %saved.id, error = %e, "receipt posting failed and ASN could not be restored"),
        }
        err
    }

    // -------------------------
    // Billing
    // -------------------------

    pub async fn visible_bill(&self, ctx: &PrincipalContext, id: BillId) -> ApiResult<Bill> {
        let bill = self.store.bill(id).await?.ok_or_else(|| ApiError::not_found("bill"))?;
        ctx.ensure_visible(bill.client_id, "bill")?;
        Ok(bill)
    }

    pub async fn populate_bill(
        &self,
        ctx: &PrincipalContext,
        bill_id: BillId,
        quote_id: QuoteId,
    ) -> ApiResult<(Bill, PopulateOutcome)> {
        let mut bill = self.visible_bill(ctx, bill_id).await?;
        let quote = self.store.quote(quote_id).await?.ok_or_else(|| ApiError::not_found("quote"))?;
        if !quote.applies_to(bill.client_id) {
            return Err(ApiError::validation("quote belongs to a different client"));
        }
        let outcome = populate_from_quote(&mut bill, &quote, Utc::now())?;
        self.store.save_bill(&mut bill).await?;
        tracing::info!(bill_id = %bill.id, added = outcome.added.len(), skipped = outcome.skipped.len(), "bill populated");
        Ok((bill, outcome))
    }

    pub async fn reprice_bill(
        &self,
        ctx: &PrincipalContext,
        bill_id: BillId,
        scope: RepriceScope,
        rates: RateSource,
    ) -> ApiResult<(Bill, RepriceOutcome)> {
        let mut bill = self.visible_bill(ctx, bill_id).await?;
        let rates = match rates {
            RateSource::Explicit(rates) => rates,
            RateSource::Quote(id) => {
                let quote = self.store.quote(id).await?.ok_or_else(|| ApiError::not_found("quote"))?;
                if !quote.applies_to(bill.client_id) {
                    return Err(ApiError::validation("quote belongs to a different client"));
                }
                quote.rate_map()
            }
        };
        let outcome = reprice(&mut bill, &scope, &rates, Utc::now())?;
        self.store.save_bill(&mut bill).await?;
        tracing::info!(bill_id = %bill.id, updated = outcome.updated.len(), "bill repriced");
        Ok((bill, outcome))
    }

    // -------------------------
    // Public site
    // -------------------------

    /// Validate and relay a contact-form message. Honeypot hits are
    /// accepted silently.
    pub async fn submit_contact(&self, submission: ContactSubmission) -> ApiResult<()> {
        if submission.is_spam() {
            tracing::info!("contact honeypot triggered; dropping message");
            return Ok(());
        }
        let message = submission.validate()?;
        let email = OutboundEmail {
            to: self.contact_to.clone(),
            reply_to: Some(message.email.clone()),
            subject: message.subject(),
            text: message.text_body(),
        };
        self.mailer.send(email).await?;
        Ok(())
    }

    pub async fn chat(&self, history: Vec<ChatMessage>) -> ApiResult<ChatStream> {
        let chat = self.chat.as_ref().ok_or_else(|| ApiError::Upstream("chat gateway not configured".to_string()))?;
        if history.is_empty() {
            return Err(ApiError::validation("messages cannot be empty"));
        }
        if history.len() > MAX_CHAT_MESSAGES {
            return Err(ApiError::validation(format!("at most {MAX_CHAT_MESSAGES} messages")));
        }
        if history.iter().any(|m| m.content.trim().is_empty()) {
            return Err(ApiError::validation("message content cannot be empty"));
        }
        if history.iter().any(|m| m.content.chars().count() > MAX_CHAT_CHARS) {
            return Err(ApiError::validation(format!("messages are limited to {MAX_CHAT_CHARS} characters")));
        }

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(CHAT_SYSTEM_PROMPT));
        messages.extend(history);
        Ok(chat.stream(messages).await?)
    }

    fn translations(&self) -> ApiResult<&TranslationCache<dyn PortalStore>> {
        self.translations
            .as_ref()
            .ok_or_else(|| ApiError::Upstream("translation gateway not configured".to_string()))
    }

    pub async fn translate(&self, text: &str, target_lang: &str) -> ApiResult<Translated> {
        Ok(self.translations()?.translate(text, target_lang).await?)
    }

    pub async fn translate_batch(&self, texts: &[String], target_lang: &str) -> ApiResult<Vec<Translated>> {
        Ok(self.translations()?.translate_batch(texts, target_lang).await?)
    }

    /// Upsert posts by slug. Invalid posts are reported by index and skipped.
    pub async fn import_posts(&self, drafts: Vec<PostDraft>) -> ApiResult<ImportReport> {
        if drafts.is_empty() {
            return Err(ApiError::validation("posts cannot be empty"));
        }
        let now = Utc::now();
        let mut report = ImportReport::default();
        for (index, mut draft) in drafts.into_iter().enumerate() {
            let slug = match draft.normalize() {
                Ok(slug) => slug,
                Err(e) => {
                    report.errors.push(ImportError { index, message: ApiError::from(e).category().2 });
                    continue;
                }
            };
            match self.store.post_by_slug(&slug).await? {
                Some(mut existing) => {
                    existing.update_from(draft, now);
                    self.store.save_post(existing).await?;
                    report.updated.push(slug);
                }
                None => {
                    self.store.save_post(draft.into_post(slug.clone(), now)).await?;
                    report.imported.push(slug);
                }
            }
        }
        tracing::info!(
            imported = report.imported.len(),
            updated = report.updated.len(),
            rejected = report.errors.len(),
            "blog import"
        );
        Ok(report)
    }

    pub async fn shopify_start(&self, client_id: ClientId, shop: &str) -> ApiResult<OAuthStart> {
        let shopify = self
            .shopify
            .as_ref()
            .ok_or_else(|| ApiError::validation("Shopify integration is not configured"))?;
        Ok(shopify.start(self.store.as_ref(), client_id, shop, Utc::now()).await?)
    }
}

/// Wire services from configuration.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let store = open_store(config).await?;
    let sessions = SessionRegistry::new(config.idle);

    let mut services = AppServices::new(store, &config.jwt_secret, config.jwt_ttl, sessions);
    if config.environment == Environment::Production {
        services = services.with_hasher(Arc::new(Argon2Hasher::production()));
    }

    if let Some(ai) = &config.ai {
        let gateway = stowline_infra::gateway::HttpChatGateway::new(&ai.url, ai.key.clone(), ai.model.clone())?;
        services = services.with_chat(Arc::new(gateway));
    } else {
        tracing::warn!("AI gateway not configured; chat and translation are disabled");
    }

    if let Some(mail) = &config.mail {
        let mailer = stowline_infra::gateway::HttpMailer::new(mail.url.clone(), mail.key.clone(), mail.from.clone())?;
        services = services.with_mailer(Arc::new(mailer), config.contact_to.clone());
    } else {
        services = services.with_mailer(Arc::new(LogMailer), config.contact_to.clone());
    }

    if let Some(shop) = &config.shopify {
        services = services.with_shopify(ShopifyOAuth::new(
            shop.client_id.clone(),
            shop.scopes.clone(),
            shop.redirect_uri.clone(),
        ));
    }

    if let Some((email, password)) = &config.bootstrap_admin {
        services
            .ensure_admin(email, password)
            .await
            .map_err(|e| anyhow::anyhow!("bootstrap admin: {}", e.category().2))?;
    }

    Ok(services)
}

#[cfg(feature = "postgres")]
async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn PortalStore>> {
    match &config.database_url {
        Some(url) => {
            let store = stowline_infra::store::PostgresStore::connect(url).await?;
            store.migrate().await?;
            tracing::info!("using postgres store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}

#[cfg(not(feature = "postgres"))]
async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn PortalStore>> {
    if config.database_url.is_some() {
        tracing::warn!("DATABASE_URL is set but the postgres feature is disabled; using in-memory store");
    }
    Ok(Arc::new(InMemoryStore::new()))
}
