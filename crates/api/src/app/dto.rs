use std::collections::BTreeMap;

use axum::{
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};

use stowline_auth::Account;
use stowline_billing::{Bill, BillStatus, QuoteLine, RepriceScope};
use stowline_core::{BillingPeriod, ClientId, Money, QuoteId};
use stowline_infra::gateway::{ChatMessage, ChatRole};
use stowline_infra::store::ClientRecord;
use stowline_inventory::{LedgerReason, NewSku, Sku};
use stowline_receiving::{AsnStatus, NewAsn, ReceivedCount, Resolution};
use stowline_content::PostDraft;

use crate::app::errors::ApiError;
use crate::app::services::RateSource;

/// `Json<T>` whose rejections use the API error shape.
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::validation(rejection.body_text())),
        }
    }
}

/// `Query<T>` with the same rejection mapping.
pub struct QueryParams<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::validation(rejection.body_text())),
        }
    }
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSkuRequest {
    #[serde(default)]
    pub client_id: Option<ClientId>,
    #[serde(flatten)]
    pub sku: NewSku,
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i64,
    #[serde(default)]
    pub reason: Option<LedgerReason>,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBillRequest {
    #[serde(default)]
    pub client_id: Option<ClientId>,
    pub period: BillingPeriod,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PopulateBillRequest {
    pub quote_id: QuoteId,
}

/// Rates come from exactly one of `rates` or `quote_id`.
#[derive(Debug, Deserialize)]
pub struct RepriceBillRequest {
    pub scope: RepriceScope,
    #[serde(default)]
    pub rates: Option<BTreeMap<String, Money>>,
    #[serde(default)]
    pub quote_id: Option<QuoteId>,
}

impl RepriceBillRequest {
    pub fn rate_source(&self) -> Result<RateSource, ApiError> {
        match (&self.rates, self.quote_id) {
            (Some(rates), None) => Ok(RateSource::Explicit(rates.clone())),
            (None, Some(id)) => Ok(RateSource::Quote(id)),
            (Some(_), Some(_)) => Err(ApiError::validation("supply either rates or quote_id, not both")),
            (None, None) => Err(ApiError::validation("rates or quote_id is required")),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BillStatusRequest {
    pub status: BillStatus,
}

#[derive(Debug, Deserialize)]
pub struct CreateQuoteRequest {
    #[serde(default)]
    pub client_id: Option<ClientId>,
    pub name: String,
    pub lines: Vec<QuoteLine>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAsnRequest {
    #[serde(default)]
    pub client_id: Option<ClientId>,
    #[serde(flatten)]
    pub asn: NewAsn,
}

#[derive(Debug, Deserialize)]
pub struct AsnListQuery {
    #[serde(default)]
    pub client_id: Option<ClientId>,
    #[serde(default)]
    pub status: Option<AsnStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ReceiveAsnRequest {
    pub counts: Vec<ReceivedCount>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewAsnRequest {
    pub resolution: Resolution,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub company_name: String,
    pub contact_name: String,
    pub contact_email: String,
}

#[derive(Debug, Deserialize)]
pub struct BlogImportRequest {
    pub posts: Vec<PostDraft>,
}

/// Roles a browser may send; the system prompt is always added server-side.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatTurnRole {
    User,
    Assistant,
}

#[derive(Debug, Deserialize)]
pub struct ChatTurn {
    pub role: ChatTurnRole,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatTurn>,
}

impl ChatRequest {
    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages
            .into_iter()
            .map(|t| ChatMessage {
                role: match t.role {
                    ChatTurnRole::User => ChatRole::User,
                    ChatTurnRole::Assistant => ChatRole::Assistant,
                },
                content: t.content,
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
    pub target_lang: String,
}

#[derive(Debug, Deserialize)]
pub struct TranslateBatchRequest {
    pub texts: Vec<String>,
    pub target_lang: String,
}

#[derive(Debug, Deserialize)]
pub struct ShopifyStartQuery {
    pub shop: String,
    #[serde(default)]
    pub client_id: Option<ClientId>,
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn account_to_json(account: &Account) -> Value {
    json!({
        "id": account.id,
        "email": account.email,
        "display_name": account.display_name,
        "role": account.role.as_str(),
        "client_id": account.client_id,
        "status": account.status,
        "created_at": account.created_at,
        "password_changed_at": account.password_changed_at,
    })
}

pub fn client_to_json(client: &ClientRecord) -> Value {
    json!({
        "id": client.id,
        "company_name": client.company_name,
        "contact_name": client.contact_name,
        "contact_email": client.contact_email,
        "created_at": client.created_at,
    })
}

pub fn sku_to_json(sku: &Sku, on_hand: i64) -> Value {
    json!({
        "id": sku.id,
        "client_id": sku.client_id,
        "sku": sku.sku,
        "name": sku.name,
        "upc": sku.upc,
        "ean": sku.ean,
        "fnsku": sku.fnsku,
        "on_hand": on_hand,
        "created_at": sku.created_at,
    })
}

pub fn bill_to_json(bill: &Bill) -> Value {
    let items: Vec<Value> = bill
        .items
        .iter()
        .map(|i| {
            json!({
                "id": i.id,
                "service_code": i.service_code,
                "description": i.description,
                "unit": i.unit,
                "quantity": i.quantity,
                "rate": i.rate,
                "amount": i.amount(),
                "service_date": i.service_date,
                "created_at": i.created_at,
            })
        })
        .collect();

    json!({
        "id": bill.id,
        "client_id": bill.client_id,
        "period": bill.period,
        "status": bill.status.as_str(),
        "notes": bill.notes,
        "items": items,
        "total": bill.total(),
        "created_at": bill.created_at,
        "updated_at": bill.updated_at,
        "version": bill.version,
    })
}
