//! Start of the Shopify authorization-code flow.

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use rand::RngCore;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use stowline_core::{ClientId, DomainError};

use crate::store::{OAuthState, OAuthStateStore, StoreError};

pub const STATE_TTL_MINUTES: i64 = 10;

static SHOP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*\.myshopify\.com$").unwrap_or_else(|e| panic!("{e}")));

#[derive(Debug, Error)]
pub enum ShopifyError {
    #[error(transparent)]
    Invalid(#[from] DomainError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct ShopifyOAuth {
    api_key: String,
    scopes: String,
    redirect_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OAuthStart {
    pub authorize_url: String,
    pub state: String,
    pub shop: String,
    pub expires_at: DateTime<Utc>,
}

/// Accept `name`, `name.myshopify.com` or a pasted admin URL.
pub fn normalize_shop(raw: &str) -> Result<String, DomainError> {
    let mut shop = raw.trim().to_ascii_lowercase();
    for prefix in ["https://", "http://"] {
        if let Some(rest) = shop.strip_prefix(prefix) {
            shop = rest.to_string();
        }
    }
    let shop = shop.split('/').next().unwrap_or_default().to_string();
    let shop = if shop.contains('.') { shop } else { format!("{shop}.myshopify.com") };
    if !SHOP.is_match(&shop) {
        return Err(DomainError::validation("shop must be a *.myshopify.com domain"));
    }
    Ok(shop)
}

fn new_state() -> String {
    let mut bytes = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl ShopifyOAuth {
    pub fn new(api_key: impl Into<String>, scopes: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), scopes: scopes.into(), redirect_uri: redirect_uri.into() }
    }

    /// Mint a state nonce for `client_id`, persist it and build the
    /// authorization URL the browser is redirected to.
    pub async fn start<S>(
        &self,
        store: &S,
        client_id: ClientId,
        shop: &str,
        now: DateTime<Utc>,
    ) -> Result<OAuthStart, ShopifyError>
    where
        S: OAuthStateStore + ?Sized,
    {
        let shop = normalize_shop(shop)?;
        let state = new_state();
        let expires_at = now + Duration::minutes(STATE_TTL_MINUTES);

        let url = Url::parse_with_params(
            &format!("https://{shop}/admin/oauth/authorize"),
            &[
                ("client_id", self.api_key.as_str()),
                ("scope", self.scopes.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("state", state.as_str()),
            ],
        )
        .map_err(|e| DomainError::validation(format!("invalid authorize url: {e}")))?;

        store
            .put_oauth_state(OAuthState { state: state.clone(), client_id, shop: shop.clone(), expires_at })
            .await?;

        Ok(OAuthStart { authorize_url: url.into(), state, shop, expires_at })
    }

    /// Redeem a state from the callback; expired or unknown states yield `None`.
    pub async fn redeem<S>(&self, store: &S, state: &str, now: DateTime<Utc>) -> Result<Option<OAuthState>, ShopifyError>
    where
        S: OAuthStateStore + ?Sized,
    {
        Ok(store.take_oauth_state(state).await?.filter(|s| s.expires_at > now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[test]
    fn shop_normalization() {
        assert_eq!(normalize_shop("Demo-Store").unwrap(), "demo-store.myshopify.com");
        assert_eq!(
            normalize_shop("https://demo.myshopify.com/admin/apps").unwrap(),
            "demo.myshopify.com"
        );
        assert!(normalize_shop("demo.example.com").is_err());
        assert!(normalize_shop("").is_err());
        assert!(normalize_shop("evil.com/.myshopify.com").is_err());
    }

    #[tokio::test]
    async fn start_builds_url_and_stores_state() {
        let store = InMemoryStore::new();
        let oauth = ShopifyOAuth::new("key123", "read_products,read_orders", "https://portal.example.com/cb");
        let client = ClientId::new();
        let now = Utc::now();

        let started = oauth.start(&store, client, "demo", now).await.unwrap();
        let url = Url::parse(&started.authorize_url).unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("demo.myshopify.com"));
        assert_eq!(url.path(), "/admin/oauth/authorize");
        assert_eq!(params["client_id"], "key123");
        assert_eq!(params["scope"], "read_products,read_orders");
        assert_eq!(params["state"], started.state);
        assert_eq!(started.expires_at, now + Duration::minutes(10));

        let redeemed = oauth.redeem(&store, &started.state, now).await.unwrap().unwrap();
        assert_eq!(redeemed.client_id, client);
        assert!(oauth.redeem(&store, &started.state, now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_state_is_rejected() {
        let store = InMemoryStore::new();
        let oauth = ShopifyOAuth::new("k", "read_products", "https://x/cb");
        let now = Utc::now();
        let started = oauth.start(&store, ClientId::new(), "demo", now).await.unwrap();

        let later = now + Duration::minutes(11);
        assert!(oauth.redeem(&store, &started.state, later).await.unwrap().is_none());
    }
}
