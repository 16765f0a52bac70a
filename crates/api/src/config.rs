//! Process configuration, read once at startup.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use stowline_infra::IdleConfig;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiConfig {
    pub url: String,
    pub key: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailConfig {
    pub url: String,
    pub key: String,
    pub from: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopifyConfig {
    pub client_id: String,
    pub scopes: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub environment: Environment,
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub jwt_ttl: chrono::Duration,
    pub database_url: Option<String>,
    pub ai: Option<AiConfig>,
    pub mail: Option<MailConfig>,
    pub contact_to: String,
    pub shopify: Option<ShopifyConfig>,
    pub idle: IdleConfig,
    pub bootstrap_admin: Option<(String, String)>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (tests pass a map instead of the process env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let environment = match get("STOWLINE_ENV").as_deref() {
            None | Some("development") | Some("dev") => Environment::Development,
            Some("production") | Some("prod") => Environment::Production,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "STOWLINE_ENV",
                    reason: format!("expected development or production, got {other}"),
                });
            }
        };

        let bind_addr = parse("BIND_ADDR", get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()))?;

        let jwt_secret = match (get("JWT_SECRET"), environment) {
            (Some(s), Environment::Production) if s.len() < 32 => {
                return Err(ConfigError::Invalid { key: "JWT_SECRET", reason: "must be at least 32 bytes".to_string() });
            }
            (Some(s), _) => s,
            (None, Environment::Production) => return Err(ConfigError::Missing("JWT_SECRET")),
            (None, Environment::Development) => {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
        };

        let jwt_ttl_secs: i64 = parse("JWT_TTL_SECS", get("JWT_TTL_SECS").unwrap_or_else(|| "28800".to_string()))?;
        if jwt_ttl_secs <= 0 {
            return Err(ConfigError::Invalid { key: "JWT_TTL_SECS", reason: "must be positive".to_string() });
        }

        let ai = match (get("AI_GATEWAY_URL"), get("AI_GATEWAY_KEY")) {
            (Some(url), Some(key)) => Some(AiConfig {
                url,
                key,
                model: get("AI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("AI_GATEWAY_KEY")),
            (None, Some(_)) => return Err(ConfigError::Missing("AI_GATEWAY_URL")),
        };

        let mail = match (get("MAIL_API_URL"), get("MAIL_API_KEY")) {
            (Some(url), Some(key)) => Some(MailConfig {
                url,
                key,
                from: get("MAIL_FROM").ok_or(ConfigError::Missing("MAIL_FROM"))?,
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("MAIL_API_KEY")),
            (None, Some(_)) => return Err(ConfigError::Missing("MAIL_API_URL")),
        };
        let contact_to = match get("CONTACT_TO") {
            Some(to) => to,
            None if mail.is_some() => return Err(ConfigError::Missing("CONTACT_TO")),
            None => "ops@localhost".to_string(),
        };

        let shopify = match get("SHOPIFY_CLIENT_ID") {
            Some(client_id) => Some(ShopifyConfig {
                client_id,
                scopes: get("SHOPIFY_SCOPES").unwrap_or_else(|| "read_products,read_orders,read_inventory".to_string()),
                redirect_uri: get("SHOPIFY_REDIRECT_URI").ok_or(ConfigError::Missing("SHOPIFY_REDIRECT_URI"))?,
            }),
            None => None,
        };

        let warning: u64 = parse("SESSION_WARNING_SECS", get("SESSION_WARNING_SECS").unwrap_or_else(|| "1680".to_string()))?;
        let timeout: u64 = parse("SESSION_TIMEOUT_SECS", get("SESSION_TIMEOUT_SECS").unwrap_or_else(|| "1800".to_string()))?;
        let idle = IdleConfig::new(Duration::from_secs(warning), Duration::from_secs(timeout)).map_err(|e| {
            ConfigError::Invalid { key: "SESSION_WARNING_SECS", reason: e.to_string() }
        })?;

        let bootstrap_admin = match (get("ADMIN_EMAIL"), get("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some((email, password)),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("ADMIN_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::Missing("ADMIN_EMAIL")),
        };

        Ok(Self {
            environment,
            bind_addr,
            jwt_secret,
            jwt_ttl: chrono::Duration::seconds(jwt_ttl_secs),
            database_url: get("DATABASE_URL"),
            ai,
            mail,
            contact_to,
            shopify,
            idle,
            bootstrap_admin,
        })
    }
}

fn parse<T>(key: &'static str, raw: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid { key, reason: e.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(move |k| map.get(k).cloned())
    }

    #[test]
    fn development_defaults() {
        let c = config(&[]).unwrap();
        assert_eq!(c.environment, Environment::Development);
        assert_eq!(c.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(c.bind_addr.port(), 8080);
        assert_eq!(c.idle, IdleConfig::default());
        assert!(c.ai.is_none() && c.mail.is_none() && c.shopify.is_none());
    }

    #[test]
    fn production_requires_strong_secret() {
        assert_eq!(config(&[("STOWLINE_ENV", "production")]), Err(ConfigError::Missing("JWT_SECRET")));
        assert!(matches!(
            config(&[("STOWLINE_ENV", "production"), ("JWT_SECRET", "short")]),
            Err(ConfigError::Invalid { key: "JWT_SECRET", .. })
        ));
        let secret = "x".repeat(40);
        assert!(config(&[("STOWLINE_ENV", "production"), ("JWT_SECRET", &secret)]).is_ok());
    }

    #[test]
    fn partial_integrations_are_rejected() {
        assert_eq!(config(&[("AI_GATEWAY_URL", "http://ai")]), Err(ConfigError::Missing("AI_GATEWAY_KEY")));
        assert_eq!(
            config(&[("MAIL_API_URL", "http://mail"), ("MAIL_API_KEY", "k"), ("MAIL_FROM", "a@b.co")]),
            Err(ConfigError::Missing("CONTACT_TO"))
        );
        assert_eq!(config(&[("SHOPIFY_CLIENT_ID", "abc")]), Err(ConfigError::Missing("SHOPIFY_REDIRECT_URI")));
    }

    #[test]
    fn session_timers_must_be_ordered() {
        let c = config(&[("SESSION_WARNING_SECS", "60"), ("SESSION_TIMEOUT_SECS", "120")]).unwrap();
        assert_eq!(c.idle.logout_after(), Duration::from_secs(120));
        assert!(config(&[("SESSION_WARNING_SECS", "120"), ("SESSION_TIMEOUT_SECS", "60")]).is_err());
        assert!(config(&[("SESSION_TIMEOUT_SECS", "soon")]).is_err());
    }
}
