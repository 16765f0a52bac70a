//! Translation cache in front of the translator.
//!
//! Entries are keyed by SHA-256 of `target_lang NUL text`, so a repeated
//! (text, language) pair is answered from the store without calling out.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use stowline_core::DomainError;

use crate::gateway::{GatewayError, Translator};
use crate::store::{StoreError, TranslationEntry, TranslationStore};

pub const MAX_TEXT_CHARS: usize = 5000;
pub const MAX_BATCH: usize = 100;

static LANG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{2,3}(-[a-z0-9]{2,4})?$").unwrap_or_else(|e| panic!("{e}")));

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error(transparent)]
    Invalid(#[from] DomainError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Translated {
    pub text: String,
    pub target_lang: String,
    pub translated_text: String,
    pub cached: bool,
}

pub fn cache_key(target_lang: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(target_lang.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

fn normalize_lang(raw: &str) -> Result<String, DomainError> {
    let lang = raw.trim().to_ascii_lowercase();
    if !LANG.is_match(&lang) {
        return Err(DomainError::validation(format!("unsupported target language: {raw}")));
    }
    Ok(lang)
}

fn check_text(text: &str) -> Result<(), DomainError> {
    if text.trim().is_empty() {
        return Err(DomainError::validation("text cannot be empty"));
    }
    if text.chars().count() > MAX_TEXT_CHARS {
        return Err(DomainError::validation(format!("text exceeds {MAX_TEXT_CHARS} characters")));
    }
    Ok(())
}

pub struct TranslationCache<S: TranslationStore + ?Sized> {
    store: Arc<S>,
    translator: Arc<dyn Translator>,
}

impl<S: TranslationStore + ?Sized> TranslationCache<S> {
    pub fn new(store: Arc<S>, translator: Arc<dyn Translator>) -> Self {
        Self { store, translator }
    }

    pub async fn translate(&self, text: &str, target_lang: &str) -> Result<Translated, TranslationError> {
        check_text(text)?;
        let lang = normalize_lang(target_lang)?;
        self.lookup_or_translate(text, &lang).await
    }

    /// Translate many texts; results keep input order and only misses reach
    /// the translator (each distinct text once).
    pub async fn translate_batch(
        &self,
        texts: &[String],
        target_lang: &str,
    ) -> Result<Vec<Translated>, TranslationError> {
        if texts.is_empty() {
            return Err(DomainError::validation("texts cannot be empty").into());
        }
        if texts.len() > MAX_BATCH {
            return Err(DomainError::validation(format!("at most {MAX_BATCH} texts per batch")).into());
        }
        for t in texts {
            check_text(t)?;
        }
        let lang = normalize_lang(target_lang)?;

        let mut seen: HashMap<&str, Translated> = HashMap::new();
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let result = match seen.get(text.as_str()) {
                Some(done) => done.clone(),
                None => {
                    let fresh = self.lookup_or_translate(text, &lang).await?;
                    seen.insert(text.as_str(), fresh.clone());
                    fresh
                }
            };
            out.push(result);
        }
        Ok(out)
    }

    async fn lookup_or_translate(&self, text: &str, lang: &str) -> Result<Translated, TranslationError> {
        let key = cache_key(lang, text);
        if let Some(hit) = self.store.translation(&key).await? {
            debug!(target_lang = lang, "translation cache hit");
            return Ok(Translated {
                text: text.to_string(),
                target_lang: hit.target_lang,
                translated_text: hit.translated_text,
                cached: true,
            });
        }

        let translated_text = self.translator.translate(text, lang).await?;
        self.store
            .put_translation(TranslationEntry {
                key,
                source_text: text.to_string(),
                target_lang: lang.to_string(),
                translated_text: translated_text.clone(),
                created_at: Utc::now(),
            })
            .await?;
        debug!(target_lang = lang, "translation cached");
        Ok(Translated {
            text: text.to_string(),
            target_lang: lang.to_string(),
            translated_text,
            cached: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTranslator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Translator for CountingTranslator {
        async fn translate(&self, text: &str, target_lang: &str) -> Result<String, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("[{target_lang}] {text}"))
        }
    }

    fn cache() -> (TranslationCache<InMemoryStore>, Arc<CountingTranslator>) {
        let translator = Arc::new(CountingTranslator::default());
        let cache = TranslationCache::new(Arc::new(InMemoryStore::new()), translator.clone());
        (cache, translator)
    }

    #[tokio::test]
    async fn repeated_request_is_served_from_cache() {
        let (cache, translator) = cache();

        let first = cache.translate("Same-day shipping", "es").await.unwrap();
        let second = cache.translate("Same-day shipping", "ES").await.unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.translated_text, second.translated_text);
        assert_eq!(translator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn language_is_part_of_the_key() {
        let (cache, translator) = cache();
        cache.translate("Pricing", "fr").await.unwrap();
        cache.translate("Pricing", "de").await.unwrap();
        assert_eq!(translator.calls.load(Ordering::SeqCst), 2);
        assert_ne!(cache_key("fr", "Pricing"), cache_key("de", "Pricing"));
    }

    #[tokio::test]
    async fn batch_translates_each_distinct_miss_once() {
        let (cache, translator) = cache();
        cache.translate("Receiving", "es").await.unwrap();

        let texts: Vec<String> = ["Receiving", "Storage", "Storage", "Kitting"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let out = cache.translate_batch(&texts, "es").await.unwrap();

        assert_eq!(out.len(), 4);
        assert!(out[0].cached);
        assert_eq!(out[2].translated_text, "[es] Storage");
        assert_eq!(translator.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn rejects_bad_input() {
        let (cache, _) = cache();
        assert!(matches!(cache.translate("  ", "es").await, Err(TranslationError::Invalid(_))));
        assert!(matches!(cache.translate("hi", "spanish!").await, Err(TranslationError::Invalid(_))));
    }
}
