//! Infrastructure layer: persistence, outbound gateways, session timers.

pub mod gateway;
pub mod session;
pub mod shopify;
pub mod sse;
pub mod store;
pub mod translation;

pub use gateway::{GatewayError, Mailer, Translator};
pub use session::{IdleConfig, IdleEvent, IdleTracker, IdleWatcher, SessionError, SessionRegistry, SessionStatus};
pub use store::{InMemoryStore, PortalStore, StoreError, StoreResult};
pub use translation::{Translated, TranslationCache, TranslationError};
