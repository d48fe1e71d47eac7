//! lexbank: localized message store with TTL-cached listings and bulk
//! export. Wires the SQLite record store, the fingerprinted response
//! cache and the service facade; HTTP framing, auth and input validation
//! belong to the embedding application.

pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod service;
pub mod store;

use std::sync::Arc;

use tracing::info;

pub use cache::ResponseCache;
pub use config::{ConfigError, ServiceConfig};
pub use error::{ServiceError, StoreError};
pub use export::ExportMapping;
pub use service::TranslationService;
pub use store::{ListFilter, NewTranslation, Page, SqliteStore, TranslationRecord};

/// Initialize tracing for embedders that do not install their own
/// subscriber.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lexbank=debug".parse().unwrap()),
        )
        .with_target(true)
        .init();
}

/// Open the store at `config.db_path`, build the response cache with its
/// background expiry sweep, and return the wired service.
pub fn open(config: ServiceConfig) -> Result<TranslationService, ServiceError> {
    let store = Arc::new(SqliteStore::open(&config.db_path)?);
    let cache = Arc::new(ResponseCache::new(config.cache_ttl()));
    ResponseCache::start_sweep_loop(
        Arc::clone(&cache),
        std::time::Duration::from_secs(config.sweep_interval_secs),
    );

    info!(
        ttl_secs = config.cache_ttl_secs,
        page_size = config.page_size,
        chunk_size = config.export_chunk_size,
        "translation service ready"
    );
    Ok(TranslationService::new(store, cache, &config))
}
