//! Service facade: cache-backed listing and export reads, point lookup,
//! and writes that invalidate every memoized read before acknowledging.
//! Store calls run on the blocking pool; cache operations stay cheap.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::fingerprint::{self, short_hex};
use crate::cache::{CachedPayload, ResponseCache};
use crate::config::ServiceConfig;
use crate::error::{ServiceError, StoreError};
use crate::export::{build_export, ExportMapping};
use crate::store::{ListFilter, NewTranslation, Page, TranslationRecord, TranslationStore};

pub struct TranslationService {
    store: Arc<dyn TranslationStore>,
    cache: Arc<ResponseCache>,
    page_size: usize,
    export_chunk_size: usize,
}

impl TranslationService {
    pub fn new(
        store: Arc<dyn TranslationStore>,
        cache: Arc<ResponseCache>,
        config: &ServiceConfig,
    ) -> Self {
        Self {
            store,
            cache,
            page_size: config.page_size,
            export_chunk_size: config.export_chunk_size,
        }
    }

    /// Filtered, paginated listing, memoized per fingerprint.
    pub async fn list(&self, filter: ListFilter, page: u32) -> Result<Page, ServiceError> {
        let filter = filter.normalize();
        let fp = fingerprint::listing(&filter, page);

        if let Some(CachedPayload::Listing(cached)) = self.cache.get(&fp) {
            debug!(fingerprint = %short_hex(&fp), "listing served from cache");
            return Ok(cached);
        }

        let per_page = self.page_size;
        let query_filter = filter.clone();
        let result = self
            .on_store(move |s| s.query(&query_filter, page, per_page))
            .await?;

        self.cache.insert(fp, CachedPayload::Listing(result.clone()));
        debug!(
            fingerprint = %short_hex(&fp),
            total = result.total,
            "listing computed and cached"
        );
        Ok(result)
    }

    /// Point lookup by id. Never cached.
    pub async fn get(&self, id: i64) -> Result<TranslationRecord, ServiceError> {
        self.on_store(move |s| s.find_by_id(id))
            .await?
            .ok_or(ServiceError::NotFound(id))
    }

    /// Full export as the nested locale → key → content mapping,
    /// memoized under the single export fingerprint. A build aborted by
    /// `cancel` leaves the cache untouched.
    pub async fn export_all(
        &self,
        cancel: &CancellationToken,
    ) -> Result<ExportMapping, ServiceError> {
        let fp = fingerprint::export();

        if let Some(CachedPayload::Export(cached)) = self.cache.get(&fp) {
            debug!("export served from cache");
            return Ok(cached);
        }

        let mapping =
            build_export(Arc::clone(&self.store), self.export_chunk_size, cancel).await?;
        self.cache.insert(fp, CachedPayload::Export(mapping.clone()));
        info!(locales = mapping.len(), "export mapping cached");
        Ok(mapping)
    }

    /// Create a translation. The cached listings and export are dropped
    /// before the record is returned, so the write is visible to the
    /// next read.
    pub async fn create(&self, new: NewTranslation) -> Result<TranslationRecord, ServiceError> {
        let record = self.on_store(move |s| s.insert(new)).await?;
        self.cache.invalidate_reads();
        info!(id = record.id, locale = %record.locale, key = %record.key, "translation created");
        Ok(record)
    }

    /// Replace the content of an existing translation. Same write
    /// barrier as `create`.
    pub async fn update(&self, id: i64, content: String) -> Result<TranslationRecord, ServiceError> {
        let record = self
            .on_store(move |s| s.update_content(id, &content))
            .await?
            .ok_or(ServiceError::NotFound(id))?;
        self.cache.invalidate_reads();
        info!(id = record.id, "translation updated");
        Ok(record)
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Dispatch a store call to the blocking pool.
    async fn on_store<T, F>(&self, op: F) -> Result<T, ServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn TranslationStore) -> Result<T, StoreError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|e| {
                ServiceError::Store(StoreError::Unavailable(format!("store worker died: {e}")))
            })?
            .map_err(ServiceError::from)
    }
}
