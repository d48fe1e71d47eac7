//! Bulk export aggregation.
//! Streams the translation table in bounded id-ordered chunks and folds
//! each chunk into the nested locale → key → content mapping. Memory
//! stays proportional to one chunk plus the accumulated mapping, never
//! to the table.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{ServiceError, StoreError};
use crate::store::{ExportRow, TranslationStore};

/// Nested export view: locale → key → content. BTreeMap keeps the JSON
/// serialization deterministic.
pub type ExportMapping = BTreeMap<String, BTreeMap<String, String>>;

/// Upper bound on rows fetched per chunk.
pub const MAX_CHUNK_SIZE: usize = 10_000;

/// Build the export mapping by chunked streaming aggregation.
///
/// Chunks are read through the store's id cursor, so a table that grows
/// or shrinks between reads yields a weakly consistent snapshot; this
/// is a cache-refresh path, not a transactional export. Duplicate
/// (locale, key) pairs resolve last-write-wins in id order. Cancellation
/// is honored between chunks and aborts without a result, so a cancelled
/// build can never be memoized.
pub async fn build_export(
    store: Arc<dyn TranslationStore>,
    chunk_size: usize,
    cancel: &CancellationToken,
) -> Result<ExportMapping, ServiceError> {
    let chunk_size = chunk_size.clamp(1, MAX_CHUNK_SIZE);
    let mut mapping = ExportMapping::new();
    let mut after_id = 0i64;
    let mut chunks = 0usize;
    let mut rows = 0usize;

    loop {
        if cancel.is_cancelled() {
            return Err(ServiceError::Cancelled);
        }

        let store = Arc::clone(&store);
        let chunk = tokio::task::spawn_blocking(move || store.export_chunk(after_id, chunk_size))
            .await
            .map_err(|e| {
                ServiceError::Store(StoreError::Unavailable(format!("export worker died: {e}")))
            })??;

        let fetched = chunk.len();
        if let Some(last) = chunk.last() {
            after_id = last.id;
        }
        fold_chunk(&mut mapping, chunk);
        chunks += 1;
        rows += fetched;

        if fetched < chunk_size {
            break;
        }
    }

    debug!(rows, chunks, locales = mapping.len(), "export mapping built");
    Ok(mapping)
}

/// Fold one chunk into the mapping, consuming it. Later rows overwrite
/// earlier ones on (locale, key) collisions.
fn fold_chunk(mapping: &mut ExportMapping, chunk: Vec<ExportRow>) {
    for row in chunk {
        mapping
            .entry(row.locale)
            .or_default()
            .insert(row.key, row.content);
    }
}
