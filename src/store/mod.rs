//! Record store interface: translation records, listing filters, and the
//! narrow query/mutate trait the cache and export layers are written
//! against. The SQLite implementation lives in `sqlite`.

pub mod sqlite;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub use sqlite::SqliteStore;

/// A stored translation string.
/// `locale`, `key` and `tag` are immutable after creation; only
/// `content` changes on update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub id: i64,
    pub locale: String,
    pub key: String,
    pub content: String,
    pub tag: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Fields accepted when creating a translation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTranslation {
    pub locale: String,
    pub key: String,
    pub content: String,
    pub tag: Option<String>,
}

/// Listing filters: tag matches exactly, key and content match as
/// substrings. Empty strings are treated as "not supplied".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListFilter {
    pub tag: Option<String>,
    pub key: Option<String>,
    pub content: Option<String>,
}

impl ListFilter {
    /// Collapse empty-string filters to None so that "empty" and
    /// "absent" produce the same query and the same fingerprint.
    pub fn normalize(mut self) -> Self {
        let scrub = |v: Option<String>| v.filter(|s| !s.is_empty());
        self.tag = scrub(self.tag);
        self.key = scrub(self.key);
        self.content = scrub(self.content);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tag.is_none() && self.key.is_none() && self.content.is_none()
    }
}

/// One page of listing results with pagination metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub items: Vec<TranslationRecord>,
    pub page: u32,
    pub per_page: usize,
    pub total: u64,
    pub total_pages: u64,
}

/// The (id, locale, key, content) projection streamed during export.
/// `id` doubles as the resumable cursor position.
#[derive(Debug, Clone)]
pub struct ExportRow {
    pub id: i64,
    pub locale: String,
    pub key: String,
    pub content: String,
}

/// Narrow store interface consumed by the service, cache and export
/// layers. Implementations must be safe to share across tasks; calls may
/// block on I/O and are dispatched to the blocking pool by callers.
pub trait TranslationStore: Send + Sync {
    /// Insert a new record and return it with its assigned id.
    fn insert(&self, new: NewTranslation) -> Result<TranslationRecord, StoreError>;

    /// Replace the content of an existing record. Returns None when the
    /// id does not exist.
    fn update_content(&self, id: i64, content: &str)
        -> Result<Option<TranslationRecord>, StoreError>;

    /// Point lookup by id.
    fn find_by_id(&self, id: i64) -> Result<Option<TranslationRecord>, StoreError>;

    /// Filtered, id-ordered page of records.
    fn query(&self, filter: &ListFilter, page: u32, per_page: usize) -> Result<Page, StoreError>;

    /// Up to `limit` rows with id greater than `after_id`, id-ordered.
    /// Repeated calls advancing `after_id` walk the whole table without
    /// ever materializing it.
    fn export_chunk(&self, after_id: i64, limit: usize) -> Result<Vec<ExportRow>, StoreError>;
}
