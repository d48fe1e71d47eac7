//! SQLite-backed translation store.
//! WAL journal mode, single connection behind a mutex, busy retries with
//! bounded backoff. Secondary indexes on locale, key and tag keep the
//! filtered listing path off full-table scans.

use std::path::Path;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{info, warn};

use super::{ExportRow, ListFilter, NewTranslation, Page, TranslationRecord, TranslationStore};
use crate::error::StoreError;

/// Retries for SQLITE_BUSY / SQLITE_LOCKED before giving up.
const MAX_BUSY_RETRIES: u32 = 3;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the translation database at the given path.
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)
            .map_err(|e| StoreError::Unavailable(format!("failed to open database: {e}")))?;
        let store = Self::init(conn)?;
        info!(path = %db_path.display(), "translation store opened");
        Ok(store)
    }

    /// Open a private in-memory database. Used by tests and embedders
    /// that do not need persistence.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Unavailable(format!("failed to open database: {e}")))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| StoreError::Unavailable(format!("PRAGMA failed: {e}")))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS translations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                locale TEXT NOT NULL,
                \"key\" TEXT NOT NULL,
                content TEXT NOT NULL,
                tag TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_translations_locale
                ON translations(locale);
            CREATE INDEX IF NOT EXISTS idx_translations_key
                ON translations(\"key\");
            CREATE INDEX IF NOT EXISTS idx_translations_tag
                ON translations(tag);",
        )
        .map_err(|e| StoreError::Unavailable(format!("create table failed: {e}")))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl TranslationStore for SqliteStore {
    fn insert(&self, new: NewTranslation) -> Result<TranslationRecord, StoreError> {
        let conn = self.conn.lock();
        let now = now_unix();

        with_busy_retry(|| {
            conn.execute(
                "INSERT INTO translations (locale, \"key\", content, tag, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![new.locale, new.key, new.content, new.tag, now, now],
            )
        })?;

        let id = conn.last_insert_rowid();
        Ok(TranslationRecord {
            id,
            locale: new.locale,
            key: new.key,
            content: new.content,
            tag: new.tag,
            created_at: now,
            updated_at: now,
        })
    }

    fn update_content(
        &self,
        id: i64,
        content: &str,
    ) -> Result<Option<TranslationRecord>, StoreError> {
        let conn = self.conn.lock();
        let now = now_unix();

        let changed = with_busy_retry(|| {
            conn.execute(
                "UPDATE translations SET content = ?1, updated_at = ?2 WHERE id = ?3",
                params![content, now, id],
            )
        })?;

        if changed == 0 {
            return Ok(None);
        }

        let record = with_busy_retry(|| {
            conn.query_row(
                "SELECT id, locale, \"key\", content, tag, created_at, updated_at
                 FROM translations WHERE id = ?1",
                params![id],
                record_from_row,
            )
            .optional()
        })?;
        Ok(record)
    }

    fn find_by_id(&self, id: i64) -> Result<Option<TranslationRecord>, StoreError> {
        let conn = self.conn.lock();
        with_busy_retry(|| {
            conn.query_row(
                "SELECT id, locale, \"key\", content, tag, created_at, updated_at
                 FROM translations WHERE id = ?1",
                params![id],
                record_from_row,
            )
            .optional()
        })
    }

    fn query(&self, filter: &ListFilter, page: u32, per_page: usize) -> Result<Page, StoreError> {
        let conn = self.conn.lock();
        let (where_sql, args) = build_where(filter);

        let count_sql = format!("SELECT COUNT(*) FROM translations{where_sql}");
        let total: i64 = with_busy_retry(|| {
            let refs: Vec<&dyn ToSql> = args.iter().map(|a| a as &dyn ToSql).collect();
            conn.query_row(&count_sql, refs.as_slice(), |row| row.get(0))
        })?;

        let page = page.max(1);
        let per_page = per_page.max(1);
        let limit = per_page as i64;
        let offset = (page as i64 - 1) * limit;

        let select_sql = format!(
            "SELECT id, locale, \"key\", content, tag, created_at, updated_at
             FROM translations{where_sql} ORDER BY id LIMIT ? OFFSET ?"
        );

        let items = with_busy_retry(|| {
            let mut stmt = conn.prepare_cached(&select_sql)?;
            let mut refs: Vec<&dyn ToSql> = args.iter().map(|a| a as &dyn ToSql).collect();
            refs.push(&limit);
            refs.push(&offset);
            let rows = stmt.query_map(refs.as_slice(), record_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?;

        let total = total as u64;
        Ok(Page {
            items,
            page,
            per_page,
            total,
            total_pages: total.div_ceil(per_page as u64),
        })
    }

    fn export_chunk(&self, after_id: i64, limit: usize) -> Result<Vec<ExportRow>, StoreError> {
        let conn = self.conn.lock();
        with_busy_retry(|| {
            let mut stmt = conn.prepare_cached(
                "SELECT id, locale, \"key\", content FROM translations
                 WHERE id > ?1 ORDER BY id LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![after_id, limit as i64], |row| {
                Ok(ExportRow {
                    id: row.get(0)?,
                    locale: row.get(1)?,
                    key: row.get(2)?,
                    content: row.get(3)?,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<TranslationRecord> {
    Ok(TranslationRecord {
        id: row.get(0)?,
        locale: row.get(1)?,
        key: row.get(2)?,
        content: row.get(3)?,
        tag: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Dynamic WHERE clause for the listing filters: tag matches exactly,
/// key and content as substrings.
fn build_where(filter: &ListFilter) -> (String, Vec<String>) {
    let mut clauses: Vec<&str> = Vec::new();
    let mut args: Vec<String> = Vec::new();

    if let Some(ref tag) = filter.tag {
        clauses.push("tag = ?");
        args.push(tag.clone());
    }
    if let Some(ref key) = filter.key {
        clauses.push("\"key\" LIKE ?");
        args.push(format!("%{key}%"));
    }
    if let Some(ref content) = filter.content {
        clauses.push("content LIKE ?");
        args.push(format!("%{content}%"));
    }

    if clauses.is_empty() {
        (String::new(), args)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), args)
    }
}

/// Run a statement, retrying on SQLITE_BUSY / SQLITE_LOCKED with
/// bounded exponential backoff. Retrying lives here, at the store
/// boundary, never in the cache layer.
fn with_busy_retry<T>(mut op: impl FnMut() -> rusqlite::Result<T>) -> Result<T, StoreError> {
    let mut attempt: u32 = 0;
    loop {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if is_busy(&e) && attempt < MAX_BUSY_RETRIES => {
                let wait = Duration::from_millis(10u64 << attempt);
                warn!(
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    "database busy, retrying"
                );
                std::thread::sleep(wait);
                attempt += 1;
            }
            Err(e) => return Err(StoreError::Unavailable(e.to_string())),
        }
    }
}

fn is_busy(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::DatabaseBusy
                || err.code == rusqlite::ErrorCode::DatabaseLocked
    )
}

/// Current time as Unix timestamp (seconds).
fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(locale: &str, key: &str, content: &str) -> NewTranslation {
        NewTranslation {
            locale: locale.into(),
            key: key.into(),
            content: content.into(),
            tag: None,
        }
    }

    fn tagged(locale: &str, key: &str, content: &str, tag: &str) -> NewTranslation {
        NewTranslation {
            tag: Some(tag.into()),
            ..record(locale, key, content)
        }
    }

    #[test]
    fn insert_assigns_ids_and_timestamps() {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = store.insert(record("en", "greet", "hi")).unwrap();
        let b = store.insert(record("fr", "greet", "salut")).unwrap();

        assert!(a.id < b.id);
        assert!(a.created_at > 0);
        assert_eq!(a.created_at, a.updated_at);
        assert_eq!(store.find_by_id(a.id).unwrap().unwrap().content, "hi");
    }

    #[test]
    fn find_by_id_misses_return_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.find_by_id(42).unwrap().is_none());
    }

    #[test]
    fn update_replaces_content_only() {
        let store = SqliteStore::open_in_memory().unwrap();
        let rec = store.insert(tagged("en", "greet", "hi", "ui")).unwrap();

        let updated = store.update_content(rec.id, "hello").unwrap().unwrap();
        assert_eq!(updated.content, "hello");
        assert_eq!(updated.locale, "en");
        assert_eq!(updated.key, "greet");
        assert_eq!(updated.tag.as_deref(), Some("ui"));

        assert!(store.update_content(9999, "x").unwrap().is_none());
    }

    #[test]
    fn query_filters_by_tag_key_and_content() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert(tagged("en", "button.save", "Save", "ui")).unwrap();
        store.insert(tagged("en", "button.cancel", "Cancel", "ui")).unwrap();
        store.insert(tagged("en", "mail.subject", "Welcome", "mail")).unwrap();

        let by_tag = store
            .query(
                &ListFilter {
                    tag: Some("ui".into()),
                    ..Default::default()
                },
                1,
                100,
            )
            .unwrap();
        assert_eq!(by_tag.total, 2);

        let by_key = store
            .query(
                &ListFilter {
                    key: Some("button".into()),
                    ..Default::default()
                },
                1,
                100,
            )
            .unwrap();
        assert_eq!(by_key.total, 2);

        let by_content = store
            .query(
                &ListFilter {
                    content: Some("Welc".into()),
                    ..Default::default()
                },
                1,
                100,
            )
            .unwrap();
        assert_eq!(by_content.total, 1);
        assert_eq!(by_content.items[0].key, "mail.subject");

        let combined = store
            .query(
                &ListFilter {
                    tag: Some("ui".into()),
                    key: Some("save".into()),
                    ..Default::default()
                },
                1,
                100,
            )
            .unwrap();
        assert_eq!(combined.total, 1);
    }

    #[test]
    fn query_paginates_in_id_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        for i in 0..7 {
            store.insert(record("en", &format!("k{i}"), "v")).unwrap();
        }

        let first = store.query(&ListFilter::default(), 1, 3).unwrap();
        assert_eq!(first.items.len(), 3);
        assert_eq!(first.total, 7);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.items[0].key, "k0");

        let last = store.query(&ListFilter::default(), 3, 3).unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].key, "k6");

        let beyond = store.query(&ListFilter::default(), 4, 3).unwrap();
        assert!(beyond.items.is_empty());
    }

    #[test]
    fn export_chunks_resume_from_cursor() {
        let store = SqliteStore::open_in_memory().unwrap();
        for i in 0..5 {
            store.insert(record("en", &format!("k{i}"), &format!("v{i}"))).unwrap();
        }

        let first = store.export_chunk(0, 2).unwrap();
        assert_eq!(first.len(), 2);
        let second = store.export_chunk(first.last().unwrap().id, 2).unwrap();
        assert_eq!(second.len(), 2);
        let third = store.export_chunk(second.last().unwrap().id, 2).unwrap();
        assert_eq!(third.len(), 1);

        let mut keys: Vec<String> = first
            .into_iter()
            .chain(second)
            .chain(third)
            .map(|r| r.key)
            .collect();
        keys.sort();
        assert_eq!(keys, vec!["k0", "k1", "k2", "k3", "k4"]);
    }

    #[test]
    fn duplicate_locale_key_pairs_are_accepted() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert(record("en", "greet", "hi")).unwrap();
        store.insert(record("en", "greet", "hello")).unwrap();

        let page = store.query(&ListFilter::default(), 1, 100).unwrap();
        assert_eq!(page.total, 2);
    }
}
