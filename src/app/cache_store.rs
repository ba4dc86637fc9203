use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension as _};

use crate::formats::CacheRecord;

pub const SCHEMA_VERSION: i32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Rendered codelabs keyed by source URL and by converted id.
///
/// `original_url` and `converted_id` are both unique. `upsert` replaces any
/// record that conflicts on either key. `accessed_at` is the only field that
/// changes after a write, and only through [`CacheStore::touch`] (which
/// [`CacheStore::get_by_id`] calls on a hit).
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get_by_url(&self, original_url: &str) -> Result<Option<CacheRecord>, StoreError>;
    async fn get_by_id(&self, converted_id: &str) -> Result<Option<CacheRecord>, StoreError>;
    async fn touch(&self, converted_id: &str) -> Result<bool, StoreError>;
    async fn upsert(
        &self,
        original_url: &str,
        converted_id: &str,
        title: &str,
        content: &str,
    ) -> Result<i64, StoreError>;
    async fn list_recent(&self, limit: usize) -> Result<Vec<CacheRecord>, StoreError>;
}

#[derive(Clone)]
pub struct SqliteCacheStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCacheStore").finish_non_exhaustive()
    }
}

impl SqliteCacheStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        init_schema(&conn)?;
        tracing::debug!(path = %path.display(), "opened sqlite cache store");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let value = tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            f(&conn)
        })
        .await??;
        Ok(value)
    }
}

const SELECT_COLUMNS: &str =
    "id, original_url, converted_id, title, content, created_at, accessed_at";

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get_by_url(&self, original_url: &str) -> Result<Option<CacheRecord>, StoreError> {
        let original_url = original_url.to_owned();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM codelabs WHERE original_url = ?1"),
                [&original_url],
                record_from_row,
            )
            .optional()
        })
        .await
    }

    async fn get_by_id(&self, converted_id: &str) -> Result<Option<CacheRecord>, StoreError> {
        let converted_id = converted_id.to_owned();
        let now = Utc::now().timestamp_millis();
        self.with_conn(move |conn| {
            touch_row(conn, &converted_id, now)?;
            conn.query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM codelabs WHERE converted_id = ?1"),
                [&converted_id],
                record_from_row,
            )
            .optional()
        })
        .await
    }

    async fn touch(&self, converted_id: &str) -> Result<bool, StoreError> {
        let converted_id = converted_id.to_owned();
        let now = Utc::now().timestamp_millis();
        self.with_conn(move |conn| Ok(touch_row(conn, &converted_id, now)? > 0))
            .await
    }

    async fn upsert(
        &self,
        original_url: &str,
        converted_id: &str,
        title: &str,
        content: &str,
    ) -> Result<i64, StoreError> {
        let original_url = original_url.to_owned();
        let converted_id = converted_id.to_owned();
        let title = title.to_owned();
        let content = content.to_owned();
        let now = Utc::now().timestamp_millis();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO codelabs
                    (original_url, converted_id, title, content, created_at, accessed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                rusqlite::params![original_url, converted_id, title, content, now],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<CacheRecord>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM codelabs ORDER BY created_at DESC, id DESC LIMIT ?1"
            ))?;
            let rows = stmt.query_map([limit], record_from_row)?;
            rows.collect()
        })
        .await
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )?;
    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()?;
    if version.is_some() {
        return Ok(());
    }

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS codelabs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            original_url TEXT UNIQUE NOT NULL,
            converted_id TEXT UNIQUE NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            accessed_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_codelabs_created_at ON codelabs(created_at);
        "#,
    )?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [SCHEMA_VERSION],
    )?;
    Ok(())
}

/// Advance `accessed_at` without ever moving it backwards.
fn touch_row(conn: &Connection, converted_id: &str, now_millis: i64) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE codelabs SET accessed_at = MAX(accessed_at, ?1) WHERE converted_id = ?2",
        rusqlite::params![now_millis, converted_id],
    )
}

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CacheRecord> {
    Ok(CacheRecord {
        id: row.get(0)?,
        original_url: row.get(1)?,
        converted_id: row.get(2)?,
        title: row.get(3)?,
        content: row.get(4)?,
        created_at: datetime_from_millis(row.get(5)?),
        accessed_at: datetime_from_millis(row.get(6)?),
    })
}

fn datetime_from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

#[derive(Debug, Default)]
struct InMemoryState {
    next_id: i64,
    records: Vec<CacheRecord>,
}

/// Process-local store with the same conflict rules as [`SqliteCacheStore`].
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    state: Mutex<InMemoryState>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get_by_url(&self, original_url: &str) -> Result<Option<CacheRecord>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .records
            .iter()
            .find(|r| r.original_url == original_url)
            .cloned())
    }

    async fn get_by_id(&self, converted_id: &str) -> Result<Option<CacheRecord>, StoreError> {
        let mut state = self.state.lock();
        let now = Utc::now();
        Ok(state
            .records
            .iter_mut()
            .find(|r| r.converted_id == converted_id)
            .map(|record| {
                record.accessed_at = record.accessed_at.max(now);
                record.clone()
            }))
    }

    async fn touch(&self, converted_id: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        let now = Utc::now();
        let Some(record) = state
            .records
            .iter_mut()
            .find(|r| r.converted_id == converted_id)
        else {
            return Ok(false);
        };
        record.accessed_at = record.accessed_at.max(now);
        Ok(true)
    }

    async fn upsert(
        &self,
        original_url: &str,
        converted_id: &str,
        title: &str,
        content: &str,
    ) -> Result<i64, StoreError> {
        let mut state = self.state.lock();
        state
            .records
            .retain(|r| r.original_url != original_url && r.converted_id != converted_id);

        state.next_id += 1;
        let id = state.next_id;
        let now = Utc::now();
        state.records.push(CacheRecord {
            id,
            original_url: original_url.to_owned(),
            converted_id: converted_id.to_owned(),
            title: title.to_owned(),
            content: content.to_owned(),
            created_at: now,
            accessed_at: now,
        });
        Ok(id)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<CacheRecord>, StoreError> {
        let state = self.state.lock();
        let mut records = state.records.clone();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        records.truncate(limit);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stores() -> Vec<(&'static str, Box<dyn CacheStore>)> {
        vec![
            (
                "sqlite",
                Box::new(SqliteCacheStore::open_in_memory().expect("open sqlite")),
            ),
            ("memory", Box::new(InMemoryCacheStore::new())),
        ]
    }

    #[tokio::test]
    async fn upsert_then_lookup_by_both_keys() -> anyhow::Result<()> {
        for (name, store) in stores() {
            let row_id = store
                .upsert("https://x/a.md", "aaaaaaaaaaaa", "A", "<html>a</html>")
                .await?;
            assert!(row_id > 0, "{name}");

            let by_url = store.get_by_url("https://x/a.md").await?.expect("by url");
            assert_eq!(by_url.converted_id, "aaaaaaaaaaaa", "{name}");
            assert_eq!(by_url.title, "A", "{name}");
            assert!(by_url.accessed_at >= by_url.created_at, "{name}");

            let by_id = store.get_by_id("aaaaaaaaaaaa").await?.expect("by id");
            assert_eq!(by_id.original_url, "https://x/a.md", "{name}");
            assert_eq!(by_id.content, "<html>a</html>", "{name}");

            assert!(store.get_by_url("https://x/missing.md").await?.is_none(), "{name}");
            assert!(store.get_by_id("bbbbbbbbbbbb").await?.is_none(), "{name}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn upsert_same_url_replaces_record() -> anyhow::Result<()> {
        for (name, store) in stores() {
            store.upsert("https://x/a.md", "aaaaaaaaaaaa", "Old", "old").await?;
            store.upsert("https://x/a.md", "cccccccccccc", "New", "new").await?;

            let record = store.get_by_url("https://x/a.md").await?.expect("record");
            assert_eq!(record.converted_id, "cccccccccccc", "{name}");
            assert_eq!(record.title, "New", "{name}");
            assert!(store.get_by_id("aaaaaaaaaaaa").await?.is_none(), "{name}");
            assert_eq!(store.list_recent(10).await?.len(), 1, "{name}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn upsert_colliding_id_overwrites_other_url() -> anyhow::Result<()> {
        for (name, store) in stores() {
            store.upsert("https://x/a.md", "dddddddddddd", "A", "a").await?;
            store.upsert("https://x/b.md", "dddddddddddd", "B", "b").await?;

            assert!(store.get_by_url("https://x/a.md").await?.is_none(), "{name}");
            let record = store.get_by_id("dddddddddddd").await?.expect("record");
            assert_eq!(record.original_url, "https://x/b.md", "{name}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn touch_advances_access_time_only() -> anyhow::Result<()> {
        for (name, store) in stores() {
            store.upsert("https://x/a.md", "aaaaaaaaaaaa", "A", "a").await?;
            let before = store.get_by_url("https://x/a.md").await?.expect("record");

            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            assert!(store.touch("aaaaaaaaaaaa").await?, "{name}");
            assert!(!store.touch("ffffffffffff").await?, "{name}");

            let after = store.get_by_url("https://x/a.md").await?.expect("record");
            assert!(after.accessed_at > before.accessed_at, "{name}");
            assert_eq!(after.created_at, before.created_at, "{name}");
            assert_eq!(after.content, before.content, "{name}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn get_by_url_does_not_touch() -> anyhow::Result<()> {
        for (name, store) in stores() {
            store.upsert("https://x/a.md", "aaaaaaaaaaaa", "A", "a").await?;
            let first = store.get_by_url("https://x/a.md").await?.expect("record");
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            let second = store.get_by_url("https://x/a.md").await?.expect("record");
            assert_eq!(first.accessed_at, second.accessed_at, "{name}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn get_by_id_touches() -> anyhow::Result<()> {
        for (name, store) in stores() {
            store.upsert("https://x/a.md", "aaaaaaaaaaaa", "A", "a").await?;
            let before = store.get_by_url("https://x/a.md").await?.expect("record");
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            let viewed = store.get_by_id("aaaaaaaaaaaa").await?.expect("record");
            assert!(viewed.accessed_at > before.accessed_at, "{name}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn list_recent_is_newest_first_and_capped() -> anyhow::Result<()> {
        for (name, store) in stores() {
            for (i, id) in ["aaaaaaaaaaa1", "aaaaaaaaaaa2", "aaaaaaaaaaa3"]
                .iter()
                .enumerate()
            {
                store
                    .upsert(&format!("https://x/{i}.md"), id, "t", "c")
                    .await?;
            }

            let recent = store.list_recent(2).await?;
            let ids: Vec<_> = recent.iter().map(|r| r.converted_id.as_str()).collect();
            assert_eq!(ids, vec!["aaaaaaaaaaa3", "aaaaaaaaaaa2"], "{name}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn sqlite_store_persists_across_reopen() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join("db").join("codelabs.db");

        {
            let store = SqliteCacheStore::open(&path)?;
            store.upsert("https://x/a.md", "aaaaaaaaaaaa", "A", "a").await?;
        }

        let store = SqliteCacheStore::open(&path)?;
        let record = store.get_by_url("https://x/a.md").await?.expect("record");
        assert_eq!(record.title, "A");
        Ok(())
    }
}
