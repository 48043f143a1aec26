//! History Oracle: the append-only store of posted and excluded links
//!
//! The pipeline only ever asks two boolean membership questions per link and
//! records the two outcomes. Entries are never deleted by this crate.

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use crate::error::{HistoryError, Result};

/// Membership queries and append-only writes keyed by canonical link.
///
/// Implementations must tolerate the same link being recorded more than
/// once without corrupting state.
#[async_trait]
pub trait History: Send + Sync {
    async fn has_posted(&self, link: &str) -> Result<bool>;
    async fn record_posted(&self, link: &str) -> Result<()>;
    async fn is_excluded(&self, link: &str) -> Result<bool>;
    async fn record_excluded(&self, link: &str) -> Result<()>;
}

/// SQLite-backed history store
#[derive(Clone)]
pub struct SqliteHistory {
    pool: SqlitePool,
}

impl SqliteHistory {
    /// Open (and if needed create) the history database at `db_path`.
    ///
    /// `:memory:` opens an in-process database, used by tests and dry runs.
    pub async fn new(db_path: &str) -> Result<Self> {
        if db_path == ":memory:" {
            // An in-memory database exists per connection, so the pool must
            // hold exactly one connection and never retire it
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect("sqlite::memory:")
                .await
                .map_err(HistoryError::SqlxError)?;

            let store = Self { pool };
            store.ensure_schema().await?;
            return Ok(store);
        }

        let db_url = {
            // Expand path and create parent directories
            let expanded_path = shellexpand::tilde(db_path).to_string();
            let path = Path::new(&expanded_path);

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(HistoryError::IoError)?;
            }

            // Forward slashes in the SQLite URL work on both Windows and Unix;
            // mode=rwc creates the database file if it doesn't exist
            format!("sqlite://{}?mode=rwc", expanded_path.replace('\\', "/"))
        };

        let pool = SqlitePool::connect(&db_url)
            .await
            .map_err(HistoryError::SqlxError)?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                article_url TEXT NOT NULL UNIQUE,
                posted_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(HistoryError::SqlxError)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS excluded (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                article_url TEXT NOT NULL UNIQUE,
                excluded_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(HistoryError::SqlxError)?;

        Ok(())
    }

    async fn contains(&self, table: &str, link: &str) -> Result<bool> {
        let query = format!("SELECT 1 FROM {} WHERE article_url = ?", table);
        let row = sqlx::query(&query)
            .bind(link)
            .fetch_optional(&self.pool)
            .await
            .map_err(HistoryError::SqlxError)?;
        Ok(row.is_some())
    }

    async fn insert(&self, table: &str, link: &str) -> Result<()> {
        // INSERT OR IGNORE keeps duplicate records from the same run harmless
        let query = format!(
            "INSERT OR IGNORE INTO {} (article_url) VALUES (?)",
            table
        );
        sqlx::query(&query)
            .bind(link)
            .execute(&self.pool)
            .await
            .map_err(HistoryError::SqlxError)?;
        Ok(())
    }
}

#[async_trait]
impl History for SqliteHistory {
    async fn has_posted(&self, link: &str) -> Result<bool> {
        self.contains("posts", link).await
    }

    async fn record_posted(&self, link: &str) -> Result<()> {
        self.insert("posts", link).await
    }

    async fn is_excluded(&self, link: &str) -> Result<bool> {
        self.contains("excluded", link).await
    }

    async fn record_excluded(&self, link: &str) -> Result<()> {
        self.insert("excluded", link).await
    }
}

/// In-memory history store for tests and dry runs
#[derive(Default)]
pub struct MemoryHistory {
    posted: Mutex<HashSet<String>>,
    excluded: Mutex<HashSet<String>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed the posted set, for tests exercising the dedup gate
    pub fn with_posted(links: &[&str]) -> Self {
        let store = Self::new();
        {
            let mut posted = store.posted.lock().unwrap();
            for link in links {
                posted.insert(link.to_string());
            }
        }
        store
    }

    /// Pre-seed the excluded set
    pub fn with_excluded(links: &[&str]) -> Self {
        let store = Self::new();
        {
            let mut excluded = store.excluded.lock().unwrap();
            for link in links {
                excluded.insert(link.to_string());
            }
        }
        store
    }

    pub fn excluded_count(&self) -> usize {
        self.excluded.lock().unwrap().len()
    }

    pub fn posted_count(&self) -> usize {
        self.posted.lock().unwrap().len()
    }
}

#[async_trait]
impl History for MemoryHistory {
    async fn has_posted(&self, link: &str) -> Result<bool> {
        Ok(self.posted.lock().unwrap().contains(link))
    }

    async fn record_posted(&self, link: &str) -> Result<()> {
        self.posted.lock().unwrap().insert(link.to_string());
        Ok(())
    }

    async fn is_excluded(&self, link: &str) -> Result<bool> {
        Ok(self.excluded.lock().unwrap().contains(link))
    }

    async fn record_excluded(&self, link: &str) -> Result<()> {
        self.excluded.lock().unwrap().insert(link.to_string());
        Ok(())
    }
}
