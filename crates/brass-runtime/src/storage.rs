//! SQLite storage for links and user accounts.
//!
//! ```text
//! links ──(triggers)──▶ links_fts   full-text search for the "search" command
//! users                              bcrypt hashes plus owner/admin flags
//! ```
//!
//! The schema lives in `migrations/` and is applied on [`Storage::open`].

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use thiserror::Error;
use tracing::{debug, info, warn};

use brass_framework::{LinkRecord, LinkStore};

static MEMDB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("user already exists: {0}")]
    UserExists(String),

    #[error("background task failed: {0}")]
    Task(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// A stored link as returned by search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredLink {
    pub channel: String,
    pub nick: String,
    pub link: String,
    pub title: Option<String>,
    pub posted_at: DateTime<Utc>,
}

impl StoredLink {
    /// One-line rendering for chat.
    pub fn line(&self) -> String {
        let date = self.posted_at.format("%Y-%m-%d");
        match &self.title {
            Some(title) => format!("{} - {} ({}, {})", self.link, title, self.nick, date),
            None => format!("{} ({}, {})", self.link, self.nick, date),
        }
    }
}

/// A user account, without its password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub nick: String,
    pub owner: bool,
    pub admin: bool,
}

/// Database handle with connection pool.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
    hash_cost: u32,
}

impl Storage {
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Opens (creating if needed) the database at `path` and applies migrations.
    ///
    /// `:memory:` opens a private in-memory database.
    pub async fn open(path: &str) -> StorageResult<Self> {
        let pool = if path == ":memory:" {
            let id = MEMDB_COUNTER.fetch_add(1, Ordering::Relaxed);
            let uri = format!(
                "file:brass-memdb-{}-{}?mode=memory&cache=shared",
                std::process::id(),
                id
            );
            let options = SqliteConnectOptions::new()
                .filename(&uri)
                .shared_cache(true)
                .create_if_missing(true);

            // The database lives only as long as one connection does.
            SqlitePoolOptions::new()
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .connect_with(options)
                .await?
        } else {
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
                && let Err(e) = std::fs::create_dir_all(parent)
            {
                warn!(path = %parent.display(), error = %e, "Failed to create database directory");
            }

            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true);

            let pool = SqlitePoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .connect_with(options)
                .await?;

            sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
            pool
        };

        info!(path, "Database connected");

        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!("Database migrations checked/applied");

        Ok(Self {
            pool,
            hash_cost: bcrypt::DEFAULT_COST,
        })
    }

    /// Sets the bcrypt cost used by [`Storage::add_user`].
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    /// Underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // =========================================================================
    // Links
    // =========================================================================

    /// Inserts one link sighting and returns its row id.
    pub async fn insert_link(&self, record: &LinkRecord) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO links (transport, channel, nick, identity, link, message, title, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.transport)
        .bind(&record.channel)
        .bind(&record.nick)
        .bind(&record.identity)
        .bind(&record.link)
        .bind(&record.message)
        .bind(&record.title)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Full-text search over stored links, newest first.
    ///
    /// Every whitespace-separated term must match; terms are quoted so user
    /// input cannot inject FTS query syntax.
    pub async fn search_links(&self, terms: &str, limit: u32) -> StorageResult<Vec<StoredLink>> {
        let query = fts_query(terms);
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, (String, String, String, Option<String>, i64)>(
            r#"
            SELECT l.channel, l.nick, l.link, l.title, l.created_at
            FROM links_fts
            JOIN links l ON l.id = links_fts.rowid
            WHERE links_fts MATCH ?
            ORDER BY l.created_at DESC, l.id DESC
            LIMIT ?
            "#,
        )
        .bind(&query)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(channel, nick, link, title, created_at)| StoredLink {
                channel,
                nick,
                link,
                title,
                posted_at: DateTime::from_timestamp(created_at, 0).unwrap_or_default(),
            })
            .collect())
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Creates an account with a bcrypt-hashed password.
    pub async fn add_user(
        &self,
        nick: &str,
        password: &str,
        owner: bool,
        admin: bool,
    ) -> StorageResult<User> {
        let password = password.to_string();
        let cost = self.hash_cost;
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))??;

        sqlx::query(
            r#"
            INSERT INTO users (nick, password_hash, owner, admin, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(nick)
        .bind(&hash)
        .bind(owner)
        .bind(admin)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StorageError::UserExists(nick.to_string());
            }
            StorageError::from(e)
        })?;

        info!(nick, owner, admin, "User added");
        Ok(User {
            nick: nick.to_string(),
            owner,
            admin,
        })
    }

    /// Checks a password. Returns the account on success, `None` on an
    /// unknown nick or a wrong password.
    pub async fn verify_user(&self, nick: &str, password: &str) -> StorageResult<Option<User>> {
        let row = sqlx::query_as::<_, (String, String, bool, bool)>(
            r#"
            SELECT nick, password_hash, owner, admin
            FROM users
            WHERE nick = ? COLLATE NOCASE
            "#,
        )
        .bind(nick)
        .fetch_optional(&self.pool)
        .await?;

        let Some((nick, hash, owner, admin)) = row else {
            return Ok(None);
        };

        let password = password.to_string();
        let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))??;

        Ok(valid.then_some(User { nick, owner, admin }))
    }
}

#[async_trait]
impl LinkStore for Storage {
    async fn save_link(&self, record: &LinkRecord) -> anyhow::Result<()> {
        self.insert_link(record).await?;
        Ok(())
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("connections", &self.pool.size())
            .finish()
    }
}

/// Quotes each term as an FTS5 string so the terms are ANDed literally.
fn fts_query(terms: &str) -> String {
    terms
        .split_whitespace()
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" ")
}
