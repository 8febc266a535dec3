//! Application state for the Countersign API

use anyhow::Result;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub struct AppState {
    pub db: SqlitePool,
    /// Per-document transition locks. Held across the whole transition,
    /// including composition during final approval, so readers of a
    /// document never observe a half-applied state.
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl AppState {
    pub async fn new() -> Result<Self> {
        let db_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
            let data_dir = dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("countersign-api");
            std::fs::create_dir_all(&data_dir).ok();
            format!("sqlite:{}/countersign.db?mode=rwc", data_dir.display())
        });

        tracing::info!("Connecting to database: {}", db_url);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        Self::run_migrations(&pool).await?;

        Ok(Self {
            db: pool,
            locks: Mutex::new(HashMap::new()),
        })
    }

    #[cfg(test)]
    pub async fn new_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::run_migrations(&pool).await?;
        Ok(Self {
            db: pool,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// The serialization lock for one document.
    ///
    /// Entries no longer referenced by any in-flight transition are pruned
    /// on each lookup, so the map tracks active documents rather than every
    /// document ever touched.
    pub fn lock_for(&self, document_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(document_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    #[cfg(test)]
    fn lock_count(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                author_id TEXT NOT NULL,
                status TEXT NOT NULL,
                content_json TEXT NOT NULL,
                content_hash TEXT,
                placements_json TEXT NOT NULL DEFAULT '[]',
                chain_json TEXT NOT NULL,
                log_json TEXT NOT NULL,
                next_actor_id TEXT,
                final_artifact_ref TEXT,
                version INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        // Queue lookups: who is waiting on me, what of mine bounced
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_documents_next_actor ON documents(next_actor_id)
            "#,
        )
        .execute(pool)
        .await?;
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_documents_author_status ON documents(author_id, status)
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS blobs (
                id TEXT PRIMARY KEY,
                data BLOB NOT NULL,
                content_type TEXT NOT NULL DEFAULT 'application/octet-stream',
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        tracing::info!("Migrations complete");
        Ok(())
    }
}


/// Get platform-specific data directory
mod dirs {
    use std::path::PathBuf;

    pub fn data_dir() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(target_os = "windows")]
        {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }
}
