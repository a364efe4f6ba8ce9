use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};

use crate::Result;
use crate::models::Listing;
use crate::store::ResultStore;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS listings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    address TEXT NOT NULL,
    source TEXT NOT NULL,
    first_seen DATETIME NOT NULL,
    last_seen DATETIME NOT NULL,
    active BOOLEAN NOT NULL,
    UNIQUE(address, source)
)
"#;

const UPSERT: &str = r#"
INSERT INTO listings (address, source, first_seen, last_seen, active)
VALUES (?, ?, ?, ?, TRUE)
ON CONFLICT(address, source)
DO UPDATE SET last_seen = excluded.last_seen, active = TRUE
"#;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open(path: &str) -> Result<Self> {
        if let Some(dir) = Path::new(path).parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.bootstrap().await?;
        info!(path, "sqlite store opened");
        Ok(store)
    }

    /// Private in-memory database. Every call gets a fresh one, which
    /// is what the tests want.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // A second connection would see a different empty database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.bootstrap().await?;
        Ok(store)
    }

    async fn bootstrap(&self) -> Result<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Full rows for a source, most recently seen first. Detection
    /// only needs the addresses; this is for inspection and tests.
    pub async fn active_listings(&self, source: &str) -> Result<Vec<Listing>> {
        let listings = sqlx::query_as::<_, Listing>(
            "SELECT id, address, source, first_seen, last_seen, active
             FROM listings
             WHERE source = ? AND active = TRUE
             ORDER BY last_seen DESC, id DESC",
        )
        .bind(source)
        .fetch_all(&self.pool)
        .await?;
        Ok(listings)
    }
}

fn deactivate_missing<'a>(source: &'a str, current: &'a [String]) -> QueryBuilder<'a, Sqlite> {
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new("UPDATE listings SET active = FALSE WHERE source = ");
    qb.push_bind(source);
    qb.push(" AND active = TRUE AND address NOT IN (");
    let mut separated = qb.separated(", ");
    for address in current {
        separated.push_bind(address.as_str());
    }
    separated.push_unseparated(")");
    qb
}

#[async_trait]
impl ResultStore for SqliteStore {
    async fn get_known(&self, source: &str) -> Result<HashSet<String>> {
        let addresses = sqlx::query_scalar::<_, String>(
            "SELECT address FROM listings WHERE source = ? AND active = TRUE",
        )
        .bind(source)
        .fetch_all(&self.pool)
        .await?;
        Ok(addresses.into_iter().collect())
    }

    async fn set_known(&self, source: &str, current: &[String]) -> Result<()> {
        if current.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        for address in current {
            sqlx::query(UPSERT)
                .bind(address.as_str())
                .bind(source)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }

        let mut qb = deactivate_missing(source, current);
        qb.build().execute(&mut *tx).await?;

        tx.commit().await?;
        debug!(source, count = current.len(), "baseline replaced");
        Ok(())
    }

    async fn upsert_observation(&self, source: &str, address: &str) -> Result<()> {
        let now = Utc::now();
        sqlx::query(UPSERT)
            .bind(address)
            .bind(source)
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_inactive_except(&self, source: &str, current: &[String]) -> Result<()> {
        if current.is_empty() {
            return Ok(());
        }
        let mut qb = deactivate_missing(source, current);
        qb.build().execute(&self.pool).await?;
        Ok(())
    }
}
