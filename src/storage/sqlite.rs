use crate::models::{HostnameCount, UrlRecord};
use crate::storage::{map_sqlx_error, unix_now, Storage, StorageError, StorageResult};
use anyhow::Context;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Hostname expression shared by the stats queries, kept in step with
/// `models::hostname_of`.
const HOSTNAME_QUERY: &str = r#"
    SELECT
        CASE WHEN instr(rest, '/') > 0 THEN substr(rest, 1, instr(rest, '/') - 1) ELSE rest END
            AS hostname
    FROM (
        SELECT
            CASE
                WHEN substr(target_url, 1, 7) = 'http://' THEN substr(target_url, 8)
                WHEN substr(target_url, 1, 8) = 'https://' THEN substr(target_url, 9)
                ELSE target_url
            END AS rest
        FROM urls
    )
"#;

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid SQLite url '{database_url}'"))?
            .create_if_missing(true);

        // Every connection to an in-memory database opens a fresh database,
        // so the pool must hold on to exactly one.
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        let pool = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(max_connections)
                .connect_with(options)
                .await?
        };

        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn init(&self) -> StorageResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS urls (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                short_id TEXT NOT NULL UNIQUE,
                target_url TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                access_count INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn create(&self, short_id: &str, target_url: &str) -> StorageResult<UrlRecord> {
        let now = unix_now()?;

        let result = sqlx::query(
            r#"
            INSERT INTO urls (short_id, target_url, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(short_id) DO NOTHING
            "#,
        )
        .bind(short_id)
        .bind(target_url)
        .bind(now)
        .bind(now)
        .execute(self.pool.as_ref())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

        Ok(UrlRecord {
            short_id: short_id.to_string(),
            target_url: target_url.to_string(),
            created_at: now,
            updated_at: now,
            access_count: 0,
        })
    }

    async fn get(&self, short_id: &str) -> StorageResult<Option<UrlRecord>> {
        let url = sqlx::query_as::<_, UrlRecord>(
            r#"
            SELECT short_id, target_url, created_at, updated_at, access_count
            FROM urls
            WHERE short_id = ?
            "#,
        )
        .bind(short_id)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(map_sqlx_error)?;

        Ok(url)
    }

    async fn list(&self) -> StorageResult<Vec<UrlRecord>> {
        let urls = sqlx::query_as::<_, UrlRecord>(
            r#"
            SELECT short_id, target_url, created_at, updated_at, access_count
            FROM urls
            ORDER BY id
            "#,
        )
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(map_sqlx_error)?;

        Ok(urls)
    }

    async fn update(&self, short_id: &str, target_url: &str) -> StorageResult<u64> {
        let now = unix_now()?;

        let result = sqlx::query(
            r#"
            UPDATE urls
            SET target_url = ?, updated_at = ?
            WHERE short_id = ?
            "#,
        )
        .bind(target_url)
        .bind(now)
        .bind(short_id)
        .execute(self.pool.as_ref())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, short_id: &str) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM urls WHERE short_id = ?")
            .bind(short_id)
            .execute(self.pool.as_ref())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_access_count(&self, short_id: &str) -> StorageResult<()> {
        sqlx::query(
            r#"
            UPDATE urls
            SET access_count = access_count + 1
            WHERE short_id = ?
            "#,
        )
        .bind(short_id)
        .execute(self.pool.as_ref())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn stats_by_hostname(
        &self,
        hostname: Option<&str>,
    ) -> StorageResult<Vec<HostnameCount>> {
        let stats = match hostname {
            Some(hostname) => {
                let sql = format!(
                    "SELECT hostname, COUNT(*) AS count FROM ({HOSTNAME_QUERY}) \
                     WHERE hostname = ? GROUP BY hostname ORDER BY hostname"
                );
                sqlx::query_as::<_, HostnameCount>(&sql)
                    .bind(hostname)
                    .fetch_all(self.pool.as_ref())
                    .await
            }
            None => {
                let sql = format!(
                    "SELECT hostname, COUNT(*) AS count FROM ({HOSTNAME_QUERY}) \
                     GROUP BY hostname ORDER BY hostname"
                );
                sqlx::query_as::<_, HostnameCount>(&sql)
                    .fetch_all(self.pool.as_ref())
                    .await
            }
        }
        .map_err(map_sqlx_error)?;

        Ok(stats)
    }
}
