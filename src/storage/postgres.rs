use crate::models::{HostnameCount, UrlRecord};
use crate::storage::{map_sqlx_error, unix_now, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

/// Hostname expression shared by the stats queries, kept in step with
/// `models::hostname_of`.
const HOSTNAME_EXPR: &str = "split_part(regexp_replace(target_url, '^https?://', ''), '/', 1)";

pub struct PostgresStorage {
    pool: Arc<PgPool>,
}

impl PostgresStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn init(&self) -> StorageResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS urls (
                id BIGSERIAL PRIMARY KEY,
                short_id TEXT NOT NULL UNIQUE,
                target_url TEXT NOT NULL,
                created_at BIGINT NOT NULL,
                updated_at BIGINT NOT NULL,
                access_count BIGINT NOT NULL DEFAULT 0
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

        let row = sqlx::query_as::<_, UrlRecord>(
            r#"
            INSERT INTO urls (short_id, target_url, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (short_id) DO NOTHING
            RETURNING short_id, target_url, created_at, updated_at, access_count
            "#,
        )
        .bind(short_id)
        .bind(target_url)
        .bind(now)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(map_sqlx_error)?;

        row.ok_or(StorageError::Conflict)
    }

    async fn get(&self, short_id: &str) -> StorageResult<Option<UrlRecord>> {
        let url = sqlx::query_as::<_, UrlRecord>(
            r#"
            SELECT short_id, target_url, created_at, updated_at, access_count
            FROM urls
            WHERE short_id = $1
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
            SET target_url = $1, updated_at = $2
            WHERE short_id = $3
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
        let result = sqlx::query("DELETE FROM urls WHERE short_id = $1")
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
            WHERE short_id = $1
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
        let sql = format!(
            r#"
            SELECT hostname, COUNT(*) AS count
            FROM (SELECT {HOSTNAME_EXPR} AS hostname FROM urls) hosts
            WHERE $1::TEXT IS NULL OR hostname = $1
            GROUP BY hostname
            ORDER BY hostname COLLATE "C"
            "#
        );

        let stats = sqlx::query_as::<_, HostnameCount>(&sql)
            .bind(hostname)
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(map_sqlx_error)?;

        Ok(stats)
    }
}
