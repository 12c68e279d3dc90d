//! PostgreSQL implementation of the short URL repository.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{NewShortUrl, ShortUrl};
use crate::domain::repositories::UrlRepository;
use crate::error::AppError;

const URL_COLUMNS: &str =
    "id, short_code, original_url, click_count, created_at, updated_at, expires_at";

/// PostgreSQL repository for short URL records.
///
/// Deletion is soft: `deleted_at` is set and the row is hidden from lookups,
/// but its short code stays reserved.
pub struct PgUrlRepository {
    pool: Arc<PgPool>,
}

impl PgUrlRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UrlRepository for PgUrlRepository {
    async fn create(&self, new_url: NewShortUrl) -> Result<ShortUrl, AppError> {
        let sql = format!(
            "INSERT INTO urls (short_code, original_url, expires_at) \
             VALUES ($1, $2, $3) \
             RETURNING {URL_COLUMNS}"
        );

        let record = sqlx::query_as::<_, ShortUrl>(&sql)
            .bind(&new_url.short_code)
            .bind(&new_url.original_url)
            .bind(new_url.expires_at)
            .fetch_one(self.pool.as_ref())
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::Conflict { .. } => AppError::conflict(
                    "Short code already exists",
                    json!({ "code": new_url.short_code }),
                ),
                other => other,
            })?;

        Ok(record)
    }

    async fn find_by_code(&self, short_code: &str) -> Result<Option<ShortUrl>, AppError> {
        let sql = format!(
            "SELECT {URL_COLUMNS} FROM urls \
             WHERE short_code = $1 AND deleted_at IS NULL"
        );

        let record = sqlx::query_as::<_, ShortUrl>(&sql)
            .bind(short_code)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(record)
    }

    async fn find_by_original_url(
        &self,
        original_url: &str,
    ) -> Result<Option<ShortUrl>, AppError> {
        let sql = format!(
            "SELECT {URL_COLUMNS} FROM urls \
             WHERE original_url = $1 AND deleted_at IS NULL \
               AND (expires_at IS NULL OR expires_at > NOW()) \
             ORDER BY id DESC \
             LIMIT 1"
        );

        let record = sqlx::query_as::<_, ShortUrl>(&sql)
            .bind(original_url)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(record)
    }

    async fn exists_by_code(&self, short_code: &str) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM urls WHERE short_code = $1)")
                .bind(short_code)
                .fetch_one(self.pool.as_ref())
                .await?;

        Ok(exists)
    }

    async fn increment_click_count(&self, short_code: &str) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE urls SET click_count = click_count + 1, updated_at = $2 \
             WHERE short_code = $1 AND deleted_at IS NULL",
        )
        .bind(short_code)
        .bind(Utc::now())
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(
                "Short URL not found",
                json!({ "code": short_code }),
            ));
        }

        Ok(())
    }

    async fn delete(&self, short_code: &str) -> Result<bool, AppError> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE urls SET deleted_at = $2, updated_at = $2 \
             WHERE short_code = $1 AND deleted_at IS NULL",
        )
        .bind(short_code)
        .bind(now)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }
}
