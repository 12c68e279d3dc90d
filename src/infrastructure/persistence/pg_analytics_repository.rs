//! PostgreSQL implementation of the analytics repository.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::click_event::ClickEvent;
use crate::domain::entities::{DailyClicks, RefererStats};
use crate::domain::repositories::AnalyticsRepository;
use crate::error::AppError;

/// PostgreSQL repository for raw click events and their aggregates.
pub struct PgAnalyticsRepository {
    pool: Arc<PgPool>,
}

impl PgAnalyticsRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnalyticsRepository for PgAnalyticsRepository {
    async fn save_click_event(&self, event: &ClickEvent) -> Result<(), AppError> {
        // Resolves url_id in the same statement; a code deleted since the
        // redirect still has its row, so only unknown codes insert nothing.
        let result = sqlx::query(
            r#"
            INSERT INTO click_events (url_id, short_code, ip_address, user_agent, referer, created_at)
            SELECT id, short_code, $2, $3, $4, $5
            FROM urls
            WHERE short_code = $1
            "#,
        )
        .bind(&event.short_code)
        .bind(&event.ip_address)
        .bind(&event.user_agent)
        .bind(&event.referer)
        .bind(event.created_at)
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(
                "Short URL not found",
                json!({ "code": event.short_code }),
            ));
        }

        Ok(())
    }

    async fn clicks_by_date(
        &self,
        short_code: &str,
        days: u32,
    ) -> Result<Vec<DailyClicks>, AppError> {
        let since = Utc::now() - Duration::days(i64::from(days));

        let rows = sqlx::query_as::<_, DailyClicks>(
            r#"
            SELECT to_char((created_at AT TIME ZONE 'UTC')::date, 'YYYY-MM-DD') AS date,
                   COUNT(*) AS count
            FROM click_events
            WHERE short_code = $1 AND created_at >= $2
            GROUP BY 1
            ORDER BY 1 DESC
            "#,
        )
        .bind(short_code)
        .bind(since)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows)
    }

    async fn top_referers(
        &self,
        short_code: &str,
        limit: u32,
    ) -> Result<Vec<RefererStats>, AppError> {
        let rows = sqlx::query_as::<_, RefererStats>(
            r#"
            SELECT referer, COUNT(*) AS count
            FROM click_events
            WHERE short_code = $1 AND referer <> ''
            GROUP BY referer
            ORDER BY count DESC, referer
            LIMIT $2
            "#,
        )
        .bind(short_code)
        .bind(i64::from(limit))
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows)
    }
}
