//! In-process repository implementations.
//!
//! Used by the integration tests and for running the service without a
//! database. Both repositories can be told to fail so error paths are
//! testable end to end.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;

use crate::domain::click_event::ClickEvent;
use crate::domain::entities::{DailyClicks, NewShortUrl, RefererStats, ShortUrl};
use crate::domain::repositories::{AnalyticsRepository, UrlRepository};
use crate::error::AppError;

fn unavailable() -> AppError {
    AppError::internal("Database error", json!({ "reason": "storage unavailable" }))
}

struct StoredUrl {
    record: ShortUrl,
    deleted: bool,
}

#[derive(Default)]
struct UrlTable {
    rows: Vec<StoredUrl>,
    next_id: i64,
}

/// `Vec`-backed [`UrlRepository`] with soft deletes.
#[derive(Default)]
pub struct InMemoryUrlRepository {
    table: Mutex<UrlTable>,
    unavailable: AtomicBool,
}

impl InMemoryUrlRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail with an internal error while `true`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Current click counter of a live record.
    pub fn click_count(&self, short_code: &str) -> Option<i64> {
        self.lock()
            .rows
            .iter()
            .find(|row| !row.deleted && row.record.short_code == short_code)
            .map(|row| row.record.click_count)
    }

    fn lock(&self) -> MutexGuard<'_, UrlTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UrlRepository for InMemoryUrlRepository {
    async fn create(&self, new_url: NewShortUrl) -> Result<ShortUrl, AppError> {
        self.check()?;

        let mut table = self.lock();
        if table
            .rows
            .iter()
            .any(|row| row.record.short_code == new_url.short_code)
        {
            return Err(AppError::conflict(
                "Short code already exists",
                json!({ "code": new_url.short_code }),
            ));
        }

        table.next_id += 1;
        let now = Utc::now();
        let record = ShortUrl {
            id: table.next_id,
            short_code: new_url.short_code,
            original_url: new_url.original_url,
            click_count: 0,
            created_at: now,
            updated_at: now,
            expires_at: new_url.expires_at,
        };
        table.rows.push(StoredUrl {
            record: record.clone(),
            deleted: false,
        });

        Ok(record)
    }

    async fn find_by_code(&self, short_code: &str) -> Result<Option<ShortUrl>, AppError> {
        self.check()?;

        Ok(self
            .lock()
            .rows
            .iter()
            .find(|row| !row.deleted && row.record.short_code == short_code)
            .map(|row| row.record.clone()))
    }

    async fn find_by_original_url(
        &self,
        original_url: &str,
    ) -> Result<Option<ShortUrl>, AppError> {
        self.check()?;

        Ok(self
            .lock()
            .rows
            .iter()
            .rev()
            .find(|row| {
                !row.deleted
                    && !row.record.is_expired()
                    && row.record.original_url == original_url
            })
            .map(|row| row.record.clone()))
    }

    async fn exists_by_code(&self, short_code: &str) -> Result<bool, AppError> {
        self.check()?;

        Ok(self
            .lock()
            .rows
            .iter()
            .any(|row| row.record.short_code == short_code))
    }

    async fn increment_click_count(&self, short_code: &str) -> Result<(), AppError> {
        self.check()?;

        let mut table = self.lock();
        let row = table
            .rows
            .iter_mut()
            .find(|row| !row.deleted && row.record.short_code == short_code)
            .ok_or_else(|| {
                AppError::not_found("Short URL not found", json!({ "code": short_code }))
            })?;

        row.record.click_count += 1;
        row.record.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, short_code: &str) -> Result<bool, AppError> {
        self.check()?;

        let mut table = self.lock();
        match table
            .rows
            .iter_mut()
            .find(|row| !row.deleted && row.record.short_code == short_code)
        {
            Some(row) => {
                row.deleted = true;
                row.record.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.check()
    }
}

/// `Vec`-backed [`AnalyticsRepository`].
///
/// Unlike the Postgres implementation it does not check that the short code
/// exists; use [`InMemoryAnalyticsRepository::fail_for`] to simulate rejected
/// writes.
#[derive(Default)]
pub struct InMemoryAnalyticsRepository {
    events: Mutex<Vec<ClickEvent>>,
    failing_codes: Mutex<HashSet<String>>,
    save_calls: AtomicUsize,
}

impl InMemoryAnalyticsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every save for `short_code` fail.
    pub fn fail_for(&self, short_code: impl Into<String>) {
        self.failing_codes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(short_code.into());
    }

    /// Number of `save_click_event` calls, failed ones included.
    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    /// Events stored so far, in insertion order.
    pub fn saved_events(&self) -> Vec<ClickEvent> {
        self.events_lock().clone()
    }

    fn events_lock(&self) -> MutexGuard<'_, Vec<ClickEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl AnalyticsRepository for InMemoryAnalyticsRepository {
    async fn save_click_event(&self, event: &ClickEvent) -> Result<(), AppError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failing_codes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&event.short_code);
        if failing {
            return Err(unavailable());
        }

        self.events_lock().push(event.clone());
        Ok(())
    }

    async fn clicks_by_date(
        &self,
        short_code: &str,
        days: u32,
    ) -> Result<Vec<DailyClicks>, AppError> {
        let since = Utc::now() - Duration::days(i64::from(days));

        let mut per_day: BTreeMap<String, i64> = BTreeMap::new();
        for event in self
            .events_lock()
            .iter()
            .filter(|e| e.short_code == short_code && e.created_at >= since)
        {
            *per_day
                .entry(event.created_at.format("%Y-%m-%d").to_string())
                .or_default() += 1;
        }

        Ok(per_day
            .into_iter()
            .rev()
            .map(|(date, count)| DailyClicks { date, count })
            .collect())
    }

    async fn top_referers(
        &self,
        short_code: &str,
        limit: u32,
    ) -> Result<Vec<RefererStats>, AppError> {
        let mut counts: HashMap<String, i64> = HashMap::new();
        for event in self
            .events_lock()
            .iter()
            .filter(|e| e.short_code == short_code && !e.referer.is_empty())
        {
            *counts.entry(event.referer.clone()).or_default() += 1;
        }

        let mut stats: Vec<RefererStats> = counts
            .into_iter()
            .map(|(referer, count)| RefererStats { referer, count })
            .collect();
        stats.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.referer.cmp(&b.referer)));
        stats.truncate(limit as usize);

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_url(code: &str, url: &str) -> NewShortUrl {
        NewShortUrl {
            short_code: code.to_string(),
            original_url: url.to_string(),
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = InMemoryUrlRepository::new();

        let created = repo
            .create(new_url("abcd", "https://example.com"))
            .await
            .unwrap();
        assert_eq!(created.id, 1);
        assert_eq!(created.click_count, 0);

        let found = repo.find_by_code("abcd").await.unwrap().unwrap();
        assert_eq!(found, created);

        let by_url = repo
            .find_by_original_url("https://example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_url.short_code, "abcd");
    }

    #[tokio::test]
    async fn test_find_by_original_url_skips_expired() {
        let repo = InMemoryUrlRepository::new();
        repo.create(NewShortUrl {
            expires_at: Some(Utc::now() - Duration::minutes(5)),
            ..new_url("abcd", "https://example.com")
        })
        .await
        .unwrap();

        assert!(
            repo.find_by_original_url("https://example.com")
                .await
                .unwrap()
                .is_none()
        );

        repo.create(new_url("efgh", "https://example.com"))
            .await
            .unwrap();
        let live = repo
            .find_by_original_url("https://example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(live.short_code, "efgh");
    }

    #[tokio::test]
    async fn test_duplicate_code_conflicts() {
        let repo = InMemoryUrlRepository::new();
        repo.create(new_url("abcd", "https://a.com")).await.unwrap();

        let err = repo
            .create(new_url("abcd", "https://b.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_soft_delete_keeps_code_reserved() {
        let repo = InMemoryUrlRepository::new();
        repo.create(new_url("abcd", "https://a.com")).await.unwrap();

        assert!(repo.delete("abcd").await.unwrap());
        assert!(!repo.delete("abcd").await.unwrap());

        assert!(repo.find_by_code("abcd").await.unwrap().is_none());
        assert!(repo.exists_by_code("abcd").await.unwrap());
        assert!(
            repo.create(new_url("abcd", "https://c.com"))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_increment_click_count() {
        let repo = InMemoryUrlRepository::new();
        repo.create(new_url("abcd", "https://a.com")).await.unwrap();

        repo.increment_click_count("abcd").await.unwrap();
        repo.increment_click_count("abcd").await.unwrap();

        assert_eq!(repo.click_count("abcd"), Some(2));
        assert!(matches!(
            repo.increment_click_count("nope").await.unwrap_err(),
            AppError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_unavailable_repository_fails() {
        let repo = InMemoryUrlRepository::new();
        repo.set_unavailable(true);

        assert!(repo.ping().await.is_err());
        assert!(repo.exists_by_code("abcd").await.is_err());
    }

    #[tokio::test]
    async fn test_analytics_aggregates() {
        let repo = InMemoryAnalyticsRepository::new();
        for referer in ["https://a.com", "https://b.com", "https://a.com", ""] {
            repo.save_click_event(&ClickEvent::new("abcd", "1.1.1.1", "ua", referer))
                .await
                .unwrap();
        }
        repo.save_click_event(&ClickEvent::new("zzzz", "1.1.1.1", "ua", "https://a.com"))
            .await
            .unwrap();

        let referers = repo.top_referers("abcd", 5).await.unwrap();
        assert_eq!(
            referers,
            vec![
                RefererStats {
                    referer: "https://a.com".to_string(),
                    count: 2
                },
                RefererStats {
                    referer: "https://b.com".to_string(),
                    count: 1
                },
            ]
        );

        let daily = repo.clicks_by_date("abcd", 7).await.unwrap();
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].count, 4);
        assert_eq!(daily[0].date, Utc::now().format("%Y-%m-%d").to_string());
    }

    #[tokio::test]
    async fn test_analytics_injected_failure() {
        let repo = InMemoryAnalyticsRepository::new();
        repo.fail_for("bad1");

        assert!(
            repo.save_click_event(&ClickEvent::new("bad1", "", "", ""))
                .await
                .is_err()
        );
        assert!(
            repo.save_click_event(&ClickEvent::new("good", "", "", ""))
                .await
                .is_ok()
        );

        assert_eq!(repo.save_calls(), 2);
        assert_eq!(repo.saved_events().len(), 1);
    }
}
