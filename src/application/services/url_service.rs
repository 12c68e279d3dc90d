//! Short URL creation, resolution, statistics and deletion.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

use super::code_allocator::CodeAllocator;
use crate::domain::click_event::ClickEvent;
use crate::domain::click_pipeline::ClickPipeline;
use crate::domain::entities::{DailyClicks, NewShortUrl, RefererStats, ShortUrl};
use crate::domain::repositories::{AnalyticsRepository, UrlRepository};
use crate::error::AppError;
use crate::generator::is_valid_code;
use crate::infrastructure::cache::CacheService;

const STATS_WINDOW_DAYS: u32 = 7;
const TOP_REFERERS_LIMIT: u32 = 5;

/// Input for [`UrlService::create_short_url`].
#[derive(Debug, Clone, Default)]
pub struct CreateShortUrl {
    pub original_url: String,
    pub custom_code: Option<String>,
    /// Lifetime in hours; must be positive when present.
    pub expires_in_hours: Option<i64>,
}

/// A stored record together with its public short URL.
#[derive(Debug, Clone)]
pub struct CreatedShortUrl {
    pub short_url: String,
    pub record: ShortUrl,
}

#[derive(Debug, Clone, Serialize)]
pub struct UrlStats {
    pub short_code: String,
    pub original_url: String,
    pub total_clicks: i64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub clicks_by_date: Vec<DailyClicks>,
    pub top_referers: Vec<RefererStats>,
}

/// Coordinates storage, cache, code allocation and click recording.
///
/// The cache is strictly best effort: every cache error is logged and the
/// request carries on against the repository.
pub struct UrlService {
    url_repository: Arc<dyn UrlRepository>,
    analytics_repository: Arc<dyn AnalyticsRepository>,
    cache: Arc<dyn CacheService>,
    allocator: CodeAllocator,
    pipeline: Arc<ClickPipeline>,
    base_url: String,
    cache_ttl: Duration,
}

fn cache_key(short_code: &str) -> String {
    format!("url:{}", short_code)
}

/// Accepts absolute `http`/`https` URLs with a host.
fn validate_original_url(input: &str) -> Result<String, AppError> {
    let trimmed = input.trim();
    let parsed = Url::parse(trimmed).map_err(|e| {
        AppError::bad_request("Invalid URL format", json!({ "reason": e.to_string() }))
    })?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(AppError::bad_request(
            "Only HTTP and HTTPS URLs are allowed",
            json!({ "url": trimmed }),
        ));
    }

    Ok(trimmed.to_string())
}

impl UrlService {
    pub fn new(
        url_repository: Arc<dyn UrlRepository>,
        analytics_repository: Arc<dyn AnalyticsRepository>,
        cache: Arc<dyn CacheService>,
        allocator: CodeAllocator,
        pipeline: Arc<ClickPipeline>,
        base_url: impl Into<String>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            url_repository,
            analytics_repository,
            cache,
            allocator,
            pipeline,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache_ttl,
        }
    }

    /// `{base_url}/{short_code}`.
    pub fn short_url(&self, short_code: &str) -> String {
        format!("{}/{}", self.base_url, short_code)
    }

    /// Creates a short URL, or returns the live record already pointing at
    /// the same original URL.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] for a malformed URL, custom code or expiry
    /// - [`AppError::Conflict`] if the custom code is taken
    /// - [`AppError::AllocationExhausted`] if no free code was found
    pub async fn create_short_url(
        &self,
        request: CreateShortUrl,
    ) -> Result<CreatedShortUrl, AppError> {
        let original_url = validate_original_url(&request.original_url)?;

        let expires_at = match request.expires_in_hours {
            None => None,
            Some(hours) if hours > 0 => Some(Utc::now() + chrono::Duration::hours(hours)),
            Some(hours) => {
                return Err(AppError::bad_request(
                    "expires_in must be a positive number of hours",
                    json!({ "expires_in": hours }),
                ));
            }
        };

        if let Some(existing) = self
            .url_repository
            .find_by_original_url(&original_url)
            .await?
        {
            debug!("Reusing {} for {}", existing.short_code, original_url);
            return Ok(CreatedShortUrl {
                short_url: self.short_url(&existing.short_code),
                record: existing,
            });
        }

        let short_code = match request.custom_code.filter(|c| !c.is_empty()) {
            Some(custom) => {
                if !is_valid_code(&custom) {
                    return Err(AppError::bad_request(
                        "Invalid custom code format",
                        json!({ "code": custom }),
                    ));
                }
                if self.url_repository.exists_by_code(&custom).await? {
                    return Err(AppError::conflict(
                        "Custom code already exists",
                        json!({ "code": custom }),
                    ));
                }
                custom
            }
            None => self.allocator.allocate_code().await?,
        };

        let record = self
            .url_repository
            .create(NewShortUrl {
                short_code,
                original_url,
                expires_at,
            })
            .await?;

        self.cache_record(&record).await;

        Ok(CreatedShortUrl {
            short_url: self.short_url(&record.short_code),
            record,
        })
    }

    /// Looks up the original URL for `short_code`, cache first.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if no live record exists
    /// - [`AppError::Gone`] if the record has expired
    pub async fn resolve(&self, short_code: &str) -> Result<String, AppError> {
        match self.cache.get(&cache_key(short_code)).await {
            Ok(Some(original_url)) => return Ok(original_url),
            Ok(None) => {}
            Err(e) => warn!("Cache lookup failed for {}: {}", short_code, e),
        }

        let record = self
            .url_repository
            .find_by_code(short_code)
            .await?
            .ok_or_else(|| {
                AppError::not_found("Short URL not found", json!({ "code": short_code }))
            })?;

        if record.is_expired() {
            return Err(AppError::gone(
                "Short URL has expired",
                json!({ "code": short_code, "expires_at": record.expires_at }),
            ));
        }

        self.cache_record(&record).await;

        Ok(record.original_url)
    }

    /// Queues a click for asynchronous persistence. Never waits.
    pub fn record_click(
        &self,
        short_code: &str,
        ip_address: &str,
        user_agent: &str,
        referer: &str,
    ) {
        self.pipeline
            .enqueue(ClickEvent::new(short_code, ip_address, user_agent, referer));
    }

    /// Record details plus 7-day daily clicks and the top 5 referers.
    ///
    /// Analytics failures are logged and leave the corresponding list empty.
    pub async fn get_stats(&self, short_code: &str) -> Result<UrlStats, AppError> {
        let record = self
            .url_repository
            .find_by_code(short_code)
            .await?
            .ok_or_else(|| {
                AppError::not_found("Short URL not found", json!({ "code": short_code }))
            })?;

        let clicks_by_date = self
            .analytics_repository
            .clicks_by_date(short_code, STATS_WINDOW_DAYS)
            .await
            .unwrap_or_else(|e| {
                warn!("Failed to load clicks by date for {}: {}", short_code, e);
                Vec::new()
            });

        let top_referers = self
            .analytics_repository
            .top_referers(short_code, TOP_REFERERS_LIMIT)
            .await
            .unwrap_or_else(|e| {
                warn!("Failed to load top referers for {}: {}", short_code, e);
                Vec::new()
            });

        Ok(UrlStats {
            short_code: record.short_code,
            original_url: record.original_url,
            total_clicks: record.click_count,
            created_at: record.created_at,
            expires_at: record.expires_at,
            clicks_by_date,
            top_referers,
        })
    }

    /// Deletes the record, then drops its cache entry.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no live record exists.
    pub async fn delete(&self, short_code: &str) -> Result<(), AppError> {
        if !self.url_repository.delete(short_code).await? {
            return Err(AppError::not_found(
                "Short URL not found",
                json!({ "code": short_code }),
            ));
        }

        if let Err(e) = self.cache.delete(&cache_key(short_code)).await {
            warn!("Failed to invalidate cache for {}: {}", short_code, e);
        }

        Ok(())
    }

    /// Caches a live record, never past its expiry.
    async fn cache_record(&self, record: &ShortUrl) {
        let ttl = match record.expires_at {
            Some(expires_at) => match (expires_at - Utc::now()).to_std() {
                Ok(remaining) => remaining.min(self.cache_ttl),
                Err(_) => return,
            },
            None => self.cache_ttl,
        };

        if let Err(e) = self
            .cache
            .set(&cache_key(&record.short_code), &record.original_url, Some(ttl))
            .await
        {
            warn!("Failed to cache {}: {}", record.short_code, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::click_pipeline::PipelineSettings;
    use crate::domain::repositories::{MockAnalyticsRepository, MockUrlRepository};
    use crate::generator::{CodeSource, ShortCodeGenerator};
    use crate::infrastructure::cache::InMemoryCache;

    fn record(code: &str, url: &str) -> ShortUrl {
        let now = Utc::now();
        ShortUrl {
            id: 1,
            short_code: code.to_string(),
            original_url: url.to_string(),
            click_count: 3,
            created_at: now,
            updated_at: now,
            expires_at: None,
        }
    }

    struct Fixture {
        urls: MockUrlRepository,
        analytics: MockAnalyticsRepository,
        cache: Arc<InMemoryCache>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                urls: MockUrlRepository::new(),
                analytics: MockAnalyticsRepository::new(),
                cache: Arc::new(InMemoryCache::default()),
            }
        }

        fn build(self) -> UrlService {
            let urls: Arc<dyn UrlRepository> = Arc::new(self.urls);
            let analytics: Arc<dyn AnalyticsRepository> = Arc::new(self.analytics);
            let source: Arc<dyn CodeSource> = Arc::new(ShortCodeGenerator::new(6));
            let pipeline = Arc::new(ClickPipeline::new(
                Arc::clone(&urls),
                Arc::clone(&analytics),
                PipelineSettings {
                    queue_capacity: 16,
                    ..PipelineSettings::default()
                },
            ));

            UrlService::new(
                Arc::clone(&urls),
                analytics,
                self.cache,
                CodeAllocator::new(source, urls),
                pipeline,
                "http://sho.rt/",
                Duration::from_secs(3600),
            )
        }
    }

    #[tokio::test]
    async fn test_create_generates_code_and_caches() {
        let mut fx = Fixture::new();
        fx.urls
            .expect_find_by_original_url()
            .times(1)
            .returning(|_| Ok(None));
        fx.urls
            .expect_exists_by_code()
            .times(1)
            .returning(|_| Ok(false));
        fx.urls
            .expect_create()
            .withf(|new_url| new_url.short_code.len() == 6 && new_url.expires_at.is_none())
            .times(1)
            .returning(|new_url| Ok(record(&new_url.short_code, &new_url.original_url)));
        let cache = Arc::clone(&fx.cache);
        let service = fx.build();

        let created = service
            .create_short_url(CreateShortUrl {
                original_url: "https://example.com/page".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let code = created.record.short_code.clone();
        assert_eq!(created.short_url, format!("http://sho.rt/{}", code));
        assert_eq!(
            cache.get(&cache_key(&code)).await.unwrap().as_deref(),
            Some("https://example.com/page")
        );
    }

    #[tokio::test]
    async fn test_create_returns_existing_record() {
        let mut fx = Fixture::new();
        fx.urls
            .expect_find_by_original_url()
            .times(1)
            .returning(|url| Ok(Some(record("old1", url))));
        fx.urls.expect_create().times(0);
        let service = fx.build();

        let created = service
            .create_short_url(CreateShortUrl {
                original_url: "https://example.com".to_string(),
                custom_code: Some("mine".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(created.record.short_code, "old1");
        assert_eq!(created.short_url, "http://sho.rt/old1");
    }

    #[tokio::test]
    async fn test_create_rejects_bad_url() {
        let service = Fixture::new().build();

        for url in ["not-a-url", "ftp://example.com/file", "javascript:alert(1)"] {
            let err = service
                .create_short_url(CreateShortUrl {
                    original_url: url.to_string(),
                    ..Default::default()
                })
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation { .. }), "{}", url);
        }
    }

    #[tokio::test]
    async fn test_create_rejects_non_positive_expiry() {
        let service = Fixture::new().build();

        let err = service
            .create_short_url(CreateShortUrl {
                original_url: "https://example.com".to_string(),
                expires_in_hours: Some(0),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_create_sets_expiry() {
        let mut fx = Fixture::new();
        fx.urls
            .expect_find_by_original_url()
            .returning(|_| Ok(None));
        fx.urls.expect_exists_by_code().returning(|_| Ok(false));
        fx.urls
            .expect_create()
            .withf(|new_url| {
                new_url.expires_at.is_some_and(|at| {
                    let minutes = (at - Utc::now()).num_minutes();
                    (23 * 60..=24 * 60).contains(&minutes)
                })
            })
            .times(1)
            .returning(|new_url| {
                let mut stored = record(&new_url.short_code, &new_url.original_url);
                stored.expires_at = new_url.expires_at;
                Ok(stored)
            });
        let service = fx.build();

        let created = service
            .create_short_url(CreateShortUrl {
                original_url: "https://example.com".to_string(),
                expires_in_hours: Some(24),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(created.record.expires_at.is_some());
    }

    #[tokio::test]
    async fn test_custom_code_validation_and_conflict() {
        let mut fx = Fixture::new();
        fx.urls
            .expect_find_by_original_url()
            .returning(|_| Ok(None));
        fx.urls
            .expect_exists_by_code()
            .withf(|code| code == "taken")
            .returning(|_| Ok(true));
        let service = fx.build();

        let invalid = service
            .create_short_url(CreateShortUrl {
                original_url: "https://example.com".to_string(),
                custom_code: Some("l0l0".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(invalid, AppError::Validation { .. }));

        let taken = service
            .create_short_url(CreateShortUrl {
                original_url: "https://example.com".to_string(),
                custom_code: Some("taken".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(taken, AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_resolve_prefers_cache() {
        let mut fx = Fixture::new();
        fx.urls.expect_find_by_code().times(0);
        fx.cache
            .set("url:abcd", "https://cached.example", None)
            .await
            .unwrap();
        let service = fx.build();

        assert_eq!(
            service.resolve("abcd").await.unwrap(),
            "https://cached.example"
        );
    }

    #[tokio::test]
    async fn test_resolve_falls_back_when_cache_down() {
        let mut fx = Fixture::new();
        fx.urls
            .expect_find_by_code()
            .times(1)
            .returning(|code| Ok(Some(record(code, "https://db.example"))));
        fx.cache.set_available(false);
        let service = fx.build();

        assert_eq!(service.resolve("abcd").await.unwrap(), "https://db.example");
    }

    #[tokio::test]
    async fn test_resolve_populates_cache() {
        let mut fx = Fixture::new();
        fx.urls
            .expect_find_by_code()
            .times(1)
            .returning(|code| Ok(Some(record(code, "https://db.example"))));
        let cache = Arc::clone(&fx.cache);
        let service = fx.build();

        service.resolve("abcd").await.unwrap();
        // Second lookup is served from cache; the mock allows only one call.
        service.resolve("abcd").await.unwrap();

        assert!(cache.exists("url:abcd").await.unwrap());
    }

    #[tokio::test]
    async fn test_resolve_missing_and_expired() {
        let mut fx = Fixture::new();
        fx.urls
            .expect_find_by_code()
            .withf(|code| code == "none")
            .returning(|_| Ok(None));
        fx.urls
            .expect_find_by_code()
            .withf(|code| code == "old1")
            .returning(|code| {
                let mut stored = record(code, "https://example.com");
                stored.expires_at = Some(Utc::now() - chrono::Duration::minutes(1));
                Ok(Some(stored))
            });
        let service = fx.build();

        assert!(matches!(
            service.resolve("none").await.unwrap_err(),
            AppError::NotFound { .. }
        ));
        assert!(matches!(
            service.resolve("old1").await.unwrap_err(),
            AppError::Gone { .. }
        ));
    }

    #[tokio::test]
    async fn test_stats_tolerate_analytics_failures() {
        let mut fx = Fixture::new();
        fx.urls
            .expect_find_by_code()
            .returning(|code| Ok(Some(record(code, "https://example.com"))));
        fx.analytics
            .expect_clicks_by_date()
            .withf(|_, days| *days == 7)
            .returning(|_, _| Err(AppError::internal("Database error", json!({}))));
        fx.analytics
            .expect_top_referers()
            .withf(|_, limit| *limit == 5)
            .returning(|_, _| {
                Ok(vec![RefererStats {
                    referer: "https://news.example".to_string(),
                    count: 2,
                }])
            });
        let service = fx.build();

        let stats = service.get_stats("abcd").await.unwrap();

        assert_eq!(stats.total_clicks, 3);
        assert!(stats.clicks_by_date.is_empty());
        assert_eq!(stats.top_referers.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_invalidates_cache() {
        let mut fx = Fixture::new();
        fx.urls
            .expect_delete()
            .withf(|code| code == "abcd")
            .returning(|_| Ok(true));
        fx.urls
            .expect_delete()
            .withf(|code| code == "none")
            .returning(|_| Ok(false));
        fx.cache
            .set("url:abcd", "https://example.com", None)
            .await
            .unwrap();
        let cache = Arc::clone(&fx.cache);
        let service = fx.build();

        service.delete("abcd").await.unwrap();
        assert!(!cache.exists("url:abcd").await.unwrap());

        assert!(matches!(
            service.delete("none").await.unwrap_err(),
            AppError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_record_click_enqueues() {
        let fx = Fixture::new();
        let service = fx.build();

        service.record_click("abcd", "10.0.0.1", "curl/8", "");

        assert_eq!(service.pipeline.queue_size(), 1);
    }
}
