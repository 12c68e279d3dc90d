#![allow(dead_code)]

use axum::extract::ConnectInfo;
use axum_test::TestServer;
use chrono::{Duration as ChronoDuration, Utc};
use clickstream_shortener::domain::click_pipeline::PipelineSettings;
use clickstream_shortener::domain::entities::{NewShortUrl, ShortUrl};
use clickstream_shortener::domain::repositories::UrlRepository;
use clickstream_shortener::generator::ShortCodeGenerator;
use clickstream_shortener::infrastructure::cache::InMemoryCache;
use clickstream_shortener::infrastructure::persistence::{
    InMemoryAnalyticsRepository, InMemoryUrlRepository,
};
use clickstream_shortener::routes::app_router;
use clickstream_shortener::state::{AppState, Backends};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::Layer;

pub const BASE_URL: &str = "http://sho.rt";

/// Inserts a peer address so handlers extracting `ConnectInfo` work under axum-test.
#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}

/// Application state over in-memory backends, with handles to inspect them.
pub struct TestApp {
    pub state: AppState,
    pub urls: Arc<InMemoryUrlRepository>,
    pub analytics: Arc<InMemoryAnalyticsRepository>,
    pub cache: Arc<InMemoryCache>,
}

impl TestApp {
    pub fn server(&self) -> TestServer {
        let app = app_router(self.state.clone()).layer(MockConnectInfoLayer);
        TestServer::new(app).unwrap()
    }

    pub async fn insert_url(&self, code: &str, url: &str) -> ShortUrl {
        self.urls
            .create(NewShortUrl {
                short_code: code.to_string(),
                original_url: url.to_string(),
                expires_at: None,
            })
            .await
            .unwrap()
    }

    pub async fn insert_expired_url(&self, code: &str, url: &str) -> ShortUrl {
        self.urls
            .create(NewShortUrl {
                short_code: code.to_string(),
                original_url: url.to_string(),
                expires_at: Some(Utc::now() - ChronoDuration::hours(1)),
            })
            .await
            .unwrap()
    }
}

pub fn test_pipeline_settings() -> PipelineSettings {
    PipelineSettings {
        worker_count: 2,
        batch_size: 10,
        flush_interval: Duration::from_millis(50),
        queue_capacity: 100,
    }
}

pub fn create_test_app() -> TestApp {
    create_test_app_with(test_pipeline_settings())
}

pub fn create_test_app_with(settings: PipelineSettings) -> TestApp {
    let urls = Arc::new(InMemoryUrlRepository::new());
    let analytics = Arc::new(InMemoryAnalyticsRepository::new());
    let cache = Arc::new(InMemoryCache::default());

    let state = AppState::new(
        Backends {
            url_repository: urls.clone(),
            analytics_repository: analytics.clone(),
            cache: cache.clone(),
            code_source: Arc::new(ShortCodeGenerator::new(6)),
        },
        settings,
        BASE_URL,
        Duration::from_secs(3600),
    );

    TestApp {
        state,
        urls,
        analytics,
        cache,
    }
}

/// Polls `condition` every 10ms, panicking after two seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached within 2s");
}
