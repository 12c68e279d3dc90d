//! Shared application state injected into every handler.

use std::sync::Arc;
use std::time::Duration;

use crate::application::services::{CodeAllocator, UrlService};
use crate::domain::click_pipeline::{ClickPipeline, PipelineSettings};
use crate::domain::repositories::{AnalyticsRepository, UrlRepository};
use crate::generator::CodeSource;
use crate::infrastructure::cache::CacheService;

#[derive(Clone)]
pub struct AppState {
    pub url_service: Arc<UrlService>,
    pub url_repository: Arc<dyn UrlRepository>,
    pub cache: Arc<dyn CacheService>,
    pub click_pipeline: Arc<ClickPipeline>,
}

/// Storage and generation backends the state is assembled from.
pub struct Backends {
    pub url_repository: Arc<dyn UrlRepository>,
    pub analytics_repository: Arc<dyn AnalyticsRepository>,
    pub cache: Arc<dyn CacheService>,
    pub code_source: Arc<dyn CodeSource>,
}

impl AppState {
    /// Wires services and a stopped click pipeline on top of `backends`.
    ///
    /// The caller owns the pipeline lifecycle: call
    /// [`ClickPipeline::start`] before serving and [`ClickPipeline::stop`]
    /// after the server has shut down.
    pub fn new(
        backends: Backends,
        pipeline_settings: PipelineSettings,
        base_url: impl Into<String>,
        cache_ttl: Duration,
    ) -> Self {
        let Backends {
            url_repository,
            analytics_repository,
            cache,
            code_source,
        } = backends;

        let click_pipeline = Arc::new(ClickPipeline::new(
            Arc::clone(&url_repository),
            Arc::clone(&analytics_repository),
            pipeline_settings,
        ));

        let allocator = CodeAllocator::new(code_source, Arc::clone(&url_repository));

        let url_service = Arc::new(UrlService::new(
            Arc::clone(&url_repository),
            analytics_repository,
            Arc::clone(&cache),
            allocator,
            Arc::clone(&click_pipeline),
            base_url,
            cache_ttl,
        ));

        Self {
            url_service,
            url_repository,
            cache,
            click_pipeline,
        }
    }
}
