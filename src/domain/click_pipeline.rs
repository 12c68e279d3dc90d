//! Asynchronous click ingestion.
//!
//! The redirect path hands each [`ClickEvent`] to [`ClickPipeline::enqueue`],
//! which never waits: when the bounded queue is full the event is dropped.
//! A fixed pool of workers drains the shared queue, accumulates private
//! batches and flushes them when a batch fills up or the flush interval
//! elapses, whichever comes first.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::click_event::ClickEvent;
use crate::domain::repositories::{AnalyticsRepository, UrlRepository};

/// Shortest flush period a worker ticker accepts.
pub const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(1);

/// Tuning knobs for a [`ClickPipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub worker_count: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub queue_capacity: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            worker_count: 4,
            batch_size: 100,
            flush_interval: Duration::from_secs(5),
            queue_capacity: 10_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Stopped,
    Running,
}

/// Point-in-time view of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub queue_size: usize,
    pub queue_capacity: usize,
    pub worker_count: usize,
    pub active_workers: usize,
    pub batch_size: usize,
    pub flush_interval_ms: u64,
    pub is_running: bool,
}

struct Lifecycle {
    state: PipelineState,
    shutdown: CancellationToken,
    workers: Vec<JoinHandle<()>>,
    /// Set once the queue has been closed by `stop`; the pipeline cannot run again.
    closed: bool,
}

/// Persists batches: raw events first, then one counter increment per stored event.
#[derive(Clone)]
struct BatchProcessor {
    url_repository: Arc<dyn UrlRepository>,
    analytics_repository: Arc<dyn AnalyticsRepository>,
}

impl BatchProcessor {
    async fn process_batch(&self, batch: &[ClickEvent], source: &str) {
        if batch.is_empty() {
            return;
        }

        let started = Instant::now();
        let mut persisted: HashMap<&str, usize> = HashMap::new();
        let mut failed = 0usize;

        for event in batch {
            match self.analytics_repository.save_click_event(event).await {
                Ok(()) => *persisted.entry(event.short_code.as_str()).or_default() += 1,
                Err(e) => {
                    failed += 1;
                    error!(
                        short_code = %event.short_code,
                        "Failed to save click event: {}", e
                    );
                }
            }
        }

        for (short_code, clicks) in &persisted {
            for _ in 0..*clicks {
                if let Err(e) = self.url_repository.increment_click_count(short_code).await {
                    error!(short_code = %short_code, "Failed to increment click count: {}", e);
                }
            }
        }

        let succeeded = batch.len() - failed;
        metrics::counter!("click_events_persisted_total").increment(succeeded as u64);
        metrics::counter!("click_events_failed_total").increment(failed as u64);

        info!(
            source,
            total = batch.len(),
            succeeded,
            failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Processed click batch"
        );
    }
}

/// Bounded click queue drained by a fixed pool of batching workers.
///
/// Lifecycle: `Stopped -> start() -> Running -> stop() -> Stopped`. Calling
/// `start` while running or `stop` while stopped does nothing. `stop` waits,
/// without timeout, for every worker to flush and exit, then closes the queue;
/// a stopped pipeline cannot be started again.
pub struct ClickPipeline {
    sender: mpsc::Sender<ClickEvent>,
    receiver: Arc<Mutex<mpsc::Receiver<ClickEvent>>>,
    processor: BatchProcessor,
    settings: PipelineSettings,
    active_workers: Arc<AtomicUsize>,
    running: AtomicBool,
    lifecycle: Mutex<Lifecycle>,
}

impl ClickPipeline {
    /// Creates a stopped pipeline.
    ///
    /// Worker count and batch size are raised to at least 1, the flush
    /// interval to at least [`MIN_FLUSH_INTERVAL`].
    ///
    /// # Panics
    ///
    /// Panics if `queue_capacity` is zero.
    pub fn new(
        url_repository: Arc<dyn UrlRepository>,
        analytics_repository: Arc<dyn AnalyticsRepository>,
        settings: PipelineSettings,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(settings.queue_capacity);

        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            processor: BatchProcessor {
                url_repository,
                analytics_repository,
            },
            settings: PipelineSettings {
                worker_count: settings.worker_count.max(1),
                batch_size: settings.batch_size.max(1),
                flush_interval: settings.flush_interval.max(MIN_FLUSH_INTERVAL),
                ..settings
            },
            active_workers: Arc::new(AtomicUsize::new(0)),
            running: AtomicBool::new(false),
            lifecycle: Mutex::new(Lifecycle {
                state: PipelineState::Stopped,
                shutdown: CancellationToken::new(),
                workers: Vec::new(),
                closed: false,
            }),
        }
    }

    /// Offers an event to the queue without waiting.
    ///
    /// Returns `false` when the event was dropped because the queue is full or closed.
    pub fn enqueue(&self, event: ClickEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => {
                metrics::counter!("click_events_enqueued_total").increment(1);
                true
            }
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(short_code = %event.short_code, "Click queue full, dropping event");
                metrics::counter!("click_events_dropped_total", "reason" => "queue_full")
                    .increment(1);
                false
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                warn!(short_code = %event.short_code, "Click queue closed, dropping event");
                metrics::counter!("click_events_dropped_total", "reason" => "closed").increment(1);
                false
            }
        }
    }

    /// Spawns the worker pool. Must be called from within a Tokio runtime.
    pub async fn start(&self) {
        let mut lifecycle = self.lifecycle.lock().await;

        if lifecycle.state == PipelineState::Running {
            debug!("Click pipeline already running");
            return;
        }
        if lifecycle.closed {
            warn!("Click pipeline queue is closed, refusing to start");
            return;
        }

        info!(
            workers = self.settings.worker_count,
            batch_size = self.settings.batch_size,
            flush_interval_ms = self.settings.flush_interval.as_millis() as u64,
            "Starting click workers"
        );

        let shutdown = CancellationToken::new();
        lifecycle.workers = (0..self.settings.worker_count)
            .map(|id| {
                let worker = Worker {
                    id,
                    receiver: Arc::clone(&self.receiver),
                    processor: self.processor.clone(),
                    shutdown: shutdown.clone(),
                    batch_size: self.settings.batch_size,
                    flush_interval: self.settings.flush_interval,
                    active_workers: Arc::clone(&self.active_workers),
                };
                tokio::spawn(worker.run())
            })
            .collect();
        lifecycle.shutdown = shutdown;
        lifecycle.state = PipelineState::Running;
        self.running.store(true, Ordering::SeqCst);
    }

    /// Signals every worker, waits for all of them to flush and exit, then
    /// closes the queue and persists anything enqueued in the meantime.
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;

        if lifecycle.state == PipelineState::Stopped {
            debug!("Click pipeline already stopped");
            return;
        }

        info!("Stopping click workers");
        lifecycle.shutdown.cancel();

        for handle in lifecycle.workers.drain(..) {
            if let Err(e) = handle.await {
                error!("Click worker terminated abnormally: {}", e);
            }
        }

        let stragglers = {
            let mut receiver = self.receiver.lock().await;
            receiver.close();
            let mut rest = Vec::new();
            while let Ok(event) = receiver.try_recv() {
                rest.push(event);
            }
            rest
        };
        for chunk in stragglers.chunks(self.settings.batch_size) {
            self.processor.process_batch(chunk, "shutdown").await;
        }

        lifecycle.closed = true;
        lifecycle.state = PipelineState::Stopped;
        self.running.store(false, Ordering::SeqCst);
        info!("Click workers stopped");
    }

    /// Number of events waiting in the queue.
    pub fn queue_size(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            queue_size: self.queue_size(),
            queue_capacity: self.sender.max_capacity(),
            worker_count: self.settings.worker_count,
            active_workers: self.active_workers.load(Ordering::SeqCst),
            batch_size: self.settings.batch_size,
            flush_interval_ms: self.settings.flush_interval.as_millis() as u64,
            is_running: self.is_running(),
        }
    }
}

/// Counts a worker as active for as long as it lives, including when it
/// unwinds from a panic.
struct ActiveWorker(Arc<AtomicUsize>);

impl ActiveWorker {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for ActiveWorker {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct Worker {
    id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<ClickEvent>>>,
    processor: BatchProcessor,
    shutdown: CancellationToken,
    batch_size: usize,
    flush_interval: Duration,
    active_workers: Arc<AtomicUsize>,
}

impl Worker {
    async fn run(self) {
        let _active = ActiveWorker::enter(&self.active_workers);
        debug!(worker = self.id, "Click worker started");

        let source = format!("worker-{}", self.id);
        let mut batch = Vec::with_capacity(self.batch_size);
        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + self.flush_interval,
            self.flush_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    self.drain_into(&mut batch, &source).await;
                    break;
                }

                event = self.next_event() => match event {
                    Some(event) => {
                        batch.push(event);
                        if batch.len() >= self.batch_size {
                            self.processor.process_batch(&batch, &source).await;
                            batch.clear();
                        }
                    }
                    None => break,
                },

                _ = ticker.tick() => {
                    if !batch.is_empty() {
                        self.processor.process_batch(&batch, &source).await;
                        batch.clear();
                    }
                }
            }
        }

        self.processor.process_batch(&batch, &source).await;

        debug!(worker = self.id, "Click worker stopped");
    }

    async fn next_event(&self) -> Option<ClickEvent> {
        self.receiver.lock().await.recv().await
    }

    /// Moves whatever is still queued into the batch, flushing full batches on the way.
    async fn drain_into(&self, batch: &mut Vec<ClickEvent>, source: &str) {
        loop {
            let next = self.receiver.lock().await.try_recv();
            let Ok(event) = next else {
                return;
            };

            batch.push(event);
            if batch.len() >= self.batch_size {
                self.processor.process_batch(batch, source).await;
                batch.clear();
            }
        }
    }
}
