//! Headline Poller
//!
//! Drives the fetch → store → retention → signals cycle: once at startup,
//! then every poll interval. Exactly one cycle is in flight at a time and a
//! failed or panicking cycle never stops the loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pulse_core::PulseResult;
use pulse_news::HeadlineSource;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::article_store::ArticleStore;
use crate::config::PulseConfig;
use crate::providers::SignalProviders;
use crate::result_cache::ResultCache;
use crate::signal_processor::{SignalProcessor, SignalReport};

/// Summary of one poll cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Headlines fetched; `None` when the fetch failed
    pub fetched: Option<usize>,
    pub upserted: usize,
    /// Articles removed by retention
    pub expired: usize,
    /// `None` when signal processing could not read the store
    pub signals: Option<SignalReport>,
}

pub struct HeadlinePoller {
    source: Arc<dyn HeadlineSource>,
    store: ArticleStore,
    cache: ResultCache,
    processor: SignalProcessor,
    country: String,
    language: String,
    interval: Duration,
    retention: chrono::Duration,
    stop_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HeadlinePoller {
    pub fn new(
        source: Arc<dyn HeadlineSource>,
        store: ArticleStore,
        cache: ResultCache,
        providers: SignalProviders,
        config: &PulseConfig,
    ) -> Self {
        let (stop_tx, _) = watch::channel(false);
        let processor = SignalProcessor::new(
            store.clone(),
            cache.clone(),
            providers,
            config.breaking_threshold,
        );
        Self {
            source,
            store,
            cache,
            processor,
            country: config.poll_country.clone(),
            language: config.poll_language.clone(),
            interval: config.poll_interval(),
            retention: config.retention(),
            stop_tx,
            task: Mutex::new(None),
        }
    }

    /// Initialize storage, then launch the recurring cycle
    ///
    /// The first cycle starts immediately. Calling `start` on a running
    /// poller does nothing.
    pub fn start(self: &Arc<Self>) -> PulseResult<()> {
        let mut task = self.task.lock();
        if task.is_some() {
            warn!("Headline poller already running");
            return Ok(());
        }

        self.store.init_schema()?;
        self.cache.init_schema()?;

        info!(
            "Starting headline poller: source={}, locale={}/{}, interval={}s, retention={}h",
            self.source.name(),
            self.country,
            self.language,
            self.interval.as_secs(),
            self.retention.num_hours()
        );

        self.stop_tx.send_replace(false);
        let stop_rx = self.stop_tx.subscribe();
        let poller = Arc::clone(self);
        *task = Some(tokio::spawn(async move {
            poller.poll_loop(stop_rx).await;
        }));
        Ok(())
    }

    /// Signal the loop to stop and wait for the in-flight cycle to finish
    pub async fn stop(&self) {
        self.stop_tx.send_replace(true);
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Headline poller task ended abnormally: {}", e);
            }
            info!("Headline poller stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|t| !t.is_finished())
    }

    async fn poll_loop(self: Arc<Self>, mut stop_rx: watch::Receiver<bool>) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = stop_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
            if *stop_rx.borrow() {
                break;
            }

            // Run the cycle as its own task so a panic is contained
            let poller = Arc::clone(&self);
            let cycle = tokio::spawn(async move { poller.run_cycle(Utc::now()).await });
            if let Err(e) = cycle.await {
                error!("Poll cycle aborted: {}", e);
            }
        }

        debug!("Headline poll loop exited");
    }

    /// Run one full cycle at `now`; every failure is logged, never returned
    #[instrument(skip(self))]
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> CycleReport {
        let mut report = CycleReport::default();

        match self
            .source
            .fetch_headlines(&self.country, &self.language)
            .await
        {
            Ok(articles) => {
                report.fetched = Some(articles.len());
                match self.store.upsert_articles(&articles) {
                    Ok(n) => report.upserted = n,
                    Err(e) => error!("Failed to store fetched headlines: {}", e),
                }
            }
            Err(e) => warn!("Headline fetch from {} failed: {}", self.source.name(), e),
        }

        match self.store.delete_fetched_before(now - self.retention) {
            Ok(n) => report.expired = n,
            Err(e) => error!("Retention cleanup failed: {}", e),
        }

        match self.processor.process_all(now).await {
            Ok(signals) => report.signals = Some(signals),
            Err(e) => error!("Signal processing failed: {}", e),
        }

        info!(
            "Poll cycle done: fetched={:?} upserted={} expired={}",
            report.fetched, report.upserted, report.expired
        );
        report
    }
}
