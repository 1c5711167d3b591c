//! Periodic polling for one active view.
//!
//! Each tick fetches every kind the view needs concurrently and, once all of
//! them have settled, commits the whole cycle to the [`SyncStore`] in one step.
//! Stopping bumps a generation counter under the store's write fence, so a
//! cycle that completes after `stop` is discarded instead of applied.

use crate::core::config::PollingConfig;
use crate::core::market::{DataKind, MarketDataSource};
use crate::store::{CycleOutcome, SyncStore};
use std::fmt::Display;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    /// Prices and sentiment side by side.
    Split,
    Prices,
    Sentiment,
}

impl View {
    pub fn kinds(&self) -> &'static [DataKind] {
        match self {
            View::Split => &[
                DataKind::Prices,
                DataKind::Opportunities,
                DataKind::Sentiments,
                DataKind::Alerts,
            ],
            View::Prices => &[DataKind::Prices, DataKind::Opportunities],
            View::Sentiment => &[DataKind::Sentiments, DataKind::Alerts],
        }
    }

    pub fn period(&self, polling: &PollingConfig) -> Duration {
        let secs = match self {
            View::Split => polling.split_secs,
            View::Prices => polling.prices_secs,
            View::Sentiment => polling.sentiment_secs,
        };
        Duration::from_secs(secs.max(1))
    }

    pub fn includes(&self, kind: DataKind) -> bool {
        self.kinds().contains(&kind)
    }
}

impl Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                View::Split => "split",
                View::Prices => "prices",
                View::Sentiment => "sentiment",
            }
        )
    }
}

impl FromStr for View {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "split" => Ok(View::Split),
            "prices" => Ok(View::Prices),
            "sentiment" => Ok(View::Sentiment),
            _ => Err(anyhow::anyhow!("Invalid view: {}", s)),
        }
    }
}

async fn when<T>(enabled: bool, fetch: impl Future<Output = T>) -> Option<T> {
    if enabled { Some(fetch.await) } else { None }
}

#[derive(Clone)]
struct PollCycle {
    view: View,
    source: Arc<dyn MarketDataSource>,
    store: Arc<SyncStore>,
    generation: Arc<AtomicU64>,
}

impl PollCycle {
    async fn fetch(&self) -> CycleOutcome {
        let view = self.view;
        let source = self.source.as_ref();

        let (prices, opportunities, sentiments, alerts) = futures::join!(
            when(view.includes(DataKind::Prices), source.current_prices()),
            when(
                view.includes(DataKind::Opportunities),
                source.price_opportunities()
            ),
            when(view.includes(DataKind::Sentiments), source.all_sentiment()),
            when(view.includes(DataKind::Alerts), source.sentiment_alerts()),
        );

        CycleOutcome {
            prices,
            opportunities,
            sentiments,
            alerts,
        }
    }

    /// Runs one cycle and commits it if `generation` is still current.
    async fn run(&self, generation: u64) -> bool {
        let outcome = self.fetch().await;
        if let Some(message) = outcome.error_message() {
            warn!(view = %self.view, "{}", message);
        }
        self.store.commit(outcome, || {
            self.generation.load(Ordering::SeqCst) == generation
        })
    }

    async fn poll_loop(
        self,
        period: Duration,
        generation: u64,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }
            if self.generation.load(Ordering::SeqCst) != generation {
                break;
            }
            debug!(view = %self.view, "Poll cycle started");
            let applied = self.run(generation).await;
            debug!(view = %self.view, applied, "Poll cycle finished");
        }

        info!(view = %self.view, "Poll loop exited");
    }
}

/// Owns the timer for one view. Create one per active view.
pub struct PollScheduler {
    cycle: PollCycle,
    period: Duration,
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl PollScheduler {
    pub fn new(
        view: View,
        period: Duration,
        source: Arc<dyn MarketDataSource>,
        store: Arc<SyncStore>,
    ) -> Self {
        Self {
            cycle: PollCycle {
                view,
                source,
                store,
                generation: Arc::new(AtomicU64::new(0)),
            },
            period,
            shutdown: None,
            task: None,
        }
    }

    pub fn for_view(
        view: View,
        polling: &PollingConfig,
        source: Arc<dyn MarketDataSource>,
        store: Arc<SyncStore>,
    ) -> Self {
        Self::new(view, view.period(polling), source, store)
    }

    pub fn view(&self) -> View {
        self.cycle.view
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_some()
    }

    /// Starts polling; the first cycle runs immediately. Must be called inside a
    /// Tokio runtime. Does nothing if already running.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        let generation = self.cycle.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.shutdown = Some(shutdown_tx);

        info!(
            view = %self.cycle.view,
            period_ms = self.period.as_millis() as u64,
            generation,
            "Starting poll scheduler"
        );
        let cycle = self.cycle.clone();
        let period = self.period;
        self.task = Some(tokio::spawn(cycle.poll_loop(period, generation, shutdown_rx)));
    }

    /// Stops the timer. A cycle already in flight may finish, but its result is
    /// discarded. Returns the loop's handle so callers can wait for it to settle.
    pub fn stop(&mut self) -> Option<JoinHandle<()>> {
        let shutdown = self.shutdown.take()?;

        let generation = &self.cycle.generation;
        self.cycle
            .store
            .fence(|| generation.fetch_add(1, Ordering::SeqCst));
        let _ = shutdown.send(true);

        info!(view = %self.cycle.view, "Poll scheduler stopped");
        self.task.take()
    }

    /// Runs a single cycle outside the timer and reports whether it was applied.
    pub async fn poll_once(&self) -> bool {
        let generation = self.cycle.generation.load(Ordering::SeqCst);
        self.cycle.run(generation).await
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
