use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::ingest::{ingest_feed, IngestReport};
use crate::feed::DocumentFetcher;
use crate::storage::FeedStore;
use crate::{Error, Result};

/// Events emitted by the poller after each tick
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// A feed was fetched and its items offered to the store
    FeedPolled(IngestReport),
    /// The selected feed could not be collected this turn
    FeedFailed { feed_name: String, message: String },
    /// No feeds are registered
    NoFeeds,
}

/// Fixed-interval poller: one feed per tick, stalest first
pub struct PollScheduler {
    store: Arc<dyn FeedStore>,
    fetcher: Arc<dyn DocumentFetcher>,
    interval: Duration,
    event_tx: Option<mpsc::UnboundedSender<SchedulerEvent>>,
}

impl PollScheduler {
    /// Create a poller. A zero interval is rejected.
    pub fn new(
        store: Arc<dyn FeedStore>,
        fetcher: Arc<dyn DocumentFetcher>,
        interval: Duration,
    ) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::InvalidInterval {
                input: format!("{:?}", interval),
                reason: "interval must be positive".to_string(),
            });
        }

        Ok(Self {
            store,
            fetcher,
            interval,
            event_tx: None,
        })
    }

    /// Set the event sender for observers
    pub fn with_event_sender(mut self, tx: mpsc::UnboundedSender<SchedulerEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn send_event(&self, event: SchedulerEvent) {
        if let Some(ref tx) = self.event_tx {
            if tx.send(event).is_err() {
                warn!("Failed to send scheduler event: receiver dropped");
            }
        }
    }

    /// Collect the stalest feed once.
    ///
    /// Returns `Ok(None)` when there is nothing to poll.
    pub async fn poll_once(&self) -> Result<Option<IngestReport>> {
        let Some(feed) = self.store.next_feed_to_poll().await? else {
            debug!("No feeds to collect");
            self.send_event(SchedulerEvent::NoFeeds);
            return Ok(None);
        };

        info!("Collecting feed '{}' from {}", feed.name, feed.url);

        match ingest_feed(self.store.as_ref(), self.fetcher.as_ref(), &feed).await {
            Ok(report) => {
                self.send_event(SchedulerEvent::FeedPolled(report.clone()));
                Ok(Some(report))
            }
            Err(e) => {
                self.send_event(SchedulerEvent::FeedFailed {
                    feed_name: feed.name.clone(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Poll until `shutdown` turns true.
    ///
    /// The first tick fires immediately. A tick that comes due while a feed
    /// is being collected is delivered once the collection finishes; further
    /// missed ticks are dropped. Shutdown is only observed between ticks.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("Poller started: one feed every {:?}", self.interval);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;

                result = shutdown.changed() => {
                    // A dropped sender can never signal again
                    if result.is_err() || *shutdown.borrow() {
                        info!("Poller received shutdown signal");
                        break;
                    }
                }

                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }

        info!("Poller stopped");
    }

    async fn tick(&self) {
        match self.poll_once().await {
            Ok(_) => {}
            Err(Error::Fetch(e)) => {
                warn!("Feed fetch failed, retrying on its next turn: {}", e);
            }
            Err(e) => {
                error!("Polling tick failed: {}", e);
            }
        }
    }
}
