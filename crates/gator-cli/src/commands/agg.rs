use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::info;

use gator_core::feed::FeedFetcher;
use gator_core::scheduler::{parse_interval, PollScheduler};
use gator_core::storage::Database;

/// Collect feeds until interrupted
pub async fn run(db: Database, time_between_reqs: &str) -> Result<()> {
    let interval = parse_interval(time_between_reqs)?;

    let scheduler = PollScheduler::new(Arc::new(db), Arc::new(FeedFetcher::new()?), interval)?;

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    println!("Collecting feeds every {:?}. Press Ctrl+C to stop.", interval);

    // Blocks until shutdown; a collection in progress is allowed to finish
    scheduler.run(shutdown_rx).await;

    println!("Stopped collecting feeds.");
    Ok(())
}
