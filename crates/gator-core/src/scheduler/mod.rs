mod ingest;
mod interval;
mod service;

pub use ingest::{ingest_feed, IngestReport};
pub use interval::parse_interval;
pub use service::{PollScheduler, SchedulerEvent};
