pub mod config;
pub mod error;
pub mod feed;
pub mod scheduler;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
