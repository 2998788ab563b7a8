pub mod algorithms;
pub mod config;
pub mod dataset;
pub mod error;
pub mod models;
pub mod utils;

pub use algorithms::{predict, train, ListRankMf, TerminationReason, TrainingReport};
pub use config::{Config, TrainingConfig};
pub use error::{ParseError, TrainError};
pub use models::*;

use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber, writing to stderr.
///
/// `RUST_LOG` wins over `default_level` when it is set.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
