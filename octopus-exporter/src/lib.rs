pub mod collector;
pub mod config;
pub mod exposition;
pub mod metrics_server;
pub mod observability;

pub use collector::{ConsumptionCollector, ScrapeError};
pub use config::Settings;
