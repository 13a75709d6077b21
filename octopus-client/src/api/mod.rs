pub mod client;
pub mod consumption_queries;

pub use client::{OctopusClient, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use consumption_queries::{reading_from_page, ConsumptionPage, IntervalConsumption};

use crate::{
    domain::{ConsumptionReading, MeterPoint},
    ClientError,
};

/// Anything that can produce the newest consumption reading for a meter.
///
/// `Ok(None)` means the upstream has no readings for the meter yet.
#[async_trait::async_trait]
pub trait ConsumptionSource: Send + Sync {
    async fn latest_consumption(
        &self,
        point: &MeterPoint,
    ) -> Result<Option<ConsumptionReading>, ClientError>;
}
