use std::sync::Arc;

use octopus_client::{
    domain::{ConsumptionReading, MeterPoint, PointType},
    ClientError, ConsumptionSource,
};

#[derive(thiserror::Error, Debug)]
#[error("failed to fetch {point_type} consumption for meter {meter}: {source}")]
pub struct ScrapeError {
    pub point_type: PointType,
    pub meter: String,
    #[source]
    pub source: ClientError,
}

/// Fetches the newest reading for every configured meter on demand.
pub struct ConsumptionCollector {
    source: Arc<dyn ConsumptionSource>,
    meters: Vec<MeterPoint>,
}

impl ConsumptionCollector {
    pub fn new(source: Arc<dyn ConsumptionSource>, meters: Vec<MeterPoint>) -> Self {
        Self { source, meters }
    }

    /// Query each meter in turn. Meters without any intervals contribute no
    /// reading; the first upstream failure aborts the scrape.
    pub async fn collect(&self) -> Result<Vec<ConsumptionReading>, ScrapeError> {
        let mut readings = Vec::with_capacity(self.meters.len());

        for point in &self.meters {
            let reading = self
                .source
                .latest_consumption(point)
                .await
                .map_err(|source| ScrapeError {
                    point_type: point.point_type,
                    meter: point.meter.clone(),
                    source,
                })?;

            match reading {
                Some(r) => {
                    tracing::debug!(
                        point_type = %r.point_type,
                        consumption_kwh = r.consumption_kwh,
                        interval_secs = r.interval_secs,
                        "collected consumption"
                    );
                    readings.push(r);
                }
                None => {
                    tracing::debug!(
                        point_type = %point.point_type,
                        meter = %point.meter,
                        "no consumption intervals available"
                    );
                }
            }
        }

        Ok(readings)
    }
}
