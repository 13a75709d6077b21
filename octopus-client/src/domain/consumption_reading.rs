use time::OffsetDateTime;

use super::PointType;

/// Most recent consumption interval for one meter, built per scrape.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionReading {
    /// Midpoint of the interval, UTC.
    pub ts: OffsetDateTime,
    pub consumption_kwh: f64,
    /// Interval length in seconds.
    pub interval_secs: f64,
    pub point_type: PointType,
    pub point: String,
    pub meter: String,
}
