//! Prometheus text exposition for consumption readings.
//!
//! The `metrics` facade cannot attach per-sample timestamps, so the
//! consumption family is built as a raw `MetricFamily` and encoded with the
//! `prometheus` text encoder. The recorder output is appended after it by the
//! metrics server.

use octopus_client::domain::ConsumptionReading;
use prometheus::{
    proto::{Gauge, LabelPair, Metric, MetricFamily, MetricType},
    Encoder, TextEncoder,
};

pub const CONSUMPTION_METRIC: &str = "octopus_consumption_kwh";
pub const CONSUMPTION_HELP: &str = "Energy consumption in kWh";

/// One gauge sample per reading, stamped with the interval midpoint.
pub fn consumption_family(readings: &[ConsumptionReading]) -> MetricFamily {
    let mut family = MetricFamily::default();
    family.set_name(CONSUMPTION_METRIC.to_string());
    family.set_help(CONSUMPTION_HELP.to_string());
    family.set_field_type(MetricType::GAUGE);

    for r in readings {
        let mut metric = Metric::default();
        for (name, value) in [
            ("type", r.point_type.as_str().to_string()),
            ("point", r.point.clone()),
            ("meter", r.meter.clone()),
            ("interval", r.interval_secs.to_string()),
        ] {
            let mut pair = LabelPair::default();
            pair.set_name(name.to_string());
            pair.set_value(value);
            metric.mut_label().push(pair);
        }

        let mut gauge = Gauge::default();
        gauge.set_value(r.consumption_kwh);
        metric.set_gauge(gauge);
        metric.set_timestamp_ms((r.ts.unix_timestamp_nanos() / 1_000_000) as i64);

        family.mut_metric().push(metric);
    }

    family
}

/// Render readings as one gauge family, or nothing at all when empty.
pub fn render_consumption(readings: &[ConsumptionReading]) -> prometheus::Result<String> {
    if readings.is_empty() {
        return Ok(String::new());
    }

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&[consumption_family(readings)], &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
