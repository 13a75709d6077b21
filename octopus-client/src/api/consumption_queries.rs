use serde::Deserialize;
use time::{format_description::well_known::Rfc3339, macros::datetime, Duration, OffsetDateTime, UtcOffset};

use super::OctopusClient;
use crate::{
    domain::{ConsumptionReading, MeterPoint},
    ClientError,
};

/// One page of the consumption listing. Pagination fields are ignored; only
/// the newest interval is ever requested.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsumptionPage {
    pub results: Vec<IntervalConsumption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntervalConsumption {
    pub consumption: f64,
    pub interval_start: String,
    pub interval_end: String,
}

pub(crate) fn consumption_url(base_url: &str, point: &MeterPoint) -> String {
    format!(
        "{base_url}/{}/{}/meters/{}/consumption/",
        point.point_type.path_segment(),
        point.point,
        point.meter
    )
}

/// Fetch the newest consumption interval for a single meter.
pub(crate) async fn fetch_latest(
    client: &OctopusClient,
    point: &MeterPoint,
) -> Result<Option<ConsumptionReading>, ClientError> {
    let url = consumption_url(client.base_url(), point);
    tracing::debug!(%url, point_type = %point.point_type, "requesting latest consumption");

    let res = client
        .http()
        .get(&url)
        .basic_auth(client.api_key(), None::<&str>)
        .query(&[("page_size", "1")])
        .send()
        .await?;

    let status = res.status();
    if !status.is_success() {
        let body = match res.text().await {
            Ok(body) => truncate_body(body),
            Err(e) => {
                tracing::warn!(error = %e, %status, "failed to read upstream error body");
                String::new()
            }
        };
        return Err(ClientError::Status { status, body });
    }

    let body = res.bytes().await?;
    let page: ConsumptionPage = serde_json::from_slice(&body)?;
    reading_from_page(point, page)
}

/// Reshape the first result of a page into a reading.
///
/// Rules:
/// - an empty page yields `None`;
/// - the timestamp is the interval midpoint, truncated to whole seconds, in UTC;
/// - the interval must not run backwards and its midpoint must fall within
///   [2000-01-01, 2100-01-01].
pub fn reading_from_page(
    point: &MeterPoint,
    page: ConsumptionPage,
) -> Result<Option<ConsumptionReading>, ClientError> {
    let Some(first) = page.results.into_iter().next() else {
        return Ok(None);
    };

    let start = parse_timestamp(&first.interval_start)?;
    let end = parse_timestamp(&first.interval_end)?;

    let interval = end - start;
    if interval.is_negative() {
        return Err(ClientError::InvalidInterval(format!(
            "interval_end {} is before interval_start {}",
            first.interval_end, first.interval_start
        )));
    }

    let ts = (start + Duration::seconds(interval.whole_seconds() / 2)).to_offset(UtcOffset::UTC);

    let min_ts = datetime!(2000-01-01 00:00:00 UTC);
    let max_ts = datetime!(2100-01-01 00:00:00 UTC);
    if ts < min_ts || ts > max_ts {
        return Err(ClientError::InvalidInterval(format!(
            "interval midpoint {ts} out of allowed range"
        )));
    }

    Ok(Some(ConsumptionReading {
        ts,
        consumption_kwh: first.consumption,
        interval_secs: interval.as_seconds_f64(),
        point_type: point.point_type,
        point: point.point.clone(),
        meter: point.meter.clone(),
    }))
}

/// Upstream error bodies end up in logs and scrape responses; keep them short.
pub(crate) const MAX_ERROR_BODY_BYTES: usize = 512;

fn truncate_body(mut body: String) -> String {
    if body.len() <= MAX_ERROR_BODY_BYTES {
        return body;
    }
    let mut cut = MAX_ERROR_BODY_BYTES;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    body.truncate(cut);
    body.push_str("...");
    body
}

fn parse_timestamp(value: &str) -> Result<OffsetDateTime, ClientError> {
    OffsetDateTime::parse(value.trim(), &Rfc3339).map_err(|source| ClientError::Timestamp {
        value: value.to_string(),
        source,
    })
}
