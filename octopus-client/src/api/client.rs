use std::{fmt, time::Duration};

use reqwest::{
    header::{HeaderMap, HeaderValue, USER_AGENT},
    Client, ClientBuilder,
};

use super::{consumption_queries, ConsumptionSource};
use crate::{
    domain::{ConsumptionReading, MeterPoint},
    ClientError,
};

pub const DEFAULT_BASE_URL: &str = "https://api.octopus.energy/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Authenticated client for the Octopus REST API.
///
/// Holds one pooled `reqwest::Client`; clone it freely.
#[derive(Clone)]
pub struct OctopusClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl OctopusClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("octopus-exporter/", env!("CARGO_PKG_VERSION"))),
        );

        let http = ClientBuilder::new()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for OctopusClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OctopusClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[async_trait::async_trait]
impl ConsumptionSource for OctopusClient {
    async fn latest_consumption(
        &self,
        point: &MeterPoint,
    ) -> Result<Option<ConsumptionReading>, ClientError> {
        let started = std::time::Instant::now();
        let res = consumption_queries::fetch_latest(self, point).await;

        let outcome = match &res {
            Ok(Some(_)) => "ok",
            Ok(None) => "empty",
            Err(_) => "error",
        };
        metrics::counter!(
            "octopus_api_requests_total",
            "type" => point.point_type.as_str(),
            "outcome" => outcome
        )
        .increment(1);
        metrics::histogram!(
            "octopus_api_request_duration_seconds",
            "type" => point.point_type.as_str()
        )
        .record(started.elapsed().as_secs_f64());

        res
    }
}
