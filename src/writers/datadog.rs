use super::ReadingWriter;
use crate::error::EnergyError;
use crate::reading::Reading;
use async_trait::async_trait;
use serde_derive::Serialize;

pub const DEFAULT_SITE: &str = "datadoghq.com";

/// Base URL of the public API for a Datadog site, e.g. `datadoghq.eu`
pub fn site_url(site: &str) -> String {
    format!("https://api.{site}")
}

/// Intake type for gauges in the v2 series API
const GAUGE: u8 = 3;

/// Submits readings as gauge series to the Datadog v2 metrics intake
pub struct DatadogWriter {
    api_key: String,
    base_url: String,
    hostname: String,
    client: reqwest::Client,
}

impl DatadogWriter {
    pub fn new(api_key: impl Into<String>, site: &str, hostname: impl Into<String>) -> Self {
        Self::with_base_url(api_key, site_url(site), hostname)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            hostname: hostname.into(),
            client: reqwest::Client::new(),
        }
    }

    fn metric_series(&self, reading: &Reading, timestamp: i64) -> MetricSeries {
        MetricSeries {
            metric: format!("energy.{}.{}", reading.reading_type, reading.commodity),
            metric_type: GAUGE,
            points: vec![MetricPoint {
                timestamp,
                value: reading.value,
            }],
            resources: vec![MetricResource {
                name: self.hostname.clone(),
                resource_type: "host".to_string(),
            }],
        }
    }

    async fn submit(&self, payload: &MetricPayload) -> Result<(), reqwest::Error> {
        self.client
            .post(format!("{}/api/v2/series", self.base_url))
            .header("DD-API-KEY", &self.api_key)
            .json(payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl ReadingWriter for DatadogWriter {
    fn name(&self) -> &str {
        "datadog"
    }

    async fn write_readings(&self, readings: &[Reading]) -> Result<(), EnergyError> {
        if readings.is_empty() {
            return Ok(());
        }

        let timestamp = chrono::Utc::now().timestamp();
        let payload = MetricPayload {
            series: readings
                .iter()
                .map(|r| self.metric_series(r, timestamp))
                .collect(),
        };

        if tracing::enabled!(tracing::Level::DEBUG) {
            match serde_json::to_string(&payload.series) {
                Ok(json) => tracing::debug!(series = %json, "submitting datadog series"),
                Err(e) => tracing::debug!(error = %e, "could not render datadog series"),
            }
        }

        self.submit(&payload)
            .await
            .map_err(|e| EnergyError::writer(self.name(), e))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricPayload {
    pub series: Vec<MetricSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSeries {
    pub metric: String,
    #[serde(rename = "type")]
    pub metric_type: u8,
    pub points: Vec<MetricPoint>,
    pub resources: Vec<MetricResource>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricPoint {
    pub timestamp: i64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricResource {
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
}
