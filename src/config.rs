use crate::geo_api;
use crate::scheduler::{FailurePolicy, DEFAULT_LIVE_INTERVAL, DEFAULT_METER_INTERVAL};
use crate::writers::datadog;
use anyhow::{anyhow, Context};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct GeoConfig {
    pub username: String,
    pub password: String,
    pub api_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatadogConfig {
    pub api_key: String,
    pub base_url: String,
    pub hostname: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub geo: GeoConfig,
    /// `None` when no API key is configured, which disables the sink
    pub datadog: Option<DatadogConfig>,
    pub live_interval: Duration,
    pub meter_interval: Duration,
    pub failure_policy: FailurePolicy,
    pub readings_to_stdout: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, treating empty values as unset
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| get(key).ok_or_else(|| anyhow!("{key} must be set"));

        let geo = GeoConfig {
            username: require("GEO_USERNAME")?,
            password: require("GEO_PASSWORD")?,
            api_url: get("GEO_API_URL").unwrap_or_else(|| geo_api::DEFAULT_BASE_URL.to_string()),
        };

        let datadog = get("DD_API_KEY").map(|api_key| {
            let site = get("DD_SITE").unwrap_or_else(|| datadog::DEFAULT_SITE.to_string());
            DatadogConfig {
                api_key,
                base_url: get("DD_API_URL").unwrap_or_else(|| datadog::site_url(&site)),
                hostname: get("DD_HOSTNAME").unwrap_or_else(|| "localhost".to_string()),
            }
        });

        let live_interval = parse_interval(get("LIVE_INTERVAL_SECS"), DEFAULT_LIVE_INTERVAL)
            .context("invalid LIVE_INTERVAL_SECS")?;
        let meter_interval = parse_interval(get("METER_INTERVAL_SECS"), DEFAULT_METER_INTERVAL)
            .context("invalid METER_INTERVAL_SECS")?;

        let failure_policy = match get("WRITER_FAILURE_POLICY") {
            Some(policy) => policy
                .parse()
                .map_err(|e: String| anyhow!(e))
                .context("invalid WRITER_FAILURE_POLICY")?,
            None => FailurePolicy::default(),
        };

        Ok(Self {
            geo,
            datadog,
            live_interval,
            meter_interval,
            failure_policy,
            readings_to_stdout: parse_bool_safe(get("READINGS_STDOUT")),
        })
    }
}

fn parse_interval(val: Option<String>, default: Duration) -> anyhow::Result<Duration> {
    let Some(val) = val else {
        return Ok(default);
    };
    let secs: u64 = val
        .trim()
        .parse()
        .with_context(|| format!("`{val}` is not a number of seconds"))?;
    if secs == 0 {
        anyhow::bail!("interval must be at least one second");
    }
    Ok(Duration::from_secs(secs))
}

/// Safely parses a boolean from an optional string, defaulting to false
fn parse_bool_safe(val: Option<String>) -> bool {
    val.unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
        .parse()
        .unwrap_or_default()
}
