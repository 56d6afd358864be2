//! ==============================================================================
//! telemetry.rs - optional push of readings to a remote database
//! ==============================================================================
//!
//! purpose:
//!     mirrors the latest successful reading into a firebase realtime
//!     database over its REST api. the database keeps a single node
//!     (`sensor_data` by default) overwritten on every push.
//!
//! relationships:
//!     - used by: main.rs (spawns push_loop when telemetry is enabled)
//!     - uses: service.rs (sample() reads without storing, so pushes never
//!       fill the request-driven history)
//!
//! ==============================================================================

use crate::config::TelemetryConfig;
use crate::domain::Reading;
use crate::service::QueryService;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::time::Duration;

/// body written to the remote node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryPayload {
    pub temperature: f64,
    pub humidity: f64,
    /// unix seconds
    pub timestamp: i64,
}

impl TelemetryPayload {
    /// None for failed readings; those are never pushed
    pub fn from_reading(reading: &Reading) -> Option<Self> {
        let (temperature, humidity) = reading.values()?;
        Some(Self {
            temperature,
            humidity,
            timestamp: reading.timestamp().timestamp(),
        })
    }
}

/// destination for pushed readings
pub struct TelemetrySink {
    client: reqwest::Client,
    url: String,
    auth_token: Option<String>,
}

impl TelemetrySink {
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        if config.database_url.trim().is_empty() {
            return Err(anyhow!("telemetry.database_url is empty"));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            client,
            url: node_url(&config.database_url, &config.path),
            auth_token: config.auth_token.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// overwrite the remote node with this payload
    pub async fn push(&self, payload: &TelemetryPayload) -> Result<()> {
        let mut request = self.client.put(&self.url).json(payload);
        if let Some(token) = &self.auth_token {
            request = request.query(&[("auth", token)]);
        }

        let response = request.send().await.context("push request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("push rejected ({}): {}", status, body.trim()));
        }
        Ok(())
    }
}

/// `{database_url}/{path}.json` with exactly one slash between the parts
fn node_url(database_url: &str, path: &str) -> String {
    format!(
        "{}/{}.json",
        database_url.trim_end_matches('/'),
        path.trim_matches('/')
    )
}

/// read, push, sleep; forever
///
/// readings taken here are not added to the history. failed reads are
/// skipped and push errors are logged, neither stops the loop.
pub async fn push_loop(service: QueryService, sink: TelemetrySink, interval: Duration) {
    tracing::info!("[TELEMETRY] Pushing to {} every {:?}", sink.url(), interval);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let reading = service.sample().await;
        let Some(payload) = TelemetryPayload::from_reading(&reading) else {
            tracing::debug!("[TELEMETRY] Failed to retrieve sensor data, skipping push");
            continue;
        };

        match sink.push(&payload).await {
            Ok(()) => tracing::debug!("[TELEMETRY] Pushed data: {:?}", payload),
            Err(e) => tracing::warn!("[TELEMETRY] ⚠ Push error: {:#}", e),
        }
    }
}
