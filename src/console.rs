use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::config::ConsoleConfig;
use crate::models::{ApiEnvelope, LeaderboardData, LeaderboardEntry, ReportStats};

pub const LEADERBOARD_PATH: &str = "/leaderboard/monthly";
pub const DEFAULT_STATS_PATH: &str = "/reports/stats";

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to fetch {what}: {message}")]
    Unsuccessful { what: &'static str, message: String },
}

/// Statistics arrive either bare or inside the usual envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum StatsPayload {
    Wrapped(ApiEnvelope<ReportStats>),
    Bare(ReportStats),
}

pub struct ConsoleClient {
    client: Client,
    base_url: String,
}

impl ConsoleClient {
    pub fn new(config: &ConsoleConfig) -> Result<Self, ConsoleError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| ConsoleError::Request {
                url: config.base_url.clone(),
                source,
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_body(&self, path: &str) -> Result<(String, String), ConsoleError> {
        let url = self.url(path);
        tracing::info!(%url, "loading");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| ConsoleError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConsoleError::Status { url, status });
        }

        let body = response.text().await.map_err(|source| ConsoleError::Request {
            url: url.clone(),
            source,
        })?;
        Ok((url, body))
    }

    pub async fn fetch_leaderboard(&self) -> Result<Vec<LeaderboardEntry>, ConsoleError> {
        let (url, body) = self.get_body(LEADERBOARD_PATH).await?;
        let entries = parse_leaderboard(&url, &body)?;
        tracing::info!(entries = entries.len(), "leaderboard loaded");
        Ok(entries)
    }

    pub async fn fetch_stats(&self, path: &str) -> Result<ReportStats, ConsoleError> {
        let (url, body) = self.get_body(path).await?;
        let stats = parse_stats(&url, &body)?;
        tracing::info!(total = stats.total, "report statistics loaded");
        Ok(stats)
    }
}

fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, ConsoleError> {
    serde_json::from_str(body).map_err(|source| ConsoleError::Decode {
        url: url.to_string(),
        source,
    })
}

fn unwrap_envelope<T>(what: &'static str, envelope: ApiEnvelope<T>) -> Result<T, ConsoleError> {
    match envelope {
        ApiEnvelope {
            success: true,
            data: Some(data),
            ..
        } => Ok(data),
        ApiEnvelope {
            success: true,
            data: None,
            ..
        } => Err(ConsoleError::Unsuccessful {
            what,
            message: "response carried no data".to_string(),
        }),
        ApiEnvelope { message, .. } => Err(ConsoleError::Unsuccessful {
            what,
            message: message.unwrap_or_else(|| "backend reported failure".to_string()),
        }),
    }
}

pub fn parse_leaderboard(url: &str, body: &str) -> Result<Vec<LeaderboardEntry>, ConsoleError> {
    let envelope: ApiEnvelope<LeaderboardData> = decode(url, body)?;
    Ok(unwrap_envelope("leaderboard", envelope)?.leaderboard)
}

pub fn parse_stats(url: &str, body: &str) -> Result<ReportStats, ConsoleError> {
    match decode::<StatsPayload>(url, body)? {
        StatsPayload::Wrapped(envelope) => unwrap_envelope("report statistics", envelope),
        StatsPayload::Bare(stats) => Ok(stats),
    }
}
