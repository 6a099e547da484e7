//! API client for communicating with the energy monitor

use anyhow::{Context, Result};
use monitor_lib::{
    ingest::BatchReport,
    storage::DashboardSummary,
    Alert, Device, HealthResponse, ReadingInput, SensorReading,
};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// API client for the energy monitor service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request with query parameters
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let mut url = self.base_url.join(path).context("Invalid path")?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn devices(&self) -> Result<Vec<Device>> {
        self.get("api/devices", &[]).await
    }

    pub async fn ingest(&self, readings: &[ReadingInput]) -> Result<BatchReport> {
        self.post("api/sensor-ingest", &readings).await
    }

    pub async fn readings(&self, device_id: Option<&str>, limit: Option<usize>) -> Result<Vec<SensorReading>> {
        let mut query = Vec::new();
        if let Some(device_id) = device_id {
            query.push(("device_id", device_id.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        self.get("api/metrics", &query).await
    }

    pub async fn alerts(&self, device_id: Option<&str>, unacknowledged: bool) -> Result<Vec<Alert>> {
        let mut query = Vec::new();
        if let Some(device_id) = device_id {
            query.push(("device_id", device_id.to_string()));
        }
        if unacknowledged {
            query.push(("acknowledged", "false".to_string()));
        }
        self.get("api/alerts", &query).await
    }

    /// Acknowledge an alert; `Ok(false)` when the service does not know it
    pub async fn acknowledge(&self, alert_id: Uuid) -> Result<bool> {
        let url = self
            .base_url
            .join("api/alerts/acknowledge")
            .context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(&AcknowledgeRequest { alert_id })
            .send()
            .await
            .context("Failed to send request")?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => {
                let body = response.text().await.unwrap_or_default();
                anyhow::bail!("API error ({}): {}", status, body)
            }
        }
    }

    pub async fn summary(&self) -> Result<DashboardSummary> {
        self.get("api/dashboard/summary", &[]).await
    }

    pub async fn start_simulation(&self) -> Result<MessageResponse> {
        self.post("api/simulation/start", &serde_json::Value::Null).await
    }

    pub async fn stop_simulation(&self) -> Result<MessageResponse> {
        self.post("api/simulation/stop", &serde_json::Value::Null).await
    }

    pub async fn simulation_status(&self) -> Result<SimulationStatus> {
        self.get("api/simulation/status", &[]).await
    }

    /// Component health. An unhealthy service answers 503 with the same
    /// body, so that status is not treated as an error here.
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = self.base_url.join("healthz").context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::SERVICE_UNAVAILABLE {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }
}

// API request and response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcknowledgeRequest {
    pub alert_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationStatus {
    pub running: bool,
    pub ticks: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_alerts_query_parameters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/alerts")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("device_id".into(), "dev-1".into()),
                Matcher::UrlEncoded("acknowledged".into(), "false".into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let alerts = client.alerts(Some("dev-1"), true).await.unwrap();

        assert!(alerts.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_ingest_returns_batch_report() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/sensor-ingest")
            .match_header("content-type", "application/json")
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"received":2,"accepted":1,"failures":[{"index":1,"device_id":"dev-2","reason":"invalid reading: missing metric vibration"}]}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let readings = vec![ReadingInput::default(), ReadingInput::default()];
        let report = client.ingest(&readings).await.unwrap();

        assert_eq!(report.received, 2);
        assert_eq!(report.accepted, 1);
        assert_eq!(report.failures[0].device_id, "dev-2");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_acknowledge_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/alerts/acknowledge")
            .with_status(404)
            .with_body(r#"{"detail":"Alert not found"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        assert!(!client.acknowledge(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn test_health_accepts_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/healthz")
            .with_status(503)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status":"unhealthy","components":{"simulator":{"status":"unhealthy","message":"simulation task panicked","last_check_timestamp":0}}}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let health = client.health().await.unwrap();
        assert_eq!(health.components.len(), 1);
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/dashboard/summary")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.summary().await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
