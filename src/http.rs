//! HTTP utilities for embedding API providers

use std::time::Duration;

use reqwest::{Client, Response};

/// Create a reqwest client with connection pooling and sensible defaults
///
/// One command runs per process, so the pool stays small.
pub fn create_client() -> anyhow::Result<Client> {
    let client = Client::builder()
        .pool_max_idle_per_host(2)
        .pool_idle_timeout(Duration::from_secs(30))
        .timeout(Duration::from_secs(120))
        .connect_timeout(Duration::from_secs(10))
        .build()?;
    Ok(client)
}

/// Check HTTP response status and return detailed error if not successful
pub async fn check_response(response: Response, service_name: &str) -> anyhow::Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    anyhow::bail!("{} API error {}: {}", service_name, status, error_detail(body))
}

/// Pull the human-readable message out of a JSON error body
fn error_detail(body: String) -> String {
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => json
            .get("error")
            .and_then(|e| e.get("message").and_then(|m| m.as_str()).or_else(|| e.as_str()))
            .or_else(|| json.get("message").and_then(|m| m.as_str()))
            .map(|s| s.to_string())
            .unwrap_or(body),
        Err(_) => body,
    }
}
