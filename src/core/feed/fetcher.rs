use serde::de::DeserializeOwned;

use crate::core::config::ManagerConfig;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Carries the target URL: this message surfaces in per-provider error
    /// fields, where a bare status code says nothing about which lookup died.
    #[error("request to {url} failed with status {status}")]
    HttpStatus { status: u16, url: String },
}

pub fn build_client(config: &ManagerConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
}

/// Fetches a URL through the configured forwarding proxy and returns the
/// response body as text. Non-2xx statuses are errors carrying the code.
pub async fn fetch_text(
    client: &reqwest::Client,
    config: &ManagerConfig,
    url: &str,
) -> Result<String, FetchError> {
    let response = client.get(config.proxied(url)).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(response.text().await?)
}

/// Fetches a URL through the proxy and deserializes the JSON body.
pub async fn fetch_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    config: &ManagerConfig,
    url: &str,
) -> Result<T, FetchError> {
    let response = client.get(config.proxied(url)).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(response.json::<T>().await?)
}
