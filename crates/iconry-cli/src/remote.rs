//! Client for the shared list of codes known to misrender on some devices.

use std::time::Duration;

use anyhow::{Context as _, Result, anyhow};
use reqwest::Client;

pub struct ProblemCodes {
  client: Client,
  url:    String,
}

impl ProblemCodes {
  pub fn new(url: impl Into<String>) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, url: url.into() })
  }

  /// `GET` the published list. Its shape is owned upstream, so it is passed
  /// through untouched.
  pub async fn fetch(&self) -> Result<serde_json::Value> {
    let resp = self
      .client
      .get(&self.url)
      .send()
      .await
      .with_context(|| format!("GET {} failed", self.url))?;

    if !resp.status().is_success() {
      return Err(anyhow!("GET {} → {}", self.url, resp.status()));
    }
    resp.json().await.context("deserialising problem codes")
  }
}
