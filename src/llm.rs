//! Local language-model completion client.
//!
//! Talks to an Ollama instance's `/api/generate` endpoint with streaming
//! disabled and returns the single text completion. No retry: a failed
//! completion surfaces directly, and the caller decides whether to ask
//! again.

use anyhow::{bail, Result};
use std::time::Duration;

use crate::config::LlmConfig;

pub struct LlmClient {
    http: reqwest::Client,
    url: String,
    model: String,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    /// Request one completion for `prompt` under `system` instructions.
    pub async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "system": system,
            "prompt": prompt,
            "stream": false,
        });

        let response = self
            .http
            .post(format!("{}/api/generate", self.url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("LLM API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        json.get("response")
            .and_then(|r| r.as_str())
            .map(|r| r.to_string())
            .ok_or_else(|| anyhow::anyhow!("Invalid LLM response: missing response field"))
    }
}
