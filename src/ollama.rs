// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Ollama API client and the oracle built on it

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::category::Category;
use crate::oracle::{build_prompt, parse_oracle_response, ClassificationOracle};
use crate::{OrdoError, Result};

/// Ollama API client
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Deserialize)]
struct ModelInfo {
    name: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(120)).build()?;

        // Accept endpoint URLs as well as the server root
        let base_url = base_url
            .trim_end_matches('/')
            .replace("/api/generate", "")
            .replace("/api/chat", "");

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if Ollama is reachable
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.base_url);

        self.client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| {
                OrdoError::Oracle(format!("Cannot connect to Ollama at {}: {}", self.base_url, e))
            })?;

        Ok(())
    }

    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);
        let tags: TagsResponse = self.client.get(&url).send().await?.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Check if a specific model is pulled
    pub async fn model_available(&self, model: &str) -> Result<bool> {
        let models = self.list_models().await?;
        Ok(models
            .iter()
            .any(|m| m.starts_with(model) || m == &format!("{}:latest", model)))
    }

    /// Non-streaming completion constrained to JSON output
    pub async fn generate_json(&self, model: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
            format: Some("json"),
        };

        debug!("Sending request to Ollama: model={}", model);

        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(OrdoError::Oracle(format!(
                "Ollama returned status {}",
                response.status()
            )));
        }

        let result: GenerateResponse = response.json().await?;
        Ok(result.response)
    }
}

/// Classification oracle backed by a local Ollama model
pub struct OllamaOracle {
    client: OllamaClient,
    model: String,
}

impl OllamaOracle {
    pub fn new(url: &str, model: &str) -> Result<Self> {
        Ok(Self {
            client: OllamaClient::new(url)?,
            model: model.to_string(),
        })
    }

    pub fn client(&self) -> &OllamaClient {
        &self.client
    }
}

#[async_trait]
impl ClassificationOracle for OllamaOracle {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn classify_batch(&self, names: &[String]) -> Result<HashMap<String, Category>> {
        let text = self.client.generate_json(&self.model, &build_prompt(names)).await?;
        parse_oracle_response(&text, names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_urls_are_normalized() {
        let client = OllamaClient::new("http://localhost:11434/api/generate/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        let client = OllamaClient::new("http://gpu-box:11434/api/chat").unwrap();
        assert_eq!(client.base_url(), "http://gpu-box:11434");
    }

    #[test]
    fn request_asks_for_json() {
        let request = GenerateRequest {
            model: "llama3.2:3b",
            prompt: "p",
            stream: false,
            format: Some("json"),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["format"], "json");
        assert_eq!(json["stream"], false);
    }

    #[tokio::test]
    async fn unreachable_server_is_an_oracle_error() {
        let oracle = OllamaOracle::new("http://127.0.0.1:9", "llama3.2:3b").unwrap();
        assert!(oracle.client().health_check().await.is_err());
        assert!(oracle.classify_batch(&["a.xyz".to_string()]).await.is_err());
    }
}
