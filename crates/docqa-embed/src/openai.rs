//! OpenAI `/embeddings` client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use docqa_core::config::EmbeddingSettings;
use docqa_core::error::provider_message;
use docqa_core::traits::Embedder;
use docqa_core::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Input limit of the hosted embedding models, in tokens.
const MAX_INPUT_TOKENS: usize = 8191;

pub struct OpenAiEmbedder {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dim: usize,
    id: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Output size of the models OpenAI documents; others fall back to `embedding.dim`.
pub fn model_dim(model: &str) -> Option<usize> {
    match model {
        "text-embedding-ada-002" | "text-embedding-3-small" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        _ => None,
    }
}

impl OpenAiEmbedder {
    pub fn new(client: Client, settings: &EmbeddingSettings, api_key: String) -> Self {
        let base_url = settings
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let dim = model_dim(&settings.model).unwrap_or(settings.dim);
        Self {
            client,
            base_url,
            api_key,
            model: settings.model.clone(),
            dim,
            id: format!("openai:{}:d{}", settings.model, dim),
        }
    }

    /// Reads the API key from `settings.api_key_env`; a missing key is a configuration error.
    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::config(format!("{} is not set", settings.api_key_env)))?;
        Ok(Self::new(Client::new(), settings, api_key))
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        MAX_INPUT_TOKENS
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/embeddings", self.base_url);
        tracing::debug!(model = %self.model, inputs = texts.len(), "requesting embeddings");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingsRequest { model: &self.model, input: texts })
            .send()
            .await
            .map_err(|e| Error::embedding(format!("embeddings request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::embedding(format!("embeddings failed: HTTP {} - {}", status, provider_message(&body))));
        }

        let mut parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("failed to parse embeddings: {}", e)))?;
        if parsed.data.len() != texts.len() {
            return Err(Error::embedding(format!(
                "sent {} inputs, received {} embeddings",
                texts.len(),
                parsed.data.len()
            )));
        }
        parsed.data.sort_by_key(|d| d.index);
        if let Some(bad) = parsed.data.iter().find(|d| d.embedding.len() != self.dim) {
            return Err(Error::embedding(format!("expected {} dims, got {}", self.dim, bad.embedding.len())));
        }
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}
