//! docqa-llm
//!
//! Completion clients behind `docqa_core::traits::LanguageModel`. Requests are
//! sent once; any transport failure, non-2xx status or malformed body becomes
//! `Error::Provider` and is left to the caller.

use std::time::Duration;

use docqa_core::config::{LlmProvider, LlmSettings};
use docqa_core::traits::LanguageModel;
use docqa_core::{Error, Result};

pub mod ollama;
pub mod openai;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

pub fn build_language_model(settings: &LlmSettings) -> Result<Box<dyn LanguageModel>> {
    let client = http_client(settings.timeout_secs)?;
    let model: Box<dyn LanguageModel> = match settings.provider {
        LlmProvider::OpenAi => {
            let api_key = std::env::var(&settings.api_key_env)
                .ok()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| Error::config(format!("{} is not set", settings.api_key_env)))?;
            Box::new(OpenAiClient::new(client, settings, api_key))
        }
        LlmProvider::Ollama => Box::new(OllamaClient::new(client, settings)),
    };
    tracing::info!(provider = model.name(), model = model.model(), "language model configured");
    Ok(model)
}

fn http_client(timeout_secs: Option<u64>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder
        .build()
        .map_err(|e| Error::config(format!("failed to create HTTP client: {}", e)))
}
