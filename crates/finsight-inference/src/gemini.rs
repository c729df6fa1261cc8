//! Google Generative Language API backend implementation.
//!
//! Speaks the REST surface of the Generative Language API: `:embedContent`
//! and `:batchEmbedContents` for embeddings, `:generateContent` for text
//! generation. Authentication is the `x-goog-api-key` header.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use finsight_core::defaults;
use finsight_core::{EmbeddingBackend, Error, GenerationBackend, Result};

use crate::config::InferenceConfig;

/// Native embedding dimensionality for known models.
fn native_dimension_for(model: &str) -> usize {
    match model {
        "text-embedding-004" | "embedding-001" => 768,
        _ => defaults::EMBED_DIMENSION,
    }
}

/// Generative Language API backend.
pub struct GeminiBackend {
    client: Client,
    base_url: String,
    api_key: String,
    embed_model: String,
    gen_model: String,
    dimension: usize,
    max_output_tokens: u32,
    embed_timeout_secs: u64,
}

impl GeminiBackend {
    /// Create a backend with explicit configuration.
    #[allow(clippy::too_many_arguments)]
    pub fn with_config(
        base_url: String,
        api_key: String,
        embed_model: String,
        gen_model: String,
        max_output_tokens: u32,
        embed_timeout_secs: u64,
        gen_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(gen_timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        info!(
            base_url = %base_url,
            embed_model = %embed_model,
            gen_model = %gen_model,
            "Initializing Generative Language backend"
        );

        let dimension = native_dimension_for(&embed_model);

        Self {
            client,
            base_url,
            api_key,
            embed_model,
            gen_model,
            dimension,
            max_output_tokens,
            embed_timeout_secs,
        }
    }

    /// Create from environment variables. Fails without `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let config = InferenceConfig::from_env();
        let api_key = config.api_key.ok_or_else(|| {
            Error::Config("GEMINI_API_KEY is required for the gemini provider".to_string())
        })?;
        Ok(Self::with_config(
            config.base_url,
            api_key,
            config.embed_model,
            config.gen_model,
            config.max_output_tokens,
            config.embed_timeout_secs,
            config.gen_timeout_secs,
        ))
    }

    fn embed_url(&self, action: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, self.embed_model, action)
    }

    fn gen_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url, self.gen_model
        )
    }

    async fn generate_internal(&self, system: &str, prompt: &str) -> Result<String> {
        let start = Instant::now();

        let system_instruction = if system.is_empty() {
            None
        } else {
            Some(Content {
                role: None,
                parts: vec![Part {
                    text: system.to_string(),
                }],
            })
        };

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            system_instruction,
            generation_config: GenerationConfig {
                max_output_tokens: self.max_output_tokens,
                temperature: 0.3,
            },
        };

        debug!(
            model = %self.gen_model,
            prompt_len = prompt.len(),
            "Starting generation"
        );

        let response = self
            .client
            .post(self.gen_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Generation request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!(
                "Generation returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let reply: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Malformed generation response: {}", e)))?;

        let text = reply
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::Inference(
                "Generation returned no candidates".to_string(),
            ));
        }

        debug!(
            model = %self.gen_model,
            duration_ms = start.elapsed().as_millis() as u64,
            response_len = text.len(),
            "Generation complete"
        );

        Ok(text)
    }
}

#[async_trait]
impl EmbeddingBackend for GeminiBackend {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let start = Instant::now();

        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: format!("models/{}", self.embed_model),
                    content: Content {
                        role: None,
                        parts: vec![Part { text: text.clone() }],
                    },
                })
                .collect(),
        };

        let response = self
            .client
            .post(self.embed_url("batchEmbedContents"))
            .header("x-goog-api-key", &self.api_key)
            .timeout(Duration::from_secs(self.embed_timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!(
                "Embedding returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let reply: BatchEmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("Malformed embedding response: {}", e)))?;

        if reply.embeddings.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "Embedding count mismatch: sent {}, received {}",
                texts.len(),
                reply.embeddings.len()
            )));
        }

        debug!(
            model = %self.embed_model,
            input_count = texts.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Embedding batch complete"
        );

        Ok(reply.embeddings.into_iter().map(|e| e.values).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.embed_model
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_internal("", prompt).await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.generate_internal(system, prompt).await
    }

    fn model_name(&self) -> &str {
        &self.gen_model
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct EmbedContentRequest {
    model: String,
    content: Content,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedContentRequest>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}
