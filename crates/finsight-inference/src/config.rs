//! Inference configuration from environment variables.
//!
//! ## Example
//!
//! ```rust,no_run
//! use finsight_inference::InferenceConfig;
//!
//! let config = InferenceConfig::from_env();
//! let (embedder, generator) = config.build().unwrap();
//! ```

use std::sync::Arc;

use tracing::info;

use finsight_core::defaults;
use finsight_core::{EmbeddingBackend, Error, GenerationBackend, Result};

use crate::gemini::GeminiBackend;
use crate::mock::MockBackend;

/// Which inference provider to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    /// Google Generative Language API (default).
    #[default]
    Gemini,
    /// Deterministic in-process backend for tests and offline development.
    Mock,
}

impl std::str::FromStr for ProviderKind {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "mock" => Ok(Self::Mock),
            _ => Err(format!("Invalid inference provider: {}", s)),
        }
    }
}

/// Configuration for the inference backends.
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub provider: ProviderKind,
    pub base_url: String,
    pub api_key: Option<String>,
    pub embed_model: String,
    pub gen_model: String,
    /// Target dimensionality of the retrieval index. Every embedding vector
    /// is normalized to this length regardless of the provider's native
    /// output size.
    pub target_dimensions: usize,
    pub max_output_tokens: u32,
    pub embed_timeout_secs: u64,
    pub gen_timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Gemini,
            base_url: defaults::GEMINI_BASE_URL.to_string(),
            api_key: None,
            embed_model: defaults::GEMINI_EMBED_MODEL.to_string(),
            gen_model: defaults::GEMINI_GEN_MODEL.to_string(),
            target_dimensions: defaults::EMBED_DIMENSION,
            max_output_tokens: defaults::GEN_MAX_OUTPUT_TOKENS,
            embed_timeout_secs: defaults::EMBED_TIMEOUT_SECS,
            gen_timeout_secs: defaults::GEN_TIMEOUT_SECS,
        }
    }
}

impl InferenceConfig {
    /// Build configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `FINSIGHT_INFERENCE_PROVIDER` | `gemini` |
    /// | `GEMINI_API_KEY` | unset |
    /// | `GEMINI_BASE_URL` | Generative Language API |
    /// | `GEMINI_EMBED_MODEL` | `text-embedding-004` |
    /// | `GEMINI_GEN_MODEL` | `gemini-1.5-pro` |
    /// | `FINSIGHT_EMBED_DIMENSIONS` | 768 |
    /// | `FINSIGHT_GEN_MAX_TOKENS` | 2048 |
    pub fn from_env() -> Self {
        let provider = std::env::var("FINSIGHT_INFERENCE_PROVIDER")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        let base_url = std::env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| defaults::GEMINI_BASE_URL.to_string());
        let api_key = std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty());
        let embed_model = std::env::var("GEMINI_EMBED_MODEL")
            .unwrap_or_else(|_| defaults::GEMINI_EMBED_MODEL.to_string());
        let gen_model = std::env::var("GEMINI_GEN_MODEL")
            .unwrap_or_else(|_| defaults::GEMINI_GEN_MODEL.to_string());

        let target_dimensions = std::env::var("FINSIGHT_EMBED_DIMENSIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults::EMBED_DIMENSION);
        let max_output_tokens = std::env::var("FINSIGHT_GEN_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults::GEN_MAX_OUTPUT_TOKENS);
        let embed_timeout_secs = std::env::var("FINSIGHT_EMBED_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults::EMBED_TIMEOUT_SECS);
        let gen_timeout_secs = std::env::var("FINSIGHT_GEN_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults::GEN_TIMEOUT_SECS);

        Self {
            provider,
            base_url,
            api_key,
            embed_model,
            gen_model,
            target_dimensions,
            max_output_tokens,
            embed_timeout_secs,
            gen_timeout_secs,
        }
    }

    /// Construct the embedding and generation backends for this config.
    ///
    /// The two trait objects may share one underlying backend instance.
    #[allow(clippy::type_complexity)]
    pub fn build(&self) -> Result<(Arc<dyn EmbeddingBackend>, Arc<dyn GenerationBackend>)> {
        match self.provider {
            ProviderKind::Gemini => {
                let api_key = self.api_key.clone().ok_or_else(|| {
                    Error::Config("GEMINI_API_KEY is required for the gemini provider".to_string())
                })?;
                let backend = Arc::new(GeminiBackend::with_config(
                    self.base_url.clone(),
                    api_key,
                    self.embed_model.clone(),
                    self.gen_model.clone(),
                    self.max_output_tokens,
                    self.embed_timeout_secs,
                    self.gen_timeout_secs,
                ));
                info!(
                    provider = "gemini",
                    embed_model = %self.embed_model,
                    gen_model = %self.gen_model,
                    "Inference backends configured"
                );
                Ok((backend.clone(), backend))
            }
            ProviderKind::Mock => {
                let backend = Arc::new(MockBackend::new());
                info!(provider = "mock", "Inference backends configured");
                Ok((backend.clone(), backend))
            }
        }
    }
}
