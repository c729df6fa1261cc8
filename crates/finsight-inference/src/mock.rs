//! Mock inference backend for deterministic testing.
//!
//! Embeddings are derived from a hash of the input text, so identical inputs
//! always produce identical vectors and distinct inputs almost always
//! diverge. Generation returns canned responses. Failure injection is
//! deterministic: any input containing the configured failure marker errors.
//!
//! ## Usage
//!
//! ```rust
//! use finsight_core::EmbeddingBackend;
//! use finsight_inference::MockBackend;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let backend = MockBackend::new().with_dimension(384);
//! let vectors = backend.embed_texts(&["test".to_string()]).await.unwrap();
//! assert_eq!(vectors[0].len(), 384);
//! # }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use finsight_core::{EmbeddingBackend, Error, GenerationBackend, Result};

/// Mock backend implementing both embedding and generation.
#[derive(Clone)]
pub struct MockBackend {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

#[derive(Debug, Clone)]
struct MockConfig {
    dimension: usize,
    fixed_responses: HashMap<String, String>,
    default_response: String,
    failure_marker: Option<String>,
}

/// A recorded call for assertions.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub operation: String,
    pub input: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            dimension: 768,
            fixed_responses: HashMap::new(),
            default_response: "Mock response".to_string(),
            failure_marker: None,
        }
    }
}

impl MockBackend {
    /// Create a new mock backend with default configuration.
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the embedding dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        Arc::make_mut(&mut self.config).dimension = dimension;
        self
    }

    /// Set the default generation response.
    pub fn with_fixed_response(mut self, response: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).default_response = response.into();
        self
    }

    /// Map a specific prompt substring to a specific response.
    pub fn with_response_mapping(
        mut self,
        input: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Arc::make_mut(&mut self.config)
            .fixed_responses
            .insert(input.into(), output.into());
        self
    }

    /// Any embed/generate input containing `marker` fails deterministically.
    pub fn with_failure_marker(mut self, marker: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).failure_marker = Some(marker.into());
        self
    }

    /// All logged calls, in order.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.call_log.lock().unwrap().clone()
    }

    /// Clear the call log.
    pub fn clear_calls(&self) {
        self.call_log.lock().unwrap().clear()
    }

    /// Number of embed calls recorded.
    pub fn embed_call_count(&self) -> usize {
        self.call_log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.operation == "embed")
            .count()
    }

    /// Number of generation calls recorded.
    pub fn generate_call_count(&self) -> usize {
        self.call_log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.operation == "generate")
            .count()
    }

    fn log_call(&self, operation: &str, input: &str) {
        self.call_log.lock().unwrap().push(MockCall {
            operation: operation.to_string(),
            input: input.to_string(),
        });
    }

    fn should_fail(&self, input: &str) -> bool {
        self.config
            .failure_marker
            .as_deref()
            .is_some_and(|marker| input.contains(marker))
    }

    /// Deterministic hash-derived embedding for one text.
    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut state: u64 = 0xcbf2_9ce4_8422_2325;
        for b in text.bytes() {
            state ^= b as u64;
            state = state.wrapping_mul(0x0000_0100_0000_01b3);
        }
        (0..self.config.dimension)
            .map(|i| {
                let mixed = state
                    .wrapping_add(i as u64)
                    .wrapping_mul(0x9e37_79b9_7f4a_7c15);
                ((mixed % 2_000) as f32 / 1_000.0) - 1.0
            })
            .collect()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingBackend for MockBackend {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            self.log_call("embed", text);
            if self.should_fail(text) {
                return Err(Error::Embedding("mock embedding failure".to_string()));
            }
            vectors.push(self.embed_one(text));
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        "mock-embed"
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.log_call("generate", prompt);
        if self.should_fail(prompt) {
            return Err(Error::Inference("mock generation failure".to_string()));
        }
        for (needle, response) in &self.config.fixed_responses {
            if prompt.contains(needle) {
                return Ok(response.clone());
            }
        }
        Ok(self.config.default_response.clone())
    }

    async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        self.generate(prompt).await
    }

    fn model_name(&self) -> &str {
        "mock-gen"
    }
}
