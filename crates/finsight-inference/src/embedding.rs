//! Embedding service: truncation, dimension normalization, batching.
//!
//! The service wraps an [`EmbeddingBackend`] and owns the policies the rest
//! of the system depends on:
//!
//! - every returned vector has the **target** dimensionality, independent of
//!   the backend's native output size (truncate or zero-pad);
//! - inputs are truncated to the provider's token budget, preferring a
//!   sentence boundary near the end of the window;
//! - batches run sequentially with an inter-batch delay, and a failed batch
//!   degrades to per-item embedding where a still-failing item receives a
//!   zero vector instead of aborting the batch.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use finsight_core::defaults;
use finsight_core::tokenizer::truncate_to_token_budget;
use finsight_core::{EmbeddingBackend, Error, Result};

/// Normalize a vector to the target dimensionality.
///
/// Vectors longer than the target keep their leading dimensions; shorter
/// vectors are zero-padded. This is the single adapter between provider
/// dimensionality and index dimensionality.
pub fn normalize_dimensions(mut vector: Vec<f32>, target: usize) -> Vec<f32> {
    if vector.len() > target {
        vector.truncate(target);
    } else if vector.len() < target {
        vector.resize(target, 0.0);
    }
    vector
}

/// Cosine similarity between two equal-length vectors.
///
/// # Panics
///
/// Panics when the vectors differ in length. A length mismatch is a
/// configuration bug, not a transient failure, and must not be silently
/// absorbed.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(
        a.len(),
        b.len(),
        "cosine similarity requires equal-length vectors ({} vs {})",
        a.len(),
        b.len()
    );

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Rank candidates by cosine similarity to the query, highest first.
///
/// Returns `(candidate_index, score)` pairs, at most `k` of them.
pub fn top_k(query: &[f32], candidates: &[Vec<f32>], k: usize) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| (i, cosine_similarity(query, c)))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);
    scored
}

/// Embedding service wrapping a pluggable backend.
pub struct EmbeddingService {
    backend: Arc<dyn EmbeddingBackend>,
    target_dimensions: usize,
    input_token_budget: usize,
    batch_size: usize,
    batch_delay: Duration,
    item_delay: Duration,
}

impl EmbeddingService {
    /// Create a service with default policy values.
    pub fn new(backend: Arc<dyn EmbeddingBackend>) -> Self {
        Self {
            backend,
            target_dimensions: defaults::EMBED_DIMENSION,
            input_token_budget: defaults::EMBED_INPUT_TOKEN_BUDGET,
            batch_size: defaults::EMBED_BATCH_SIZE,
            batch_delay: Duration::from_millis(defaults::EMBED_BATCH_DELAY_MS),
            item_delay: Duration::from_millis(defaults::EMBED_ITEM_DELAY_MS),
        }
    }

    /// Override the target dimensionality.
    pub fn with_target_dimensions(mut self, target: usize) -> Self {
        self.target_dimensions = target;
        self
    }

    /// Override the batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Override inter-batch and per-item delays (tests use zero).
    pub fn with_delays(mut self, batch_delay: Duration, item_delay: Duration) -> Self {
        self.batch_delay = batch_delay;
        self.item_delay = item_delay;
        self
    }

    /// Target dimensionality every returned vector is normalized to.
    pub fn target_dimensions(&self) -> usize {
        self.target_dimensions
    }

    /// Backend model name, for health reporting.
    pub fn model_name(&self) -> &str {
        self.backend.model_name()
    }

    /// Embed one text. The input is truncated to the provider budget and
    /// the output normalized to the target dimensionality.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let truncated = truncate_to_token_budget(text, self.input_token_budget);
        let vectors = self.backend.embed_texts(&[truncated.to_string()]).await?;
        let vector = vectors
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("Backend returned no vector".to_string()))?;
        Ok(normalize_dimensions(vector, self.target_dimensions))
    }

    /// Embed many texts in sequential fixed-size batches.
    ///
    /// A failed batch falls back to per-item embedding; an item that still
    /// fails is assigned a zero vector and logged as degraded. The output
    /// always has one vector per input, in input order.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());

        for (batch_index, batch) in texts.chunks(self.batch_size).enumerate() {
            if batch_index > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }

            let truncated: Vec<String> = batch
                .iter()
                .map(|t| truncate_to_token_budget(t, self.input_token_budget).to_string())
                .collect();

            match self.backend.embed_texts(&truncated).await {
                Ok(vectors) if vectors.len() == truncated.len() => {
                    debug!(
                        batch_index,
                        input_count = truncated.len(),
                        "Embedded batch"
                    );
                    out.extend(
                        vectors
                            .into_iter()
                            .map(|v| normalize_dimensions(v, self.target_dimensions)),
                    );
                }
                Ok(vectors) => {
                    warn!(
                        batch_index,
                        sent = truncated.len(),
                        received = vectors.len(),
                        "Embedding count mismatch, falling back to per-item"
                    );
                    self.embed_items(&truncated, &mut out).await;
                }
                Err(e) => {
                    warn!(
                        batch_index,
                        error = %e,
                        "Batch embedding failed, falling back to per-item"
                    );
                    self.embed_items(&truncated, &mut out).await;
                }
            }
        }

        Ok(out)
    }

    /// Per-item fallback path. Failures degrade to zero vectors.
    async fn embed_items(&self, texts: &[String], out: &mut Vec<Vec<f32>>) {
        for (i, text) in texts.iter().enumerate() {
            if i > 0 && !self.item_delay.is_zero() {
                tokio::time::sleep(self.item_delay).await;
            }
            match self.backend.embed_texts(std::slice::from_ref(text)).await {
                Ok(mut vectors) if !vectors.is_empty() => {
                    out.push(normalize_dimensions(vectors.remove(0), self.target_dimensions));
                }
                Ok(_) => {
                    warn!("Backend returned no vector, assigning zero vector (degraded)");
                    out.push(vec![0.0; self.target_dimensions]);
                }
                Err(e) => {
                    warn!(error = %e, "Item embedding failed, assigning zero vector (degraded)");
                    out.push(vec![0.0; self.target_dimensions]);
                }
            }
        }
    }
}
