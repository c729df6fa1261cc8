//! Core traits for finsight abstractions.
//!
//! These traits define the interfaces that concrete implementations must
//! satisfy, enabling pluggable backends and testability. The embedding
//! provider, generative-language backend, and vector index are all external
//! collaborators reached through these seams.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::models::ConceptCategory;

// =============================================================================
// INFERENCE TRAITS
// =============================================================================

/// Backend for generating text embeddings.
///
/// Implementations return vectors of their **native** dimensionality; the
/// embedding service is responsible for normalizing to the index's target
/// dimensionality.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Generate embeddings for the given texts, one vector per input.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Native dimension of this backend's embedding vectors.
    fn dimension(&self) -> usize;

    /// Model name being used.
    fn model_name(&self) -> &str;
}

/// Backend for text generation (LLM).
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate text given a prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate text with system context.
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Model name being used.
    fn model_name(&self) -> &str;
}

// =============================================================================
// VECTOR INDEX TRAITS
// =============================================================================

/// One `(id, vector, metadata)` tuple written to the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: JsonValue,
}

/// Optional metadata filter for nearest-neighbor queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexFilter {
    /// Restrict matches to chunks tagged with any of these categories.
    #[serde(default)]
    pub categories: Vec<ConceptCategory>,
    /// Restrict matches to one document.
    pub document_id: Option<String>,
}

impl IndexFilter {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.document_id.is_none()
    }
}

/// One nearest-neighbor match returned by the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMatch {
    pub id: String,
    pub score: f32,
    pub metadata: JsonValue,
}

/// External vector index supporting upsert and top-K similarity query.
///
/// Upsert (not insert) is the storage primitive: chunk ids are deterministic,
/// so reprocessing a document overwrites its prior vectors in place.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Upsert a batch of records.
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()>;

    /// Top-K nearest-neighbor query with an optional metadata filter.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<IndexFilter>,
    ) -> Result<Vec<IndexMatch>>;

    /// Remove all vectors belonging to a document.
    async fn delete_document(&self, document_id: &str) -> Result<()>;
}
