//! # finsight-inference
//!
//! Embedding and generation backends for finsight, plus the embedding
//! service that owns dimension normalization, input truncation, and
//! batching/rate-limit policy.
//!
//! ## Backends
//!
//! - [`GeminiBackend`] — Google Generative Language REST API
//!   (`:embedContent` / `:batchEmbedContents` / `:generateContent`)
//! - [`MockBackend`] — deterministic backend for tests and offline
//!   development
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use finsight_inference::{EmbeddingService, GeminiBackend};
//!
//! # async fn demo() -> finsight_core::Result<()> {
//! let backend = Arc::new(GeminiBackend::from_env()?);
//! let service = EmbeddingService::new(backend);
//! let vector = service.embed("free cash flow to the firm").await?;
//! assert_eq!(vector.len(), service.target_dimensions());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod embedding;
pub mod gemini;
pub mod mock;

pub use config::{InferenceConfig, ProviderKind};
pub use embedding::{cosine_similarity, top_k, EmbeddingService};
pub use gemini::GeminiBackend;
pub use mock::MockBackend;
