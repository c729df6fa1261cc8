//! # finsight-knowledge
//!
//! Retrieval and analysis services for finsight: persistence of chunk
//! vectors into an external vector index, semantic knowledge search with a
//! hard relevance threshold, the built-in valuation framework catalogue, and
//! retrieval-augmented analysis generation with a load-bearing degraded
//! fallback.

pub mod analysis;
pub mod frameworks;
pub mod index;
pub mod knowledge;

pub use analysis::AnalysisEngine;
pub use frameworks::frameworks_for;
pub use index::{HttpVectorIndex, InMemoryVectorIndex};
pub use knowledge::KnowledgeService;
