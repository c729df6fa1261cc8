//! Application state shared across handlers.
//!
//! Service instances are injected explicitly at startup; handlers never
//! construct backends themselves.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use finsight_core::ProcessingJob;
use finsight_inference::EmbeddingService;
use finsight_ingest::DocumentProcessor;
use finsight_knowledge::{AnalysisEngine, KnowledgeService};

/// In-memory registry of processing jobs, keyed by job id.
pub type JobRegistry = Arc<RwLock<HashMap<Uuid, ProcessingJob>>>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<DocumentProcessor>,
    pub knowledge: Arc<KnowledgeService>,
    pub analysis: Arc<AnalysisEngine>,
    pub embedder: Arc<EmbeddingService>,
    pub jobs: JobRegistry,
}

impl AppState {
    pub fn new(
        processor: Arc<DocumentProcessor>,
        knowledge: Arc<KnowledgeService>,
        analysis: Arc<AnalysisEngine>,
        embedder: Arc<EmbeddingService>,
    ) -> Self {
        Self {
            processor,
            knowledge,
            analysis,
            embedder,
            jobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}
