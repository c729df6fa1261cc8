//! finsight-api — HTTP API server for finsight.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use finsight_api::{app, AppState};
use finsight_core::defaults;
use finsight_core::VectorIndex;
use finsight_inference::{EmbeddingService, InferenceConfig};
use finsight_ingest::{ConceptExtractor, DocumentProcessor};
use finsight_knowledge::{AnalysisEngine, HttpVectorIndex, InMemoryVectorIndex, KnowledgeService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "finsight_api=info,finsight_ingest=info,finsight_knowledge=info,finsight_inference=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let inference = InferenceConfig::from_env();
    let (embedding_backend, generation_backend) = inference
        .build()
        .context("Failed to configure inference backends")?;

    let embedder = Arc::new(
        EmbeddingService::new(embedding_backend)
            .with_target_dimensions(inference.target_dimensions),
    );

    let index: Arc<dyn VectorIndex> = match HttpVectorIndex::from_env() {
        Ok(index) => Arc::new(index),
        Err(e) => {
            warn!(error = %e, "Vector index not configured, using in-memory index");
            Arc::new(InMemoryVectorIndex::new())
        }
    };

    let concepts = Arc::new(ConceptExtractor::with_generation(generation_backend.clone()));
    let processor = Arc::new(DocumentProcessor::new(concepts, embedder.clone()));
    let knowledge = Arc::new(KnowledgeService::new(index, embedder.clone()));
    let analysis = Arc::new(AnalysisEngine::new(knowledge.clone(), generation_backend));

    let state = AppState::new(processor, knowledge, analysis, embedder);

    let port = std::env::var("FINSIGHT_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(defaults::SERVER_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "finsight-api listening");

    axum::serve(listener, app(state))
        .await
        .context("Server error")?;

    Ok(())
}
