//! Knowledge storage and semantic search.
//!
//! Storage filters out unembedded chunks, batches upserts, and truncates the
//! metadata payload (the chunk id remains the source of truth for full
//! text). Search embeds an assembled query text, filters by the concept
//! categories relevant to the requested analysis type, and applies the
//! minimum relevance score as a hard filter.

use std::sync::Arc;

use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, warn};

use finsight_core::defaults::{
    DEFAULT_TOP_K, INDEX_METADATA_MAX_CHARS, MIN_RELEVANCE_SCORE, UPSERT_BATCH_SIZE,
};
use finsight_core::{
    DocumentChunk, FinancialDocument, IndexFilter, IndexMatch, KnowledgeQuery, KnowledgeResult,
    Result, VectorIndex, VectorRecord,
};
use finsight_inference::EmbeddingService;

/// Retrieval service over the external vector index.
pub struct KnowledgeService {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<EmbeddingService>,
}

impl KnowledgeService {
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Arc<EmbeddingService>) -> Self {
        Self { index, embedder }
    }

    /// Persist chunk vectors for one document. Chunks without an embedding
    /// are skipped. Returns the number of vectors written.
    pub async fn store_chunks(
        &self,
        document: &FinancialDocument,
        chunks: &[DocumentChunk],
    ) -> Result<usize> {
        let records: Vec<VectorRecord> = chunks
            .iter()
            .filter_map(|chunk| {
                let embedding = chunk.embedding.as_ref()?;
                Some(VectorRecord {
                    id: chunk.id.clone(),
                    vector: embedding.clone(),
                    metadata: chunk_metadata_payload(document, chunk),
                })
            })
            .collect();

        let skipped = chunks.len() - records.len();
        if skipped > 0 {
            warn!(skipped, "Skipping unembedded chunks during storage");
        }

        let total = records.len();
        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            self.index.upsert(batch.to_vec()).await?;
        }

        info!(
            document_id = %document.id,
            stored = total,
            skipped,
            "Stored chunk vectors"
        );
        Ok(total)
    }

    /// Remove a document's vectors from the index.
    pub async fn remove_document(&self, document_id: &str) -> Result<()> {
        self.index.delete_document(document_id).await
    }

    /// Answer a semantic knowledge query.
    ///
    /// Matches below the minimum score (default
    /// [`MIN_RELEVANCE_SCORE`], caller-overridable) are discarded — a hard
    /// filter, not a rank adjustment. Provider failures are logged and
    /// surface as an empty result set; availability wins over completeness.
    pub async fn search_knowledge(&self, query: &KnowledgeQuery) -> Result<Vec<KnowledgeResult>> {
        match self.search_inner(query).await {
            Ok(results) => Ok(results),
            Err(e) => {
                warn!(error = %e, "Knowledge search failed, returning empty results");
                Ok(Vec::new())
            }
        }
    }

    async fn search_inner(&self, query: &KnowledgeQuery) -> Result<Vec<KnowledgeResult>> {
        let query_text = build_query_text(query);
        debug!(query = %query_text, "Searching knowledge index");

        let vector = self.embedder.embed(&query_text).await?;

        let filter = IndexFilter {
            categories: query.analysis_type.concept_categories().to_vec(),
            document_id: None,
        };
        let top_k = query.max_results.unwrap_or(DEFAULT_TOP_K);
        let matches = self.index.query(&vector, top_k, Some(filter)).await?;

        let threshold = query.min_score.unwrap_or(MIN_RELEVANCE_SCORE);
        let results: Vec<KnowledgeResult> = matches
            .into_iter()
            .filter(|m| m.score >= threshold)
            .map(into_knowledge_result)
            .collect();

        debug!(
            result_count = results.len(),
            threshold, "Knowledge search complete"
        );
        Ok(results)
    }
}

/// Query text assembly: symbol context, instrument-type context, expanded
/// analysis-type label, explicit concept terms — in that order.
fn build_query_text(query: &KnowledgeQuery) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(symbol) = &query.symbol {
        parts.push(format!("{} investment analysis", symbol));
    }
    if let Some(instrument_type) = query.instrument_type {
        parts.push(format!("{} instrument", instrument_type));
    }
    parts.push(query.analysis_type.expanded_label().to_string());
    if !query.concepts.is_empty() {
        parts.push(query.concepts.join(" "));
    }
    parts.join(" ")
}

/// Index metadata payload for one chunk. Content is truncated; ids stay the
/// source of truth for full text.
fn chunk_metadata_payload(document: &FinancialDocument, chunk: &DocumentChunk) -> JsonValue {
    let mut categories: Vec<String> = chunk
        .concepts
        .iter()
        .map(|c| c.category.to_string())
        .collect();
    categories.sort();
    categories.dedup();

    let concepts: Vec<&str> = chunk.concepts.iter().map(|c| c.name.as_str()).collect();
    let content: String = chunk.content.chars().take(INDEX_METADATA_MAX_CHARS).collect();

    json!({
        "document_id": document.id,
        "document_title": document.title,
        "source": document.source,
        "document_category": document.category,
        "chunk_index": chunk.chunk_index,
        "section_title": chunk.metadata.section_title,
        "topics": chunk.metadata.topics,
        "concepts": concepts,
        "formulas": chunk.metadata.formulas,
        "categories": categories,
        "content": content,
    })
}

fn into_knowledge_result(m: IndexMatch) -> KnowledgeResult {
    let topics = string_vec(&m.metadata, "topics");
    let concepts = string_vec(&m.metadata, "concepts");
    let formulas = string_vec(&m.metadata, "formulas");

    let matched_terms: Vec<&str> = topics
        .iter()
        .chain(concepts.iter())
        .map(String::as_str)
        .take(4)
        .collect();
    let explanation = if matched_terms.is_empty() {
        format!("{:.0}% semantic match", m.score * 100.0)
    } else {
        format!(
            "{:.0}% match on {}",
            m.score * 100.0,
            matched_terms.join(", ")
        )
    };

    KnowledgeResult {
        chunk_id: m.id,
        document_id: m
            .metadata
            .get("document_id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        content: m
            .metadata
            .get("content")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        score: m.score,
        explanation,
        topics,
        concepts,
        formulas,
    }
}

fn string_vec(metadata: &JsonValue, field: &str) -> Vec<String> {
    metadata
        .get(field)
        .and_then(|v| v.as_array())
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use finsight_core::{AnalysisType, InstrumentType};

    #[test]
    fn test_build_query_text_order() {
        let query = KnowledgeQuery {
            analysis_type: AnalysisType::FundamentalAnalysis,
            symbol: Some("NVDA".to_string()),
            instrument_type: Some(InstrumentType::Stock),
            concepts: vec!["free cash flow".to_string()],
            max_results: None,
            min_score: None,
        };
        let text = build_query_text(&query);
        assert!(text.starts_with("NVDA investment analysis"));
        let stock_pos = text.find("STOCK instrument").unwrap();
        let label_pos = text.find("fundamental analysis").unwrap();
        let concept_pos = text.find("free cash flow").unwrap();
        assert!(stock_pos < label_pos);
        assert!(label_pos < concept_pos);
    }

    #[test]
    fn test_build_query_text_minimal() {
        let query = KnowledgeQuery {
            analysis_type: AnalysisType::RiskAssessment,
            symbol: None,
            instrument_type: None,
            concepts: vec![],
            max_results: None,
            min_score: None,
        };
        let text = build_query_text(&query);
        assert_eq!(text, AnalysisType::RiskAssessment.expanded_label());
    }

    #[test]
    fn test_explanation_includes_score_percentage() {
        let result = into_knowledge_result(IndexMatch {
            id: "c1".to_string(),
            score: 0.87,
            metadata: json!({
                "document_id": "doc-1",
                "content": "text",
                "topics": ["beta"],
                "concepts": ["value at risk"],
            }),
        });
        assert!(result.explanation.starts_with("87% match on"));
        assert!(result.explanation.contains("beta"));
        assert_eq!(result.document_id, "doc-1");
    }

    #[test]
    fn test_explanation_without_terms() {
        let result = into_knowledge_result(IndexMatch {
            id: "c1".to_string(),
            score: 0.75,
            metadata: json!({}),
        });
        assert_eq!(result.explanation, "75% semantic match");
    }

    #[test]
    fn test_metadata_payload_truncates_content() {
        use chrono::Utc;
        use finsight_core::{
            CertificationLevel, ChunkMetadata, DocumentCategory, DocumentSource,
        };

        let now = Utc::now();
        let document = FinancialDocument {
            id: "doc-1".to_string(),
            title: "T".to_string(),
            source: DocumentSource::Sec,
            category: DocumentCategory::General,
            subcategory: None,
            level: CertificationLevel::General,
            version: "1.0".to_string(),
            page_count: 1,
            size_bytes: 10,
            checksum: "c".to_string(),
            url: None,
            created_at: now,
            updated_at: now,
        };
        let chunk = DocumentChunk {
            id: "doc-1-s0-c0".to_string(),
            document_id: "doc-1".to_string(),
            chunk_index: 0,
            content: "x".repeat(INDEX_METADATA_MAX_CHARS * 2),
            token_count: 100,
            embedding: Some(vec![0.1]),
            metadata: ChunkMetadata::default(),
            concepts: vec![],
        };

        let payload = chunk_metadata_payload(&document, &chunk);
        let stored = payload["content"].as_str().unwrap();
        assert_eq!(stored.len(), INDEX_METADATA_MAX_CHARS);
    }
}
