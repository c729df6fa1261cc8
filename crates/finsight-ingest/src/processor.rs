//! Document processing orchestration.
//!
//! Runs the strictly ordered ingestion pipeline and captures every failure
//! into the job's terminal FAILED state; `process_document` itself never
//! returns an error. Chunk enrichment and embedding failures are isolated
//! per chunk and never fail the job.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};

use finsight_core::defaults::CHUNK_TOKEN_BUDGET;
use finsight_core::tokenizer::estimate_tokens;
use finsight_core::{
    DocumentChunk, DocumentUpload, FinancialDocument, ProcessingJob, ProcessingStats,
};
use finsight_inference::EmbeddingService;

use crate::chunker::{chunk_section, derive_metadata};
use crate::classify::classify_document;
use crate::concepts::ConceptExtractor;
use crate::extract::TextExtractor;
use crate::sections::split_sections;

/// Result of one ingestion run: the job record plus the artifacts for
/// storage. A failed job carries whatever was produced before the failure.
#[derive(Debug)]
pub struct ProcessingOutcome {
    pub job: ProcessingJob,
    pub document: Option<FinancialDocument>,
    pub chunks: Vec<DocumentChunk>,
}

impl ProcessingOutcome {
    fn failed(job: ProcessingJob) -> Self {
        Self {
            job,
            document: None,
            chunks: Vec::new(),
        }
    }
}

/// Orchestrates ingestion of one source document.
///
/// Dependencies are injected explicitly; the processor holds no global
/// state and runs independent documents concurrently without coordination.
pub struct DocumentProcessor {
    extractor: TextExtractor,
    concepts: Arc<ConceptExtractor>,
    embedder: Arc<EmbeddingService>,
}

impl DocumentProcessor {
    pub fn new(concepts: Arc<ConceptExtractor>, embedder: Arc<EmbeddingService>) -> Self {
        Self {
            extractor: TextExtractor,
            concepts,
            embedder,
        }
    }

    /// Process raw document bytes into chunks with concepts and embeddings.
    ///
    /// Pipeline order is fixed: extract → classify → split sections → chunk
    /// → metadata → concepts → embeddings. Identity is content-derived, so
    /// re-running with identical input reproduces identical document and
    /// chunk ids.
    pub async fn process_document(&self, bytes: &[u8], upload: DocumentUpload) -> ProcessingOutcome {
        let started = Instant::now();
        let mut job = ProcessingJob::new();
        job.start();

        if upload.title.trim().is_empty() {
            job.fail("Document title is required");
            return ProcessingOutcome::failed(job);
        }

        let extracted = match self.extractor.extract(bytes, &upload.title).await {
            Ok(extracted) => extracted,
            Err(e) => {
                job.fail(format!("Text extraction failed: {}", e));
                return ProcessingOutcome::failed(job);
            }
        };
        if extracted.text.trim().is_empty() {
            job.fail("Document contains no extractable text");
            return ProcessingOutcome::failed(job);
        }

        let checksum = FinancialDocument::checksum_of(bytes);
        let document_id = FinancialDocument::derive_id(&checksum, &upload.title, upload.source);
        let category = classify_document(&upload.title, &extracted.text);
        let now = Utc::now();
        let document = FinancialDocument {
            id: document_id.clone(),
            title: upload.title.clone(),
            source: upload.source,
            category,
            subcategory: None,
            level: upload.level,
            version: "1.0".to_string(),
            page_count: extracted.page_count,
            size_bytes: bytes.len(),
            checksum,
            url: upload.url.clone(),
            created_at: now,
            updated_at: now,
        };
        job.document_id = Some(document_id.clone());

        let sections = split_sections(&extracted.text);
        if sections.is_empty() {
            job.fail("Document contains no usable sections");
            return ProcessingOutcome::failed(job);
        }

        let mut chunks: Vec<DocumentChunk> = Vec::new();
        let mut chunk_index = 0usize;
        let mut concept_count = 0usize;

        for section in &sections {
            for (sub_index, content) in chunk_section(&section.body, CHUNK_TOKEN_BUDGET)
                .into_iter()
                .enumerate()
            {
                let metadata = derive_metadata(&self.concepts, &content, &section.title);

                // Enrichment failures are absorbed inside the extractor;
                // a chunk that yields nothing keeps empty concepts.
                let concepts = self
                    .concepts
                    .extract_concepts(&content, &metadata.topics)
                    .await;
                concept_count += concepts.len();

                let token_count = estimate_tokens(&content);
                chunks.push(DocumentChunk {
                    id: DocumentChunk::compose_id(&document_id, section.index, sub_index),
                    document_id: document_id.clone(),
                    chunk_index,
                    content,
                    token_count,
                    embedding: None,
                    metadata,
                    concepts,
                });
                chunk_index += 1;
            }
        }

        if chunks.is_empty() {
            job.fail("Document produced no chunks");
            return ProcessingOutcome {
                job,
                document: Some(document),
                chunks: Vec::new(),
            };
        }

        // Embeddings run through the batch path so rate-limit policy applies.
        // A degraded (zero) vector leaves the chunk unembedded rather than
        // poisoning the index.
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let mut embedding_count = 0usize;
        match self.embedder.embed_batch(&texts).await {
            Ok(vectors) => {
                for (chunk, vector) in chunks.iter_mut().zip(vectors) {
                    if vector.iter().any(|&v| v != 0.0) {
                        chunk.embedding = Some(vector);
                        embedding_count += 1;
                    } else {
                        warn!(chunk_id = %chunk.id, "Embedding degraded, chunk left unembedded");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Embedding generation failed, chunks left unembedded");
            }
        }

        let stats = ProcessingStats {
            page_count: extracted.page_count,
            chunk_count: chunks.len(),
            concept_count,
            embedding_count,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        job.complete(stats);

        info!(
            document_id = %document_id,
            chunk_count = stats.chunk_count,
            concept_count = stats.concept_count,
            embedding_count = stats.embedding_count,
            duration_ms = stats.elapsed_ms,
            "Document processing complete"
        );

        ProcessingOutcome {
            job,
            document: Some(document),
            chunks,
        }
    }
}
