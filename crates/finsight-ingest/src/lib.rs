//! # finsight-ingest
//!
//! Document ingestion pipeline for finsight.
//!
//! One ingestion job takes raw document bytes through a strictly ordered
//! pipeline: text extraction → category classification → section splitting →
//! sentence-bounded chunking → per-chunk metadata → concept enrichment →
//! embedding generation. Failures in enrichment or embedding are isolated to
//! the affected chunk; pipeline-level failures land in the job's terminal
//! FAILED state and are never thrown out of [`DocumentProcessor::process_document`].

pub mod chunker;
pub mod classify;
pub mod concepts;
pub mod extract;
pub mod processor;
pub mod sections;

pub use chunker::derive_metadata;
pub use classify::classify_document;
pub use concepts::ConceptExtractor;
pub use extract::{ExtractedText, TextExtractor};
pub use processor::{DocumentProcessor, ProcessingOutcome};
pub use sections::{split_sections, Section};
