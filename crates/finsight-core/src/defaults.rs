//! Centralized default constants for the finsight system.
//!
//! **This module is the single source of truth** for all shared default
//! values. All crates should reference these constants instead of defining
//! their own magic numbers.
//!
//! Organized by domain area. When adding new constants, place them in the
//! appropriate section and document the rationale for the chosen value.

// =============================================================================
// CHUNKING
// =============================================================================

/// Target token budget per chunk. Chunks are sealed once the next sentence
/// would push the estimate past this value.
pub const CHUNK_TOKEN_BUDGET: usize = 500;

/// Minimum characters for a chunk to be kept (smaller fragments are noise).
pub const MIN_CHUNK_CHARS: usize = 50;

/// Minimum characters for a section to survive splitting.
pub const MIN_SECTION_CHARS: usize = 200;

/// Estimated characters per page for plain-text sources (no page structure).
pub const PLAIN_TEXT_PAGE_CHARS: usize = 3_000;

// =============================================================================
// EMBEDDING
// =============================================================================

/// Target embedding dimensionality for the vector index. Every vector is
/// truncated or zero-padded to this length regardless of provider output.
pub const EMBED_DIMENSION: usize = 768;

/// Token budget accepted by the embedding provider per input.
pub const EMBED_INPUT_TOKEN_BUDGET: usize = 2_048;

/// Fraction of the truncation window in which a sentence boundary is
/// preferred over a hard cut.
pub const TRUNCATION_BOUNDARY_WINDOW: f32 = 0.2;

/// Number of texts per embedding batch request.
pub const EMBED_BATCH_SIZE: usize = 10;

/// Delay between sequential embedding batches (rate-limit courtesy).
pub const EMBED_BATCH_DELAY_MS: u64 = 1_000;

/// Delay between per-item fallback embeddings after a batch failure.
pub const EMBED_ITEM_DELAY_MS: u64 = 200;

/// Timeout for embedding requests in seconds.
pub const EMBED_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// INFERENCE
// =============================================================================

/// Default Generative Language API base URL.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default embedding model.
pub const GEMINI_EMBED_MODEL: &str = "text-embedding-004";

/// Default generation model.
pub const GEMINI_GEN_MODEL: &str = "gemini-1.5-pro";

/// Timeout for generation requests in seconds.
pub const GEN_TIMEOUT_SECS: u64 = 120;

/// Maximum output tokens requested from the generative backend.
pub const GEN_MAX_OUTPUT_TOKENS: u32 = 2_048;

/// Minimum input length before the generative concept pass is attempted.
pub const GENERATIVE_MIN_INPUT_CHARS: usize = 200;

// =============================================================================
// VECTOR INDEX
// =============================================================================

/// Number of records per upsert batch.
pub const UPSERT_BATCH_SIZE: usize = 100;

/// Maximum characters of chunk content carried in index metadata. The chunk
/// id remains the source of truth for full text.
pub const INDEX_METADATA_MAX_CHARS: usize = 1_000;

/// Default minimum relevance score for knowledge search (caller-overridable).
pub const MIN_RELEVANCE_SCORE: f32 = 0.7;

/// Default top-K for knowledge search.
pub const DEFAULT_TOP_K: usize = 10;

// =============================================================================
// EXTRACTION
// =============================================================================

/// Per-command timeout for external extraction tools (seconds).
pub const EXTRACTION_CMD_TIMEOUT_SECS: u64 = 60;

/// Page threshold for batch PDF extraction.
pub const LARGE_PDF_PAGE_THRESHOLD: usize = 100;

/// Pages per batch for large PDF extraction.
pub const PDF_BATCH_PAGES: usize = 50;

/// Maximum accepted upload size in bytes (50 MB).
pub const MAX_BODY_SIZE_BYTES: usize = 50 * 1024 * 1024;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default CORS max-age in seconds (1 hour).
pub const CORS_MAX_AGE_SECS: u64 = 3600;
