//! Data models for finsight.
//!
//! Documents, chunks, concepts, valuation frameworks, market inputs, and
//! analysis outputs. Enum wire names use SCREAMING_SNAKE_CASE to match the
//! HTTP surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

// =============================================================================
// DOCUMENT TAXONOMY
// =============================================================================

/// Publisher or certifying body a reference document originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentSource {
    CfaInstitute,
    Sec,
    FederalReserve,
    AcademicJournal,
    Internal,
    Other,
}

impl std::fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CfaInstitute => write!(f, "CFA_INSTITUTE"),
            Self::Sec => write!(f, "SEC"),
            Self::FederalReserve => write!(f, "FEDERAL_RESERVE"),
            Self::AcademicJournal => write!(f, "ACADEMIC_JOURNAL"),
            Self::Internal => write!(f, "INTERNAL"),
            Self::Other => write!(f, "OTHER"),
        }
    }
}

impl std::str::FromStr for DocumentSource {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CFA_INSTITUTE" => Ok(Self::CfaInstitute),
            "SEC" => Ok(Self::Sec),
            "FEDERAL_RESERVE" => Ok(Self::FederalReserve),
            "ACADEMIC_JOURNAL" => Ok(Self::AcademicJournal),
            "INTERNAL" => Ok(Self::Internal),
            "OTHER" => Ok(Self::Other),
            _ => Err(format!("Invalid document source: {}", s)),
        }
    }
}

/// Certification level the document targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CertificationLevel {
    #[serde(rename = "LEVEL_1")]
    Level1,
    #[serde(rename = "LEVEL_2")]
    Level2,
    #[serde(rename = "LEVEL_3")]
    Level3,
    #[serde(rename = "PROFESSIONAL")]
    Professional,
    #[default]
    #[serde(rename = "GENERAL")]
    General,
}

impl std::str::FromStr for CertificationLevel {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LEVEL_1" => Ok(Self::Level1),
            "LEVEL_2" => Ok(Self::Level2),
            "LEVEL_3" => Ok(Self::Level3),
            "PROFESSIONAL" => Ok(Self::Professional),
            "GENERAL" => Ok(Self::General),
            _ => Err(format!("Invalid certification level: {}", s)),
        }
    }
}

/// High-level category a document is classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentCategory {
    EquityValuation,
    FixedIncome,
    Derivatives,
    PortfolioManagement,
    RiskManagement,
    Economics,
    QuantitativeMethods,
    FinancialReporting,
    AlternativeInvestments,
    #[default]
    General,
}

// =============================================================================
// DOCUMENTS AND CHUNKS
// =============================================================================

/// Caller-supplied metadata accompanying a raw document upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentUpload {
    pub title: String,
    pub source: DocumentSource,
    #[serde(default)]
    pub level: CertificationLevel,
    pub url: Option<String>,
}

/// An ingested financial reference document.
///
/// Identity is content-derived: re-ingesting byte-identical input under the
/// same title and source reproduces the same id. Immutable after creation
/// except `updated_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialDocument {
    pub id: String,
    pub title: String,
    pub source: DocumentSource,
    pub category: DocumentCategory,
    pub subcategory: Option<String>,
    pub level: CertificationLevel,
    pub version: String,
    pub page_count: usize,
    pub size_bytes: usize,
    pub checksum: String,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FinancialDocument {
    /// SHA-256 checksum of raw document bytes, hex-encoded.
    pub fn checksum_of(bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }

    /// Derive the content-based document id from checksum, title, and source.
    ///
    /// The id is stable across reprocessing runs with identical input, which
    /// makes vector-index upsert the correct storage primitive.
    pub fn derive_id(checksum: &str, title: &str, source: DocumentSource) -> String {
        let mut hasher = Sha256::new();
        hasher.update(checksum.as_bytes());
        hasher.update(title.as_bytes());
        hasher.update(source.to_string().as_bytes());
        let digest = hex::encode(hasher.finalize());
        format!("doc-{}", &digest[..16])
    }
}

/// Structural metadata derived for a chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub section_title: Option<String>,
    pub topics: Vec<String>,
    pub formulas: Vec<String>,
    pub has_table: bool,
    pub has_figure: bool,
}

/// A bounded, semantically coherent slice of a source document.
///
/// Chunks belong to exactly one document and never outlive it. `chunk_index`
/// is unique and monotonically increasing per document; `token_count` never
/// exceeds the configured per-chunk budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: usize,
    pub content: String,
    pub token_count: usize,
    pub embedding: Option<Vec<f32>>,
    pub metadata: ChunkMetadata,
    pub concepts: Vec<FinancialConcept>,
}

impl DocumentChunk {
    /// Compose the deterministic chunk id from document id, section index,
    /// and sub-chunk index within the section.
    pub fn compose_id(document_id: &str, section_index: usize, sub_index: usize) -> String {
        format!("{}-s{}-c{}", document_id, section_index, sub_index)
    }
}

// =============================================================================
// CONCEPTS
// =============================================================================

/// Category a financial concept belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConceptCategory {
    Valuation,
    RatioAnalysis,
    RiskMetrics,
    PortfolioTheory,
    FixedIncome,
    Equity,
    Derivatives,
    Economics,
    Statistics,
}

impl ConceptCategory {
    /// All known categories, used to validate generative-extraction output.
    pub fn all() -> &'static [ConceptCategory] {
        &[
            Self::Valuation,
            Self::RatioAnalysis,
            Self::RiskMetrics,
            Self::PortfolioTheory,
            Self::FixedIncome,
            Self::Equity,
            Self::Derivatives,
            Self::Economics,
            Self::Statistics,
        ]
    }

    /// Human-readable label used in definitions and explanations.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Valuation => "valuation",
            Self::RatioAnalysis => "ratio analysis",
            Self::RiskMetrics => "risk metrics",
            Self::PortfolioTheory => "portfolio theory",
            Self::FixedIncome => "fixed income",
            Self::Equity => "equity",
            Self::Derivatives => "derivatives",
            Self::Economics => "economics",
            Self::Statistics => "statistics",
        }
    }
}

impl std::fmt::Display for ConceptCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Valuation => write!(f, "VALUATION"),
            Self::RatioAnalysis => write!(f, "RATIO_ANALYSIS"),
            Self::RiskMetrics => write!(f, "RISK_METRICS"),
            Self::PortfolioTheory => write!(f, "PORTFOLIO_THEORY"),
            Self::FixedIncome => write!(f, "FIXED_INCOME"),
            Self::Equity => write!(f, "EQUITY"),
            Self::Derivatives => write!(f, "DERIVATIVES"),
            Self::Economics => write!(f, "ECONOMICS"),
            Self::Statistics => write!(f, "STATISTICS"),
        }
    }
}

impl std::str::FromStr for ConceptCategory {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().replace([' ', '-'], "_").as_str() {
            "VALUATION" => Ok(Self::Valuation),
            "RATIO_ANALYSIS" => Ok(Self::RatioAnalysis),
            "RISK_METRICS" => Ok(Self::RiskMetrics),
            "PORTFOLIO_THEORY" => Ok(Self::PortfolioTheory),
            "FIXED_INCOME" => Ok(Self::FixedIncome),
            "EQUITY" => Ok(Self::Equity),
            "DERIVATIVES" => Ok(Self::Derivatives),
            "ECONOMICS" => Ok(Self::Economics),
            "STATISTICS" => Ok(Self::Statistics),
            _ => Err(format!("Invalid concept category: {}", s)),
        }
    }
}

/// A canonical financial term with definition and cross-references.
///
/// Concepts are value objects: two concepts with the same normalized name
/// are the same concept. Related concepts are weak links by name, never
/// hard references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialConcept {
    pub name: String,
    pub category: ConceptCategory,
    pub definition: String,
    #[serde(default)]
    pub related: Vec<String>,
    #[serde(default)]
    pub formulas: Vec<String>,
    #[serde(default)]
    pub applications: Vec<String>,
}

impl FinancialConcept {
    /// Normalization used as concept identity: lowercased, all
    /// non-alphanumeric characters stripped.
    pub fn normalize_name(name: &str) -> String {
        name.chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase()
    }

    /// Normalized identity key of this concept.
    pub fn key(&self) -> String {
        Self::normalize_name(&self.name)
    }
}

// =============================================================================
// KNOWLEDGE RETRIEVAL
// =============================================================================

/// Analysis mode a knowledge query or analysis request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisType {
    FundamentalAnalysis,
    TechnicalAnalysis,
    RiskAssessment,
    PortfolioReview,
}

impl AnalysisType {
    /// Query words the analysis-type label expands into.
    pub fn expanded_label(&self) -> &'static str {
        match self {
            Self::FundamentalAnalysis => {
                "fundamental analysis intrinsic value financial ratios earnings quality"
            }
            Self::TechnicalAnalysis => "technical analysis price trends momentum volume patterns",
            Self::RiskAssessment => "risk assessment volatility drawdown value at risk exposure",
            Self::PortfolioReview => {
                "portfolio review allocation diversification rebalancing correlation"
            }
        }
    }

    /// Concept categories relevant to this analysis type, used as the
    /// vector-index metadata filter.
    pub fn concept_categories(&self) -> &'static [ConceptCategory] {
        match self {
            Self::FundamentalAnalysis => &[
                ConceptCategory::Valuation,
                ConceptCategory::RatioAnalysis,
                ConceptCategory::Equity,
            ],
            Self::TechnicalAnalysis => &[ConceptCategory::Statistics, ConceptCategory::Equity],
            Self::RiskAssessment => &[
                ConceptCategory::RiskMetrics,
                ConceptCategory::PortfolioTheory,
                ConceptCategory::Statistics,
            ],
            Self::PortfolioReview => &[
                ConceptCategory::PortfolioTheory,
                ConceptCategory::Valuation,
                ConceptCategory::Economics,
            ],
        }
    }
}

/// Instrument class an analysis or framework request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstrumentType {
    Stock,
    Etf,
    Bond,
    Commodity,
    Crypto,
}

impl std::str::FromStr for InstrumentType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "STOCK" => Ok(Self::Stock),
            "ETF" => Ok(Self::Etf),
            "BOND" => Ok(Self::Bond),
            "COMMODITY" => Ok(Self::Commodity),
            "CRYPTO" => Ok(Self::Crypto),
            _ => Err(format!("Invalid instrument type: {}", s)),
        }
    }
}

impl std::fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stock => write!(f, "STOCK"),
            Self::Etf => write!(f, "ETF"),
            Self::Bond => write!(f, "BOND"),
            Self::Commodity => write!(f, "COMMODITY"),
            Self::Crypto => write!(f, "CRYPTO"),
        }
    }
}

/// Semantic knowledge query against the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeQuery {
    pub analysis_type: AnalysisType,
    pub symbol: Option<String>,
    pub instrument_type: Option<InstrumentType>,
    #[serde(default)]
    pub concepts: Vec<String>,
    pub max_results: Option<usize>,
    /// Minimum relevance score; defaults to
    /// [`crate::defaults::MIN_RELEVANCE_SCORE`] when absent. Applied as a
    /// hard filter, not a rank adjustment.
    pub min_score: Option<f32>,
}

/// Query-time retrieval result. Ephemeral: never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeResult {
    pub chunk_id: String,
    pub document_id: String,
    pub content: String,
    /// Relevance score in [0, 1].
    pub score: f32,
    pub explanation: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub concepts: Vec<String>,
    #[serde(default)]
    pub formulas: Vec<String>,
}

// =============================================================================
// VALUATION FRAMEWORKS
// =============================================================================

/// A typed variable appearing in a framework formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaVariable {
    pub symbol: String,
    pub description: String,
}

/// A named formula with its expression and variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    pub name: String,
    pub expression: String,
    pub variables: Vec<FormulaVariable>,
}

/// A named, formula-bearing analytical method for estimating instrument
/// value. Static reference data constructed per instrument-type request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationFramework {
    pub name: String,
    pub description: String,
    pub applicability: Vec<String>,
    pub key_metrics: Vec<String>,
    pub formulas: Vec<Formula>,
    pub limitations: Vec<String>,
    pub source: String,
}

// =============================================================================
// MARKET INPUTS
// =============================================================================

/// Live quote figures for one instrument, passed by value into analysis
/// generation. This core never fetches market data itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub market_cap: Option<f64>,
}

/// Fundamental ratio fields for one instrument. All optional: upstream
/// collectors do not guarantee coverage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundamentalData {
    pub pe_ratio: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub eps: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub profit_margin: Option<f64>,
    pub revenue_growth: Option<f64>,
}

// =============================================================================
// ANALYSIS OUTPUT
// =============================================================================

/// Recommendation action produced by analysis generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    StrongBuy,
    Buy,
    #[default]
    Hold,
    Sell,
    StrongSell,
}

impl std::str::FromStr for Recommendation {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().replace([' ', '-'], "_").as_str() {
            "STRONG_BUY" => Ok(Self::StrongBuy),
            "BUY" => Ok(Self::Buy),
            "HOLD" | "NEUTRAL" => Ok(Self::Hold),
            "SELL" => Ok(Self::Sell),
            "STRONG_SELL" => Ok(Self::StrongSell),
            _ => Err(format!("Invalid recommendation: {}", s)),
        }
    }
}

/// Request context for enhanced analysis generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisContext {
    pub symbol: String,
    pub instrument_type: InstrumentType,
    pub analysis_type: AnalysisType,
    pub market: MarketSnapshot,
    #[serde(default)]
    pub fundamentals: FundamentalData,
}

/// Structured analysis produced from the generative backend's reply.
///
/// When the reply contains no parseable JSON object, the analysis degrades
/// to a minimal result (`degraded = true`) with the raw text preserved for
/// inspection. The summary is non-empty in every case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedAnalysis {
    pub summary: String,
    pub recommendation: Recommendation,
    pub confidence: f32,
    #[serde(default)]
    pub key_insights: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
    pub valuation_notes: Option<String>,
    #[serde(default)]
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

// =============================================================================
// PROCESSING JOBS
// =============================================================================

/// Processing job lifecycle. Terminal on either outcome; a failed job is
/// resubmitted from raw bytes, never resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Counters accumulated while processing one document.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub page_count: usize,
    pub chunk_count: usize,
    pub concept_count: usize,
    pub embedding_count: usize,
    pub elapsed_ms: u64,
}

/// One ingestion job: PENDING → PROCESSING → {COMPLETED | FAILED}.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingJob {
    pub id: Uuid,
    pub document_id: Option<String>,
    pub status: JobStatus,
    pub error_message: Option<String>,
    pub stats: ProcessingStats,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProcessingJob {
    /// Create a new pending job.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id: None,
            status: JobStatus::Pending,
            error_message: None,
            stats: ProcessingStats::default(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Transition to PROCESSING, stamping the start time.
    pub fn start(&mut self) {
        self.status = JobStatus::Processing;
        self.started_at = Some(Utc::now());
    }

    /// Transition to terminal COMPLETED with final statistics.
    pub fn complete(&mut self, stats: ProcessingStats) {
        self.status = JobStatus::Completed;
        self.stats = stats;
        self.completed_at = Some(Utc::now());
    }

    /// Transition to terminal FAILED with an error message.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error_message = Some(message.into());
        self.completed_at = Some(Utc::now());
    }
}

impl Default for ProcessingJob {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_document_source_roundtrip() {
        for (source, expected) in [
            (DocumentSource::CfaInstitute, "\"CFA_INSTITUTE\""),
            (DocumentSource::Sec, "\"SEC\""),
            (DocumentSource::FederalReserve, "\"FEDERAL_RESERVE\""),
            (DocumentSource::Other, "\"OTHER\""),
        ] {
            let json = serde_json::to_string(&source).unwrap();
            assert_eq!(json, expected);
            let back: DocumentSource = serde_json::from_str(&json).unwrap();
            assert_eq!(back, source);
        }
    }

    #[test]
    fn test_document_source_from_str_case_insensitive() {
        assert_eq!(
            "cfa_institute".parse::<DocumentSource>().unwrap(),
            DocumentSource::CfaInstitute
        );
        assert!("WALL_STREET_BETS".parse::<DocumentSource>().is_err());
    }

    #[test]
    fn test_derive_id_is_deterministic() {
        let checksum = FinancialDocument::checksum_of(b"document body");
        let a = FinancialDocument::derive_id(&checksum, "Equity Valuation", DocumentSource::CfaInstitute);
        let b = FinancialDocument::derive_id(&checksum, "Equity Valuation", DocumentSource::CfaInstitute);
        assert_eq!(a, b);
        assert!(a.starts_with("doc-"));
        assert_eq!(a.len(), "doc-".len() + 16);
    }

    #[test]
    fn test_derive_id_varies_with_inputs() {
        let checksum = FinancialDocument::checksum_of(b"document body");
        let a = FinancialDocument::derive_id(&checksum, "Title A", DocumentSource::Sec);
        let b = FinancialDocument::derive_id(&checksum, "Title B", DocumentSource::Sec);
        let c = FinancialDocument::derive_id(&checksum, "Title A", DocumentSource::Internal);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_chunk_id_composition() {
        assert_eq!(
            DocumentChunk::compose_id("doc-abc123", 2, 7),
            "doc-abc123-s2-c7"
        );
    }

    #[test]
    fn test_concept_normalize_name() {
        assert_eq!(
            FinancialConcept::normalize_name("Price-to-Earnings (P/E) Ratio"),
            "pricetoearningsperatio"
        );
        assert_eq!(FinancialConcept::normalize_name("  WACC  "), "wacc");
        assert_eq!(FinancialConcept::normalize_name("βeta"), "eta");
    }

    #[test]
    fn test_concept_category_from_str_accepts_spaces() {
        assert_eq!(
            ConceptCategory::from_str("ratio analysis").unwrap(),
            ConceptCategory::RatioAnalysis
        );
        assert_eq!(
            ConceptCategory::from_str("FIXED-INCOME").unwrap(),
            ConceptCategory::FixedIncome
        );
        assert!(ConceptCategory::from_str("astrology").is_err());
    }

    #[test]
    fn test_concept_category_all_covers_every_variant() {
        assert_eq!(ConceptCategory::all().len(), 9);
    }

    #[test]
    fn test_analysis_type_categories_fundamental() {
        let cats = AnalysisType::FundamentalAnalysis.concept_categories();
        assert!(cats.contains(&ConceptCategory::Valuation));
        assert!(cats.contains(&ConceptCategory::RatioAnalysis));
        assert!(cats.contains(&ConceptCategory::Equity));
    }

    #[test]
    fn test_analysis_type_serialization() {
        let json = serde_json::to_string(&AnalysisType::FundamentalAnalysis).unwrap();
        assert_eq!(json, "\"FUNDAMENTAL_ANALYSIS\"");
    }

    #[test]
    fn test_instrument_type_parse() {
        assert_eq!("STOCK".parse::<InstrumentType>().unwrap(), InstrumentType::Stock);
        assert_eq!("etf".parse::<InstrumentType>().unwrap(), InstrumentType::Etf);
        assert!("TULIP".parse::<InstrumentType>().is_err());
    }

    #[test]
    fn test_recommendation_default_is_hold() {
        assert_eq!(Recommendation::default(), Recommendation::Hold);
    }

    #[test]
    fn test_recommendation_parse_variants() {
        assert_eq!("BUY".parse::<Recommendation>().unwrap(), Recommendation::Buy);
        assert_eq!(
            "strong buy".parse::<Recommendation>().unwrap(),
            Recommendation::StrongBuy
        );
        assert_eq!("neutral".parse::<Recommendation>().unwrap(), Recommendation::Hold);
        assert!("YOLO".parse::<Recommendation>().is_err());
    }

    #[test]
    fn test_job_lifecycle() {
        let mut job = ProcessingJob::new();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(!job.status.is_terminal());

        job.start();
        assert_eq!(job.status, JobStatus::Processing);
        assert!(job.started_at.is_some());

        job.complete(ProcessingStats {
            page_count: 10,
            chunk_count: 4,
            concept_count: 12,
            embedding_count: 4,
            elapsed_ms: 1500,
        });
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.status.is_terminal());
        assert_eq!(job.stats.chunk_count, 4);
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_job_failure_records_message() {
        let mut job = ProcessingJob::new();
        job.start();
        job.fail("text extraction failed");
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("text extraction failed"));
        assert!(job.status.is_terminal());
    }

    #[test]
    fn test_job_status_serialization() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Processing).unwrap(),
            "\"PROCESSING\""
        );
    }

    #[test]
    fn test_knowledge_query_deserializes_with_defaults() {
        let query: KnowledgeQuery =
            serde_json::from_str(r#"{"analysis_type": "FUNDAMENTAL_ANALYSIS"}"#).unwrap();
        assert_eq!(query.analysis_type, AnalysisType::FundamentalAnalysis);
        assert!(query.concepts.is_empty());
        assert!(query.min_score.is_none());
    }

    #[test]
    fn test_enhanced_analysis_raw_response_skipped_when_absent() {
        let analysis = EnhancedAnalysis {
            summary: "ok".to_string(),
            recommendation: Recommendation::Hold,
            confidence: 0.5,
            key_insights: vec![],
            risks: vec![],
            valuation_notes: None,
            degraded: false,
            raw_response: None,
        };
        let json = serde_json::to_string(&analysis).unwrap();
        assert!(!json.contains("raw_response"));
    }
}
