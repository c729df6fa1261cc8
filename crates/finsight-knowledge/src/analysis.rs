//! Retrieval-augmented analysis generation.
//!
//! One prompt combines instrument identity, live market figures, fundamental
//! ratios, retrieved knowledge (annotated with relevance scores), and the
//! selected valuation frameworks. The generative reply is parsed by locating
//! the first balanced JSON object; a reply with no parseable object degrades
//! to a minimal structured result with the raw text preserved. The degraded
//! path is load-bearing, not an edge case.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use finsight_core::{
    AnalysisContext, EnhancedAnalysis, GenerationBackend, KnowledgeQuery, KnowledgeResult,
    Recommendation, ValuationFramework,
};

use crate::frameworks::frameworks_for;
use crate::knowledge::KnowledgeService;

const SYSTEM_PROMPT: &str =
    "You are a rigorous financial analyst. Ground every claim in the supplied \
     market data and reference material. Respond with a single JSON object.";

/// Characters of a raw reply carried into a degraded summary.
const DEGRADED_SUMMARY_CHARS: usize = 600;

/// Outcome of parsing one generative reply.
enum ParsedReply {
    Parsed(EnhancedAnalysis),
    Degraded,
}

/// Retrieval-augmented analysis generator.
pub struct AnalysisEngine {
    knowledge: Arc<KnowledgeService>,
    generation: Arc<dyn GenerationBackend>,
}

impl AnalysisEngine {
    pub fn new(knowledge: Arc<KnowledgeService>, generation: Arc<dyn GenerationBackend>) -> Self {
        Self {
            knowledge,
            generation,
        }
    }

    /// Generate a structured analysis for one instrument.
    ///
    /// Never fails: generation and parse failures degrade to a neutral HOLD
    /// result with a non-empty summary.
    pub async fn generate_enhanced_analysis(&self, ctx: &AnalysisContext) -> EnhancedAnalysis {
        let query = KnowledgeQuery {
            analysis_type: ctx.analysis_type,
            symbol: Some(ctx.symbol.clone()),
            instrument_type: Some(ctx.instrument_type),
            concepts: vec![],
            max_results: None,
            min_score: None,
        };
        let knowledge = self
            .knowledge
            .search_knowledge(&query)
            .await
            .unwrap_or_default();
        let frameworks = frameworks_for(ctx.instrument_type, None, None);

        let prompt = build_analysis_prompt(ctx, &knowledge, &frameworks);
        debug!(
            symbol = %ctx.symbol,
            knowledge_count = knowledge.len(),
            framework_count = frameworks.len(),
            prompt_len = prompt.len(),
            "Generating enhanced analysis"
        );

        match self.generation.generate_with_system(SYSTEM_PROMPT, &prompt).await {
            Ok(reply) => match parse_analysis_reply(&reply) {
                ParsedReply::Parsed(analysis) => {
                    info!(symbol = %ctx.symbol, recommendation = ?analysis.recommendation, "Analysis generated");
                    analysis
                }
                ParsedReply::Degraded => {
                    warn!(symbol = %ctx.symbol, "Analysis reply had no parseable JSON, degrading");
                    degraded_analysis(Some(reply))
                }
            },
            Err(e) => {
                warn!(symbol = %ctx.symbol, error = %e, "Analysis generation failed, degrading");
                degraded_analysis(None)
            }
        }
    }
}

/// Reply schema accepted from the generative backend.
#[derive(Debug, Deserialize)]
struct AnalysisReplyJson {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    recommendation: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default, alias = "keyInsights")]
    key_insights: Vec<String>,
    #[serde(default)]
    risks: Vec<String>,
    #[serde(default, alias = "valuationNotes")]
    valuation_notes: Option<String>,
}

fn parse_analysis_reply(reply: &str) -> ParsedReply {
    let Some(object) = extract_json_object(reply) else {
        return ParsedReply::Degraded;
    };
    let Ok(parsed) = serde_json::from_str::<AnalysisReplyJson>(object) else {
        return ParsedReply::Degraded;
    };
    if parsed.summary.trim().is_empty() {
        return ParsedReply::Degraded;
    }

    let recommendation = parsed
        .recommendation
        .as_deref()
        .and_then(|r| r.parse::<Recommendation>().ok())
        .unwrap_or_default();

    ParsedReply::Parsed(EnhancedAnalysis {
        summary: parsed.summary.trim().to_string(),
        recommendation,
        confidence: parsed.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
        key_insights: parsed.key_insights,
        risks: parsed.risks,
        valuation_notes: parsed.valuation_notes,
        degraded: false,
        raw_response: None,
    })
}

/// Minimal structured result for unusable replies. The raw text is kept for
/// inspection when any came back.
fn degraded_analysis(raw: Option<String>) -> EnhancedAnalysis {
    let summary = raw
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|r| r.chars().take(DEGRADED_SUMMARY_CHARS).collect())
        .unwrap_or_else(|| {
            "Automated analysis was unavailable; defaulting to a neutral stance.".to_string()
        });

    EnhancedAnalysis {
        summary,
        recommendation: Recommendation::Hold,
        confidence: 0.0,
        key_insights: vec![],
        risks: vec![],
        valuation_notes: None,
        degraded: true,
        raw_response: raw,
    }
}

/// First balanced JSON object in free-form text, string/escape aware.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn build_analysis_prompt(
    ctx: &AnalysisContext,
    knowledge: &[KnowledgeResult],
    frameworks: &[ValuationFramework],
) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "Analyze {} ({:?}, {:?} request).\n\n== Market data ==\n\
         price: {:.2}\nchange: {:+.2} ({:+.2}%)\nvolume: {}\n",
        ctx.symbol,
        ctx.instrument_type,
        ctx.analysis_type,
        ctx.market.price,
        ctx.market.change,
        ctx.market.change_percent,
        ctx.market.volume,
    ));
    if let Some(market_cap) = ctx.market.market_cap {
        prompt.push_str(&format!("market cap: {:.0}\n", market_cap));
    }

    prompt.push_str("\n== Fundamentals ==\n");
    let f = &ctx.fundamentals;
    for (label, value) in [
        ("P/E", f.pe_ratio),
        ("P/B", f.pb_ratio),
        ("EPS", f.eps),
        ("dividend yield", f.dividend_yield),
        ("debt/equity", f.debt_to_equity),
        ("ROE", f.return_on_equity),
        ("profit margin", f.profit_margin),
        ("revenue growth", f.revenue_growth),
    ] {
        if let Some(value) = value {
            prompt.push_str(&format!("{}: {:.2}\n", label, value));
        }
    }

    if !knowledge.is_empty() {
        prompt.push_str("\n== Reference material ==\n");
        for result in knowledge {
            prompt.push_str(&format!(
                "[relevance {:.0}%] {}\n",
                result.score * 100.0,
                result.content
            ));
        }
    }

    prompt.push_str("\n== Valuation frameworks ==\n");
    for framework in frameworks {
        prompt.push_str(&format!("{}: {}\n", framework.name, framework.description));
        for formula in &framework.formulas {
            prompt.push_str(&format!("  {} — {}\n", formula.name, formula.expression));
        }
    }

    prompt.push_str(
        "\nRespond with one JSON object with fields: \"summary\" (string), \
         \"recommendation\" (STRONG_BUY | BUY | HOLD | SELL | STRONG_SELL), \
         \"confidence\" (0..1), \"key_insights\" (string array), \"risks\" \
         (string array), \"valuation_notes\" (string).",
    );

    prompt
}
