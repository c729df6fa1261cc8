//! Document category classification.
//!
//! Title keywords are checked first; when the title is inconclusive the
//! content is scanned and the category with the most keyword hits wins.
//! Nothing matching falls back to [`DocumentCategory::General`].

use tracing::debug;

use finsight_core::DocumentCategory;

/// Keyword table per category. Order matters: earlier entries win on title
/// matches.
const CATEGORY_KEYWORDS: &[(DocumentCategory, &[&str])] = &[
    (
        DocumentCategory::EquityValuation,
        &["equity", "valuation", "stock analysis", "discounted cash flow", "dcf"],
    ),
    (
        DocumentCategory::FixedIncome,
        &["fixed income", "bond", "yield curve", "duration", "credit"],
    ),
    (
        DocumentCategory::Derivatives,
        &["derivative", "option", "futures", "swap", "forward contract"],
    ),
    (
        DocumentCategory::PortfolioManagement,
        &["portfolio", "asset allocation", "diversification", "rebalancing"],
    ),
    (
        DocumentCategory::RiskManagement,
        &["risk management", "value at risk", "var", "hedging", "exposure"],
    ),
    (
        DocumentCategory::Economics,
        &["economics", "macroeconomic", "inflation", "monetary policy", "gdp"],
    ),
    (
        DocumentCategory::QuantitativeMethods,
        &["quantitative", "statistics", "regression", "probability", "hypothesis"],
    ),
    (
        DocumentCategory::FinancialReporting,
        &["financial reporting", "accounting", "financial statement", "balance sheet"],
    ),
    (
        DocumentCategory::AlternativeInvestments,
        &["alternative investment", "real estate", "private equity", "hedge fund", "commodities"],
    ),
];

/// Minimum content keyword hits before a content-based classification is
/// trusted over the General fallback.
const MIN_CONTENT_HITS: usize = 3;

/// Characters of content inspected for the fallback pass.
const CONTENT_SCAN_CHARS: usize = 10_000;

/// Classify a document by title keywords, falling back to content
/// inspection, defaulting to `General`.
pub fn classify_document(title: &str, content: &str) -> DocumentCategory {
    let title_lower = title.to_lowercase();
    for (category, keywords) in CATEGORY_KEYWORDS {
        if keywords.iter().any(|kw| title_lower.contains(kw)) {
            debug!(?category, "Classified by title keywords");
            return *category;
        }
    }

    let scan_end = content
        .char_indices()
        .nth(CONTENT_SCAN_CHARS)
        .map(|(i, _)| i)
        .unwrap_or(content.len());
    let content_lower = content[..scan_end].to_lowercase();

    let mut best = (DocumentCategory::General, 0usize);
    for (category, keywords) in CATEGORY_KEYWORDS {
        let hits: usize = keywords
            .iter()
            .map(|kw| content_lower.matches(kw).count())
            .sum();
        if hits > best.1 {
            best = (*category, hits);
        }
    }

    if best.1 >= MIN_CONTENT_HITS {
        debug!(category = ?best.0, hits = best.1, "Classified by content keywords");
        best.0
    } else {
        DocumentCategory::General
    }
}
