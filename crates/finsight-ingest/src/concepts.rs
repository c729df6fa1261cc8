//! Financial concept extraction.
//!
//! Two independent producers feed one value type: a deterministic pattern
//! pass over a fixed recognizer table, and an optional generative pass that
//! asks the generation backend for a JSON concept list. The two result sets
//! are combined by an explicit, order-sensitive merge keyed by normalized
//! concept name.
//!
//! Extraction never fails past its boundary: malformed generative replies
//! and backend errors yield empty or partial results.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use tracing::{debug, warn};

use finsight_core::defaults::GENERATIVE_MIN_INPUT_CHARS;
use finsight_core::{ConceptCategory, FinancialConcept, GenerationBackend};

/// One recognizer: canonical concept name, category, and the pattern that
/// detects mentions of it.
struct PatternSpec {
    name: &'static str,
    category: ConceptCategory,
    pattern: &'static str,
}

const PATTERN_SPECS: &[PatternSpec] = &[
    // Valuation
    PatternSpec { name: "discounted cash flow", category: ConceptCategory::Valuation, pattern: r"(?i)\bdiscounted cash flow\b|\bDCF\b" },
    PatternSpec { name: "net present value", category: ConceptCategory::Valuation, pattern: r"(?i)\bnet present value\b|\bNPV\b" },
    PatternSpec { name: "intrinsic value", category: ConceptCategory::Valuation, pattern: r"(?i)\bintrinsic value\b" },
    PatternSpec { name: "terminal value", category: ConceptCategory::Valuation, pattern: r"(?i)\bterminal value\b" },
    PatternSpec { name: "dividend discount model", category: ConceptCategory::Valuation, pattern: r"(?i)\bdividend discount model\b|\bDDM\b" },
    PatternSpec { name: "free cash flow", category: ConceptCategory::Valuation, pattern: r"(?i)\bfree cash flow\b|\bFCFF?\b|\bFCFE\b" },
    PatternSpec { name: "weighted average cost of capital", category: ConceptCategory::Valuation, pattern: r"(?i)\bweighted average cost of capital\b|\bWACC\b" },
    PatternSpec { name: "enterprise value", category: ConceptCategory::Valuation, pattern: r"(?i)\benterprise value\b|\bEV/EBITDA\b" },
    // Ratio analysis
    PatternSpec { name: "price-to-earnings ratio", category: ConceptCategory::RatioAnalysis, pattern: r"(?i)\bprice[- ]to[- ]earnings\b|\bP/E ratio\b|\bP/E\b" },
    PatternSpec { name: "price-to-book ratio", category: ConceptCategory::RatioAnalysis, pattern: r"(?i)\bprice[- ]to[- ]book\b|\bP/B ratio\b" },
    PatternSpec { name: "return on equity", category: ConceptCategory::RatioAnalysis, pattern: r"(?i)\breturn on equity\b|\bROE\b" },
    PatternSpec { name: "return on assets", category: ConceptCategory::RatioAnalysis, pattern: r"(?i)\breturn on assets\b|\bROA\b" },
    PatternSpec { name: "debt-to-equity ratio", category: ConceptCategory::RatioAnalysis, pattern: r"(?i)\bdebt[- ]to[- ]equity\b" },
    PatternSpec { name: "earnings per share", category: ConceptCategory::RatioAnalysis, pattern: r"(?i)\bearnings per share\b|\bEPS\b" },
    PatternSpec { name: "current ratio", category: ConceptCategory::RatioAnalysis, pattern: r"(?i)\bcurrent ratio\b|\bquick ratio\b" },
    PatternSpec { name: "profit margin", category: ConceptCategory::RatioAnalysis, pattern: r"(?i)\bprofit margin\b|\boperating margin\b" },
    // Risk metrics
    PatternSpec { name: "value at risk", category: ConceptCategory::RiskMetrics, pattern: r"(?i)\bvalue at risk\b|\bVaR\b" },
    PatternSpec { name: "volatility", category: ConceptCategory::RiskMetrics, pattern: r"(?i)\bvolatility\b|\bstandard deviation of returns\b" },
    PatternSpec { name: "beta", category: ConceptCategory::RiskMetrics, pattern: r"(?i)\bbeta coefficient\b|\bsystematic risk\b|\bbeta\b" },
    PatternSpec { name: "maximum drawdown", category: ConceptCategory::RiskMetrics, pattern: r"(?i)\bmax(?:imum)? drawdown\b" },
    PatternSpec { name: "sharpe ratio", category: ConceptCategory::RiskMetrics, pattern: r"(?i)\bsharpe ratio\b|\bsortino ratio\b" },
    // Portfolio theory
    PatternSpec { name: "modern portfolio theory", category: ConceptCategory::PortfolioTheory, pattern: r"(?i)\bmodern portfolio theory\b|\bMPT\b" },
    PatternSpec { name: "efficient frontier", category: ConceptCategory::PortfolioTheory, pattern: r"(?i)\befficient frontier\b" },
    PatternSpec { name: "diversification", category: ConceptCategory::PortfolioTheory, pattern: r"(?i)\bdiversification\b|\basset allocation\b" },
    PatternSpec { name: "capital asset pricing model", category: ConceptCategory::PortfolioTheory, pattern: r"(?i)\bcapital asset pricing model\b|\bCAPM\b" },
    PatternSpec { name: "correlation", category: ConceptCategory::PortfolioTheory, pattern: r"(?i)\bcorrelation\b|\bcovariance\b" },
    // Fixed income
    PatternSpec { name: "yield to maturity", category: ConceptCategory::FixedIncome, pattern: r"(?i)\byield to maturity\b|\bYTM\b" },
    PatternSpec { name: "duration", category: ConceptCategory::FixedIncome, pattern: r"(?i)\b(?:modified|macaulay) duration\b|\bduration\b" },
    PatternSpec { name: "convexity", category: ConceptCategory::FixedIncome, pattern: r"(?i)\bconvexity\b" },
    PatternSpec { name: "credit spread", category: ConceptCategory::FixedIncome, pattern: r"(?i)\bcredit spread\b|\bcoupon rate\b" },
    // Equity
    PatternSpec { name: "dividend yield", category: ConceptCategory::Equity, pattern: r"(?i)\bdividend yield\b" },
    PatternSpec { name: "market capitalization", category: ConceptCategory::Equity, pattern: r"(?i)\bmarket capitali[sz]ation\b|\bmarket cap\b" },
    PatternSpec { name: "book value", category: ConceptCategory::Equity, pattern: r"(?i)\bbook value\b" },
    PatternSpec { name: "preferred stock", category: ConceptCategory::Equity, pattern: r"(?i)\bpreferred stock\b|\bcommon stock\b" },
    // Derivatives
    PatternSpec { name: "option pricing", category: ConceptCategory::Derivatives, pattern: r"(?i)\boption pricing\b|\bblack[- ]scholes\b" },
    PatternSpec { name: "futures contract", category: ConceptCategory::Derivatives, pattern: r"(?i)\bfutures contract\b|\bforward contract\b" },
    PatternSpec { name: "hedging", category: ConceptCategory::Derivatives, pattern: r"(?i)\bhedg(?:e|ing)\b|\bswap\b" },
    // Economics
    PatternSpec { name: "inflation", category: ConceptCategory::Economics, pattern: r"(?i)\binflation\b|\bCPI\b" },
    PatternSpec { name: "interest rate", category: ConceptCategory::Economics, pattern: r"(?i)\binterest rate\b|\bfederal funds rate\b" },
    PatternSpec { name: "monetary policy", category: ConceptCategory::Economics, pattern: r"(?i)\bmonetary policy\b|\bfiscal policy\b" },
    PatternSpec { name: "gross domestic product", category: ConceptCategory::Economics, pattern: r"(?i)\bgross domestic product\b|\bGDP\b" },
    // Statistics
    PatternSpec { name: "regression analysis", category: ConceptCategory::Statistics, pattern: r"(?i)\bregression\b" },
    PatternSpec { name: "hypothesis testing", category: ConceptCategory::Statistics, pattern: r"(?i)\bhypothesis test(?:ing)?\b|\bp-value\b" },
    PatternSpec { name: "confidence interval", category: ConceptCategory::Statistics, pattern: r"(?i)\bconfidence interval\b" },
    PatternSpec { name: "normal distribution", category: ConceptCategory::Statistics, pattern: r"(?i)\bnormal distribution\b|\blog-?normal\b" },
];

/// Built-in glossary, keyed by normalized concept name.
fn glossary() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("discountedcashflow", "Valuation method that estimates intrinsic value as the present value of expected future cash flows, discounted at a rate reflecting their risk."),
        ("netpresentvalue", "The sum of discounted future cash flows minus the initial investment; positive values indicate value creation."),
        ("weightedaveragecostofcapital", "Blended required return across a firm's equity and debt financing, weighted by market values; the standard discount rate for firm-level cash flows."),
        ("dividenddiscountmodel", "Equity valuation model expressing share value as the present value of expected future dividends."),
        ("freecashflow", "Cash generated by operations after capital expenditures, available to the firm's capital providers."),
        ("pricetoearningsratio", "Share price divided by earnings per share; a relative valuation multiple comparing price to current profitability."),
        ("pricetobookratio", "Share price divided by book value per share; compares market valuation to accounting net assets."),
        ("returnonequity", "Net income divided by shareholders' equity; measures profitability per unit of owner capital."),
        ("earningspershare", "Net income attributable to common shareholders divided by weighted average shares outstanding."),
        ("valueatrisk", "Estimated maximum loss over a horizon at a given confidence level, under normal market conditions."),
        ("beta", "Sensitivity of an asset's returns to market returns; the systematic risk exposure priced by the CAPM."),
        ("sharperatio", "Excess return per unit of total risk, computed as (return minus risk-free rate) divided by return standard deviation."),
        ("capitalassetpricingmodel", "Model relating expected return to systematic risk: expected return equals the risk-free rate plus beta times the market risk premium."),
        ("efficientfrontier", "Set of portfolios offering the highest expected return for each level of risk."),
        ("yieldtomaturity", "Single discount rate equating a bond's price to the present value of its remaining cash flows."),
        ("duration", "Weighted-average time to a bond's cash flows; first-order sensitivity of price to yield changes."),
        ("convexity", "Second-order sensitivity of bond price to yield changes; improves on duration for large moves."),
        ("dividendyield", "Annual dividends per share divided by share price."),
    ])
}

/// Generic applications per category.
fn category_applications(category: ConceptCategory) -> Vec<String> {
    let apps: &[&str] = match category {
        ConceptCategory::Valuation => &["Estimating intrinsic value", "Screening for mispriced securities"],
        ConceptCategory::RatioAnalysis => &["Comparing profitability across companies", "Tracking financial health over time"],
        ConceptCategory::RiskMetrics => &["Sizing position risk", "Setting portfolio risk limits"],
        ConceptCategory::PortfolioTheory => &["Asset allocation decisions", "Diversification planning"],
        ConceptCategory::FixedIncome => &["Pricing bonds", "Managing interest-rate exposure"],
        ConceptCategory::Equity => &["Evaluating shareholder returns", "Equity screening"],
        ConceptCategory::Derivatives => &["Hedging market exposure", "Pricing contingent claims"],
        ConceptCategory::Economics => &["Forming macroeconomic outlooks", "Anticipating policy impacts"],
        ConceptCategory::Statistics => &["Validating model assumptions", "Quantifying estimation uncertainty"],
    };
    apps.iter().map(|s| s.to_string()).collect()
}

/// Formula-like substrings in a block of text.
///
/// A candidate is a line containing an `=` with operator characters around
/// it, bounded to a plausible formula length.
pub fn find_formulas(text: &str) -> Vec<String> {
    let mut formulas = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.len() < 8 || trimmed.len() > 120 {
            continue;
        }
        let Some(eq_pos) = trimmed.find('=') else {
            continue;
        };
        // Require something on both sides and at least one math operator
        let rhs = &trimmed[eq_pos + 1..];
        if eq_pos < 1 || rhs.trim().len() < 2 {
            continue;
        }
        if trimmed.chars().any(|c| matches!(c, '+' | '-' | '*' | '/' | '^' | '(' | 'Σ')) {
            if !formulas.contains(&trimmed.to_string()) {
                formulas.push(trimmed.to_string());
            }
            if formulas.len() >= 5 {
                break;
            }
        }
    }
    formulas
}

struct CompiledPattern {
    name: &'static str,
    category: ConceptCategory,
    regex: Regex,
}

/// Extractor combining the pattern table with an optional generative pass.
pub struct ConceptExtractor {
    patterns: Vec<CompiledPattern>,
    glossary: HashMap<&'static str, &'static str>,
    generation: Option<Arc<dyn GenerationBackend>>,
}

impl ConceptExtractor {
    /// Pattern-only extractor.
    pub fn new() -> Self {
        let patterns = PATTERN_SPECS
            .iter()
            .map(|spec| CompiledPattern {
                name: spec.name,
                category: spec.category,
                regex: Regex::new(spec.pattern).unwrap(),
            })
            .collect();
        Self {
            patterns,
            glossary: glossary(),
            generation: None,
        }
    }

    /// Extractor with a generative pass on top of the pattern table.
    pub fn with_generation(backend: Arc<dyn GenerationBackend>) -> Self {
        let mut extractor = Self::new();
        extractor.generation = Some(backend);
        extractor
    }

    /// Extract concepts from a text fragment.
    ///
    /// Never fails: backend errors and malformed replies degrade to the
    /// pattern-pass result (or an empty list).
    pub async fn extract_concepts(
        &self,
        text: &str,
        suggested_topics: &[String],
    ) -> Vec<FinancialConcept> {
        let pattern_concepts = self.pattern_pass(text);

        let generative_concepts = match &self.generation {
            Some(backend) if text.len() >= GENERATIVE_MIN_INPUT_CHARS => {
                self.generative_pass(backend.as_ref(), text, suggested_topics)
                    .await
            }
            _ => Vec::new(),
        };

        merge_concepts(pattern_concepts, generative_concepts)
    }

    /// Canonical names of patterns matching the text, used as chunk topics.
    pub fn detect_topics(&self, text: &str) -> Vec<String> {
        let mut topics = Vec::new();
        for pattern in &self.patterns {
            if pattern.regex.is_match(text) {
                topics.push(pattern.name.to_string());
                if topics.len() >= 10 {
                    break;
                }
            }
        }
        topics
    }

    fn pattern_pass(&self, text: &str) -> Vec<FinancialConcept> {
        let matched: Vec<&CompiledPattern> = self
            .patterns
            .iter()
            .filter(|p| p.regex.is_match(text))
            .collect();

        let formulas = find_formulas(text);

        matched
            .iter()
            .map(|pattern| {
                let key = FinancialConcept::normalize_name(pattern.name);
                let definition = self
                    .glossary
                    .get(key.as_str())
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| generic_definition(pattern.name, pattern.category));

                // Related concepts: other recognizers firing in the same text
                let related: Vec<String> = matched
                    .iter()
                    .filter(|other| other.name != pattern.name)
                    .take(5)
                    .map(|other| other.name.to_string())
                    .collect();

                FinancialConcept {
                    name: pattern.name.to_string(),
                    category: pattern.category,
                    definition,
                    related,
                    formulas: formulas.clone(),
                    applications: category_applications(pattern.category),
                }
            })
            .collect()
    }

    async fn generative_pass(
        &self,
        backend: &dyn GenerationBackend,
        text: &str,
        suggested_topics: &[String],
    ) -> Vec<FinancialConcept> {
        let prompt = build_extraction_prompt(text, suggested_topics);
        match backend.generate(&prompt).await {
            Ok(reply) => {
                let concepts = parse_concept_reply(&reply);
                debug!(
                    count = concepts.len(),
                    "Generative concept pass complete"
                );
                concepts
            }
            Err(e) => {
                warn!(error = %e, "Generative concept pass failed, using pattern results only");
                Vec::new()
            }
        }
    }
}

impl Default for ConceptExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn generic_definition(name: &str, category: ConceptCategory) -> String {
    format!(
        "{} is a {} concept used in financial analysis and investment decision making.",
        name,
        category.label()
    )
}

fn build_extraction_prompt(text: &str, suggested_topics: &[String]) -> String {
    let categories: Vec<String> = ConceptCategory::all().iter().map(|c| c.to_string()).collect();
    let topics = if suggested_topics.is_empty() {
        "none".to_string()
    } else {
        suggested_topics.join(", ")
    };
    // Bound the text sent to the backend; concepts repeat, so the head is enough
    let excerpt: String = text.chars().take(4_000).collect();
    format!(
        "Extract the financial concepts defined or discussed in the text below.\n\
         Suggested topics: {topics}\n\
         Respond with a JSON array only. Each element must have \"name\", \
         \"definition\", and \"category\" (one of: {categories}), and may have \
         \"related\", \"formulas\", and \"applications\" as string arrays.\n\n\
         Text:\n{excerpt}",
        topics = topics,
        categories = categories.join(", "),
        excerpt = excerpt,
    )
}

/// Parse the generative reply into concepts, dropping schema-invalid items
/// silently.
fn parse_concept_reply(reply: &str) -> Vec<FinancialConcept> {
    let Some(json) = extract_json_array(reply) else {
        debug!("No JSON array found in concept reply");
        return Vec::new();
    };

    let Ok(items) = serde_json::from_str::<Vec<serde_json::Value>>(json) else {
        debug!("Concept reply array failed to parse");
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| {
            let name = item.get("name")?.as_str()?.trim().to_string();
            let definition = item.get("definition")?.as_str()?.trim().to_string();
            let category: ConceptCategory = item.get("category")?.as_str()?.parse().ok()?;
            if name.is_empty() || definition.is_empty() {
                return None;
            }
            Some(FinancialConcept {
                name,
                category,
                definition,
                related: string_array(&item, "related"),
                formulas: string_array(&item, "formulas"),
                applications: string_array(&item, "applications"),
            })
        })
        .collect()
}

fn string_array(item: &serde_json::Value, field: &str) -> Vec<String> {
    item.get(field)
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

/// First balanced JSON array in free-form text, string/escape aware.
fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
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
            b'[' if !in_string => depth += 1,
            b']' if !in_string => {
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

/// Merge pattern-derived and generative-derived concepts.
///
/// Keyed by normalized name. The generative definition wins when present;
/// related terms, formulas, and applications are unioned, which preserves
/// pattern-derived formulas when the generative side provides none. Order is
/// pattern results first, then new generative concepts.
pub fn merge_concepts(
    pattern: Vec<FinancialConcept>,
    generative: Vec<FinancialConcept>,
) -> Vec<FinancialConcept> {
    let mut order: Vec<String> = Vec::new();
    let mut by_key: HashMap<String, FinancialConcept> = HashMap::new();

    for concept in pattern.into_iter().chain(generative.into_iter()) {
        let key = concept.key();
        match by_key.get_mut(&key) {
            None => {
                order.push(key.clone());
                by_key.insert(key, concept);
            }
            Some(existing) => {
                if !concept.definition.trim().is_empty() {
                    existing.definition = concept.definition;
                }
                union_into(&mut existing.related, concept.related);
                union_into(&mut existing.formulas, concept.formulas);
                union_into(&mut existing.applications, concept.applications);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| by_key.remove(&key))
        .collect()
}

fn union_into(target: &mut Vec<String>, incoming: Vec<String>) {
    for value in incoming {
        if !target.contains(&value) {
            target.push(value);
        }
    }
}
