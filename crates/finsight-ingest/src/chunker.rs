//! Sentence-bounded chunking and per-chunk metadata derivation.
//!
//! Within one section, sentences are greedily accumulated into a chunk until
//! adding the next sentence would exceed the token budget; the chunk is then
//! sealed and a new one started. A single sentence larger than the whole
//! budget is hard-split at char boundaries.

use regex::Regex;

use finsight_core::defaults::MIN_CHUNK_CHARS;
use finsight_core::tokenizer::estimate_tokens;
use finsight_core::ChunkMetadata;

use crate::concepts::{find_formulas, ConceptExtractor};

/// Characters per token, mirrored from the estimation heuristic.
const CHARS_PER_TOKEN: f32 = 3.7;

/// Split a section body into chunk texts bounded by `budget_tokens`.
pub fn chunk_section(body: &str, budget_tokens: usize) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for sentence in split_sentences(body) {
        if estimate_tokens(sentence) > budget_tokens {
            // Oversized sentence: seal what we have, then hard-split it.
            seal(&mut chunks, &mut current);
            chunks.extend(hard_split(sentence, budget_tokens));
            continue;
        }

        let projected = current.len() + if current.is_empty() { 0 } else { 1 } + sentence.len();
        if !current.is_empty() && char_estimate(projected) > budget_tokens {
            seal(&mut chunks, &mut current);
        }

        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(sentence);
    }
    seal(&mut chunks, &mut current);

    chunks.retain(|c| c.len() >= MIN_CHUNK_CHARS);
    chunks
}

fn seal(chunks: &mut Vec<String>, current: &mut String) {
    if !current.trim().is_empty() {
        chunks.push(std::mem::take(current));
    } else {
        current.clear();
    }
}

fn char_estimate(chars: usize) -> usize {
    (chars as f32 / CHARS_PER_TOKEN).ceil() as usize
}

/// Split text into trimmed sentences.
///
/// Sentence terminators are `.`, `!`, `?` followed by whitespace, with
/// guards against common abbreviations and decimal numbers.
fn split_sentences(text: &str) -> Vec<&str> {
    let terminator_re = Regex::new(r"[.!?]+(?:\s+|$)").unwrap();
    let abbrev_re =
        Regex::new(r"(?i)\b(?:dr|mr|mrs|ms|prof|inc|ltd|co|etc|vs|e\.g|i\.e|no)\.$").unwrap();

    let mut sentences = Vec::new();
    let mut last_end = 0;

    for mat in terminator_re.find_iter(text) {
        let candidate = &text[last_end..mat.end()];

        if abbrev_re.is_match(candidate.trim_end()) {
            continue;
        }

        // Preceded by a digit: likely a decimal point, not a terminator
        if mat.start() > 0
            && text[..mat.start()]
                .chars()
                .last()
                .is_some_and(|c| c.is_ascii_digit())
            && text[mat.end()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit() || c.is_lowercase())
        {
            continue;
        }

        let trimmed = candidate.trim();
        if !trimmed.is_empty() {
            sentences.push(trimmed);
        }
        last_end = mat.end();
    }

    if last_end < text.len() {
        let tail = text[last_end..].trim();
        if !tail.is_empty() {
            sentences.push(tail);
        }
    }

    sentences
}

/// Hard-split an oversized sentence into budget-sized pieces at char
/// boundaries.
fn hard_split(sentence: &str, budget_tokens: usize) -> Vec<String> {
    let piece_chars = (budget_tokens as f32 * CHARS_PER_TOKEN) as usize;
    let mut pieces = Vec::new();
    let mut offset = 0;

    while offset < sentence.len() {
        let mut end = (offset + piece_chars).min(sentence.len());
        while end > offset && !sentence.is_char_boundary(end) {
            end -= 1;
        }
        if end == offset {
            break;
        }
        pieces.push(sentence[offset..end].to_string());
        offset = end;
    }

    pieces
}

/// Derive structural metadata for one chunk.
///
/// The section title is the chunk's first non-trivial short line, falling
/// back to the enclosing section's header.
pub fn derive_metadata(
    extractor: &ConceptExtractor,
    content: &str,
    section_title: &str,
) -> ChunkMetadata {
    let own_title = content
        .lines()
        .map(str::trim)
        .find(|line| line.len() >= 4 && line.len() <= 80)
        .map(str::to_string);

    let section_title = own_title.or_else(|| {
        if section_title.is_empty() {
            None
        } else {
            Some(section_title.to_string())
        }
    });

    ChunkMetadata {
        section_title,
        topics: extractor.detect_topics(content),
        formulas: find_formulas(content),
        has_table: detect_table(content),
        has_figure: detect_figure(content),
    }
}

fn detect_table(content: &str) -> bool {
    let pipe_rows = content
        .lines()
        .filter(|l| l.matches('|').count() >= 2)
        .count();
    if pipe_rows >= 2 {
        return true;
    }
    Regex::new(r"(?i)\btable\s+\d").unwrap().is_match(content)
}

fn detect_figure(content: &str) -> bool {
    Regex::new(r"(?i)\b(?:figure|exhibit|chart)\s+\d")
        .unwrap()
        .is_match(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use finsight_core::defaults::CHUNK_TOKEN_BUDGET;

    #[test]
    fn test_chunks_respect_token_budget() {
        let body = "The dividend discount model values a stock as the present value \
                    of expected dividends. "
            .repeat(60);
        let chunks = chunk_section(&body, CHUNK_TOKEN_BUDGET);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(
                estimate_tokens(chunk) <= CHUNK_TOKEN_BUDGET,
                "chunk exceeds budget: {} tokens",
                estimate_tokens(chunk)
            );
        }
    }

    #[test]
    fn test_short_body_single_chunk() {
        let body = "Beta measures systematic risk relative to the market portfolio.";
        let chunks = chunk_section(body, CHUNK_TOKEN_BUDGET);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], body);
    }

    #[test]
    fn test_tiny_fragments_dropped() {
        let chunks = chunk_section("Ok.", CHUNK_TOKEN_BUDGET);
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_oversized_sentence_hard_split() {
        // One giant "sentence" with no terminators
        let body = "x".repeat(8_000);
        let chunks = chunk_section(&body, 100);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(estimate_tokens(chunk) <= 100);
        }
    }

    #[test]
    fn test_split_sentences_basic() {
        let sentences = split_sentences("First sentence. Second sentence! Third?");
        assert_eq!(
            sentences,
            vec!["First sentence.", "Second sentence!", "Third?"]
        );
    }

    #[test]
    fn test_split_sentences_decimal_guard() {
        let sentences = split_sentences("The ratio rose to 3.5 percent. Growth continued.");
        assert_eq!(sentences.len(), 2);
        assert!(sentences[0].contains("3.5 percent"));
    }

    #[test]
    fn test_split_sentences_abbreviation_guard() {
        let sentences = split_sentences("Growth was driven by Acme Inc. and its partners. Done.");
        assert_eq!(sentences.len(), 2);
        assert!(sentences[0].contains("Inc. and its partners"));
    }

    #[test]
    fn test_metadata_section_title_from_first_short_line() {
        let extractor = ConceptExtractor::new();
        let content = "Dividend Discount Basics\nThe model discounts future dividends to \
                       present value using the required return on equity.";
        let metadata = derive_metadata(&extractor, content, "Chapter 5");
        assert_eq!(
            metadata.section_title.as_deref(),
            Some("Dividend Discount Basics")
        );
    }

    #[test]
    fn test_metadata_falls_back_to_section_header() {
        let extractor = ConceptExtractor::new();
        // Single long line: no short line candidate inside the chunk
        let content = "w".repeat(200);
        let metadata = derive_metadata(&extractor, &content, "Chapter 5 Valuation");
        assert_eq!(metadata.section_title.as_deref(), Some("Chapter 5 Valuation"));
    }

    #[test]
    fn test_metadata_detects_formulas_and_topics() {
        let extractor = ConceptExtractor::new();
        let content = "Weighted average cost of capital drives discounting.\n\
                       WACC = E/V * Re + D/V * Rd * (1 - Tc)\n\
                       The discounted cash flow approach uses this rate.";
        let metadata = derive_metadata(&extractor, content, "");
        assert!(!metadata.formulas.is_empty());
        assert!(metadata
            .topics
            .iter()
            .any(|t| t.contains("weighted average cost of capital") || t.contains("discounted cash flow")));
    }

    #[test]
    fn test_metadata_table_and_figure_flags() {
        let extractor = ConceptExtractor::new();
        let with_pipes = "Year | FCF | Discount\n2023 | 100 | 0.93\n2024 | 110 | 0.86";
        let metadata = derive_metadata(&extractor, with_pipes, "");
        assert!(metadata.has_table);

        let with_figure = "As shown in Figure 3, volatility clusters over time.";
        let metadata = derive_metadata(&extractor, with_figure, "");
        assert!(metadata.has_figure);

        let plain = "No structure here at all.";
        let metadata = derive_metadata(&extractor, plain, "");
        assert!(!metadata.has_table);
        assert!(!metadata.has_figure);
    }
}
