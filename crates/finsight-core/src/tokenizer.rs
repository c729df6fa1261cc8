//! Token estimation and budgeted truncation.
//!
//! Token counts in finsight are estimates by contract: the chunker and the
//! embedding service both bound their inputs with the same heuristic, so
//! exact BPE counting is unnecessary. The ratio of ~3.7 characters per token
//! holds for English prose.

use crate::defaults::TRUNCATION_BOUNDARY_WINDOW;

/// Characters per token for English text.
const CHARS_PER_TOKEN: f32 = 3.7;

/// Quickly estimate token count without tokenization.
///
/// Returns the estimated number of tokens, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    (text.len() as f32 / CHARS_PER_TOKEN).ceil() as usize
}

/// Check if text likely exceeds a token limit using estimation.
pub fn likely_exceeds_limit(text: &str, limit: usize) -> bool {
    estimate_tokens(text) > limit
}

/// Truncate text to an estimated token budget.
///
/// When the text fits the budget it is returned unchanged. Otherwise the cut
/// prefers the last sentence boundary, but only if that boundary falls within
/// the final 20% of the truncation window; a boundary earlier than that would
/// discard too much content, so a hard cut (at a char boundary) is used
/// instead.
pub fn truncate_to_token_budget(text: &str, max_tokens: usize) -> &str {
    let budget_chars = (max_tokens as f32 * CHARS_PER_TOKEN) as usize;
    if text.len() <= budget_chars {
        return text;
    }

    let hard_cut = floor_char_boundary(text, budget_chars);
    let window = &text[..hard_cut];

    let earliest = (budget_chars as f32 * (1.0 - TRUNCATION_BOUNDARY_WINDOW)) as usize;
    match last_sentence_end(window) {
        Some(end) if end >= earliest => &text[..end],
        _ => window,
    }
}

/// Byte offset just past the last sentence terminator in `text`, if any.
///
/// A terminator is `.`, `!`, or `?` followed by whitespace or end of input.
fn last_sentence_end(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut result = None;
    for (i, b) in bytes.iter().enumerate() {
        if matches!(b, b'.' | b'!' | b'?') {
            let at_end = i + 1 == bytes.len();
            let before_space = bytes.get(i + 1).is_some_and(|n| n.is_ascii_whitespace());
            if at_end || before_space {
                result = Some(i + 1);
            }
        }
    }
    result
}

/// Largest char boundary at or before `pos`.
fn floor_char_boundary(text: &str, mut pos: usize) -> usize {
    if pos >= text.len() {
        return text.len();
    }
    while pos > 0 && !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}
