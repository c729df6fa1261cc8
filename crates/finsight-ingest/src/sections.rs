//! Section splitting along financial-document header conventions.
//!
//! Recognized headers: `Chapter 4 …`, `Section 2 …`, `Part III` style labels
//! (with arabic numerals), `Reading 23 …` study-session markers, markdown
//! `#` headings, and dotted numeric headings such as `3.2 Dividend Discount
//! Models`. Sections shorter than the minimum length are discarded as noise.

use regex::Regex;

use finsight_core::defaults::MIN_SECTION_CHARS;

/// One contiguous section of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Sequential index after noise filtering; part of chunk identity.
    pub index: usize,
    pub title: String,
    pub body: String,
}

/// Split raw text into sections at recognized headers.
///
/// Text with no recognizable headers (or where every section is filtered as
/// noise) becomes a single section so that short documents still produce
/// chunks.
pub fn split_sections(text: &str) -> Vec<Section> {
    let header_re = Regex::new(
        r"(?im)^[ \t]*(?:(?:chapter|section|part|reading|module)[ \t]+\d+[^\r\n]*|#{1,6}[ \t]+[^\r\n]+|\d+(?:\.\d+)+[ \t]+[A-Z][^\r\n]*)$",
    )
    .unwrap();

    let headers: Vec<(usize, usize)> = header_re
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect();

    let mut sections: Vec<(String, &str)> = Vec::new();

    if let Some(&(first_start, _)) = headers.first() {
        // Preamble before the first header
        let preamble = &text[..first_start];
        if !preamble.trim().is_empty() {
            sections.push((first_short_line(preamble), preamble));
        }

        for (i, &(_, end)) in headers.iter().enumerate() {
            let body_end = headers.get(i + 1).map(|&(s, _)| s).unwrap_or(text.len());
            let title = clean_header(&text[headers[i].0..end]);
            sections.push((title, &text[end..body_end]));
        }
    } else if !text.trim().is_empty() {
        sections.push((first_short_line(text), text));
    }

    let mut kept: Vec<Section> = sections
        .into_iter()
        .filter(|(_, body)| body.trim().len() >= MIN_SECTION_CHARS)
        .enumerate()
        .map(|(index, (title, body))| Section {
            index,
            title,
            body: body.trim().to_string(),
        })
        .collect();

    // Everything filtered as noise: keep the whole text as one section.
    if kept.is_empty() && !text.trim().is_empty() {
        kept.push(Section {
            index: 0,
            title: first_short_line(text),
            body: text.trim().to_string(),
        });
    }

    kept
}

/// Strip markdown markers and surrounding whitespace from a header line.
fn clean_header(header: &str) -> String {
    header.trim().trim_start_matches('#').trim().to_string()
}

/// First non-trivial short line of a block, used as a fallback title.
fn first_short_line(block: &str) -> String {
    block
        .lines()
        .map(str::trim)
        .find(|line| line.len() >= 4 && line.len() <= 80)
        .unwrap_or("")
        .to_string()
}
