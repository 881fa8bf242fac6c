//! Bounding long terms text before retrieval and prompt assembly.
//!
//! Text under the limit is only whitespace-normalised. Longer text keeps
//! the paragraphs that mention a high-value keyword (in input order);
//! when nothing qualifies the text is cut at the limit and marked.
//!
//! All lengths are counted in characters, not bytes.

use std::sync::OnceLock;

use regex::Regex;
use tracing::info;

use crate::terms::{ReducedBlock, TermsBlock};

/// Default bound on reduced text length, in characters.
pub const DEFAULT_MAX_LENGTH: usize = 3000;

/// Appended whenever text is cut at the bound.
pub const TRUNCATION_MARKER: &str = "... (이하 생략)";

/// Paragraphs must be longer than this (in characters) to be retained.
pub const MIN_PARAGRAPH_LENGTH: usize = 50;

/// Keywords that make a paragraph worth keeping.
pub const KEY_PARAGRAPH_KEYWORDS: &[&str] = &[
    "개인정보", "수집", "제3자", "마케팅", "광고", //
    "비용", "요금", "결제", "환불", "해지", //
    "책임", "면책", "손해배상", "위험", "주의",
];

static PARAGRAPH_BREAK: OnceLock<Regex> = OnceLock::new();
static EXCESS_NEWLINES: OnceLock<Regex> = OnceLock::new();
static EXCESS_WHITESPACE: OnceLock<Regex> = OnceLock::new();

/// Tunables for [`ReducerConfig::reduce`]. `Default` reproduces the
/// built-in constants.
#[derive(Debug, Clone)]
pub struct ReducerConfig {
    pub max_length: usize,
    pub keywords: Vec<String>,
    pub min_paragraph_length: usize,
    pub truncation_marker: String,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_LENGTH,
            keywords: KEY_PARAGRAPH_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            min_paragraph_length: MIN_PARAGRAPH_LENGTH,
            truncation_marker: TRUNCATION_MARKER.to_string(),
        }
    }
}

/// How a piece of text was reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReductionKind {
    /// Already within bounds; only whitespace was normalised.
    Normalized,
    /// Keyword-bearing paragraphs were kept.
    Extracted { paragraphs: usize },
    /// Cut at the bound and marked.
    Truncated,
}

/// Result of reducing one text.
#[derive(Debug, Clone)]
pub struct Reduction {
    pub text: String,
    pub kind: ReductionKind,
}

impl ReducerConfig {
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            ..Self::default()
        }
    }

    /// Reduce `text` to at most `max_length` characters plus the marker.
    pub fn reduce(&self, text: &str) -> Reduction {
        if char_len(text) <= self.max_length {
            return Reduction {
                text: normalize_whitespace(text),
                kind: ReductionKind::Normalized,
            };
        }

        let para_re = PARAGRAPH_BREAK.get_or_init(|| Regex::new(r"\n\n+").expect("valid regex"));
        let kept: Vec<&str> = para_re
            .split(text)
            .filter(|para| self.is_key_paragraph(para))
            .collect();

        if kept.is_empty() {
            let cut = format!(
                "{}{}",
                truncate_chars(text, self.max_length),
                self.truncation_marker
            );
            return Reduction {
                text: normalize_whitespace(&cut),
                kind: ReductionKind::Truncated,
            };
        }

        let paragraphs = kept.len();
        let joined = normalize_whitespace(&kept.join("\n\n"));
        let text = if char_len(&joined) > self.max_length {
            format!(
                "{}{}",
                truncate_chars(&joined, self.max_length),
                self.truncation_marker
            )
        } else {
            joined
        };

        Reduction {
            text,
            kind: ReductionKind::Extracted { paragraphs },
        }
    }

    fn is_key_paragraph(&self, para: &str) -> bool {
        char_len(para) > self.min_paragraph_length
            && self.keywords.iter().any(|kw| para.contains(kw.as_str()))
    }
}

/// Reduce `text` with the default keyword table and the given bound.
pub fn reduce(text: &str, max_length: usize) -> String {
    ReducerConfig::with_max_length(max_length).reduce(text).text
}

/// Reduce every block, assigning 1-based indices to blocks that lack one.
pub fn reduce_blocks(blocks: &[TermsBlock], config: &ReducerConfig) -> Vec<ReducedBlock> {
    blocks
        .iter()
        .enumerate()
        .map(|(pos, block)| {
            let index = block.index.unwrap_or(pos + 1);
            let reduction = config.reduce(&block.text);
            match reduction.kind {
                ReductionKind::Extracted { paragraphs } => {
                    info!(index, paragraphs, "kept key paragraphs");
                }
                ReductionKind::Truncated => {
                    info!(index, max_length = config.max_length, "truncated terms text");
                }
                ReductionKind::Normalized => {}
            }
            ReducedBlock {
                index,
                category_hint: block.category_hint.clone(),
                is_required: block.is_required,
                text: reduction.text,
            }
        })
        .collect()
}

/// Collapse 3+ newlines to two, then any run of 2+ whitespace to one space.
pub fn normalize_whitespace(text: &str) -> String {
    let newlines = EXCESS_NEWLINES.get_or_init(|| Regex::new(r"\n{3,}").expect("valid regex"));
    let spaces = EXCESS_WHITESPACE.get_or_init(|| Regex::new(r"\s{2,}").expect("valid regex"));
    let text = newlines.replace_all(text, "\n\n");
    spaces.replace_all(&text, " ").into_owned()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Longest prefix of `s` with at most `n` characters.
fn truncate_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
