//! Additive relevance scoring between terms text and a clause record.
//!
//! Four signals are summed and the sum is scaled by the clause weight:
//!
//! | Signal | Bonus |
//! |---|---|
//! | detected category equals clause category | 30 |
//! | each title token (> 2 chars) found in the text | 10 |
//! | each key term present in both snippet and text | 5 |
//! | each pattern rule that fires and lists the clause id | 20 |
//!
//! No I/O, no state: the same `(text, clause)` pair always scores the same.

use termslens_core::{Category, ClauseRecord, detect_with};

use crate::rules::{MIN_TITLE_TOKEN_CHARS, ScoringRules};

/// Per-signal contributions for one `(text, clause)` pair, before weighting.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub category: f64,
    pub title: f64,
    pub key_terms: f64,
    pub patterns: f64,
    pub weight: f64,
}

impl ScoreBreakdown {
    pub fn unweighted(&self) -> f64 {
        self.category + self.title + self.key_terms + self.patterns
    }

    pub fn total(&self) -> f64 {
        self.unweighted() * self.weight
    }
}

/// Terms text with its lower-cased form and detected category computed once.
#[derive(Debug, Clone)]
pub struct PreparedText<'a> {
    raw: &'a str,
    lower: String,
    category: Category,
}

impl<'a> PreparedText<'a> {
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    pub fn category(&self) -> Category {
        self.category
    }
}

/// Scores clauses against terms text using a [`ScoringRules`] table.
#[derive(Debug, Clone, Default)]
pub struct RelevanceScorer {
    rules: ScoringRules,
}

impl RelevanceScorer {
    pub fn new(rules: ScoringRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ScoringRules {
        &self.rules
    }

    pub fn prepare<'a>(&self, text: &'a str) -> PreparedText<'a> {
        PreparedText {
            raw: text,
            lower: text.to_lowercase(),
            category: detect_with(self.rules.category_rules, text),
        }
    }

    /// Weighted relevance of `clause` for `text`. Never negative.
    pub fn score(&self, text: &str, clause: &ClauseRecord) -> f64 {
        self.score_prepared(&self.prepare(text), clause)
    }

    pub fn score_prepared(&self, text: &PreparedText<'_>, clause: &ClauseRecord) -> f64 {
        self.breakdown(text, clause).total()
    }

    pub fn breakdown(&self, text: &PreparedText<'_>, clause: &ClauseRecord) -> ScoreBreakdown {
        let rules = &self.rules;

        let category = if text.category == clause.category {
            rules.category_bonus
        } else {
            0.0
        };

        let title_hits = clause
            .title
            .to_lowercase()
            .split_whitespace()
            .filter(|token| token.chars().count() > MIN_TITLE_TOKEN_CHARS)
            .filter(|token| text.lower.contains(token))
            .count();

        let snippet = clause.snippet.to_lowercase();
        let key_term_hits = rules
            .key_terms
            .iter()
            .filter(|term| snippet.contains(term.as_str()) && text.lower.contains(term.as_str()))
            .count();

        let pattern_hits = rules
            .patterns
            .iter()
            .filter(|rule| rule.applies(text.raw, &clause.id))
            .count();

        ScoreBreakdown {
            category,
            title: title_hits as f64 * rules.title_token_bonus,
            key_terms: key_term_hits as f64 * rules.key_term_bonus,
            patterns: pattern_hits as f64 * rules.pattern_bonus,
            weight: clause.effective_weight(),
        }
    }
}
