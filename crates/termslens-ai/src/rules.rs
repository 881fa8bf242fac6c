//! Data tables driving the relevance scorer.
//!
//! Bonus magnitudes, the snippet key-term list and the pattern-to-clause
//! table are plain values here so they can be tested and swapped without
//! touching the scoring code. `ScoringRules::default()` reproduces the
//! built-in tables exactly.

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use termslens_core::{CATEGORY_RULES, CategoryRule};
use thiserror::Error;

pub const CATEGORY_BONUS: f64 = 30.0;
pub const TITLE_TOKEN_BONUS: f64 = 10.0;
pub const KEY_TERM_BONUS: f64 = 5.0;
pub const PATTERN_BONUS: f64 = 20.0;

/// Title tokens must be longer than this many characters to count.
pub const MIN_TITLE_TOKEN_CHARS: usize = 2;

/// Terms that score when present in both the clause snippet and the text.
pub const KEY_TERMS: &[&str] = &[
    "수집", "이용", "제공", "동의", "고지", "목적", "제3자", "개인정보", //
    "환불", "철회", "해지", "위약금", "책임", "면책", "마케팅", "광고",
];

/// Built-in pattern table: (regex over the text, eligible clause ids).
///
/// These ids are tied to the shipped `law_kb.json`.
pub const PATTERN_TABLE: &[(&str, &[&str])] = &[
    ("개인정보.*수집|수집.*개인정보", &["P1", "P2", "P3"]),
    ("제3자.*제공|제공.*제3자", &["P4", "TP1", "TP3"]),
    ("환불|철회|반품", &["T1", "T2"]),
    ("마케팅|광고", &["M1", "M2", "M6"]),
    ("위약금|손해배상", &["T4"]),
];

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("pattern table is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A text pattern that boosts a fixed set of clauses.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pattern: Regex,
    clause_ids: Vec<String>,
}

impl PatternRule {
    /// Compile a case-insensitive pattern. `.` does not match newlines.
    pub fn new<S: AsRef<str>>(pattern: &str, clause_ids: &[S]) -> Result<Self, RuleError> {
        let compiled = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| RuleError::Pattern {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self {
            pattern: compiled,
            clause_ids: clause_ids.iter().map(|s| s.as_ref().to_string()).collect(),
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn clause_ids(&self) -> &[String] {
        &self.clause_ids
    }

    /// Whether this rule boosts `clause_id` for `text`.
    pub fn applies(&self, text: &str, clause_id: &str) -> bool {
        self.clause_ids.iter().any(|id| id == clause_id) && self.pattern.is_match(text)
    }
}

/// Serialised form of a pattern rule, as read from a JSON override file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternRuleSpec {
    pub pattern: String,
    pub clause_ids: Vec<String>,
}

/// Every constant the scorer consults.
#[derive(Debug, Clone)]
pub struct ScoringRules {
    pub category_rules: &'static [CategoryRule],
    pub category_bonus: f64,
    pub title_token_bonus: f64,
    pub key_term_bonus: f64,
    pub pattern_bonus: f64,
    /// Stored lower-case.
    pub key_terms: Vec<String>,
    pub patterns: Vec<PatternRule>,
}

impl Default for ScoringRules {
    fn default() -> Self {
        let patterns = PATTERN_TABLE
            .iter()
            .map(|&(pattern, ids)| {
                PatternRule::new(pattern, ids).expect("built-in pattern table is valid")
            })
            .collect();
        Self {
            category_rules: CATEGORY_RULES,
            category_bonus: CATEGORY_BONUS,
            title_token_bonus: TITLE_TOKEN_BONUS,
            key_term_bonus: KEY_TERM_BONUS,
            pattern_bonus: PATTERN_BONUS,
            key_terms: KEY_TERMS.iter().map(|t| t.to_lowercase()).collect(),
            patterns,
        }
    }
}

impl ScoringRules {
    /// Replace the pattern table, keeping every other default.
    pub fn with_patterns(specs: &[PatternRuleSpec]) -> Result<Self, RuleError> {
        let patterns = specs
            .iter()
            .map(|spec| PatternRule::new(&spec.pattern, spec.clause_ids.as_slice()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            patterns,
            ..Self::default()
        })
    }

    /// Parse a JSON array of `{ "pattern": ..., "clauseIds": [...] }`.
    pub fn patterns_from_json(raw: &str) -> Result<Self, RuleError> {
        let specs: Vec<PatternRuleSpec> = serde_json::from_str(raw)?;
        Self::with_patterns(&specs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(n: usize) -> PatternRule {
        let rules = ScoringRules::default();
        rules.patterns[n].clone()
    }

    #[test]
    fn default_tables_have_expected_sizes() {
        let rules = ScoringRules::default();
        assert_eq!(rules.key_terms.len(), 16);
        assert_eq!(rules.patterns.len(), 5);
        assert_eq!(rules.category_rules.len(), 3);
    }

    #[test]
    fn collection_rule_either_order() {
        let r = rule(0);
        assert!(r.applies("개인정보를 수집합니다", "P1"));
        assert!(r.applies("수집하는 개인정보 항목", "P3"));
        assert!(!r.applies("개인정보 보호", "P1"));
        assert!(!r.applies("개인정보를 수집합니다", "P4"));
    }

    #[test]
    fn collection_rule_does_not_cross_lines() {
        assert!(!rule(0).applies("개인정보\n수집", "P1"));
    }

    #[test]
    fn third_party_rule() {
        let r = rule(1);
        assert!(r.applies("제3자에게 제공", "TP1"));
        assert!(r.applies("제공받는 제3자", "P4"));
        assert!(!r.applies("제3자에게 제공", "TP2"));
    }

    #[test]
    fn refund_rule() {
        let r = rule(2);
        for text in ["환불 불가", "청약 철회", "반품 규정"] {
            assert!(r.applies(text, "T1"));
            assert!(r.applies(text, "T2"));
        }
        assert!(!r.applies("환불 불가", "T4"));
    }

    #[test]
    fn marketing_and_penalty_rules() {
        assert!(rule(3).applies("광고성 정보 수신", "M6"));
        assert!(!rule(3).applies("광고성 정보 수신", "M3"));
        assert!(rule(4).applies("손해배상 청구", "T4"));
        assert!(rule(4).applies("위약금 부과", "T4"));
    }

    #[test]
    fn patterns_are_case_insensitive() {
        let r = PatternRule::new("refund", &["T1"]).unwrap();
        assert!(r.applies("No REFUND after 7 days", "T1"));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = PatternRule::new("(unclosed", &["X"]).unwrap_err();
        assert!(err.to_string().contains("(unclosed"));
    }

    #[test]
    fn pattern_table_from_json() {
        let rules = ScoringRules::patterns_from_json(
            r#"[{"pattern": "cookie", "clauseIds": ["C1", "C2"]}]"#,
        )
        .unwrap();
        assert_eq!(rules.patterns.len(), 1);
        assert_eq!(rules.patterns[0].pattern(), "cookie");
        assert_eq!(rules.patterns[0].clause_ids(), ["C1", "C2"]);
        assert_eq!(rules.key_terms.len(), 16);
    }

    #[test]
    fn pattern_table_from_bad_json() {
        assert!(matches!(
            ScoringRules::patterns_from_json("{"),
            Err(RuleError::Json(_))
        ));
    }
}
