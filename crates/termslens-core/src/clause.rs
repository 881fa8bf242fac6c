//! Statutory clause records held in the legal knowledge base.

use serde::{Deserialize, Serialize};

use crate::category::Category;

fn default_weight() -> f64 {
    1.0
}

/// One entry of the fixed legal-reference knowledge base.
///
/// Loaded once from `law_kb.json` and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseRecord {
    /// Stable identifier, e.g. `P1`, `TP3`. Unique within a knowledge base.
    pub id: String,
    pub title: String,
    /// Explanatory text; the main surface for key-term matching.
    pub snippet: String,
    pub category: Category,
    pub law: String,
    pub article: String,
    /// Static importance multiplier applied after all bonuses are summed.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl ClauseRecord {
    /// Weight used for scoring. Non-positive or non-finite weights count as 1.0.
    pub fn effective_weight(&self) -> f64 {
        if self.weight.is_finite() && self.weight > 0.0 {
            self.weight
        } else {
            1.0
        }
    }

    /// Citation line, e.g. `개인정보 보호법 제15조`.
    pub fn citation(&self) -> String {
        format!("{} {}", self.law, self.article)
    }
}
