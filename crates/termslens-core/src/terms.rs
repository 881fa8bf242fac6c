//! Terms blocks scraped from a page, before and after reduction.

use serde::{Deserialize, Serialize};

fn unknown_hint() -> String {
    "unknown".to_string()
}

/// One consent/terms block as supplied by the page scraper.
///
/// The scraper's type guess is read from a top-level `categoryHint` or
/// `type`, falling back to a nested `features.type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ScrapedBlock")]
pub struct TermsBlock {
    /// 1-based position; assigned from input order when absent.
    pub index: Option<usize>,
    /// Scraper's guess at the block type (`privacy`, `marketing`, ...).
    pub category_hint: String,
    pub is_required: bool,
    pub text: String,
}

impl TermsBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            index: None,
            category_hint: unknown_hint(),
            is_required: false,
            text: text.into(),
        }
    }
}

#[derive(Deserialize)]
struct ScrapedFeatures {
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScrapedBlock {
    #[serde(default)]
    index: Option<usize>,
    #[serde(default, alias = "type")]
    category_hint: Option<String>,
    #[serde(default)]
    features: Option<ScrapedFeatures>,
    #[serde(default)]
    is_required: Option<bool>,
    text: String,
}

impl From<ScrapedBlock> for TermsBlock {
    fn from(raw: ScrapedBlock) -> Self {
        let nested = raw.features.and_then(|f| f.kind);
        let category_hint = raw
            .category_hint
            .or(nested)
            .filter(|hint| !hint.is_empty())
            .unwrap_or_else(unknown_hint);
        Self {
            index: raw.index,
            category_hint,
            is_required: raw.is_required.unwrap_or(false),
            text: raw.text,
        }
    }
}

/// A [`TermsBlock`] whose text has been bounded and whitespace-normalised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReducedBlock {
    pub index: usize,
    pub category_hint: String,
    pub is_required: bool,
    pub text: String,
}
