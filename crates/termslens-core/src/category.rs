//! Coarse topical categories for terms text and clause records.
//!
//! Detection is an ordered keyword table: the first rule whose keyword set
//! hits the lower-cased text wins, so a text mentioning both personal
//! information and marketing is classified as `privacy`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of topical labels shared by terms text and clause records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Privacy,
    Marketing,
    ThirdParty,
    /// Catch-all for general terms of service.
    Terms,
    /// A clause category outside this set. Never detected from text, so
    /// such clauses are still scored but never earn the category bonus.
    #[serde(other)]
    Other,
}

impl Category {
    /// The categories text detection can produce.
    pub const ALL: [Category; 4] = [
        Category::Privacy,
        Category::Marketing,
        Category::ThirdParty,
        Category::Terms,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Privacy => "privacy",
            Self::Marketing => "marketing",
            Self::ThirdParty => "third-party",
            Self::Terms => "terms",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown category: {0:?}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .chain([Self::Other])
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// One row of the detection table: any keyword present selects `category`.
#[derive(Debug, Clone, Copy)]
pub struct CategoryRule {
    pub keywords: &'static [&'static str],
    pub category: Category,
}

impl CategoryRule {
    /// `lower` must already be lower-cased.
    fn matches(&self, lower: &str) -> bool {
        self.keywords.iter().any(|kw| lower.contains(kw))
    }
}

/// Detection rules in priority order. Keywords are stored lower-case.
pub const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        keywords: &["개인정보", "privacy"],
        category: Category::Privacy,
    },
    CategoryRule {
        keywords: &["마케팅", "marketing", "광고"],
        category: Category::Marketing,
    },
    CategoryRule {
        keywords: &["제3자", "third party"],
        category: Category::ThirdParty,
    },
];

/// Classify `text` with the built-in [`CATEGORY_RULES`].
pub fn detect_category(text: &str) -> Category {
    detect_with(CATEGORY_RULES, text)
}

/// Classify `text` against an arbitrary ordered rule table.
///
/// Returns [`Category::Terms`] when no rule matches.
pub fn detect_with(rules: &[CategoryRule], text: &str) -> Category {
    let lower = text.to_lowercase();
    rules
        .iter()
        .find(|rule| rule.matches(&lower))
        .map(|rule| rule.category)
        .unwrap_or(Category::Terms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn personal_information_is_privacy() {
        assert_eq!(detect_category("개인정보 수집 및 이용 동의"), Category::Privacy);
        assert_eq!(detect_category("Our PRIVACY policy"), Category::Privacy);
    }

    #[test]
    fn marketing_keywords() {
        assert_eq!(detect_category("마케팅 정보 수신 동의"), Category::Marketing);
        assert_eq!(detect_category("광고성 정보"), Category::Marketing);
        assert_eq!(detect_category("Marketing emails"), Category::Marketing);
    }

    #[test]
    fn third_party_keywords() {
        assert_eq!(detect_category("제3자 제공 동의"), Category::ThirdParty);
        assert_eq!(detect_category("shared with a Third Party"), Category::ThirdParty);
    }

    #[test]
    fn fallback_is_terms() {
        assert_eq!(detect_category("서비스 이용약관"), Category::Terms);
        assert_eq!(detect_category(""), Category::Terms);
    }

    #[test]
    fn earlier_rule_wins() {
        // Privacy outranks marketing and third-party.
        assert_eq!(
            detect_category("마케팅 목적의 개인정보 제3자 제공"),
            Category::Privacy
        );
        // Marketing outranks third-party.
        assert_eq!(detect_category("광고 목적 제3자 제공"), Category::Marketing);
    }

    #[test]
    fn hyphenated_third_party_is_not_a_keyword() {
        assert_eq!(detect_category("third-party cookies"), Category::Terms);
    }

    #[test]
    fn custom_rule_table() {
        let rules = [CategoryRule {
            keywords: &["refund"],
            category: Category::Terms,
        }];
        assert_eq!(detect_with(&rules, "privacy"), Category::Terms);
        assert_eq!(detect_with(&[], "개인정보"), Category::Terms);
    }

    #[test]
    fn string_round_trip() {
        for c in Category::ALL {
            assert_eq!(c.as_str().parse::<Category>().unwrap(), c);
        }
        assert_eq!("other".parse::<Category>().unwrap(), Category::Other);
        assert!("legal".parse::<Category>().is_err());
    }

    #[test]
    fn serde_uses_kebab_case() {
        let json = serde_json::to_string(&Category::ThirdParty).unwrap();
        assert_eq!(json, "\"third-party\"");
        let parsed: Category = serde_json::from_str("\"marketing\"").unwrap();
        assert_eq!(parsed, Category::Marketing);
        let unknown: Category = serde_json::from_str("\"refund\"").unwrap();
        assert_eq!(unknown, Category::Other);
    }
}
