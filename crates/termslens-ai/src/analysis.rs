//! Parsing the model's per-block risk analysis out of free-form text.
//!
//! Models often wrap JSON in a markdown fence or prefix it with prose, so
//! the text is trimmed down to the first `[` or `{` before parsing. The
//! parsed JSON is kept as-is; [`typed_analysis`] offers a best-effort typed
//! view that tolerates fields of the wrong JSON type.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("analysis text is empty")]
    Empty,
    #[error("analysis is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("analysis JSON is a {0}, expected an array or object")]
    NotStructured(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Accept,
    Caution,
    Reject,
    #[serde(other)]
    Unknown,
}

impl Recommendation {
    fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "accept" => Self::Accept,
            "caution" => Self::Caution,
            "reject" => Self::Reject,
            _ => Self::Unknown,
        }
    }
}

/// The model's verdict on one terms block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermAnalysis {
    #[serde(default, deserialize_with = "lenient_index")]
    pub index: usize,
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_required: bool,
    #[serde(default, deserialize_with = "lenient_list")]
    pub risks: Vec<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub data_collection: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub key_points: Vec<String>,
    #[serde(default, deserialize_with = "lenient_recommendation")]
    pub recommendation: Option<Recommendation>,
    /// 0 (unsafe) to 10 (safe).
    #[serde(default, deserialize_with = "lenient_number")]
    pub safety_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub reason: Option<String>,
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text_of(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn lenient_index<'de, D: Deserializer<'de>>(d: D) -> Result<usize, D::Error> {
    let n = number_of(&Value::deserialize(d)?).unwrap_or(0.0);
    Ok(if n.is_finite() && n > 0.0 { n as usize } else { 0 })
}

fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(number_of(&Value::deserialize(d)?))
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(text_of(Value::deserialize(d)?).unwrap_or_default())
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(text_of(Value::deserialize(d)?))
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Bool(b) => b,
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "필수"),
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    })
}

/// A list of strings, a single string, or anything else rendered as text.
fn lenient_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items.into_iter().filter_map(text_of).collect(),
        other => text_of(other).into_iter().collect(),
    })
}

fn lenient_recommendation<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<Recommendation>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Null => None,
        Value::String(s) => Some(Recommendation::parse(&s)),
        _ => Some(Recommendation::Unknown),
    })
}

/// Strip a surrounding markdown code fence and any prose before the JSON.
pub fn extract_json(text: &str) -> &str {
    let mut json = text.trim();

    if json.starts_with("```") {
        if let Some(newline) = json.find('\n') {
            json = &json[newline + 1..];
        }
        if let Some(fence) = json.rfind("```") {
            json = &json[..fence];
        }
    }
    json = json.trim();

    if !json.starts_with('[') && !json.starts_with('{') {
        let start = [json.find('['), json.find('{')].into_iter().flatten().min();
        if let Some(start) = start {
            json = &json[start..];
        }
    }
    json
}

/// Parse the analysis JSON from a model reply. Only arrays and objects
/// are accepted; their contents are not validated.
pub fn parse_analysis(text: &str) -> Result<Value, ResponseError> {
    let json = extract_json(text);
    if json.is_empty() {
        return Err(ResponseError::Empty);
    }
    let value: Value = serde_json::from_str(json).map_err(|e| {
        warn!(error = %e, len = text.len(), "could not parse analysis JSON");
        e
    })?;
    match value {
        Value::Array(_) | Value::Object(_) => Ok(value),
        Value::Null => Err(ResponseError::NotStructured("null")),
        Value::Bool(_) => Err(ResponseError::NotStructured("boolean")),
        Value::Number(_) => Err(ResponseError::NotStructured("number")),
        Value::String(_) => Err(ResponseError::NotStructured("string")),
    }
}

/// Typed view of a parsed analysis. A single object counts as one item;
/// array elements that are not objects are skipped.
pub fn typed_analysis(value: &Value) -> Vec<TermAnalysis> {
    let items: &[Value] = match value {
        Value::Array(items) => items,
        Value::Object(_) => std::slice::from_ref(value),
        _ => &[],
    };
    items
        .iter()
        .filter(|item| item.is_object())
        .filter_map(|item| TermAnalysis::deserialize(item).ok())
        .collect()
}
