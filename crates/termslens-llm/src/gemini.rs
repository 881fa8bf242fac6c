//! Gemini `generateContent` client.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{GenerateError, TextGenerator};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_output_tokens: 2048,
            top_p: 0.8,
            top_k: 20,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content>,
    generation_config: &'a GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

/// HTTP client for a Gemini-compatible `generateContent` endpoint.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    config: GenerationConfig,
}

impl GeminiClient {
    /// `base_url` should be like `https://generativelanguage.googleapis.com`
    /// (no trailing slash needed).
    pub fn new(base_url: String, model: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            config: GenerationConfig::default(),
        }
    }

    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn request_body<'a>(&'a self, prompt: &str) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: &self.config,
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
        }
    }
}

/// Pull the first candidate's text out of a response, rejecting empty ones.
fn first_text(resp: GenerateResponse) -> Result<String, GenerateError> {
    let candidate = resp
        .candidates
        .into_iter()
        .next()
        .ok_or(GenerateError::EmptyResponse("no candidates"))?;
    let content = candidate
        .content
        .ok_or(GenerateError::EmptyResponse("candidate has no content"))?;
    let part = content
        .parts
        .into_iter()
        .next()
        .ok_or(GenerateError::EmptyResponse("content has no parts"))?;
    if part.text.trim().is_empty() {
        return Err(GenerateError::EmptyResponse("blank text"));
    }
    Ok(part.text)
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        if self.api_key.is_empty() {
            return Err(GenerateError::MissingApiKey);
        }

        let url = self.endpoint();
        info!(url = %url, prompt_chars = prompt.chars().count(), "calling generative model");
        let started = Instant::now();
        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(prompt))
            .send()
            .await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!(status = status.as_u16(), elapsed_ms, "generative model returned an error");
            return Err(GenerateError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = resp.json().await?;
        let text = first_text(parsed)?;
        info!(elapsed_ms, chars = text.chars().count(), "received model response");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GeminiClient {
        GeminiClient::new(
            "http://localhost:8080/".into(),
            DEFAULT_MODEL.into(),
            "test-key".into(),
        )
    }

    #[test]
    fn trims_trailing_slash() {
        assert_eq!(client().base_url, "http://localhost:8080");
    }

    #[test]
    fn endpoint_names_model() {
        assert_eq!(
            client().endpoint(),
            "http://localhost:8080/v1beta/models/gemini-2.0-flash-exp:generateContent"
        );
    }

    #[test]
    fn request_body_shape() {
        let c = client();
        let body = serde_json::to_value(c.request_body("약관 분석")).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "약관 분석");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
        assert_eq!(body["generationConfig"]["topK"], 20);
        let settings = body["safetySettings"].as_array().unwrap();
        assert_eq!(settings.len(), 4);
        assert!(settings.iter().all(|s| s["threshold"] == "BLOCK_NONE"));
    }

    #[test]
    fn custom_generation_config() {
        let c = client().with_generation_config(GenerationConfig {
            temperature: 0.0,
            ..GenerationConfig::default()
        });
        let body = serde_json::to_value(c.request_body("x")).unwrap();
        assert_eq!(body["generationConfig"]["temperature"], 0.0);
    }

    fn parse(json: &str) -> GenerateResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn extracts_first_candidate_text() {
        let resp = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"[]"},{"text":"ignored"}]}}]}"#,
        );
        assert_eq!(first_text(resp).unwrap(), "[]");
    }

    #[test]
    fn empty_responses_are_distinguished() {
        let cases = [
            (r#"{}"#, "no candidates"),
            (r#"{"candidates":[{}]}"#, "candidate has no content"),
            (r#"{"candidates":[{"content":{}}]}"#, "content has no parts"),
            (r#"{"candidates":[{"content":{"parts":[{"text":"  "}]}}]}"#, "blank text"),
        ];
        for (json, reason) in cases {
            match first_text(parse(json)) {
                Err(GenerateError::EmptyResponse(r)) => assert_eq!(r, reason),
                other => panic!("expected EmptyResponse({reason}), got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn missing_key_fails_before_sending() {
        let c = GeminiClient::new(DEFAULT_BASE_URL.into(), DEFAULT_MODEL.into(), String::new());
        assert!(matches!(
            c.generate("x").await,
            Err(GenerateError::MissingApiKey)
        ));
    }
}
