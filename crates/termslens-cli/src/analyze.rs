//! Analysis pipeline: reduce terms, retrieve clauses, prompt the model,
//! and package the reply as a report.

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use termslens_ai::{Retriever, build_prompt, parse_analysis, typed_analysis};
use termslens_core::{ClauseRecord, ReducedBlock, ReducerConfig, TermsBlock, reduce_blocks};
use termslens_llm::TextGenerator;
use tracing::{info, warn};

/// Knobs shared by every pipeline stage.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub limit: usize,
    pub reducer: ReducerConfig,
}

/// Everything needed to call the model, before the call is made.
pub struct PreparedPrompt {
    pub blocks: Vec<ReducedBlock>,
    pub clauses: Vec<ClauseRecord>,
    pub prompt: String,
}

/// Outcome of one analysis run, written as JSON.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub url: Option<String>,
    /// RFC 3339.
    pub timestamp: String,
    pub terms_count: usize,
    /// Raw model reply, or the error message for failed runs.
    pub analysis: String,
    /// Parsed reply JSON, kept as the model produced it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_analysis: Option<Value>,
    /// The terms blocks as supplied, before reduction.
    pub raw_terms: Vec<TermsBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub clause_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl AnalysisReport {
    /// Report for a run that could not produce an analysis.
    pub fn failure(url: Option<String>, terms: &[TermsBlock], err: &anyhow::Error) -> Self {
        Self {
            url,
            timestamp: now_rfc3339(),
            terms_count: terms.len(),
            analysis: format!(
                "분석 중 오류가 발생했습니다.\n\n오류 내용: {err:#}\n\n\
                 약관이 너무 길거나 API 호출에 문제가 있을 수 있습니다."
            ),
            structured_analysis: None,
            raw_terms: terms.to_vec(),
            model: None,
            clause_ids: Vec::new(),
            processing_time_ms: None,
            is_error: true,
        }
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Read a JSON array of terms blocks.
pub async fn read_terms(path: &Path) -> anyhow::Result<Vec<TermsBlock>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading terms from {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing terms in {}", path.display()))
}

/// Reduce every block, retrieve clauses per block, and assemble the prompt.
pub async fn prepare_prompt(
    retriever: &Retriever<'_>,
    options: &AnalysisOptions,
    terms: &[TermsBlock],
) -> PreparedPrompt {
    let blocks = reduce_blocks(terms, &options.reducer);
    let total_chars: usize = blocks.iter().map(|b| b.text.chars().count()).sum();
    info!(blocks = blocks.len(), total_chars, "reduced terms");

    let clauses = retriever.retrieve_for_blocks(&blocks, options.limit).await;
    let prompt = build_prompt(&blocks, &clauses);
    info!(prompt_chars = prompt.chars().count(), "assembled prompt");

    PreparedPrompt {
        blocks,
        clauses,
        prompt,
    }
}

/// Run the full pipeline against `generator`.
///
/// A reply that is not parseable JSON is kept as raw text with no
/// structured analysis; only generator failures are errors.
pub async fn run_analysis(
    retriever: &Retriever<'_>,
    generator: &dyn TextGenerator,
    options: &AnalysisOptions,
    terms: &[TermsBlock],
    url: Option<String>,
) -> anyhow::Result<AnalysisReport> {
    let started = Instant::now();
    let prepared = prepare_prompt(retriever, options, terms).await;

    let analysis = generator
        .generate(&prepared.prompt)
        .await
        .with_context(|| format!("generating analysis with {}", generator.model()))?;

    let structured_analysis = match parse_analysis(&analysis) {
        Ok(value) => {
            let items = typed_analysis(&value).len();
            info!(items, "parsed structured analysis");
            Some(value)
        }
        Err(e) => {
            warn!(error = %e, "keeping raw analysis text");
            None
        }
    };

    let processing_time_ms = started.elapsed().as_millis() as u64;
    info!(processing_time_ms, "analysis complete");

    Ok(AnalysisReport {
        url,
        timestamp: now_rfc3339(),
        terms_count: terms.len(),
        analysis,
        structured_analysis,
        raw_terms: terms.to_vec(),
        model: Some(generator.model().to_string()),
        clause_ids: prepared.clauses.into_iter().map(|c| c.id).collect(),
        processing_time_ms: Some(processing_time_ms),
        is_error: false,
    })
}
