//! Prompt assembly: reduced terms plus retrieved clauses, in the fixed
//! Korean template the analysis model expects.

use termslens_core::{ClauseRecord, ReducedBlock};

/// Rendered in place of the clause context when retrieval found nothing.
pub const NO_CLAUSES: &str = "관련 법률 조항 없음";

const TERMS_SEPARATOR: &str = "\n\n---\n\n";

const OUTPUT_FORMAT: &str = r#"출력 형식 (각 약관마다):
[
  {
    "index": 1,
    "type": "privacy",
    "title": "개인정보 처리방침",
    "isRequired": true,
    "risks": ["위험요소1", "위험요소2"],
    "dataCollection": "수집 정보 요약",
    "keyPoints": ["핵심1", "핵심2"],
    "recommendation": "accept",
    "safetyScore": 7,
    "reason": "권장 이유"
  }
]

recommendation: accept(안전), caution(주의), reject(비권장)

중요: 반드시 유효한 JSON만 출력하세요. 마크다운이나 설명 추가 금지."#;

/// `[id] title` / `법률: law article` / `내용: snippet`, one clause per paragraph.
pub fn format_clause_context(clauses: &[ClauseRecord]) -> String {
    clauses
        .iter()
        .map(|c| {
            format!(
                "[{id}] {title}\n법률: {citation}\n내용: {snippet}",
                id = c.id,
                title = c.title,
                citation = c.citation(),
                snippet = c.snippet,
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// `[index. hint 필수]` header followed by the reduced text, per block.
pub fn format_terms(blocks: &[ReducedBlock]) -> String {
    blocks
        .iter()
        .map(|b| {
            let required = if b.is_required { " 필수" } else { "" };
            format!("[{}. {}{}]\n{}", b.index, b.category_hint, required, b.text)
        })
        .collect::<Vec<_>>()
        .join(TERMS_SEPARATOR)
}

/// Full analysis prompt for `blocks`, grounded in `clauses`.
pub fn build_prompt(blocks: &[ReducedBlock], clauses: &[ClauseRecord]) -> String {
    let context = format_clause_context(clauses);
    let context = if context.is_empty() {
        NO_CLAUSES
    } else {
        context.as_str()
    };
    format!(
        "다음 약관들을 분석하여 유효한 JSON 배열로만 답변하세요. \
         설명이나 마크다운 없이 순수 JSON만 출력하세요.\n\
         \n\
         약관: {terms}\n\
         \n\
         관련 법률 조항 (판단 기준): {context}\n\
         \n\
         분석 지침: 위의 법률 조항을 기준으로 각 약관이 법적 요건을 충족하는지, \
         부당한 조항이 포함되어 있는지 판단하세요.\n\
         \n\
         {OUTPUT_FORMAT}",
        terms = format_terms(blocks),
    )
}
