//! Retrieval layer: knowledge-base loading, relevance scoring, top-K
//! retrieval, and the prompt/response contract with the analysis model.

pub mod analysis;
pub mod knowledge;
pub mod prompt;
pub mod retriever;
pub mod rules;
pub mod scorer;

pub use analysis::{Recommendation, ResponseError, TermAnalysis, parse_analysis, typed_analysis};
pub use knowledge::{KnowledgeError, KnowledgeSource, KnowledgeStore};
pub use prompt::build_prompt;
pub use retriever::{DEFAULT_LIMIT, Retriever, ScoredClause, merge_by_id, rank};
pub use rules::{PatternRule, RuleError, ScoringRules};
pub use scorer::{RelevanceScorer, ScoreBreakdown};
