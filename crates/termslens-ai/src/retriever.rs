//! Top-K clause retrieval over the knowledge base.

use indexmap::IndexMap;
use termslens_core::{ClauseRecord, ReducedBlock};
use tracing::{debug, info, warn};

use crate::knowledge::KnowledgeStore;
use crate::scorer::RelevanceScorer;

/// Default number of clauses returned per text.
pub const DEFAULT_LIMIT: usize = 5;

/// A clause together with its relevance for one retrieval call.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredClause {
    pub clause: ClauseRecord,
    pub score: f64,
}

/// Scores every clause in a [`KnowledgeStore`] and keeps the best ones.
pub struct Retriever<'s> {
    store: &'s KnowledgeStore,
    scorer: RelevanceScorer,
}

impl<'s> Retriever<'s> {
    pub fn new(store: &'s KnowledgeStore, scorer: RelevanceScorer) -> Self {
        Self { store, scorer }
    }

    pub fn scorer(&self) -> &RelevanceScorer {
        &self.scorer
    }

    /// Up to `limit` clauses most relevant to `text`, best first.
    pub async fn retrieve(&self, text: &str, limit: usize) -> Vec<ClauseRecord> {
        self.retrieve_scored(text, limit)
            .await
            .into_iter()
            .map(|s| s.clause)
            .collect()
    }

    /// Like [`retrieve`](Self::retrieve) but keeps the scores.
    pub async fn retrieve_scored(&self, text: &str, limit: usize) -> Vec<ScoredClause> {
        let clauses = self.store.load().await;
        if clauses.is_empty() {
            warn!("legal knowledge base is empty; no clauses retrieved");
            return Vec::new();
        }
        rank(&self.scorer, &clauses, text, limit)
    }

    /// Retrieve for each block in order and merge the results by clause id.
    pub async fn retrieve_for_blocks(
        &self,
        blocks: &[ReducedBlock],
        limit: usize,
    ) -> Vec<ClauseRecord> {
        let mut per_block = Vec::with_capacity(blocks.len());
        for block in blocks {
            let hits = self.retrieve(&block.text, limit).await;
            debug!(index = block.index, hits = hits.len(), "retrieved clauses for block");
            per_block.push(hits);
        }
        let merged = merge_by_id(per_block);
        info!(unique = merged.len(), "collected relevant clauses");
        merged
    }
}

/// Score `clauses` against `text`, drop non-positive scores, and keep the
/// top `limit`. Ties keep collection order.
pub fn rank(
    scorer: &RelevanceScorer,
    clauses: &[ClauseRecord],
    text: &str,
    limit: usize,
) -> Vec<ScoredClause> {
    let prepared = scorer.prepare(text);
    let mut scored: Vec<(&ClauseRecord, f64)> = clauses
        .iter()
        .map(|clause| (clause, scorer.score_prepared(&prepared, clause)))
        .filter(|(_, score)| *score > 0.0)
        .collect();

    // `sort_by` is stable, which is what keeps equal scores in collection order.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    let top_score = scored.first().map_or(0.0, |(_, s)| *s);
    scored.truncate(limit);
    info!(
        found = scored.len(),
        top_score,
        category = %prepared.category(),
        "searched legal knowledge base"
    );

    scored
        .into_iter()
        .map(|(clause, score)| ScoredClause {
            clause: clause.clone(),
            score,
        })
        .collect()
}

/// Merge per-block results, de-duplicating by id.
///
/// The first occurrence of an id fixes its position; a later occurrence
/// replaces the stored record in place.
pub fn merge_by_id<I>(batches: I) -> Vec<ClauseRecord>
where
    I: IntoIterator<Item = Vec<ClauseRecord>>,
{
    let mut merged: IndexMap<String, ClauseRecord> = IndexMap::new();
    for batch in batches {
        for clause in batch {
            merged.insert(clause.id.clone(), clause);
        }
    }
    merged.into_values().collect()
}
