//! Plain-text rendering for the `retrieve` and `kb check` commands.

use std::fmt::Write;

use termslens_ai::{RelevanceScorer, ScoredClause};
use termslens_core::{Category, ClauseRecord};

/// One line per hit with the score broken down by signal.
pub fn render_hits(scorer: &RelevanceScorer, text: &str, hits: &[ScoredClause]) -> String {
    let prepared = scorer.prepare(text);
    let mut out = String::new();
    let _ = writeln!(out, "detected category: {}", prepared.category());
    if hits.is_empty() {
        let _ = writeln!(out, "no relevant clauses");
        return out;
    }
    for (rank, hit) in hits.iter().enumerate() {
        let b = scorer.breakdown(&prepared, &hit.clause);
        let _ = writeln!(
            out,
            "{:>2}. [{}] {} ({})",
            rank + 1,
            hit.clause.id,
            hit.clause.title,
            hit.clause.citation()
        );
        let _ = writeln!(
            out,
            "    score {:.1} = (category {:.0} + title {:.0} + terms {:.0} + patterns {:.0}) x {}",
            hit.score, b.category, b.title, b.key_terms, b.patterns, b.weight
        );
    }
    out
}

/// Entry counts per category, in enumeration order.
pub fn render_kb_summary(clauses: &[ClauseRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} clauses", clauses.len());
    for category in Category::ALL {
        let count = clauses.iter().filter(|c| c.category == category).count();
        let _ = writeln!(out, "  {:<12} {count}", category.as_str());
    }
    let other = clauses.iter().filter(|c| c.category == Category::Other).count();
    if other > 0 {
        let _ = writeln!(out, "  {:<12} {other}", Category::Other.as_str());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clause(id: &str, category: Category) -> ClauseRecord {
        ClauseRecord {
            id: id.into(),
            title: "환불 및 청약철회".into(),
            snippet: "환불".into(),
            category,
            law: "전자상거래법".into(),
            article: "제17조".into(),
            weight: 1.0,
        }
    }

    #[test]
    fn hits_show_breakdown() {
        let scorer = RelevanceScorer::default();
        let text = "청약철회 및 환불 불가";
        let hit = ScoredClause {
            clause: clause("T1", Category::Terms),
            score: scorer.score(text, &clause("T1", Category::Terms)),
        };
        let out = render_hits(&scorer, text, &[hit]);
        assert!(out.starts_with("detected category: terms\n"));
        assert!(out.contains(" 1. [T1] 환불 및 청약철회 (전자상거래법 제17조)"));
        // 30 category + 10 title + 5 key term + 20 pattern.
        assert!(out.contains("score 65.0 = (category 30 + title 10 + terms 5 + patterns 20) x 1"));
    }

    #[test]
    fn no_hits_message() {
        let out = render_hits(&RelevanceScorer::default(), "x", &[]);
        assert!(out.ends_with("no relevant clauses\n"));
    }

    #[test]
    fn kb_summary_counts_categories() {
        let out = render_kb_summary(&[
            clause("P1", Category::Privacy),
            clause("P2", Category::Privacy),
            clause("T1", Category::Terms),
        ]);
        assert!(out.starts_with("3 clauses\n"));
        assert!(out.contains("  privacy      2\n"));
        assert!(out.contains("  third-party  0\n"));
        assert!(out.contains("  terms        1\n"));
        assert!(!out.contains("other"));

        let out = render_kb_summary(&[clause("R1", Category::Other)]);
        assert!(out.ends_with("  other        1\n"));
    }
}
