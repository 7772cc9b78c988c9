//! Reciprocal Rank Fusion.
//!
//! Same `1/(k+rank)` contribution and deterministic tie-break chain as
//! other RRF implementations, pared down to the two sources and tie-break
//! order this system needs (score desc, then smallest observed rank, then
//! id asc) rather than a lexical-score tiebreak, since cosine distance and
//! trigram similarity aren't comparable the way two relevance scores from
//! the same model family would be.

use std::cmp::Ordering;
use std::collections::HashMap;

/// Default RRF constant `k`.
pub const DEFAULT_RRF_K: f64 = 60.0;

/// `rrf_score(rank, k) = 1 / (rank + k)`, the building block every fused
/// score is a sum of.
#[must_use]
pub fn rrf_score(rank: usize, k: f64) -> f64 {
    1.0 / (rank as f64 + k)
}

/// One ranked hit from a single retrieval lane, keyed by an opaque id.
#[derive(Debug, Clone, Copy)]
pub struct RankedHit {
    pub id: i64,
    /// 1-based rank within its source list.
    pub rank: usize,
}

/// A passage's fused RRF score plus the smallest rank it was observed at
/// across the fused lists (used only for tie-breaking).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedScore {
    pub id: i64,
    pub score: f64,
    pub best_rank: usize,
}

/// Fuse two ranked lists by RRF, deduplicating by id (summing contributions
/// when an id appears in both), and ordering by score descending, ties
/// broken by smallest observed rank, then id ascending.
///
/// Fusion is commutative over its two inputs:
/// `fuse(a, b) == fuse(b, a)` as a set, since summation and max-tie-break
/// don't depend on argument order.
#[must_use]
pub fn fuse(lists: &[&[RankedHit]], k: f64) -> Vec<FusedScore> {
    let mut acc: HashMap<i64, (f64, usize)> = HashMap::new();
    for list in lists {
        for hit in *list {
            let contribution = rrf_score(hit.rank, k);
            let entry = acc.entry(hit.id).or_insert((0.0, usize::MAX));
            entry.0 += contribution;
            entry.1 = entry.1.min(hit.rank);
        }
    }

    let mut fused: Vec<FusedScore> = acc
        .into_iter()
        .map(|(id, (score, best_rank))| FusedScore { id, score, best_rank })
        .collect();

    fused.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.best_rank.cmp(&b.best_rank))
            .then_with(|| a.id.cmp(&b.id))
    });

    fused
}
