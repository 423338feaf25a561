//! Maximum Marginal Relevance selection.
//!
//! Greedy re-ranking that balances relevance to the query against
//! redundancy with what has already been selected:
//!
//! `score(c) = lambda * sim(query, c) - (1 - lambda) * max_sim(c, selected)`
//!
//! `lambda = 1` degenerates to pure relevance ranking, `lambda = 0` to
//! maximal diversity. Ties break toward higher raw query similarity, then
//! toward earlier candidate order, so the result is deterministic for
//! identical inputs.

use super::Chunk;

/// A retrieval candidate: a chunk with its raw similarity to the query.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub chunk: Chunk,
    pub relevance: f32,
}

impl Candidate {
    pub fn new(chunk: Chunk, relevance: f32) -> Self {
        Self { chunk, relevance }
    }
}

/// Selects up to `k` candidates greedily. Returns fewer than `k` when the
/// pool is exhausted; an empty pool yields an empty selection.
pub fn select(candidates: Vec<Candidate>, k: usize, lambda: f32) -> Vec<Candidate> {
    let lambda = lambda.clamp(0.0, 1.0);

    let mut pool: Vec<(usize, Candidate)> = candidates.into_iter().enumerate().collect();
    let mut selected: Vec<Candidate> = Vec::with_capacity(k.min(pool.len()));

    while selected.len() < k && !pool.is_empty() {
        let mut best_at = 0;
        let mut best_rank = rank_of(&pool[0], &selected, lambda);

        for (at, entry) in pool.iter().enumerate().skip(1) {
            let rank = rank_of(entry, &selected, lambda);
            if better(rank, best_rank) {
                best_at = at;
                best_rank = rank;
            }
        }

        let (_, winner) = pool.remove(best_at);
        selected.push(winner);
    }

    selected
}

/// (mmr score, raw relevance, negated candidate order), compared
/// lexicographically, larger wins.
fn rank_of(entry: &(usize, Candidate), selected: &[Candidate], lambda: f32) -> (f32, f32, i64) {
    let (order, candidate) = entry;

    let redundancy = selected
        .iter()
        .map(|s| candidate.chunk.embedding.cosine_similarity(&s.chunk.embedding))
        .fold(f32::NEG_INFINITY, f32::max);
    let redundancy = if redundancy.is_finite() { redundancy } else { 0.0 };

    let mmr = lambda * candidate.relevance - (1.0 - lambda) * redundancy;
    (mmr, candidate.relevance, -(*order as i64))
}

fn better(a: (f32, f32, i64), b: (f32, f32, i64)) -> bool {
    match a.0.partial_cmp(&b.0) {
        Some(std::cmp::Ordering::Greater) => return true,
        Some(std::cmp::Ordering::Less) => return false,
        _ => {}
    }
    match a.1.partial_cmp(&b.1) {
        Some(std::cmp::Ordering::Greater) => return true,
        Some(std::cmp::Ordering::Less) => return false,
        _ => {}
    }
    a.2 > b.2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Embedding;
    use std::collections::HashSet;
    use uuid::Uuid;

    fn candidate(embedding: Vec<f32>, relevance: f32) -> Candidate {
        let chunk = Chunk::new(Uuid::new_v4(), "text", 0, Embedding::new(embedding));
        Candidate::new(chunk, relevance)
    }

    #[test]
    fn test_never_selects_a_chunk_twice() {
        let pool = vec![
            candidate(vec![1.0, 0.0], 0.9),
            candidate(vec![0.9, 0.1], 0.8),
            candidate(vec![0.0, 1.0], 0.7),
            candidate(vec![0.5, 0.5], 0.6),
        ];

        let picked = select(pool, 4, 0.5);
        let ids: HashSet<Uuid> = picked.iter().map(|c| c.chunk.id).collect();
        assert_eq!(ids.len(), picked.len());
    }

    #[test]
    fn test_lambda_one_is_pure_relevance_ranking() {
        let pool = vec![
            candidate(vec![1.0, 0.0], 0.3),
            candidate(vec![1.0, 0.0], 0.9),
            candidate(vec![1.0, 0.0], 0.6),
            candidate(vec![1.0, 0.0], 0.8),
        ];

        let picked = select(pool, 4, 1.0);
        let relevances: Vec<f32> = picked.iter().map(|c| c.relevance).collect();
        assert_eq!(relevances, vec![0.9, 0.8, 0.6, 0.3]);
    }

    #[test]
    fn test_diversity_penalty_skips_near_duplicates() {
        // Two nearly identical high-relevance chunks and one distinct one.
        let pool = vec![
            candidate(vec![1.0, 0.0], 0.95),
            candidate(vec![1.0, 0.01], 0.94),
            candidate(vec![0.0, 1.0], 0.5),
        ];

        let picked = select(pool, 2, 0.5);
        assert!((picked[0].relevance - 0.95).abs() < 1e-6);
        // The redundant twin loses to the diverse chunk at lambda = 0.5.
        assert!((picked[1].relevance - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_ties_break_by_candidate_order() {
        let a = candidate(vec![1.0, 0.0], 0.7);
        let b = candidate(vec![0.0, 1.0], 0.7);
        let first_id = a.chunk.id;

        let picked = select(vec![a, b], 1, 1.0);
        assert_eq!(picked[0].chunk.id, first_id);
    }

    #[test]
    fn test_pool_exhaustion_returns_fewer_than_k() {
        let pool = vec![candidate(vec![1.0, 0.0], 0.9)];
        assert_eq!(select(pool, 5, 0.7).len(), 1);
        assert!(select(Vec::new(), 5, 0.7).is_empty());
    }
}
