use crate::models::ScoredCandidate;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Share of the result set one author may occupy before the repeat penalty
/// applies. A heuristic constant, not a fairness bound.
const AUTHOR_SHARE_THRESHOLD: f64 = 0.3;

/// Single-pass diversity re-ranker. Walks candidates in score-descending
/// order, multiplies down repeat authors and already-seen topics, then
/// re-sorts. Order-sensitive by construction: it approximates rather than
/// guarantees global diversity.
pub struct DiversityReranker;

impl DiversityReranker {
    pub fn new() -> Self {
        Self
    }

    /// `diversity_factor` is the caller-supplied [0,1] knob; 0 is a no-op.
    pub fn rerank(
        &self,
        mut candidates: Vec<ScoredCandidate>,
        diversity_factor: f64,
    ) -> Vec<ScoredCandidate> {
        let factor = diversity_factor.clamp(0.0, 1.0);
        if factor == 0.0 || candidates.len() < 2 {
            return candidates;
        }

        let n = candidates.len();
        let author_cap = ((AUTHOR_SHARE_THRESHOLD * n as f64).floor() as usize).max(1);

        let mut author_counts: HashMap<Uuid, usize> = HashMap::new();
        let mut seen_topics: HashSet<String> = HashSet::new();

        for candidate in candidates.iter_mut() {
            let author_seen = author_counts
                .get(&candidate.item.author_id)
                .copied()
                .unwrap_or(0);
            if author_seen >= author_cap {
                candidate.score *= 1.0 - factor;
            }

            if !candidate.item.topics.is_empty() {
                let overlap = candidate
                    .item
                    .topics
                    .iter()
                    .filter(|t| seen_topics.contains(*t))
                    .count();
                if overlap > 0 {
                    let penalty = factor * overlap as f64 / candidate.item.topics.len() as f64;
                    candidate.score *= 1.0 - penalty;
                }
            }

            *author_counts.entry(candidate.item.author_id).or_insert(0) += 1;
            for topic in &candidate.item.topics {
                seen_topics.insert(topic.clone());
            }
        }

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        candidates
    }
}

impl Default for DiversityReranker {
    fn default() -> Self {
        Self::new()
    }
}
