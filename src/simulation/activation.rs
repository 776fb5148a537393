//! Which New lemmas a too-easy block should introduce next.

use std::collections::{BTreeSet, HashSet};

use super::dictionary::{GlobalLemmaDictionary, LemmaId};
use super::frequency::LemmaFrequencies;
use super::numerical_types::SentenceRecord;
use crate::profile::{LemmaProfile, LemmaState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationCandidate {
    pub lemma_id: LemmaId,
    pub lemma: String,
    pub frequency: u64,
}

/// Picks up to `limit` lemmas from `candidates`, in activation order.
pub trait ActivationStrategy: Send + Sync {
    fn choose(&self, candidates: &[ActivationCandidate], limit: usize) -> Vec<LemmaId>;
}

/// Greedy default: most frequent corpus lemma first, ties by lemma text.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighestFrequencyFirst;

impl ActivationStrategy for HighestFrequencyFirst {
    fn choose(&self, candidates: &[ActivationCandidate], limit: usize) -> Vec<LemmaId> {
        let mut ranked: Vec<&ActivationCandidate> = candidates.iter().collect();
        ranked.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.lemma.cmp(&b.lemma)));
        ranked.into_iter().take(limit).map(|c| c.lemma_id).collect()
    }
}

/// Tracked lemmas of the block that are still New in `trial` and not excluded.
/// Returned in ascending lemma-text order.
pub fn collect_candidates(
    block: &[&SentenceRecord],
    trial: &LemmaProfile,
    frequencies: &LemmaFrequencies,
    dictionary: &GlobalLemmaDictionary,
    excluded: &HashSet<LemmaId>,
) -> Vec<ActivationCandidate> {
    let ids: BTreeSet<LemmaId> = block
        .iter()
        .flat_map(|record| record.exposable_lemma_ids())
        .filter(|id| !excluded.contains(id))
        .filter(|&id| trial.tracks(id) && trial.query(id) == LemmaState::New)
        .collect();

    let mut candidates: Vec<ActivationCandidate> = ids
        .into_iter()
        .map(|lemma_id| ActivationCandidate {
            lemma_id,
            lemma: dictionary.get_str(lemma_id).unwrap_or_default().to_string(),
            frequency: frequencies.count(lemma_id),
        })
        .collect();
    candidates.sort_by(|a, b| a.lemma.cmp(&b.lemma));
    candidates
}
