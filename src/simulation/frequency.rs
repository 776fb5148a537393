//! Corpus frequencies and the exposure thresholds derived from them.

use std::collections::{BTreeMap, HashMap};

use super::dictionary::{GlobalLemmaDictionary, LemmaId};
use crate::config::EngineConfig;
use crate::types::records::{FrequencyTable, SentenceInput};

#[derive(Debug, Clone, Default)]
pub struct LemmaFrequencies {
    counts: HashMap<LemmaId, u64>,
    total: u64,
}

impl LemmaFrequencies {
    pub fn from_table(table: &FrequencyTable, dictionary: &mut GlobalLemmaDictionary) -> Self {
        let mut frequencies = LemmaFrequencies::default();
        for (lemma, &count) in table {
            if let Some(id) = dictionary.get_id_or_insert(lemma) {
                // Entries that normalize to the same lemma are merged.
                *frequencies.counts.entry(id).or_insert(0) += count;
                frequencies.total += count;
            }
        }
        frequencies
    }

    /// Counts AdvSL and SimSL lemma tokens across the corpus.
    pub fn from_sentences(sentences: &[SentenceInput], dictionary: &mut GlobalLemmaDictionary) -> Self {
        let mut table: FrequencyTable = BTreeMap::new();
        for sentence in sentences {
            let sim_s_tokens = sentence.sim_s_lemmas.iter().flat_map(|s| s.lemmas.iter());
            for lemma in sentence.adv_s_lemmas.iter().chain(sim_s_tokens) {
                let cleaned = super::dictionary::normalize_lemma(lemma);
                if !cleaned.is_empty() {
                    *table.entry(cleaned).or_insert(0) += 1;
                }
            }
        }
        Self::from_table(&table, dictionary)
    }

    pub fn count(&self, lemma_id: LemmaId) -> u64 {
        self.counts.get(&lemma_id).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn share(&self, lemma_id: LemmaId) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.count(lemma_id) as f64 / self.total as f64
    }

    /// Lemma ids in ascending id order.
    pub fn lemma_ids(&self) -> Vec<LemmaId> {
        let mut ids: Vec<LemmaId> = self.counts.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

/// Maps a lemma's frequency share to the number of exposures it needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdPolicy {
    pub baseline: u32,
    pub consolidation_window: u32,
    pub high_frequency_cutoff: f64,
}

impl ThresholdPolicy {
    pub fn from_config(config: &EngineConfig) -> Self {
        ThresholdPolicy {
            baseline: config.baseline_threshold,
            consolidation_window: config.consolidation_window,
            high_frequency_cutoff: config.high_frequency_cutoff,
        }
    }

    pub fn required_threshold(&self, share: f64) -> u32 {
        let baseline = self.baseline.max(1);
        if share <= self.high_frequency_cutoff {
            return baseline;
        }
        let scaled = (self.consolidation_window as f64 * share).ceil();
        if scaled >= u32::MAX as f64 {
            return u32::MAX;
        }
        (scaled as u32).max(baseline)
    }
}
