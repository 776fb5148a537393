//! The simulated learner: per-lemma acquisition state driven by exposure counts.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::simulation::dictionary::LemmaId;
use crate::simulation::frequency::{LemmaFrequencies, ThresholdPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LemmaState {
    New,
    Active,
    Known,
}

impl LemmaState {
    /// State is a pure function of exposures against the lemma's threshold.
    pub fn from_exposures(exposure_count: u32, required_threshold: u32) -> Self {
        if exposure_count == 0 {
            LemmaState::New
        } else if exposure_count >= required_threshold {
            LemmaState::Known
        } else {
            LemmaState::Active
        }
    }

    pub fn is_known_or_active(self) -> bool {
        matches!(self, LemmaState::Active | LemmaState::Known)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerLemmaInfo {
    pub state: LemmaState,
    pub exposure_count: u32,
    pub required_threshold: u32,
}

impl LearnerLemmaInfo {
    pub fn new(required_threshold: u32) -> Self {
        Self::with_exposures(0, required_threshold)
    }

    pub fn with_exposures(exposure_count: u32, required_threshold: u32) -> Self {
        let required_threshold = required_threshold.max(1);
        LearnerLemmaInfo {
            state: LemmaState::from_exposures(exposure_count, required_threshold),
            exposure_count,
            required_threshold,
        }
    }

    fn bump(&mut self) {
        self.exposure_count = self.exposure_count.saturating_add(1);
        self.state = LemmaState::from_exposures(self.exposure_count, self.required_threshold);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LemmaProfile {
    vocabulary: HashMap<LemmaId, LearnerLemmaInfo>,
}

impl LemmaProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a fresh profile with every corpus lemma New.
    pub fn initialize(frequencies: &LemmaFrequencies, policy: &ThresholdPolicy) -> Self {
        let mut profile = Self::new();
        profile.extend_from_frequencies(frequencies, policy);
        profile
    }

    /// Adds lemmas the profile does not track yet. Existing thresholds are left
    /// untouched. Returns how many lemmas were added.
    pub fn extend_from_frequencies(
        &mut self,
        frequencies: &LemmaFrequencies,
        policy: &ThresholdPolicy,
    ) -> usize {
        let mut added = 0;
        for lemma_id in frequencies.lemma_ids() {
            self.vocabulary.entry(lemma_id).or_insert_with(|| {
                added += 1;
                LearnerLemmaInfo::new(policy.required_threshold(frequencies.share(lemma_id)))
            });
        }
        added
    }

    pub(crate) fn insert(&mut self, lemma_id: LemmaId, info: LearnerLemmaInfo) {
        self.vocabulary.insert(lemma_id, info);
    }

    pub fn get_lemma_info(&self, lemma_id: LemmaId) -> Option<&LearnerLemmaInfo> {
        self.vocabulary.get(&lemma_id)
    }

    pub fn tracks(&self, lemma_id: LemmaId) -> bool {
        self.vocabulary.contains_key(&lemma_id)
    }

    /// Untracked lemmas never gate leveling, so they read as Known.
    pub fn query(&self, lemma_id: LemmaId) -> LemmaState {
        self.vocabulary
            .get(&lemma_id)
            .map_or(LemmaState::Known, |info| info.state)
    }

    pub fn is_lemma_known_or_active(&self, lemma_id: LemmaId) -> bool {
        self.query(lemma_id).is_known_or_active()
    }

    pub fn exposure_count(&self, lemma_id: LemmaId) -> u32 {
        self.vocabulary.get(&lemma_id).map_or(0, |info| info.exposure_count)
    }

    pub fn record_exposure(&mut self, lemma_id: LemmaId) {
        if let Some(info) = self.vocabulary.get_mut(&lemma_id) {
            info.bump();
        }
    }

    pub fn record_exposures(&mut self, lemma_ids: &[LemmaId]) {
        for &lemma_id in lemma_ids {
            self.record_exposure(lemma_id);
        }
    }

    /// Moves a New lemma to its first exposure. Returns false when the lemma is
    /// untracked or already past New.
    pub fn activate(&mut self, lemma_id: LemmaId) -> bool {
        match self.vocabulary.get_mut(&lemma_id) {
            Some(info) if info.state == LemmaState::New => {
                info.bump();
                true
            }
            _ => false,
        }
    }

    pub fn snapshot(&self) -> LemmaProfile {
        self.clone()
    }

    pub fn restore(&mut self, snapshot: LemmaProfile) {
        *self = snapshot;
    }

    pub fn iter(&self) -> impl Iterator<Item = (LemmaId, &LearnerLemmaInfo)> {
        self.vocabulary.iter().map(|(id, info)| (*id, info))
    }

    // --- Counting methods ---
    pub fn count_known(&self) -> usize {
        self.count_in(LemmaState::Known)
    }

    pub fn count_active_only(&self) -> usize {
        self.count_in(LemmaState::Active)
    }

    pub fn count_total_known_or_active(&self) -> usize {
        self.vocabulary
            .values()
            .filter(|info| info.state.is_known_or_active())
            .count()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn total_exposure_count(&self) -> u64 {
        self.vocabulary.values().map(|info| info.exposure_count as u64).sum()
    }

    fn count_in(&self, state: LemmaState) -> usize {
        self.vocabulary.values().filter(|info| info.state == state).count()
    }
}
