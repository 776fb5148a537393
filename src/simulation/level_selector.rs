//! Chooses, per sentence, the most advanced rendering the learner can follow.
//!
//! Fallback order: L1 (AdvS), L2 (SimS), then L4 (diglot) while the learner's
//! vocabulary is below the low-vocabulary cutoff or L3 (woven) otherwise, and
//! L5 (SimE) when nothing else carries target-language content. Selection is a
//! pure function of the record and a read-only profile.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::dictionary::LemmaId;
use super::numerical_types::{SentenceId, SentenceRecord};
use super::text_generator::{apply_substitutions, find_free_match, weave_phrases, Substitution};
use crate::profile::{LemmaProfile, LemmaState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    #[serde(rename = "L1")]
    Advanced,
    #[serde(rename = "L2")]
    Simple,
    #[serde(rename = "L3")]
    Woven,
    #[serde(rename = "L4")]
    Diglot,
    #[serde(rename = "L5")]
    Base,
}

/// One sentence as it will be emitted, with the target-language lemma tokens
/// actually present in `text`.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendering {
    pub sentence_id: SentenceId,
    pub level: Level,
    pub text: String,
    pub target_lemmas: Vec<LemmaId>,
    /// L4 only: the phrase each substitution was made in, parallel to
    /// `target_lemmas`.
    pub substituted_phrases: Vec<usize>,
}

pub struct LevelSelector<'p> {
    profile: &'p LemmaProfile,
    low_vocabulary: bool,
}

impl<'p> LevelSelector<'p> {
    pub fn new(profile: &'p LemmaProfile, low_vocabulary_cutoff: usize) -> Self {
        LevelSelector {
            profile,
            low_vocabulary: profile.count_total_known_or_active() < low_vocabulary_cutoff,
        }
    }

    pub fn is_low_vocabulary(&self) -> bool {
        self.low_vocabulary
    }

    pub fn select(&self, record: &SentenceRecord) -> Rendering {
        self.try_advanced(record)
            .or_else(|| self.try_simple(record))
            .or_else(|| {
                if self.low_vocabulary {
                    self.try_diglot(record)
                } else {
                    self.try_woven(record)
                }
            })
            .unwrap_or_else(|| Rendering {
                sentence_id: record.id,
                level: Level::Base,
                text: record.sim_e.clone(),
                target_lemmas: Vec::new(),
                substituted_phrases: Vec::new(),
            })
    }

    /// Renders a block in parallel; output order matches `records`.
    pub fn select_all(&self, records: &[&SentenceRecord]) -> Vec<Rendering> {
        records.par_iter().map(|record| self.select(record)).collect()
    }

    fn understands_all(&self, lemma_ids: &[LemmaId]) -> bool {
        lemma_ids.iter().all(|&id| self.profile.is_lemma_known_or_active(id))
    }

    fn try_advanced(&self, record: &SentenceRecord) -> Option<Rendering> {
        self.understands_all(&record.adv_s_lemma_ids).then(|| Rendering {
            sentence_id: record.id,
            level: Level::Advanced,
            text: record.adv_s.clone(),
            target_lemmas: record.adv_s_lemma_ids.clone(),
            substituted_phrases: Vec::new(),
        })
    }

    fn try_simple(&self, record: &SentenceRecord) -> Option<Rendering> {
        if !record.phrases.iter().all(|p| self.understands_all(&p.lemma_ids)) {
            return None;
        }
        Some(Rendering {
            sentence_id: record.id,
            level: Level::Simple,
            text: record.sim_s.clone(),
            target_lemmas: record.phrases.iter().flat_map(|p| p.lemma_ids.iter().copied()).collect(),
            substituted_phrases: Vec::new(),
        })
    }

    fn try_woven(&self, record: &SentenceRecord) -> Option<Rendering> {
        let in_target: Vec<bool> = record
            .phrases
            .iter()
            .map(|p| self.understands_all(&p.lemma_ids))
            .collect();
        let target_lemmas: Vec<LemmaId> = record
            .phrases
            .iter()
            .zip(&in_target)
            .filter(|(_, target)| **target)
            .flat_map(|(p, _)| p.lemma_ids.iter().copied())
            .collect();
        // Phrases without tracked lemmas render in SimS but carry no new target content.
        if target_lemmas.is_empty() {
            return None;
        }
        Some(Rendering {
            sentence_id: record.id,
            level: Level::Woven,
            text: weave_phrases(record, &in_target),
            target_lemmas,
            substituted_phrases: Vec::new(),
        })
    }

    fn try_diglot(&self, record: &SentenceRecord) -> Option<Rendering> {
        let mut substitutions: Vec<Substitution> = Vec::new();
        let mut target_lemmas = Vec::new();
        let mut substituted_phrases = Vec::new();

        for (phrase_index, phrase) in record.phrases.iter().enumerate() {
            let mut candidates: Vec<(usize, _)> = phrase
                .diglot
                .iter()
                .enumerate()
                .filter(|(_, c)| c.viable && self.profile.query(c.lemma_id) == LemmaState::Active)
                .collect();
            candidates.sort_by_key(|(position, c)| (self.profile.exposure_count(c.lemma_id), *position));

            let region = phrase.sim_e_range.clone().unwrap_or(0..record.sim_e.len());
            for (_, candidate) in candidates {
                if let Some(range) = find_free_match(&candidate.pattern, &record.sim_e, &region, &substitutions) {
                    substitutions.push(Substitution {
                        range,
                        replacement: candidate.surface_form.clone(),
                    });
                    target_lemmas.push(candidate.lemma_id);
                    substituted_phrases.push(phrase_index);
                    break;
                }
            }
        }

        if substitutions.is_empty() {
            return None;
        }
        Some(Rendering {
            sentence_id: record.id,
            level: Level::Diglot,
            text: apply_substitutions(&record.sim_e, &substitutions),
            target_lemmas,
            substituted_phrases,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::dictionary::GlobalLemmaDictionary;
    use crate::simulation::fixtures::{track, SentenceBuilder};

    fn dog_runs() -> SentenceBuilder {
        SentenceBuilder::new("s1")
            .advanced("El perro veloz corre.", &["el", "perro", "veloz", "correr"])
            .phrase("El perro", "The dog", &["el", "perro"], &[("dog", "perro", "perro", true)])
            .phrase("corre", "runs", &["correr"], &[("runs", "correr", "corre", true)])
    }

    #[test]
    fn empty_profile_falls_back_to_base() {
        let mut dict = GlobalLemmaDictionary::new();
        let record = dog_runs().build(0, &mut dict);
        let mut profile = LemmaProfile::new();
        for lemma in ["el", "perro", "veloz", "correr"] {
            track(&mut profile, &mut dict, lemma, 0, 5);
        }

        let selector = LevelSelector::new(&profile, 50);
        assert!(selector.is_low_vocabulary());
        let rendering = selector.select(&record);
        assert_eq!(rendering.level, Level::Base);
        assert_eq!(rendering.text, "The dog runs.");
        assert!(rendering.target_lemmas.is_empty());
    }

    #[test]
    fn all_advanced_lemmas_known_gives_advanced_text_verbatim() {
        let mut dict = GlobalLemmaDictionary::new();
        let record = dog_runs().build(0, &mut dict);
        let mut profile = LemmaProfile::new();
        for lemma in ["el", "perro", "veloz", "correr"] {
            track(&mut profile, &mut dict, lemma, 5, 5);
        }

        let rendering = LevelSelector::new(&profile, 0).select(&record);
        assert_eq!(rendering.level, Level::Advanced);
        assert_eq!(rendering.text, "El perro veloz corre.");
        assert_eq!(rendering.target_lemmas.len(), 4);
    }

    #[test]
    fn sentence_without_lemmas_is_vacuously_advanced() {
        let mut dict = GlobalLemmaDictionary::new();
        let record = SentenceBuilder::new("s0")
            .advanced("¡Ay!", &[])
            .phrase("¡Ay!", "Oh!", &[], &[])
            .build(0, &mut dict);

        let rendering = LevelSelector::new(&LemmaProfile::new(), 50).select(&record);
        assert_eq!(rendering.level, Level::Advanced);
        assert_eq!(rendering.text, "¡Ay!");
    }

    #[test]
    fn unknown_advanced_word_drops_to_simple() {
        let mut dict = GlobalLemmaDictionary::new();
        let record = dog_runs().build(0, &mut dict);
        let mut profile = LemmaProfile::new();
        track(&mut profile, &mut dict, "veloz", 0, 5);
        for lemma in ["el", "perro", "correr"] {
            track(&mut profile, &mut dict, lemma, 1, 5);
        }

        let rendering = LevelSelector::new(&profile, 0).select(&record);
        assert_eq!(rendering.level, Level::Simple);
        assert_eq!(rendering.text, "El perro corre.");
    }

    #[test]
    fn woven_mixes_phrases_and_keeps_boundaries() {
        let mut dict = GlobalLemmaDictionary::new();
        let record = dog_runs().build(0, &mut dict);
        let mut profile = LemmaProfile::new();
        for lemma in ["veloz", "correr"] {
            track(&mut profile, &mut dict, lemma, 0, 5);
        }
        for lemma in ["el", "perro"] {
            track(&mut profile, &mut dict, lemma, 5, 5);
        }

        let rendering = LevelSelector::new(&profile, 1).select(&record);
        assert_eq!(rendering.level, Level::Woven);
        assert_eq!(rendering.text, "El perro runs.");
        assert_eq!(
            rendering.target_lemmas,
            vec![dict.get_id("el").unwrap(), dict.get_id("perro").unwrap()]
        );
    }

    #[test]
    fn low_vocabulary_prefers_least_practiced_active_candidate() {
        let mut dict = GlobalLemmaDictionary::new();
        let record = SentenceBuilder::new("s2")
            .advanced("La niña ve al gato.", &["el", "niña", "ver", "gato"])
            .phrase(
                "La niña ve",
                "The girl sees",
                &["el", "niña", "ver"],
                &[("girl", "niña", "niña", true), ("sees", "ver", "ve", true)],
            )
            .phrase("al gato", "the cat", &["gato"], &[("cat", "gato", "gato", false)])
            .build(0, &mut dict);
        let mut profile = LemmaProfile::new();
        track(&mut profile, &mut dict, "el", 0, 5);
        track(&mut profile, &mut dict, "niña", 3, 5);
        track(&mut profile, &mut dict, "ver", 1, 5);
        track(&mut profile, &mut dict, "gato", 2, 5);

        let rendering = LevelSelector::new(&profile, 50).select(&record);
        assert_eq!(rendering.level, Level::Diglot);
        // One substitution in the first phrase; the second phrase's only
        // candidate is not viable.
        assert_eq!(rendering.text, "The girl ve the cat.");
        assert_eq!(rendering.target_lemmas, vec![dict.get_id("ver").unwrap()]);
        assert_eq!(rendering.substituted_phrases, vec![0]);
    }

    #[test]
    fn diglot_substitutes_at_most_once_per_phrase() {
        let mut dict = GlobalLemmaDictionary::new();
        let record = SentenceBuilder::new("s4")
            .advanced("La niña ve al gato.", &["el", "niña", "ver", "gato"])
            .phrase(
                "La niña ve",
                "The girl sees",
                &["el", "niña", "ver"],
                &[("girl", "niña", "niña", true), ("sees", "ver", "ve", true)],
            )
            .phrase("al gato", "the cat", &["gato"], &[("cat", "gato", "gato", true)])
            .build(0, &mut dict);
        let mut profile = LemmaProfile::new();
        track(&mut profile, &mut dict, "el", 0, 5);
        track(&mut profile, &mut dict, "niña", 1, 5);
        track(&mut profile, &mut dict, "ver", 1, 5);
        track(&mut profile, &mut dict, "gato", 4, 5);

        // "niña" and "ver" tie on exposures; map order picks "niña" and the
        // first phrase takes no second substitution.
        let rendering = LevelSelector::new(&profile, 50).select(&record);
        assert_eq!(rendering.level, Level::Diglot);
        assert_eq!(rendering.text, "The niña sees the gato.");
        assert_eq!(
            rendering.target_lemmas,
            vec![dict.get_id("niña").unwrap(), dict.get_id("gato").unwrap()]
        );
        assert_eq!(rendering.substituted_phrases, vec![0, 1]);
    }

    #[test]
    fn diglot_skips_known_candidates_and_unmatched_words() {
        let mut dict = GlobalLemmaDictionary::new();
        let record = SentenceBuilder::new("s3")
            .advanced("La casa enorme.", &["el", "casa", "grande"])
            .phrase(
                "la casa grande",
                "the big house",
                &["el", "casa", "grande"],
                &[("home", "casa", "casa", true), ("big", "grande", "grande", true)],
            )
            .build(0, &mut dict);
        let mut profile = LemmaProfile::new();
        track(&mut profile, &mut dict, "el", 0, 5);
        track(&mut profile, &mut dict, "casa", 1, 5);
        track(&mut profile, &mut dict, "grande", 2, 5);

        // "home" is not in the SimE span, so the next candidate is used.
        let rendering = LevelSelector::new(&profile, 50).select(&record);
        assert_eq!(rendering.text, "the grande house.");

        track(&mut profile, &mut dict, "grande", 5, 5);
        let rendering = LevelSelector::new(&profile, 50).select(&record);
        assert_eq!(rendering.level, Level::Base);
    }

    #[test]
    fn select_all_preserves_order() {
        let mut dict = GlobalLemmaDictionary::new();
        let records: Vec<SentenceRecord> = (0..32)
            .map(|i| dog_runs().build(i, &mut dict))
            .collect();
        let refs: Vec<&SentenceRecord> = records.iter().collect();
        let renderings = LevelSelector::new(&LemmaProfile::new(), 0).select_all(&refs);

        let ids: Vec<u64> = renderings.iter().map(|r| r.sentence_id).collect();
        assert_eq!(ids, (0..32).collect::<Vec<_>>());
    }
}
