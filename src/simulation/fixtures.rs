//! Record builders for tests, compiled for unit tests and behind the
//! `test-utils` feature for the integration suites.

use super::dictionary::GlobalLemmaDictionary;
use super::numerical_types::SentenceRecord;
use super::preprocessor::to_sentence_record;
use crate::profile::{LearnerLemmaInfo, LemmaProfile};
use crate::types::records::*;

/// Builds a well-formed sentence record: phrases are named S1, S2, ... and
/// SimS / SimE are the phrase texts joined by spaces with a closing period.
pub struct SentenceBuilder {
    input: SentenceInput,
    sim_s_parts: Vec<String>,
    sim_e_parts: Vec<String>,
}

impl SentenceBuilder {
    pub fn new(key: &str) -> Self {
        SentenceBuilder {
            input: SentenceInput {
                sentence_id: key.to_string(),
                ..Default::default()
            },
            sim_s_parts: Vec::new(),
            sim_e_parts: Vec::new(),
        }
    }

    pub fn advanced(mut self, text: &str, lemmas: &[&str]) -> Self {
        self.input.adv_s = text.to_string();
        self.input.adv_s_lemmas = lemmas.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn advanced_lemmas(mut self, lemmas: Vec<String>) -> Self {
        self.input.adv_s = format!("{}.", lemmas.join(" "));
        self.input.adv_s_lemmas = lemmas;
        self
    }

    /// Adds a phrase; `diglot` holds `(base word, lemma, surface form, viable)`.
    pub fn phrase(
        mut self,
        sim_s: &str,
        sim_e: &str,
        lemmas: &[&str],
        diglot: &[(&str, &str, &str, bool)],
    ) -> Self {
        let name = format!("S{}", self.input.sim_s_segments.len() + 1);
        self.input.sim_s_segments.push(SegmentInput {
            id: name.clone(),
            text: sim_s.to_string(),
        });
        self.input.phrase_alignments.push(PhraseAlignmentInput {
            segment_id: name.clone(),
            adv_s_span: sim_s.to_string(),
            sim_e_span: sim_e.to_string(),
        });
        self.input.sim_s_lemmas.push(SegmentLemmasInput {
            segment_id: name.clone(),
            lemmas: lemmas.iter().map(|l| l.to_string()).collect(),
        });
        self.input.diglot_map.push(DiglotSegmentInput {
            segment_id: name,
            entries: diglot
                .iter()
                .map(|(eng, lemma, form, viable)| DiglotEntryInput {
                    eng_word: eng.to_string(),
                    spa_lemma: lemma.to_string(),
                    exact_spa_form: form.to_string(),
                    viable: *viable,
                })
                .collect(),
        });
        self.sim_s_parts.push(sim_s.to_string());
        self.sim_e_parts.push(sim_e.to_string());
        self
    }

    pub fn input(mut self) -> SentenceInput {
        if self.input.sim_s.is_empty() {
            self.input.sim_s = format!("{}.", self.sim_s_parts.join(" "));
        }
        if self.input.sim_e.is_empty() {
            self.input.sim_e = format!("{}.", self.sim_e_parts.join(" "));
        }
        self.input
    }

    pub fn build(self, id: u64, dict: &mut GlobalLemmaDictionary) -> SentenceRecord {
        to_sentence_record(id, &self.input(), dict).expect("fixture sentence is well formed")
    }
}

/// Tracks `lemma` in `profile` with the given exposures and threshold.
pub fn track(
    profile: &mut LemmaProfile,
    dict: &mut GlobalLemmaDictionary,
    lemma: &str,
    exposures: u32,
    threshold: u32,
) {
    let id = dict.get_id_or_insert(lemma).expect("non-empty lemma");
    profile.insert(id, LearnerLemmaInfo::with_exposures(exposures, threshold));
}
