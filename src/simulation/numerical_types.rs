use regex::Regex;
use std::ops::Range;

use super::dictionary::LemmaId;

/// Global, 0-based position of a sentence in the corpus stream.
pub type SentenceId = u64;

#[derive(Debug, Clone)]
pub struct DiglotCandidate {
    pub base_word: String,
    pub lemma_id: LemmaId,
    pub surface_form: String,
    pub viable: bool,
    /// Whole-word matcher for `base_word`.
    pub(crate) pattern: Regex,
}

/// One named phrase, carrying every representation aligned to it.
#[derive(Debug, Clone)]
pub struct Phrase {
    pub name: String,
    pub sim_s_text: String,
    pub adv_s_span: String,
    pub sim_e_span: String,
    pub lemma_ids: Vec<LemmaId>,
    pub diglot: Vec<DiglotCandidate>,
    /// SimS text between the previous phrase and this one.
    pub lead: String,
    /// Where `sim_e_span` sits inside the sentence's SimE, if it was found.
    pub sim_e_range: Option<Range<usize>>,
}

#[derive(Debug, Clone)]
pub struct SentenceRecord {
    pub id: SentenceId,
    pub key: String,
    pub adv_s: String,
    pub sim_s: String,
    pub sim_e: String,
    pub adv_s_lemma_ids: Vec<LemmaId>,
    pub phrases: Vec<Phrase>,
    /// SimS text after the last phrase.
    pub tail: String,
}

impl SentenceRecord {
    /// Sum of SimSL cardinalities; the unit of the block budget.
    pub fn source_lemma_count(&self) -> usize {
        self.phrases.iter().map(|p| p.lemma_ids.len()).sum()
    }

    /// Every lemma a rendering of this sentence could expose: AdvSL, SimSL and
    /// viable diglot lemmas.
    pub fn exposable_lemma_ids(&self) -> impl Iterator<Item = LemmaId> + '_ {
        let sim_s = self.phrases.iter().flat_map(|p| p.lemma_ids.iter().copied());
        let diglot = self
            .phrases
            .iter()
            .flat_map(|p| p.diglot.iter().filter(|c| c.viable).map(|c| c.lemma_id));
        self.adv_s_lemma_ids.iter().copied().chain(sim_s).chain(diglot)
    }
}
