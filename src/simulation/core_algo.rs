//! Batch orchestration: collect a block, render it against a trial profile,
//! introduce new vocabulary while the block is too easy, then commit exposures.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::iter::Peekable;
use tracing::{debug, info, warn};

use super::activation::{collect_candidates, ActivationStrategy, HighestFrequencyFirst};
use super::comprehensibility::{evaluate_comprehensibility, Comprehensibility};
use super::dictionary::{GlobalLemmaDictionary, LemmaId};
use super::frequency::LemmaFrequencies;
use super::level_selector::{Level, LevelSelector, Rendering};
use super::numerical_types::{SentenceId, SentenceRecord};
use super::text_generator::join_sentences;
use crate::config::{ActivationMode, EngineConfig};
use crate::error::{WeaveError, WeaveResult};
use crate::profile::LemmaProfile;
use crate::profile_io::{Checkpoint, ProfileSnapshot};

/// Why a batch was committed while still at or above the target ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionWarning {
    AttemptsExhausted,
    CandidatesExhausted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedSentence {
    pub id: SentenceId,
    pub key: String,
    pub level: Level,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutput {
    /// 1-based position of the batch in the run.
    pub index: u64,
    pub first_sentence: SentenceId,
    pub last_sentence: SentenceId,
    pub sentences: Vec<RenderedSentence>,
    pub text: String,
    pub known_tokens: u64,
    pub total_tokens: u64,
    pub ratio: f64,
    pub attempts: u32,
    pub activated: Vec<String>,
    pub warning: Option<ExhaustionWarning>,
    pub saturation_notice: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommittedBatch {
    pub output: BatchOutput,
    pub profile: ProfileSnapshot,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub batches: u64,
    pub sentences: u64,
    pub flagged_batches: u64,
    pub saturation_notices: Vec<u64>,
    pub known_lemmas: usize,
    pub active_lemmas: usize,
}

impl RunSummary {
    /// Folds in a later run over the same learner; learner counts come from it.
    pub fn absorb(&mut self, later: RunSummary) {
        self.batches += later.batches;
        self.sentences += later.sentences;
        self.flagged_batches += later.flagged_batches;
        self.saturation_notices.extend(later.saturation_notices);
        self.known_lemmas = later.known_lemmas;
        self.active_lemmas = later.active_lemmas;
    }
}

/// One rendering of a whole block against one profile state.
struct Pass {
    renderings: Vec<Rendering>,
    score: Comprehensibility,
}

pub struct BatchGenerator<'a> {
    config: &'a EngineConfig,
    dictionary: &'a GlobalLemmaDictionary,
    frequencies: &'a LemmaFrequencies,
    strategy: Box<dyn ActivationStrategy + 'a>,
    profile: LemmaProfile,
    batches_committed: u64,
    next_sentence: SentenceId,
    saturation_streak: u32,
}

impl<'a> BatchGenerator<'a> {
    pub fn new(
        config: &'a EngineConfig,
        dictionary: &'a GlobalLemmaDictionary,
        frequencies: &'a LemmaFrequencies,
        profile: LemmaProfile,
    ) -> Self {
        BatchGenerator {
            config,
            dictionary,
            frequencies,
            strategy: Box::new(HighestFrequencyFirst),
            profile,
            batches_committed: 0,
            next_sentence: 0,
            saturation_streak: 0,
        }
    }

    pub fn with_strategy(mut self, strategy: impl ActivationStrategy + 'a) -> Self {
        self.strategy = Box::new(strategy);
        self
    }

    /// Continues from a checkpoint; the caller restores the profile itself since
    /// that needs a mutable dictionary.
    pub fn resume_from(mut self, checkpoint: &Checkpoint) -> Self {
        self.batches_committed = checkpoint.batches_committed;
        self.next_sentence = checkpoint.next_sentence;
        self.saturation_streak = checkpoint.saturation_streak;
        self
    }

    pub fn profile(&self) -> &LemmaProfile {
        &self.profile
    }

    pub fn batches_committed(&self) -> u64 {
        self.batches_committed
    }

    pub fn next_sentence(&self) -> SentenceId {
        self.next_sentence
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            batches_committed: self.batches_committed,
            next_sentence: self.next_sentence,
            saturation_streak: self.saturation_streak,
            profile: ProfileSnapshot::from_profile(&self.profile, self.dictionary),
        }
    }

    /// Pulls sentences until their SimSL sizes reach the block budget or the
    /// stream ends.
    pub fn collect_block<'r, I>(&self, stream: &mut Peekable<I>) -> Vec<&'r SentenceRecord>
    where
        I: Iterator<Item = &'r SentenceRecord>,
    {
        let mut block = Vec::new();
        let mut source_lemmas = 0;
        while source_lemmas < self.config.block_size_lemmas {
            match stream.next() {
                Some(record) => {
                    source_lemmas += record.source_lemma_count();
                    block.push(record);
                }
                None => break,
            }
        }
        block
    }

    fn evaluate(&self, block: &[&SentenceRecord], profile: &LemmaProfile) -> Pass {
        let selector = LevelSelector::new(profile, self.config.low_vocabulary_cutoff);
        let renderings = selector.select_all(block);
        let score = evaluate_comprehensibility(&renderings, profile);
        Pass { renderings, score }
    }

    /// Evaluates, regenerates and commits one block. The block must be non-empty
    /// and continue the sentence order.
    pub fn generate_batch(&mut self, block: &[&SentenceRecord]) -> CommittedBatch {
        let index = self.batches_committed + 1;
        let target = self.config.target_ratio;

        let mut trial = self.profile.snapshot();
        let mut pass = self.evaluate(block, &trial);
        let mut attempts = 0u32;
        let mut activated: Vec<LemmaId> = Vec::new();
        let mut rejected: HashSet<LemmaId> = HashSet::new();
        let mut warning = None;

        debug!(batch = index, ratio = pass.score.ratio(), "initial evaluation");

        while pass.score.meets(target) {
            let candidates = collect_candidates(block, &trial, self.frequencies, self.dictionary, &rejected);
            if candidates.is_empty() {
                warning = Some(ExhaustionWarning::CandidatesExhausted);
                break;
            }
            if attempts >= self.config.max_regen_attempts {
                warning = Some(ExhaustionWarning::AttemptsExhausted);
                break;
            }
            attempts += 1;

            let chosen = self.strategy.choose(&candidates, self.config.max_lemmas_per_pass);
            if chosen.is_empty() {
                warning = Some(ExhaustionWarning::CandidatesExhausted);
                break;
            }

            match self.config.activation_mode {
                ActivationMode::Together => {
                    let mut next = trial.snapshot();
                    let group: Vec<LemmaId> = chosen.into_iter().filter(|&id| next.activate(id)).collect();
                    let next_pass = self.evaluate(block, &next);
                    if group.is_empty() || next_pass.score.exceeds(&pass.score) {
                        debug!(batch = index, attempt = attempts, lemmas = ?self.names(&group), "activation rejected");
                        rejected.extend(group);
                    } else {
                        debug!(batch = index, attempt = attempts, lemmas = ?self.names(&group), ratio = next_pass.score.ratio(), "activated");
                        trial = next;
                        pass = next_pass;
                        activated.extend(group);
                    }
                }
                ActivationMode::OneAtATime => {
                    for lemma_id in chosen {
                        let mut next = trial.snapshot();
                        if !next.activate(lemma_id) {
                            rejected.insert(lemma_id);
                            continue;
                        }
                        let next_pass = self.evaluate(block, &next);
                        if next_pass.score.exceeds(&pass.score) {
                            debug!(batch = index, attempt = attempts, lemma = ?self.dictionary.get_str(lemma_id), "activation rejected");
                            rejected.insert(lemma_id);
                            continue;
                        }
                        debug!(batch = index, attempt = attempts, lemma = ?self.dictionary.get_str(lemma_id), ratio = next_pass.score.ratio(), "activated");
                        trial = next;
                        pass = next_pass;
                        activated.push(lemma_id);
                        if !pass.score.meets(target) {
                            break;
                        }
                    }
                }
            }
        }

        self.commit(block, index, trial, pass, attempts, activated, warning)
    }

    #[allow(clippy::too_many_arguments)]
    fn commit(
        &mut self,
        block: &[&SentenceRecord],
        index: u64,
        mut trial: LemmaProfile,
        pass: Pass,
        attempts: u32,
        activated: Vec<LemmaId>,
        warning: Option<ExhaustionWarning>,
    ) -> CommittedBatch {
        for rendering in &pass.renderings {
            trial.record_exposures(&rendering.target_lemmas);
        }
        self.profile = trial;
        self.batches_committed = index;
        if let Some(last) = block.last() {
            self.next_sentence = last.id + 1;
        }

        let saturated = pass.score.meets(self.config.target_ratio) && activated.is_empty();
        self.saturation_streak = if saturated { self.saturation_streak + 1 } else { 0 };
        let saturation_notice = self.saturation_streak == self.config.saturation_window;

        let sentences: Vec<RenderedSentence> = block
            .iter()
            .zip(&pass.renderings)
            .map(|(record, rendering)| RenderedSentence {
                id: record.id,
                key: record.key.clone(),
                level: rendering.level,
                text: rendering.text.clone(),
            })
            .collect();
        let output = BatchOutput {
            index,
            first_sentence: block.first().map_or(self.next_sentence, |r| r.id),
            last_sentence: block.last().map_or(self.next_sentence, |r| r.id),
            text: join_sentences(sentences.iter().map(|s| s.text.as_str())),
            sentences,
            known_tokens: pass.score.known,
            total_tokens: pass.score.total,
            ratio: pass.score.ratio(),
            attempts,
            activated: self.names(&activated),
            warning,
            saturation_notice,
        };

        info!(
            batch = index,
            sentences = output.sentences.len(),
            ratio = output.ratio,
            activated = output.activated.len(),
            attempts,
            known = self.profile.count_known(),
            active = self.profile.count_active_only(),
            exposures = self.profile.total_exposure_count(),
            "batch committed"
        );
        if let Some(w) = warning {
            warn!(batch = index, warning = ?w, ratio = output.ratio, "batch committed above target");
        }
        if saturation_notice {
            warn!(
                batch = index,
                streak = self.saturation_streak,
                "learner saturated: consecutive batches met target without new vocabulary"
            );
        }

        CommittedBatch {
            output,
            profile: ProfileSnapshot::from_profile(&self.profile, self.dictionary),
        }
    }

    /// Runs batches over `records` (corpus order), skipping sentences already
    /// committed. `on_commit` receives each batch with the checkpoint taken
    /// right after it.
    pub fn run<'r, I, F>(&mut self, records: I, mut on_commit: F) -> WeaveResult<RunSummary>
    where
        I: IntoIterator<Item = &'r SentenceRecord>,
        F: FnMut(&CommittedBatch, &Checkpoint) -> WeaveResult<()>,
    {
        let start = self.next_sentence;
        let mut last_seen: Option<&SentenceRecord> = None;
        let mut ordered = Vec::new();
        for record in records.into_iter().filter(|r| r.id >= start) {
            if let Some(prev) = last_seen {
                if record.id <= prev.id {
                    return Err(WeaveError::DataIntegrity {
                        sentence_id: record.id,
                        key: record.key.clone(),
                        details: format!("sentence arrived after sentence {}", prev.id),
                    });
                }
            }
            last_seen = Some(record);
            ordered.push(record);
        }

        let mut summary = RunSummary::default();
        let mut stream = ordered.into_iter().peekable();
        while stream.peek().is_some() {
            let block = self.collect_block(&mut stream);
            let committed = self.generate_batch(&block);
            on_commit(&committed, &self.checkpoint())?;

            summary.batches += 1;
            summary.sentences += committed.output.sentences.len() as u64;
            if committed.output.warning.is_some() {
                summary.flagged_batches += 1;
            }
            if committed.output.saturation_notice {
                summary.saturation_notices.push(committed.output.index);
            }
        }

        summary.known_lemmas = self.profile.count_known();
        summary.active_lemmas = self.profile.count_active_only();
        info!(
            batches = summary.batches,
            sentences = summary.sentences,
            known = summary.known_lemmas,
            "corpus exhausted"
        );
        Ok(summary)
    }

    fn names(&self, lemma_ids: &[LemmaId]) -> Vec<String> {
        lemma_ids
            .iter()
            .map(|&id| self.dictionary.get_str(id).unwrap_or_default().to_string())
            .collect()
    }
}
