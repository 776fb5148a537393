#[path = "../common/mod.rs"]
mod common;

use common::{snapshot, table, Corpus, SentenceBuilder};
use proptest::prelude::*;
use weavelang_engine::config::{ActivationMode, EngineConfig};
use weavelang_engine::profile_io::ProfileSnapshot;
use weavelang_engine::simulation::{
    evaluate_comprehensibility, BatchGenerator, BatchOutput, Comprehensibility, Level, LevelSelector,
};
use weavelang_engine::types::records::SentenceInput;
use weavelang_engine::LemmaState;

const POOL: [(&str, &str); 8] = [
    ("sol", "sun"),
    ("mar", "sea"),
    ("luna", "moon"),
    ("casa", "house"),
    ("perro", "dog"),
    ("gato", "cat"),
    ("agua", "water"),
    ("pan", "bread"),
];

type PhraseSeed = (Vec<usize>, Vec<bool>);
type SentenceSeed = (Vec<PhraseSeed>, Vec<usize>);

fn build_corpus(seeds: &[SentenceSeed]) -> Vec<SentenceInput> {
    seeds
        .iter()
        .enumerate()
        .map(|(i, (phrases, extra))| {
            let mut builder = SentenceBuilder::new(&format!("p{i}"));
            let mut adv_lemmas = Vec::new();
            for (lemma_idx, viable) in phrases {
                let lemmas: Vec<&str> = lemma_idx.iter().map(|&l| POOL[l].0).collect();
                let words: Vec<&str> = lemma_idx.iter().map(|&l| POOL[l].1).collect();
                let sim_s = if lemmas.is_empty() { "eh".to_string() } else { lemmas.join(" ") };
                let sim_e = if words.is_empty() { "uh".to_string() } else { words.join(" ") };
                let diglot: Vec<(&str, &str, &str, bool)> = lemma_idx
                    .iter()
                    .zip(viable.iter().cycle())
                    .map(|(&l, &v)| (POOL[l].1, POOL[l].0, POOL[l].0, v))
                    .collect();
                builder = builder.phrase(&sim_s, &sim_e, &lemmas, &diglot);
                adv_lemmas.extend(lemmas.iter().map(|l| l.to_string()));
            }
            adv_lemmas.extend(extra.iter().map(|&l| POOL[l].0.to_string()));
            builder.advanced_lemmas(adv_lemmas).input()
        })
        .collect()
}

fn corpus_strategy() -> impl Strategy<Value = Vec<SentenceSeed>> {
    let phrase = (
        prop::collection::vec(0..POOL.len(), 0..3),
        prop::collection::vec(any::<bool>(), 1..3),
    );
    let sentence = (prop::collection::vec(phrase, 0..4), prop::collection::vec(0..POOL.len(), 0..2));
    prop::collection::vec(sentence, 1..12)
}

/// `(exposures, threshold)` per pool lemma.
fn profile_strategy() -> impl Strategy<Value = Vec<(u32, u32)>> {
    prop::collection::vec((0u32..4, 1u32..5), POOL.len())
}

fn corpus_with_profile(
    seeds: &[SentenceSeed],
    learner: &[(u32, u32)],
) -> (Corpus, weavelang_engine::LemmaProfile) {
    let frequencies: Vec<(&str, u64)> = POOL
        .iter()
        .enumerate()
        .map(|(i, (lemma, _))| (*lemma, (i as u64 + 1) * 7))
        .collect();
    let mut corpus = Corpus::new(&build_corpus(seeds), &table(&frequencies));
    let entries: Vec<(&str, u32, u32)> = POOL
        .iter()
        .zip(learner)
        .map(|((lemma, _), (exposures, threshold))| (*lemma, *exposures, *threshold))
        .collect();
    let profile = corpus.profile(&entries);
    (corpus, profile)
}

fn rank(state: LemmaState) -> u8 {
    match state {
        LemmaState::New => 0,
        LemmaState::Active => 1,
        LemmaState::Known => 2,
    }
}

/// Runs the whole corpus batch by batch, checking per-batch invariants on the
/// way, and returns every output with the snapshot taken after it.
fn run_checked(
    seeds: &[SentenceSeed],
    learner: &[(u32, u32)],
    config: &EngineConfig,
) -> Result<Vec<(BatchOutput, ProfileSnapshot)>, TestCaseError> {
    let (corpus, profile) = corpus_with_profile(seeds, learner);
    let mut previous = ProfileSnapshot::from_profile(&profile, &corpus.dictionary);
    let mut generator = BatchGenerator::new(config, &corpus.dictionary, &corpus.frequencies, profile);

    let mut results = Vec::new();
    let mut stream = corpus.records.iter().peekable();
    while stream.peek().is_some() {
        let block = generator.collect_block(&mut stream);
        prop_assert!(!block.is_empty());

        let initial = {
            let selector = LevelSelector::new(generator.profile(), config.low_vocabulary_cutoff);
            evaluate_comprehensibility(&selector.select_all(&block), generator.profile())
        };
        let committed = generator.generate_batch(&block);
        let output = committed.output;

        // Regeneration never makes a batch easier than its first rendering.
        let finished = Comprehensibility {
            known: output.known_tokens,
            total: output.total_tokens,
        };
        prop_assert!(!finished.exceeds(&initial));

        for (lemma, before) in &previous.lemmas {
            let after = &committed.profile.lemmas[lemma];
            prop_assert!(after.exposure_count >= before.exposure_count);
            prop_assert!(rank(after.state) >= rank(before.state));
            prop_assert_eq!(after.required_threshold, before.required_threshold);
        }
        previous = committed.profile.clone();
        results.push((output, committed.profile));
    }
    Ok(results)
}

fn config(block: usize, low_vocabulary: usize, one_at_a_time: bool, per_pass: usize) -> EngineConfig {
    EngineConfig {
        block_size_lemmas: block,
        target_ratio: 0.8,
        low_vocabulary_cutoff: low_vocabulary,
        max_lemmas_per_pass: per_pass,
        max_regen_attempts: 4,
        activation_mode: if one_at_a_time {
            ActivationMode::OneAtATime
        } else {
            ActivationMode::Together
        },
        ..Default::default()
    }
}

proptest! {
    #[test]
    fn runs_are_deterministic_and_cover_every_sentence(
        seeds in corpus_strategy(),
        learner in profile_strategy(),
        block in 1usize..8,
        low_vocabulary in 0usize..10,
        one_at_a_time in any::<bool>(),
        per_pass in 1usize..4,
    ) {
        let config = config(block, low_vocabulary, one_at_a_time, per_pass);
        let first = run_checked(&seeds, &learner, &config)?;
        let second = run_checked(&seeds, &learner, &config)?;
        prop_assert_eq!(&first, &second);

        let ids: Vec<u64> = first
            .iter()
            .flat_map(|(output, _)| output.sentences.iter().map(|s| s.id))
            .collect();
        prop_assert_eq!(ids, (0..seeds.len() as u64).collect::<Vec<_>>());
        for (i, (output, _)) in first.iter().enumerate() {
            prop_assert_eq!(output.index, i as u64 + 1);
            prop_assert!(output.attempts <= config.max_regen_attempts);
        }
    }

    #[test]
    fn selector_is_total_and_respects_level_rules(
        seeds in corpus_strategy(),
        learner in profile_strategy(),
        low_vocabulary in 0usize..10,
    ) {
        let (corpus, profile) = corpus_with_profile(&seeds, &learner);
        let selector = LevelSelector::new(&profile, low_vocabulary);

        for record in &corpus.records {
            let rendering = selector.select(record);
            if rendering.level != Level::Diglot {
                prop_assert!(rendering.substituted_phrases.is_empty());
            }
            let adv_readable = record
                .adv_s_lemma_ids
                .iter()
                .all(|&id| profile.is_lemma_known_or_active(id));

            if adv_readable {
                prop_assert_eq!(rendering.level, Level::Advanced);
                prop_assert_eq!(&rendering.text, &record.adv_s);
            }
            match rendering.level {
                Level::Diglot => {
                    prop_assert!(selector.is_low_vocabulary());
                    prop_assert!(!rendering.target_lemmas.is_empty());
                    // At most one substitution per phrase, each drawn from
                    // that phrase's own viable entries.
                    prop_assert_eq!(rendering.substituted_phrases.len(), rendering.target_lemmas.len());
                    prop_assert!(rendering.substituted_phrases.windows(2).all(|w| w[0] < w[1]));
                    for (&phrase, &id) in rendering.substituted_phrases.iter().zip(&rendering.target_lemmas) {
                        prop_assert!(phrase < record.phrases.len());
                        prop_assert!(record.phrases[phrase].diglot.iter().any(|c| c.viable && c.lemma_id == id));
                        prop_assert_eq!(profile.query(id), LemmaState::Active);
                    }
                }
                Level::Woven => prop_assert!(!selector.is_low_vocabulary()),
                Level::Base => {
                    prop_assert!(rendering.target_lemmas.is_empty());
                    prop_assert_eq!(&rendering.text, &record.sim_e);
                }
                Level::Advanced | Level::Simple => {}
            }
        }
    }

    #[test]
    fn snapshots_restore_the_same_learner(learner in profile_strategy()) {
        let entries: Vec<(&str, u32, u32)> = POOL
            .iter()
            .zip(&learner)
            .map(|((lemma, _), (exposures, threshold))| (*lemma, *exposures, *threshold))
            .collect();
        let original = snapshot(&entries);
        let mut dictionary = weavelang_engine::simulation::GlobalLemmaDictionary::new();
        let profile = original.to_profile(&mut dictionary);
        prop_assert_eq!(ProfileSnapshot::from_profile(&profile, &dictionary), original);
    }
}
