#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use weavelang_engine::profile::{LearnerLemmaInfo, LemmaProfile};
use weavelang_engine::profile_io::ProfileSnapshot;
use weavelang_engine::simulation::{
    to_sentence_records, GlobalLemmaDictionary, LemmaFrequencies, SentenceRecord,
};
use weavelang_engine::types::records::{FrequencyTable, SentenceInput};

pub use weavelang_engine::simulation::fixtures::SentenceBuilder;

/// A preprocessed corpus ready to drive a `BatchGenerator`.
pub struct Corpus {
    pub dictionary: GlobalLemmaDictionary,
    pub frequencies: LemmaFrequencies,
    pub records: Vec<SentenceRecord>,
}

impl Corpus {
    pub fn new(inputs: &[SentenceInput], table: &FrequencyTable) -> Self {
        let mut dictionary = GlobalLemmaDictionary::new();
        dictionary.populate_from_sentences(inputs);
        let frequencies = LemmaFrequencies::from_table(table, &mut dictionary);
        let records = to_sentence_records(inputs, &mut dictionary).expect("well-formed corpus");
        Corpus {
            dictionary,
            frequencies,
            records,
        }
    }

    pub fn refs(&self) -> Vec<&SentenceRecord> {
        self.records.iter().collect()
    }

    /// Builds a profile from `(lemma, exposures, threshold)` triples.
    pub fn profile(&mut self, entries: &[(&str, u32, u32)]) -> LemmaProfile {
        snapshot(entries).to_profile(&mut self.dictionary)
    }
}

pub fn snapshot(entries: &[(&str, u32, u32)]) -> ProfileSnapshot {
    ProfileSnapshot {
        lemmas: entries
            .iter()
            .map(|(lemma, exposures, threshold)| {
                (lemma.to_string(), LearnerLemmaInfo::with_exposures(*exposures, *threshold))
            })
            .collect(),
    }
}

pub fn table(entries: &[(&str, u64)]) -> FrequencyTable {
    entries.iter().map(|(lemma, count)| (lemma.to_string(), *count)).collect()
}

pub fn write_jsonl(dir: &Path, name: &str, inputs: &[SentenceInput]) -> PathBuf {
    let path = dir.join(name);
    let lines: Vec<String> = inputs
        .iter()
        .map(|input| serde_json::to_string(input).expect("serializable record"))
        .collect();
    fs::write(&path, lines.join("\n")).expect("write corpus");
    path
}

/// A small storybook corpus with repeated vocabulary, diglot entries and a
/// few lemma-free sentences.
pub fn storybook() -> Vec<SentenceInput> {
    let mut inputs = Vec::new();
    for round in 0..6 {
        inputs.push(
            SentenceBuilder::new(&format!("dog-{round}"))
                .advanced("El perro veloz corre.", &["el", "perro", "veloz", "correr"])
                .phrase("El perro", "The dog", &["el", "perro"], &[("dog", "perro", "perro", true)])
                .phrase("corre", "runs", &["correr"], &[("runs", "correr", "corre", true)])
                .input(),
        );
        inputs.push(
            SentenceBuilder::new(&format!("girl-{round}"))
                .advanced("La niña mira al gato.", &["el", "niña", "mirar", "gato"])
                .phrase(
                    "La niña ve",
                    "The girl sees",
                    &["el", "niña", "ver"],
                    &[("girl", "niña", "niña", true), ("sees", "ver", "ve", true)],
                )
                .phrase("al gato", "the cat", &["gato"], &[("cat", "gato", "gato", true)])
                .input(),
        );
        inputs.push(
            SentenceBuilder::new(&format!("house-{round}"))
                .advanced("La casa es enorme.", &["el", "casa", "ser", "enorme"])
                .phrase("La casa", "The house", &["el", "casa"], &[("house", "casa", "casa", true)])
                .phrase("es grande", "is big", &["ser", "grande"], &[("big", "grande", "grande", false)])
                .input(),
        );
        inputs.push(SentenceBuilder::new(&format!("ay-{round}")).advanced("¡Ay!", &[]).input());
    }
    inputs
}
