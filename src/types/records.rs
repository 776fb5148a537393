//! Serialized shape of the precomputed sentence records consumed by the engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{WeaveError, WeaveResult};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SegmentInput {
    pub id: String,
    pub text: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PhraseAlignmentInput {
    pub segment_id: String,
    pub adv_s_span: String,
    pub sim_e_span: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SegmentLemmasInput {
    pub segment_id: String,
    pub lemmas: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DiglotEntryInput {
    pub eng_word: String,
    pub spa_lemma: String,
    pub exact_spa_form: String,
    pub viable: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DiglotSegmentInput {
    pub segment_id: String,
    pub entries: Vec<DiglotEntryInput>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SentenceInput {
    pub sentence_id: String,
    pub adv_s: String,
    pub sim_s: String,
    pub sim_e: String,
    pub sim_s_segments: Vec<SegmentInput>,
    pub phrase_alignments: Vec<PhraseAlignmentInput>,
    pub sim_s_lemmas: Vec<SegmentLemmasInput>,
    pub adv_s_lemmas: Vec<String>,
    pub diglot_map: Vec<DiglotSegmentInput>,
}

/// Corpus-wide lemma counts, keyed by lemma string.
pub type FrequencyTable = BTreeMap<String, u64>;

/// Reads sentence records in corpus order. Accepts a JSON array or JSON Lines.
pub fn load_sentences(path: &Path) -> WeaveResult<Vec<SentenceInput>> {
    let contents = fs::read_to_string(path).map_err(|e| WeaveError::io(path, e))?;
    parse_sentences(&contents).map_err(|e| WeaveError::json(path, e))
}

pub fn parse_sentences(contents: &str) -> Result<Vec<SentenceInput>, serde_json::Error> {
    if contents.trim_start().starts_with('[') {
        return serde_json::from_str(contents);
    }
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(serde_json::from_str::<SentenceInput>)
        .collect()
}

pub fn load_frequency_table(path: &Path) -> WeaveResult<FrequencyTable> {
    let contents = fs::read_to_string(path).map_err(|e| WeaveError::io(path, e))?;
    serde_json::from_str(&contents).map_err(|e| WeaveError::json(path, e))
}

/// Reads a book sequence: one book stem per line, in reading order. Blank
/// lines and lines starting with `#` are skipped.
pub fn load_book_sequence(path: &Path) -> WeaveResult<Vec<String>> {
    let contents = fs::read_to_string(path).map_err(|e| WeaveError::io(path, e))?;
    Ok(parse_book_sequence(&contents))
}

pub fn parse_book_sequence(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
