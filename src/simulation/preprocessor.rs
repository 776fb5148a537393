use regex::Regex;
use std::collections::HashSet;
use std::ops::Range;
use tracing::debug;

use super::dictionary::{GlobalLemmaDictionary, LemmaId};
use super::numerical_types::{DiglotCandidate, Phrase, SentenceId, SentenceRecord};
use crate::error::{WeaveError, WeaveResult};
use crate::types::records::SentenceInput;

/// Converts records in corpus order, assigning each its global id.
pub fn to_sentence_records(
    inputs: &[SentenceInput],
    dictionary: &mut GlobalLemmaDictionary,
) -> WeaveResult<Vec<SentenceRecord>> {
    inputs
        .iter()
        .enumerate()
        .map(|(index, input)| to_sentence_record(index as SentenceId, input, dictionary))
        .collect()
}

pub fn to_sentence_record(
    id: SentenceId,
    input: &SentenceInput,
    dictionary: &mut GlobalLemmaDictionary,
) -> WeaveResult<SentenceRecord> {
    let integrity = |details: String| WeaveError::DataIntegrity {
        sentence_id: id,
        key: input.sentence_id.clone(),
        details,
    };

    let names: Vec<&str> = input.sim_s_segments.iter().map(|s| s.id.as_str()).collect();
    let mut seen = HashSet::new();
    if let Some(dup) = names.iter().find(|name| !seen.insert(**name)) {
        return Err(integrity(format!("duplicate phrase name '{}'", dup)));
    }
    check_same_names(&names, "PHRASE_ALIGN", input.phrase_alignments.iter().map(|a| a.segment_id.as_str()))
        .map_err(&integrity)?;
    check_same_names(&names, "SimSL", input.sim_s_lemmas.iter().map(|l| l.segment_id.as_str()))
        .map_err(&integrity)?;
    check_same_names(&names, "DIGLOT_MAP", input.diglot_map.iter().map(|d| d.segment_id.as_str()))
        .map_err(&integrity)?;

    let segment_texts: Vec<&str> = input.sim_s_segments.iter().map(|s| s.text.as_str()).collect();
    let (leads, tail) = match locate_in_order(&input.sim_s, &segment_texts) {
        Some(ranges) => split_boundaries(&input.sim_s, &ranges),
        None => {
            debug!(sentence = %input.sentence_id, "SimS segments not found verbatim, joining with spaces");
            let leads = (0..names.len())
                .map(|i| if i == 0 { String::new() } else { " ".to_string() })
                .collect();
            (leads, String::new())
        }
    };
    let sim_e_ranges = locate_each(
        &input.sim_e,
        input.phrase_alignments.iter().map(|a| a.sim_e_span.as_str()),
    );

    let mut phrases = Vec::with_capacity(names.len());
    for (index, segment) in input.sim_s_segments.iter().enumerate() {
        let alignment = &input.phrase_alignments[index];
        let lemma_ids = intern_all(dictionary, input.sim_s_lemmas[index].lemmas.iter());

        let mut diglot = Vec::new();
        for entry in &input.diglot_map[index].entries {
            let base_word = entry.eng_word.trim();
            let Some(lemma_id) = dictionary.get_id_or_insert(&entry.spa_lemma) else {
                continue;
            };
            if base_word.is_empty() || entry.exact_spa_form.trim().is_empty() {
                continue;
            }
            let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(base_word)))
                .map_err(|e| integrity(format!("unusable diglot word '{}': {}", base_word, e)))?;
            diglot.push(DiglotCandidate {
                base_word: base_word.to_string(),
                lemma_id,
                surface_form: entry.exact_spa_form.trim().to_string(),
                viable: entry.viable,
                pattern,
            });
        }

        phrases.push(Phrase {
            name: segment.id.clone(),
            sim_s_text: segment.text.clone(),
            adv_s_span: alignment.adv_s_span.clone(),
            sim_e_span: alignment.sim_e_span.clone(),
            lemma_ids,
            diglot,
            lead: leads[index].clone(),
            sim_e_range: sim_e_ranges[index].clone(),
        });
    }

    Ok(SentenceRecord {
        id,
        key: input.sentence_id.clone(),
        adv_s: input.adv_s.clone(),
        sim_s: input.sim_s.clone(),
        sim_e: input.sim_e.clone(),
        adv_s_lemma_ids: intern_all(dictionary, input.adv_s_lemmas.iter()),
        phrases,
        tail,
    })
}

fn intern_all<'a>(
    dictionary: &mut GlobalLemmaDictionary,
    lemmas: impl Iterator<Item = &'a String>,
) -> Vec<LemmaId> {
    lemmas.filter_map(|l| dictionary.get_id_or_insert(l)).collect()
}

fn check_same_names<'a>(
    expected: &[&str],
    structure: &str,
    actual: impl Iterator<Item = &'a str>,
) -> Result<(), String> {
    let actual: Vec<&str> = actual.collect();
    if actual == expected {
        Ok(())
    } else {
        Err(format!(
            "{} phrase names {:?} do not match SimS_Segments {:?}",
            structure, actual, expected
        ))
    }
}

/// Finds every needle left to right without overlap; `None` if any is missing.
fn locate_in_order(haystack: &str, needles: &[&str]) -> Option<Vec<Range<usize>>> {
    let mut cursor = 0;
    let mut ranges = Vec::with_capacity(needles.len());
    for needle in needles {
        if needle.is_empty() {
            return None;
        }
        let start = cursor + haystack[cursor..].find(needle)?;
        cursor = start + needle.len();
        ranges.push(start..cursor);
    }
    Some(ranges)
}

/// Like `locate_in_order`, but a missing needle only loses its own range.
fn locate_each<'a>(haystack: &str, needles: impl Iterator<Item = &'a str>) -> Vec<Option<Range<usize>>> {
    let mut cursor = 0;
    needles
        .map(|needle| {
            let needle = needle.trim();
            if needle.is_empty() {
                return None;
            }
            let start = cursor + haystack[cursor..].find(needle)?;
            cursor = start + needle.len();
            Some(start..cursor)
        })
        .collect()
}

fn split_boundaries(haystack: &str, ranges: &[Range<usize>]) -> (Vec<String>, String) {
    let mut cursor = 0;
    let mut leads = Vec::with_capacity(ranges.len());
    for range in ranges {
        leads.push(haystack[cursor..range.start].to_string());
        cursor = range.end;
    }
    (leads, haystack[cursor..].to_string())
}
