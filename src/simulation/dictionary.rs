use std::collections::HashMap;

use crate::types::records::SentenceInput;

pub type LemmaId = u32;

/// Interns target-language lemma strings as dense numeric ids.
#[derive(Debug, Default, Clone)]
pub struct GlobalLemmaDictionary {
    str_to_id: HashMap<String, LemmaId>,
    id_to_str: Vec<String>,
}

/// Lemmas are compared trimmed and lowercased.
pub fn normalize_lemma(lemma_str: &str) -> String {
    lemma_str.trim().to_lowercase()
}

impl GlobalLemmaDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the id for a lemma, assigning the next free id on first sight.
    /// Returns `None` for lemmas that normalize to an empty string.
    pub fn get_id_or_insert(&mut self, lemma_str: &str) -> Option<LemmaId> {
        let cleaned = normalize_lemma(lemma_str);
        if cleaned.is_empty() {
            return None;
        }
        if let Some(id) = self.str_to_id.get(&cleaned) {
            return Some(*id);
        }
        let id = self.id_to_str.len() as LemmaId;
        self.str_to_id.insert(cleaned.clone(), id);
        self.id_to_str.push(cleaned);
        Some(id)
    }

    /// Looks up a lemma without inserting it.
    pub fn get_id(&self, lemma_str: &str) -> Option<LemmaId> {
        let cleaned = normalize_lemma(lemma_str);
        if cleaned.is_empty() {
            return None;
        }
        self.str_to_id.get(&cleaned).copied()
    }

    pub fn get_str(&self, lemma_id: LemmaId) -> Option<&str> {
        self.id_to_str.get(lemma_id as usize).map(String::as_str)
    }

    pub fn size(&self) -> usize {
        self.id_to_str.len()
    }

    /// Registers every lemma mentioned by the records, in corpus order, so ids
    /// do not depend on which sentence is converted first.
    pub fn populate_from_sentences(&mut self, sentences: &[SentenceInput]) {
        for sentence in sentences {
            for lemma in &sentence.adv_s_lemmas {
                self.get_id_or_insert(lemma);
            }
            for segment_lemmas in &sentence.sim_s_lemmas {
                for lemma in &segment_lemmas.lemmas {
                    self.get_id_or_insert(lemma);
                }
            }
            for segment_map in &sentence.diglot_map {
                for entry in &segment_map.entries {
                    self.get_id_or_insert(&entry.spa_lemma);
                }
            }
        }
    }
}
