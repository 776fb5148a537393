use regex::Regex;
use std::ops::Range;

use super::numerical_types::SentenceRecord;

/// Separator between rendered sentences inside a batch, and between batches.
pub const SENTENCE_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub range: Range<usize>,
    pub replacement: String,
}

/// Weaves the sentence phrase by phrase: SimS text where `in_target[i]` holds,
/// the aligned SimE span otherwise, keeping SimS boundaries between phrases.
pub fn weave_phrases(record: &SentenceRecord, in_target: &[bool]) -> String {
    let mut woven = String::with_capacity(record.sim_s.len() + record.sim_e.len());
    for (phrase, &target) in record.phrases.iter().zip(in_target) {
        woven.push_str(&phrase.lead);
        if target {
            woven.push_str(&phrase.sim_s_text);
        } else {
            woven.push_str(phrase.sim_e_span.trim());
        }
    }
    woven.push_str(&record.tail);
    woven
}

/// First whole-word match of `pattern` inside `region` that does not overlap
/// an earlier substitution.
pub fn find_free_match(
    pattern: &Regex,
    haystack: &str,
    region: &Range<usize>,
    taken: &[Substitution],
) -> Option<Range<usize>> {
    pattern
        .find_iter(haystack)
        .map(|m| m.range())
        .filter(|r| r.start >= region.start && r.end <= region.end)
        .find(|r| !taken.iter().any(|s| r.start < s.range.end && s.range.start < r.end))
}

/// Rebuilds `base` with non-overlapping substitutions applied.
pub fn apply_substitutions(base: &str, substitutions: &[Substitution]) -> String {
    let mut ordered: Vec<&Substitution> = substitutions.iter().collect();
    ordered.sort_by_key(|s| s.range.start);

    let mut out = String::with_capacity(base.len());
    let mut cursor = 0;
    for sub in ordered {
        out.push_str(&base[cursor..sub.range.start]);
        out.push_str(&sub.replacement);
        cursor = sub.range.end;
    }
    out.push_str(&base[cursor..]);
    out
}

/// Joins texts verbatim with [`SENTENCE_SEPARATOR`]; empty texts keep their slot.
pub fn join_sentences<'a>(texts: impl IntoIterator<Item = &'a str>) -> String {
    texts.into_iter().collect::<Vec<_>>().join(SENTENCE_SEPARATOR)
}
