use std::collections::HashMap;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{WeaveError, WeaveResult};
use crate::profile::LemmaProfile;
use crate::profile_io::{
    load_checkpoint, load_profile_snapshot, read_json, save_checkpoint, save_profile_snapshot, write_atomic,
    write_json_atomic, Checkpoint, ProfileSnapshot,
};
use crate::simulation::core_algo::{BatchGenerator, BatchOutput, CommittedBatch, RunSummary};
use crate::simulation::dictionary::GlobalLemmaDictionary;
use crate::simulation::frequency::{LemmaFrequencies, ThresholdPolicy};
use crate::simulation::numerical_types::{SentenceId, SentenceRecord};
use crate::simulation::preprocessor::to_sentence_records;
use crate::simulation::text_generator::join_sentences;
use crate::types::records::{load_book_sequence, load_frequency_table, load_sentences, SentenceInput};
use crate::LemmaState;

pub const BATCHES_DIR: &str = "batches";
pub const PROFILES_DIR: &str = "profiles";
pub const BOOKS_DIR: &str = "books";
pub const CHECKPOINT_FILE: &str = "checkpoint.json";
pub const CORPUS_FILE: &str = "corpus.txt";
pub const PROFILE_FILE: &str = "profile.json";

/// Known lemmas per learner level in book text file names.
pub const KNOWN_LEMMAS_PER_LEVEL: usize = 100;

#[derive(Debug, Clone)]
pub struct GenerationArgs {
    /// A records file, or with `sequence_path` the directory holding one
    /// `<stem>.jsonl` (or `<stem>.json`) per book.
    pub corpus_path: PathBuf,
    /// Falls back to counting the corpus itself when absent.
    pub frequencies_path: Option<PathBuf>,
    pub out_dir: PathBuf,
    pub start_profile_path: Option<PathBuf>,
    pub resume: bool,
    /// Book stems in reading order, one per line.
    pub sequence_path: Option<PathBuf>,
}

/// One appearance of a book in the reading sequence. A book listed twice gets
/// two instances, each with its own global sentence ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookInstance {
    pub stem: String,
    /// `{stem}_instNN`, numbered per stem from 01.
    pub id: String,
    pub sentences: Range<SentenceId>,
}

pub fn batch_file_stem(index: u64) -> String {
    format!("batch_{:06}", index)
}

pub fn in_profile_file_name(book_id: &str) -> String {
    format!("{book_id}_in.profile.json")
}

pub fn out_profile_file_name(book_id: &str) -> String {
    format!("{book_id}_out.profile.json")
}

pub fn book_text_file_name(book_id: &str, start_level: usize, end_level: usize) -> String {
    format!("{book_id}_lvl{start_level:02}_lvl{end_level:02}.txt")
}

pub fn book_instance_ids(stems: &[String]) -> Vec<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    stems
        .iter()
        .map(|stem| {
            let count = seen.entry(stem.as_str()).or_insert(0);
            *count += 1;
            format!("{stem}_inst{:02}", *count)
        })
        .collect()
}

/// Learner level of a snapshot: Known lemmas divided by [`KNOWN_LEMMAS_PER_LEVEL`].
pub fn learner_level(snapshot: &ProfileSnapshot) -> usize {
    let known = snapshot
        .state_counts()
        .iter()
        .find(|(state, _)| *state == LemmaState::Known)
        .map_or(0, |(_, count)| *count);
    known / KNOWN_LEMMAS_PER_LEVEL
}

/// One pass over the corpus. Each batch is written to `out_dir/batches` before
/// the checkpoint that covers it, so an interrupted run can be resumed from the
/// last checkpoint. With a book sequence, blocks never span two books and each
/// book instance also gets entry and exit snapshots under `out_dir/profiles`
/// and a level-tagged text under `out_dir/books`. The returned summary covers
/// only batches produced by this invocation.
pub fn run_corpus_generation(config: &EngineConfig, args: &GenerationArgs) -> WeaveResult<RunSummary> {
    config.validate()?;

    let (inputs, books) = load_corpus(args)?;
    let mut dictionary = GlobalLemmaDictionary::new();
    dictionary.populate_from_sentences(&inputs);
    let frequencies = match &args.frequencies_path {
        Some(path) => LemmaFrequencies::from_table(&load_frequency_table(path)?, &mut dictionary),
        None => LemmaFrequencies::from_sentences(&inputs, &mut dictionary),
    };
    let records = to_sentence_records(&inputs, &mut dictionary)?;
    info!(
        sentences = records.len(),
        books = books.len(),
        lemmas = dictionary.size(),
        frequency_entries = frequencies.len(),
        "corpus loaded"
    );

    let checkpoint_path = args.out_dir.join(CHECKPOINT_FILE);
    let checkpoint = if args.resume {
        let checkpoint = load_checkpoint(&checkpoint_path)?;
        match &checkpoint {
            Some(cp) => info!(
                batches_committed = cp.batches_committed,
                next_sentence = cp.next_sentence,
                "resuming from checkpoint"
            ),
            None => info!(path = ?checkpoint_path, "no checkpoint found, starting from the beginning"),
        }
        checkpoint
    } else {
        None
    };

    let mut profile = match (&checkpoint, &args.start_profile_path) {
        (Some(cp), _) => cp.profile.to_profile(&mut dictionary),
        (None, Some(path)) => {
            let profile = load_profile_snapshot(path)?.to_profile(&mut dictionary);
            info!(path = ?path, known = profile.count_known(), "loaded starting profile");
            profile
        }
        (None, None) => LemmaProfile::new(),
    };
    let added = profile.extend_from_frequencies(&frequencies, &ThresholdPolicy::from_config(config));
    debug!(added, tracked = profile.vocabulary_size(), "profile initialized");

    let batches_dir = args.out_dir.join(BATCHES_DIR);
    fs::create_dir_all(&batches_dir).map_err(|e| WeaveError::io(&batches_dir, e))?;

    let mut generator = BatchGenerator::new(config, &dictionary, &frequencies, profile);
    if let Some(cp) = &checkpoint {
        generator = generator.resume_from(cp);
    }

    let summary = if books.is_empty() {
        generator.run(&records, |batch, progress| {
            write_batch(&batches_dir, &checkpoint_path, batch, progress)
        })?
    } else {
        run_book_sequence(&mut generator, &records, &books, &dictionary, &args.out_dir)?
    };

    let committed = generator.batches_committed();
    let corpus_text = assemble_corpus_text(&batches_dir, committed)?;
    write_atomic(&args.out_dir.join(CORPUS_FILE), corpus_text.as_bytes())?;
    save_profile_snapshot(
        &ProfileSnapshot::from_profile(generator.profile(), &dictionary),
        &args.out_dir.join(PROFILE_FILE),
    )?;
    info!(out_dir = ?args.out_dir, batches = committed, "corpus written");

    Ok(summary)
}

/// Loads the sentence records in global order, plus the book instances
/// covering them when a sequence is given.
fn load_corpus(args: &GenerationArgs) -> WeaveResult<(Vec<SentenceInput>, Vec<BookInstance>)> {
    let Some(sequence_path) = &args.sequence_path else {
        return Ok((load_sentences(&args.corpus_path)?, Vec::new()));
    };

    let stems = load_book_sequence(sequence_path)?;
    if stems.is_empty() {
        return Err(WeaveError::Configuration(format!(
            "book sequence {:?} lists no books",
            sequence_path
        )));
    }

    let mut inputs = Vec::new();
    let mut books = Vec::with_capacity(stems.len());
    let mut loaded: HashMap<&str, Vec<SentenceInput>> = HashMap::new();
    for (stem, id) in stems.iter().zip(book_instance_ids(&stems)) {
        if !loaded.contains_key(stem.as_str()) {
            let book = load_sentences(&book_records_path(&args.corpus_path, stem))?;
            loaded.insert(stem.as_str(), book);
        }
        let start = inputs.len() as SentenceId;
        if let Some(book) = loaded.get(stem.as_str()) {
            inputs.extend(book.iter().cloned());
        }
        let end = inputs.len() as SentenceId;
        debug!(book = %id, start, end, "book instance queued");
        books.push(BookInstance {
            stem: stem.clone(),
            id,
            sentences: start..end,
        });
    }
    Ok((inputs, books))
}

fn book_records_path(dir: &Path, stem: &str) -> PathBuf {
    let jsonl = dir.join(format!("{stem}.jsonl"));
    if jsonl.exists() {
        jsonl
    } else {
        dir.join(format!("{stem}.json"))
    }
}

fn write_batch(
    batches_dir: &Path,
    checkpoint_path: &Path,
    batch: &CommittedBatch,
    progress: &Checkpoint,
) -> WeaveResult<()> {
    let stem = batch_file_stem(batch.output.index);
    write_json_atomic(&batch.output, &batches_dir.join(format!("{stem}.json")))?;
    write_atomic(&batches_dir.join(format!("{stem}.txt")), batch.output.text.as_bytes())?;
    save_checkpoint(progress, checkpoint_path)?;
    debug!(batch = batch.output.index, next_sentence = progress.next_sentence, "checkpoint written");
    Ok(())
}

/// Runs the books one after another against the same learner. A book already
/// finished before this invocation is skipped; one that was interrupted keeps
/// the entry snapshot written when it started.
fn run_book_sequence(
    generator: &mut BatchGenerator<'_>,
    records: &[SentenceRecord],
    books: &[BookInstance],
    dictionary: &GlobalLemmaDictionary,
    out_dir: &Path,
) -> WeaveResult<RunSummary> {
    let batches_dir = out_dir.join(BATCHES_DIR);
    let profiles_dir = out_dir.join(PROFILES_DIR);
    let books_dir = out_dir.join(BOOKS_DIR);
    let checkpoint_path = out_dir.join(CHECKPOINT_FILE);
    for dir in [&profiles_dir, &books_dir] {
        fs::create_dir_all(dir).map_err(|e| WeaveError::io(dir, e))?;
    }

    let mut summary = RunSummary::default();
    for book in books {
        if generator.next_sentence() > book.sentences.end {
            continue;
        }

        let in_path = profiles_dir.join(in_profile_file_name(&book.id));
        let entry = if generator.next_sentence() <= book.sentences.start {
            let snapshot = ProfileSnapshot::from_profile(generator.profile(), dictionary);
            save_profile_snapshot(&snapshot, &in_path)?;
            info!(
                book = %book.id,
                sentences = book.sentences.end - book.sentences.start,
                level = learner_level(&snapshot),
                "book started"
            );
            snapshot
        } else {
            load_profile_snapshot(&in_path)?
        };

        let span = book.sentences.start as usize..book.sentences.end as usize;
        let part = generator.run(&records[span], |batch, progress| {
            write_batch(&batches_dir, &checkpoint_path, batch, progress)
        })?;
        summary.absorb(part);

        let exit = ProfileSnapshot::from_profile(generator.profile(), dictionary);
        save_profile_snapshot(&exit, &profiles_dir.join(out_profile_file_name(&book.id)))?;
        let (start_level, end_level) = (learner_level(&entry), learner_level(&exit));
        let text = book_text(&batches_dir, generator.batches_committed(), book.sentences.start)?;
        write_atomic(
            &books_dir.join(book_text_file_name(&book.id, start_level, end_level)),
            text.as_bytes(),
        )?;
        info!(book = %book.id, start_level, end_level, "book finished");
    }
    summary.known_lemmas = generator.profile().count_known();
    summary.active_lemmas = generator.profile().count_active_only();
    Ok(summary)
}

/// Text of the trailing committed batches that start at or after
/// `first_sentence`. Batches never span two books.
fn book_text(batches_dir: &Path, committed: u64, first_sentence: SentenceId) -> WeaveResult<String> {
    let mut texts = Vec::new();
    for index in (1..=committed).rev() {
        let output: BatchOutput = read_json(&batches_dir.join(format!("{}.json", batch_file_stem(index))))?;
        if output.last_sentence < first_sentence {
            break;
        }
        texts.push(output.text);
    }
    texts.reverse();
    Ok(join_sentences(texts.iter().map(String::as_str)))
}

/// Joins the text files of batches `1..=batches` in order.
fn assemble_corpus_text(batches_dir: &Path, batches: u64) -> WeaveResult<String> {
    let mut texts = Vec::with_capacity(batches as usize);
    for index in 1..=batches {
        let path = batches_dir.join(format!("{}.txt", batch_file_stem(index)));
        texts.push(fs::read_to_string(&path).map_err(|e| WeaveError::io(&path, e))?);
    }
    Ok(join_sentences(texts.iter().map(String::as_str)))
}
