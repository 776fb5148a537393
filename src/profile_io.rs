use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::{WeaveError, WeaveResult};
use crate::profile::{LearnerLemmaInfo, LemmaProfile, LemmaState};
use crate::simulation::dictionary::GlobalLemmaDictionary;
use crate::simulation::numerical_types::SentenceId;

/// Persisted learner: lemma -> {state, exposure_count, required_threshold}.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct ProfileSnapshot {
    pub lemmas: BTreeMap<String, LearnerLemmaInfo>,
}

impl ProfileSnapshot {
    pub fn from_profile(profile: &LemmaProfile, dictionary: &GlobalLemmaDictionary) -> Self {
        let lemmas = profile
            .iter()
            .filter_map(|(id, info)| dictionary.get_str(id).map(|lemma| (lemma.to_string(), *info)))
            .collect();
        ProfileSnapshot { lemmas }
    }

    /// Rebuilds the profile, interning lemmas the dictionary has not seen.
    /// States are re-derived from the stored counts and thresholds.
    pub fn to_profile(&self, dictionary: &mut GlobalLemmaDictionary) -> LemmaProfile {
        let mut profile = LemmaProfile::new();
        for (lemma, info) in &self.lemmas {
            if let Some(id) = dictionary.get_id_or_insert(lemma) {
                profile.insert(
                    id,
                    LearnerLemmaInfo::with_exposures(info.exposure_count, info.required_threshold),
                );
            }
        }
        profile
    }

    /// Lemma counts per state, in New, Active, Known order.
    pub fn state_counts(&self) -> [(LemmaState, usize); 3] {
        let mut counts = [(LemmaState::New, 0), (LemmaState::Active, 0), (LemmaState::Known, 0)];
        for info in self.lemmas.values() {
            let state = LemmaState::from_exposures(info.exposure_count, info.required_threshold);
            if let Some(slot) = counts.iter_mut().find(|(s, _)| *s == state) {
                slot.1 += 1;
            }
        }
        counts
    }
}

/// Everything needed to continue a run right after the last committed batch.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Checkpoint {
    pub batches_committed: u64,
    pub next_sentence: SentenceId,
    pub saturation_streak: u32,
    pub profile: ProfileSnapshot,
}

/// Writes `contents` to a temp file beside `path`, then renames it over `path`.
pub fn write_atomic(path: &Path, contents: &[u8]) -> WeaveResult<()> {
    let parent_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir).map_err(|e| WeaveError::io(parent_dir, e))?;

    let temp_file = NamedTempFile::new_in(parent_dir).map_err(|e| WeaveError::io(parent_dir, e))?;
    {
        let mut writer = BufWriter::new(&temp_file);
        writer.write_all(contents).map_err(|e| WeaveError::io(path, e))?;
        writer.flush().map_err(|e| WeaveError::io(path, e))?;
    }
    temp_file.as_file().sync_all().map_err(|e| WeaveError::io(path, e))?;
    temp_file.persist(path).map_err(|e| WeaveError::Persist {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

pub fn write_json_atomic<T: Serialize>(value: &T, path: &Path) -> WeaveResult<()> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(|e| WeaveError::json(path, e))?;
    bytes.push(b'\n');
    write_atomic(path, &bytes)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> WeaveResult<T> {
    let file = File::open(path).map_err(|e| WeaveError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| WeaveError::json(path, e))
}

pub fn save_profile_snapshot(snapshot: &ProfileSnapshot, file_path: &Path) -> WeaveResult<()> {
    write_json_atomic(snapshot, file_path)
}

pub fn load_profile_snapshot(file_path: &Path) -> WeaveResult<ProfileSnapshot> {
    read_json(file_path)
}

pub fn save_checkpoint(checkpoint: &Checkpoint, file_path: &Path) -> WeaveResult<()> {
    write_json_atomic(checkpoint, file_path)
}

/// `Ok(None)` when no checkpoint has been written yet.
pub fn load_checkpoint(file_path: &Path) -> WeaveResult<Option<Checkpoint>> {
    if !file_path.exists() {
        return Ok(None);
    }
    read_json(file_path).map(Some)
}
