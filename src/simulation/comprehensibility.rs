use serde::{Deserialize, Serialize};

use super::level_selector::Rendering;
use crate::profile::{LemmaProfile, LemmaState};

/// Known vs. total target-language lemma tokens across a batch rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Comprehensibility {
    pub known: u64,
    pub total: u64,
}

impl Comprehensibility {
    /// A batch without target-language tokens is vacuously comprehensible.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.known as f64 / self.total as f64
        }
    }

    pub fn meets(&self, target: f64) -> bool {
        self.ratio() >= target
    }

    /// Exact `self.ratio() > other.ratio()`, free of float rounding.
    pub fn exceeds(&self, other: &Comprehensibility) -> bool {
        let (k1, t1) = self.as_fraction();
        let (k2, t2) = other.as_fraction();
        k1 as u128 * t2 as u128 > k2 as u128 * t1 as u128
    }

    fn as_fraction(&self) -> (u64, u64) {
        if self.total == 0 {
            (1, 1)
        } else {
            (self.known, self.total)
        }
    }
}

pub fn evaluate_comprehensibility(renderings: &[Rendering], profile: &LemmaProfile) -> Comprehensibility {
    renderings
        .iter()
        .flat_map(|r| r.target_lemmas.iter())
        .fold(Comprehensibility::default(), |mut acc, &lemma_id| {
            acc.total += 1;
            if profile.query(lemma_id) == LemmaState::Known {
                acc.known += 1;
            }
            acc
        })
}
