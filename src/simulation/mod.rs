pub mod activation;
pub mod comprehensibility;
pub mod core_algo;
pub mod dictionary;
pub mod frequency;
pub mod level_selector;
pub mod numerical_types;
pub mod preprocessor;
pub mod text_generator;

#[cfg(any(test, feature = "test-utils"))]
pub mod fixtures;

pub use activation::{ActivationCandidate, ActivationStrategy, HighestFrequencyFirst};
pub use comprehensibility::{evaluate_comprehensibility, Comprehensibility};
pub use core_algo::{BatchGenerator, BatchOutput, CommittedBatch, ExhaustionWarning, RunSummary};
pub use dictionary::{GlobalLemmaDictionary, LemmaId};
pub use frequency::{LemmaFrequencies, ThresholdPolicy};
pub use level_selector::{Level, LevelSelector, Rendering};
pub use numerical_types::{SentenceId, SentenceRecord};
pub use preprocessor::to_sentence_records;
