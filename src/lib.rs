pub mod config;
pub mod error;
pub mod types {
    pub mod records;
}
pub mod simulation;
pub mod profile;
pub mod profile_io;
pub mod corpus_generator;

pub use config::{ActivationMode, Config, EngineConfig};
pub use error::{WeaveError, WeaveResult};
pub use profile::{LearnerLemmaInfo, LemmaProfile, LemmaState};
