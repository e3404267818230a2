//! # ttreco-core
//!
//! This is an internal crate used by `ttreco`.
#![warn(clippy::perf, clippy::style)]
#![allow(clippy::excessive_precision)]

use thiserror::Error;

/// Stochastic multi-working-point b-tagging of selected jets.
pub mod btag;
/// Enumeration of jet-to-decay-role assignments and their truth label.
pub mod combinations;
/// Raw input records and the per-event object table.
pub mod data;
/// Named scalar features for combinations and events.
pub mod features;
/// Persisting [`FeatureTable`](crate::features::FeatureTable)s to Parquet.
pub mod io;
/// Truth-to-reconstruction object matching.
pub mod matching;
/// Longitudinal neutrino momentum from the $`W`$ mass constraint.
pub mod neutrino;
/// The per-event pipeline and job-level bookkeeping.
pub mod processor;
/// Kinematic object selection and event-level selections.
pub mod selection;
/// Classification of the generator-level $`t\bar{t}`$ decay chain.
pub mod truth;
/// Utility functions, enums, and traits
pub mod utils;

pub use crate::btag::{BTagEmulator, EfficiencyCurve, FlavorClass};
pub use crate::combinations::{Combination, CombinationEnumerator, JetAssignment};
pub use crate::data::{
    EventObjects, ObjectId, PhysicsObject, RawEvent, RawJet, RawLepton, RawMissingEnergy,
    RawTruthParticle, TruthParticle,
};
pub use crate::features::{
    CombinationFeatureExtractor, EventFeatureExtractor, FeatureRow, FeatureTable,
};
pub use crate::io::{write_parquet, FeatureWriteOptions, FloatPrecision};
pub use crate::matching::{TruthMatcher, TruthMatches};
pub use crate::neutrino::{NeutrinoReconstructor, NeutrinoSolution, NeutrinoSolutions};
pub use crate::processor::{EventOutput, EventProcessor, JobOutput, JobSummary, ProcessorOptions};
pub use crate::selection::{ObjectSelector, SelectionOptions};
pub use crate::truth::{DecayClassification, TruthDecayClassifier, TruthRecord};
pub use crate::utils::enums::{
    DecaySlot, EventSelection, ObjectKind, Shape, TopBranch, TopDecay, TruthSelection, WDecay,
};
pub use crate::utils::shapes::ParticleCollection;
pub use crate::utils::vectors::{Vec3, Vec4};

/// The nominal $`W`$ boson mass in GeV used by the neutrino solver.
pub const W_MASS: f64 = 80.399;

pub type RecoResult<T> = Result<T, RecoError>;

/// The error type used by all `ttreco` internal methods
#[derive(Error, Debug)]
pub enum RecoError {
    /// An alias for [`std::io::Error`].
    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),
    /// An alias for [`parquet::errors::ParquetError`].
    #[error("Parquet Error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),
    /// An alias for [`arrow::error::ArrowError`].
    #[error("Arrow Error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),
    /// An alias for [`shellexpand::LookupError`].
    #[error("Failed to expand path: {0}")]
    LookupError(#[from] shellexpand::LookupError<std::env::VarError>),
    /// An error which occurs when the user tries to parse an invalid string of text, typically
    /// into an enum variant.
    #[error("Failed to parse string: \"{name}\" does not correspond to a valid \"{object}\"!")]
    ParseError {
        /// The string which was parsed
        name: String,
        /// The name of the object it failed to parse into
        object: String,
    },
    /// A decay-chain slot was assigned more than once while walking the truth record.
    #[error("Decay slot \"{slot}\" was assigned more than once!")]
    DuplicateDecaySlot {
        /// The slot which was already assigned
        slot: DecaySlot,
    },
    /// A decay-chain slot was still undefined after the truth walk finished.
    #[error("Decay slot \"{slot}\" is undefined after walking the truth record!")]
    UnresolvedDecaySlot {
        /// The slot which was never assigned
        slot: DecaySlot,
    },
    /// Two visible daughters of the same $`W`$ imply different decay channels.
    #[error("Decay slot \"{slot}\" was classified as \"{first}\" and then as \"{second}\"!")]
    ConflictingWDecay {
        /// The $`W`$ slot in question
        slot: DecaySlot,
        /// The channel assigned first
        first: WDecay,
        /// The channel implied by a later daughter
        second: WDecay,
    },
    /// A daughter of a top-produced $`W`$ has a PDG id outside the recognized decay channels.
    #[error("Unexpected W daughter with PDG id {pdg_id}!")]
    UnexpectedWDaughter {
        /// The PDG id of the daughter
        pdg_id: i32,
    },
    /// A mother reference points outside the truth record.
    #[error("Truth particle {index} references mother {mother}, which is out of range!")]
    InvalidMotherIndex {
        /// The (0-based) index of the particle holding the reference
        index: usize,
        /// The (1-based) mother reference
        mother: i32,
    },
    /// More decay-chain particles were stored than the classifier allows.
    #[error("Truth record holds {count} decay-chain particles (at most {max} allowed)!")]
    TruthRecordOverflow {
        /// The number of particles found
        count: usize,
        /// The configured maximum
        max: usize,
    },
    /// An event must carry exactly one missing-energy record.
    #[error("Expected exactly one missing energy record, found {count}!")]
    MissingEnergyCount {
        /// The number of records found
        count: usize,
    },
    /// A feature row was assembled without a value for a declared column.
    #[error("No value was computed for feature \"{name}\"!")]
    MissingFeature {
        /// Name of the feature which failed lookup
        name: String,
    },
    /// An error type for [`rayon`] thread pools
    #[cfg(feature = "rayon")]
    #[error("Error building thread pool: {0}")]
    ThreadPoolError(#[from] rayon::ThreadPoolBuildError),
    /// A custom fallback error for errors too complex or too infrequent to warrant their own error
    /// category.
    #[error("{0}")]
    Custom(String),
}

impl RecoError {
    /// Returns `true` for violations of the truth-record invariants, which mark a single event
    /// as unusable rather than the whole job.
    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            RecoError::DuplicateDecaySlot { .. }
                | RecoError::UnresolvedDecaySlot { .. }
                | RecoError::ConflictingWDecay { .. }
                | RecoError::UnexpectedWDaughter { .. }
                | RecoError::InvalidMotherIndex { .. }
                | RecoError::TruthRecordOverflow { .. }
                | RecoError::MissingEnergyCount { .. }
        )
    }
}
