//! `ttreco` reconstructs semi-leptonic $`t\bar{t}`$ events and turns every candidate assignment of
//! jets to the decay products into a row of named, truth-labelled features, ready to train a
//! classifier which picks the correct assignment.
//!
//! # Table of Contents
//! - [Key Features](#key-features)
//! - [Quick Start](#quick-start)
//! - [Data Format](#data-format)
//! - [Parallelism](#parallelism)
//!
//! # Key Features
//! * Kinematic object selection with configurable cuts and jet-count windows.
//! * Stochastic multi-working-point b-tag emulation driven by a single seeded generator.
//! * Neutrino longitudinal momentum from the $`W`$ mass constraint, both quadratic roots kept.
//! * Classification of the generator-level decay chain and $`\Delta R`$ truth matching.
//! * A fixed column layout for every combination: per-object kinematics, composite systems,
//!   pairwise angles, event shapes, and a `signal` label.
//!
//! # Quick Start
//! ```rust,no_run
//! use ttreco::{write_parquet, EventProcessor, FeatureWriteOptions, ProcessorOptions, RawEvent};
//!
//! # fn load() -> Vec<RawEvent> { Vec::new() }
//! # fn main() -> ttreco::RecoResult<()> {
//! let events: Vec<RawEvent> = load();
//! let options = ProcessorOptions::new()
//!     .reco_selection(ttreco::EventSelection::LeptonPlusJets)
//!     .seed(1234);
//! let mut processor = EventProcessor::new(options);
//! let output = processor.process_events(&events, 0)?;
//! write_parquet(&output.combinations, "~/combinations.parquet", &FeatureWriteOptions::default())?;
//! write_parquet(&output.events, "~/events.parquet", &FeatureWriteOptions::default())?;
//! let summary = processor.finish();
//! println!("{} of {} events passed", summary.passed, summary.total);
//! # Ok(())
//! # }
//! ```
//!
//! # Data Format
//! Each feature table is written as one Parquet file with a single floating-point column per
//! feature (64-bit by default, see [`FloatPrecision`]). The combination table begins with
//! `EventId` and `CombId` and ends with `signal`; quantities which are undefined for an event
//! (a missing lepton, an unsolved neutrino) hold [`PAD_VALUE`](crate::features::PAD_VALUE).
//!
//! # Parallelism
//! With the default `rayon` feature, [`EventProcessor::process_partitioned`] splits the input
//! into contiguous partitions, forks the job generator once per partition, and concatenates the
//! results in order, so the output depends only on the seed and the number of partitions.
#![warn(clippy::perf, clippy::style, missing_docs)]

/// Raw input records and the per-event object table.
pub mod data {
    pub use ttreco_core::data::{
        test_event, EventObjects, ObjectId, PhysicsObject, RawEvent, RawJet, RawLepton,
        RawMissingEnergy, RawTruthParticle, TruthParticle,
    };
}
/// Named scalar features and their tables.
pub mod features {
    pub use ttreco_core::features::*;
}
/// Writing feature tables to disk.
pub mod io {
    pub use ttreco_core::io::*;
}
/// The reconstruction stages, usable on their own.
pub mod reconstruction {
    pub use ttreco_core::btag::*;
    pub use ttreco_core::combinations::*;
    pub use ttreco_core::matching::*;
    pub use ttreco_core::neutrino::*;
    pub use ttreco_core::selection::*;
    pub use ttreco_core::truth::*;
}
/// The per-event pipeline and job-level bookkeeping.
pub mod processor {
    pub use ttreco_core::processor::*;
}
/// Utility functions, enums, and traits
pub mod utils {
    pub use ttreco_core::utils::*;
}

pub use ttreco_core::btag::{BTagEmulator, EfficiencyCurve, FlavorClass};
pub use ttreco_core::combinations::{Combination, CombinationEnumerator, JetAssignment};
pub use ttreco_core::data::{
    EventObjects, ObjectId, PhysicsObject, RawEvent, RawJet, RawLepton, RawMissingEnergy,
    RawTruthParticle, TruthParticle,
};
pub use ttreco_core::features::{
    CombinationFeatureExtractor, EventFeatureExtractor, FeatureRow, FeatureTable, PAD_VALUE,
};
pub use ttreco_core::io::{write_parquet, FeatureWriteOptions, FloatPrecision};
pub use ttreco_core::matching::{TruthMatcher, TruthMatches};
pub use ttreco_core::neutrino::{NeutrinoReconstructor, NeutrinoSolution, NeutrinoSolutions};
pub use ttreco_core::processor::{
    EventOutput, EventProcessor, JobOutput, JobSummary, ProcessorOptions,
};
pub use ttreco_core::selection::{ObjectSelector, SelectionOptions};
pub use ttreco_core::truth::{DecayClassification, TruthDecayClassifier, TruthRecord};
pub use ttreco_core::utils::enums::{
    DecaySlot, EventSelection, ObjectKind, Shape, TopBranch, TopDecay, TruthSelection, WDecay,
};
pub use ttreco_core::utils::vectors::{Vec3, Vec4};
pub use ttreco_core::W_MASS;
pub use ttreco_core::{RecoError, RecoResult};
pub use serde::{Deserialize, Serialize};
