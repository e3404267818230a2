use fastrand::Rng;
use log::{debug, error};
use serde::{Deserialize, Serialize};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::{
    btag::BTagEmulator,
    combinations::CombinationEnumerator,
    data::{EventObjects, RawEvent},
    features::{CombinationFeatureExtractor, EventFeatureExtractor, FeatureTable},
    matching::TruthMatcher,
    neutrino::NeutrinoReconstructor,
    selection::{ObjectSelector, SelectionOptions},
    truth::TruthDecayClassifier,
    utils::enums::{EventSelection, TruthSelection},
    RecoResult,
};

/// The default seed of the job's random generator.
pub const DEFAULT_SEED: u64 = 8675309;

/// Configuration of every stage of an [`EventProcessor`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessorOptions {
    pub selection: SelectionOptions,
    pub btag: BTagEmulator,
    pub neutrino: NeutrinoReconstructor,
    pub matcher: TruthMatcher,
    pub enumerator: CombinationEnumerator,
    pub classifier: TruthDecayClassifier,
    /// Seed of the generator used for b-tag emulation.
    pub seed: u64,
    /// Reconstruction-level selection applied after tagging.
    pub reco_selection: EventSelection,
    /// Truth-level selection applied after classification.
    pub truth_selection: TruthSelection,
    /// Skip (and log) events which violate the truth-record invariants instead of aborting.
    pub skip_invalid_truth: bool,
    /// Value of the `Tag` column of the event features.
    pub tag: i32,
    /// Size of a dedicated thread pool for partitioned processing (the global pool if `None`).
    pub threads: Option<usize>,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            selection: SelectionOptions::default(),
            btag: BTagEmulator::default(),
            neutrino: NeutrinoReconstructor::default(),
            matcher: TruthMatcher::default(),
            enumerator: CombinationEnumerator::default(),
            classifier: TruthDecayClassifier::default(),
            seed: DEFAULT_SEED,
            reco_selection: EventSelection::default(),
            truth_selection: TruthSelection::default(),
            skip_invalid_truth: false,
            tag: 0,
            threads: None,
        }
    }
}

impl ProcessorOptions {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn selection(mut self, selection: SelectionOptions) -> Self {
        self.selection = selection;
        self
    }
    pub fn btag(mut self, btag: BTagEmulator) -> Self {
        self.btag = btag;
        self
    }
    pub fn neutrino(mut self, neutrino: NeutrinoReconstructor) -> Self {
        self.neutrino = neutrino;
        self
    }
    pub fn matcher(mut self, matcher: TruthMatcher) -> Self {
        self.matcher = matcher;
        self
    }
    pub fn enumerator(mut self, enumerator: CombinationEnumerator) -> Self {
        self.enumerator = enumerator;
        self
    }
    pub fn classifier(mut self, classifier: TruthDecayClassifier) -> Self {
        self.classifier = classifier;
        self
    }
    /// Override the generator seed; defaults to 8675309.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
    pub fn reco_selection(mut self, selection: EventSelection) -> Self {
        self.reco_selection = selection;
        self
    }
    pub fn truth_selection(mut self, selection: TruthSelection) -> Self {
        self.truth_selection = selection;
        self
    }
    pub fn skip_invalid_truth(mut self, skip: bool) -> Self {
        self.skip_invalid_truth = skip;
        self
    }
    pub fn tag(mut self, tag: i32) -> Self {
        self.tag = tag;
        self
    }
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }
}

/// The feature rows of one accepted event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventOutput {
    pub event_id: usize,
    /// The event summary row.
    pub event: Vec<f64>,
    /// One row per combination, in enumeration order.
    pub combinations: Vec<Vec<f64>>,
}

/// Feature tables accumulated over many events.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JobOutput {
    pub events: FeatureTable,
    pub combinations: FeatureTable,
}

impl JobOutput {
    fn push(&mut self, output: EventOutput) -> RecoResult<()> {
        self.events.push(output.event)?;
        for row in output.combinations {
            self.combinations.push(row)?;
        }
        Ok(())
    }

    fn append(&mut self, other: JobOutput) -> RecoResult<()> {
        self.events.append(other.events)?;
        self.combinations.append(other.combinations)
    }
}

/// Job-level counters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    /// Events seen.
    pub total: usize,
    /// Events passing every selection.
    pub passed: usize,
    /// Passing events whose neutrino quadratic had a real solution.
    pub solved: usize,
    /// Events skipped for violating the truth-record invariants.
    pub skipped: usize,
    /// Combinations emitted.
    pub combinations: usize,
    /// Combinations labelled as signal.
    pub signal_combinations: usize,
    /// The three-jet mass of each distinct fully truth-matched hadronic top.
    pub matched_top_masses: Vec<f64>,
}

impl JobSummary {
    pub fn n_matched_tops(&self) -> usize {
        self.matched_top_masses.len()
    }

    /// The fraction of passing events with a solved neutrino ($`0`$ if none passed).
    pub fn solved_fraction(&self) -> f64 {
        if self.passed == 0 {
            return 0.0;
        }
        self.solved as f64 / self.passed as f64
    }

    /// Add the counts of `other` to this summary.
    pub fn merge(&mut self, other: JobSummary) {
        self.total += other.total;
        self.passed += other.passed;
        self.solved += other.solved;
        self.skipped += other.skipped;
        self.combinations += other.combinations;
        self.signal_combinations += other.signal_combinations;
        self.matched_top_masses.extend(other.matched_top_masses);
    }
}

/// Runs the reconstruction chain on one event at a time.
///
/// The stages are: object selection, b-tag emulation, the jet-count and reconstruction-level
/// selection, the neutrino solution (events with exactly one lepton), truth classification, the
/// truth-level selection, truth matching, and finally the event and combination feature rows.
///
/// The processor owns the job's random generator, so events must be processed in a fixed order
/// for a given seed to reproduce the same b-tags.
#[derive(Clone, Debug)]
pub struct EventProcessor {
    options: ProcessorOptions,
    selector: ObjectSelector,
    rng: Rng,
    event_extractor: EventFeatureExtractor,
    combination_extractor: CombinationFeatureExtractor,
    summary: JobSummary,
}

impl Default for EventProcessor {
    fn default() -> Self {
        Self::new(ProcessorOptions::default())
    }
}

impl EventProcessor {
    pub fn new(options: ProcessorOptions) -> Self {
        Self {
            selector: ObjectSelector::new(options.selection.clone()),
            rng: Rng::with_seed(options.seed),
            options,
            event_extractor: EventFeatureExtractor::new(),
            combination_extractor: CombinationFeatureExtractor::new(),
            summary: JobSummary::default(),
        }
    }

    pub fn options(&self) -> &ProcessorOptions {
        &self.options
    }

    /// The counters accumulated so far.
    pub fn summary(&self) -> &JobSummary {
        &self.summary
    }

    /// Empty event and combination tables with the columns this processor fills.
    pub fn output(&self) -> JobOutput {
        JobOutput {
            events: self.event_extractor.table(),
            combinations: self.combination_extractor.table(),
        }
    }

    /// Unwrap a stage result, turning data-integrity errors into a skipped event when the
    /// options allow it.
    fn check<T>(&mut self, event_id: usize, result: RecoResult<T>) -> RecoResult<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if self.options.skip_invalid_truth && err.is_data_integrity() => {
                error!("Skipping event {}: {}", event_id, err);
                self.summary.skipped += 1;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn reconstruct_neutrinos(&self, objects: &mut EventObjects) {
        if objects.n_leptons() != 1 {
            return;
        }
        let (Some(lepton), Some(met)) = (objects.lepton(0), objects.missing_energy()) else {
            return;
        };
        let solutions = self.options.neutrino.solve(&lepton.p4, &met.p4);
        objects.set_neutrinos(solutions.p4s(), solutions.solved);
    }

    /// Run the full chain on one event.
    ///
    /// Returns `Ok(None)` for events rejected by a selection (or skipped, see
    /// [`ProcessorOptions::skip_invalid_truth`]).
    ///
    /// # Errors
    ///
    /// Data-integrity violations of the event record abort the job unless they are skipped.
    pub fn process_event(
        &mut self,
        event: &RawEvent,
        event_id: usize,
    ) -> RecoResult<Option<EventOutput>> {
        self.summary.total += 1;
        let selected = self.selector.select(event);
        let Some(mut objects) = self.check(event_id, selected)? else {
            return Ok(None);
        };
        self.options.btag.tag_jets(&mut objects, &mut self.rng);
        if !self
            .selector
            .passes(&objects, self.options.reco_selection)
        {
            return Ok(None);
        }
        self.reconstruct_neutrinos(&mut objects);

        let classified = self.options.classifier.classify(&event.truth);
        let Some(truth) = self.check(event_id, classified)? else {
            return Ok(None);
        };
        if !self.options.truth_selection.passes(&truth.classification) {
            return Ok(None);
        }
        let matches = self.options.matcher.match_objects(&objects, &truth.particles);

        let event_row = self.event_extractor.fill(
            event_id,
            self.options.tag,
            &objects,
            &truth.classification,
        )?;
        let combinations = self.options.enumerator.enumerate(&objects, &matches);
        let mut rows = Vec::with_capacity(combinations.len());
        let mut matched_tops = Vec::new();
        for combination in &combinations {
            rows.push(
                self.combination_extractor
                    .fill(event_id, combination, &objects)?,
            );
            if combination.is_signal {
                self.summary.signal_combinations += 1;
            }
            let triple = (
                combination.assignment.had_top_jet,
                combination.assignment.had_w_jet1,
                combination.assignment.had_w_jet2,
            );
            if !matched_tops.contains(&triple)
                && matches.from_common_w_of_same_top(
                    combination.had_top_jet.id,
                    combination.had_w_jet1.id,
                    combination.had_w_jet2.id,
                )
            {
                matched_tops.push(triple);
                let p4 =
                    combination.had_top_jet.p4 + combination.had_w_jet1.p4 + combination.had_w_jet2.p4;
                self.summary.matched_top_masses.push(p4.m());
            }
        }

        self.summary.passed += 1;
        if objects.neutrino_solved() {
            self.summary.solved += 1;
        }
        self.summary.combinations += rows.len();
        debug!(
            "event {}: {} jets, {} leptons, {} combinations",
            event_id,
            objects.n_jets(),
            objects.n_leptons(),
            rows.len()
        );
        Ok(Some(EventOutput {
            event_id,
            event: event_row,
            combinations: rows,
        }))
    }

    /// Process `events` in order, numbering them from `first_event_id`, and collect the rows of
    /// the accepted ones.
    pub fn process_events(
        &mut self,
        events: &[RawEvent],
        first_event_id: usize,
    ) -> RecoResult<JobOutput> {
        let mut output = self.output();
        for (offset, event) in events.iter().enumerate() {
            if let Some(rows) = self.process_event(event, first_event_id + offset)? {
                output.push(rows)?;
            }
        }
        Ok(output)
    }

    /// A processor with the same options and a generator forked from this one.
    fn fork(&mut self) -> Self {
        Self {
            options: self.options.clone(),
            selector: self.selector.clone(),
            rng: self.rng.fork(),
            event_extractor: self.event_extractor.clone(),
            combination_extractor: CombinationFeatureExtractor::new(),
            summary: JobSummary::default(),
        }
    }

    /// Split `events` into `n_partitions` contiguous partitions and process them in parallel.
    ///
    /// Each partition gets a generator forked from the job generator in partition order, and the
    /// rows are concatenated in partition order, so the output depends only on the seed and the
    /// number of partitions. Event ids are positions in `events`.
    #[cfg(feature = "rayon")]
    pub fn process_partitioned(
        &mut self,
        events: &[RawEvent],
        n_partitions: usize,
    ) -> RecoResult<JobOutput> {
        let n_partitions = n_partitions.max(1);
        let chunk_size = ((events.len() + n_partitions - 1) / n_partitions).max(1);
        let workers: Vec<(usize, &[RawEvent], EventProcessor)> = events
            .chunks(chunk_size)
            .enumerate()
            .map(|(index, partition)| (index * chunk_size, partition, self.fork()))
            .collect();
        let run = move || {
            workers
                .into_par_iter()
                .map(|(first_event_id, partition, mut worker)| {
                    let output = worker.process_events(partition, first_event_id)?;
                    Ok((output, worker.summary))
                })
                .collect::<Vec<RecoResult<(JobOutput, JobSummary)>>>()
        };
        let results = match self.options.threads {
            Some(n_threads) => rayon::ThreadPoolBuilder::new()
                .num_threads(n_threads)
                .build()?
                .install(run),
            None => run(),
        };
        let mut output = self.output();
        for result in results {
            let (partition, summary) = result?;
            output.append(partition)?;
            self.summary.merge(summary);
        }
        Ok(output)
    }

    /// Finish the job and return its counters.
    pub fn finish(self) -> JobSummary {
        debug!(
            "processed {} events: {} passed, {} solved, {} skipped, {} combinations ({} signal), {} matched hadronic tops",
            self.summary.total,
            self.summary.passed,
            self.summary.solved,
            self.summary.skipped,
            self.summary.combinations,
            self.summary.signal_combinations,
            self.summary.n_matched_tops()
        );
        self.summary
    }
}
