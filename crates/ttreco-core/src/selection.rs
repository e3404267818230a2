use serde::{Deserialize, Serialize};

use crate::{
    data::{EventObjects, RawEvent, RawLepton},
    utils::{enums::EventSelection, vectors::Vec4},
    RecoError, RecoResult,
};

/// The default minimum $`p_T`$ (GeV) for jets and leptons.
pub const DEFAULT_PT_MIN: f64 = 20.0;
/// The default maximum $`|\eta|`$ for jets and leptons.
pub const DEFAULT_ABS_ETA_MAX: f64 = 2.5;

/// Kinematic cuts and jet-multiplicity requirements for an [`ObjectSelector`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectionOptions {
    /// Minimum jet $`p_T`$ (inclusive).
    pub jet_pt_min: f64,
    /// Maximum jet $`|\eta|`$ (inclusive).
    pub jet_abs_eta_max: f64,
    /// Minimum lepton $`p_T`$ (inclusive).
    pub lepton_pt_min: f64,
    /// Maximum lepton $`|\eta|`$ (inclusive).
    pub lepton_abs_eta_max: f64,
    /// Minimum number of selected jets for an event to pass.
    pub min_jets: Option<usize>,
    /// Maximum number of selected jets for an event to pass.
    pub max_jets: Option<usize>,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self {
            jet_pt_min: DEFAULT_PT_MIN,
            jet_abs_eta_max: DEFAULT_ABS_ETA_MAX,
            lepton_pt_min: DEFAULT_PT_MIN,
            lepton_abs_eta_max: DEFAULT_ABS_ETA_MAX,
            min_jets: None,
            max_jets: None,
        }
    }
}

impl SelectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the jet cuts; defaults to $`p_T \geq 20`$ and $`|\eta| \leq 2.5`$.
    pub fn jet_cuts(mut self, pt_min: f64, abs_eta_max: f64) -> Self {
        self.jet_pt_min = pt_min;
        self.jet_abs_eta_max = abs_eta_max;
        self
    }

    /// Override the electron and muon cuts; defaults to $`p_T \geq 20`$ and $`|\eta| \leq 2.5`$.
    pub fn lepton_cuts(mut self, pt_min: f64, abs_eta_max: f64) -> Self {
        self.lepton_pt_min = pt_min;
        self.lepton_abs_eta_max = abs_eta_max;
        self
    }

    /// Require at least `n` selected jets.
    pub fn min_jets(mut self, n: usize) -> Self {
        self.min_jets = Some(n);
        self
    }

    /// Require at most `n` selected jets.
    pub fn max_jets(mut self, n: usize) -> Self {
        self.max_jets = Some(n);
        self
    }

    fn passes_jet_window(&self, n_jets: usize) -> bool {
        self.min_jets.map_or(true, |min| n_jets >= min)
            && self.max_jets.map_or(true, |max| n_jets <= max)
    }
}

/// Applies kinematic cuts to the raw candidates of an event and builds its [`EventObjects`].
///
/// Objects are appended in the order they appear in the raw lists; an empty list is a valid
/// outcome.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ObjectSelector {
    options: SelectionOptions,
}

impl ObjectSelector {
    pub fn new(options: SelectionOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SelectionOptions {
        &self.options
    }

    fn lepton_passes(&self, lepton: &RawLepton) -> bool {
        lepton.pt >= self.options.lepton_pt_min
            && lepton.eta.abs() <= self.options.lepton_abs_eta_max
    }

    /// Build the object table for one event.
    ///
    /// # Errors
    ///
    /// Returns [`RecoError::MissingEnergyCount`] unless the event carries exactly one
    /// missing-energy record.
    pub fn select(&self, event: &RawEvent) -> RecoResult<EventObjects> {
        let [met] = event.missing_energy.as_slice() else {
            return Err(RecoError::MissingEnergyCount {
                count: event.missing_energy.len(),
            });
        };
        let mut objects = EventObjects::new();
        for jet in event.jets.iter().filter(|jet| {
            jet.pt >= self.options.jet_pt_min && jet.eta.abs() <= self.options.jet_abs_eta_max
        }) {
            objects.push_jet(
                Vec4::from_pt_eta_phi_m(jet.pt, jet.eta, jet.phi, jet.mass),
                jet.flavor,
            );
        }
        for electron in event.electrons.iter().filter(|lep| self.lepton_passes(lep)) {
            objects.push_electron(Vec4::from_pt_eta_phi_m(
                electron.pt,
                electron.eta,
                electron.phi,
                0.0,
            ));
        }
        for muon in event.muons.iter().filter(|lep| self.lepton_passes(lep)) {
            objects.push_muon(Vec4::from_pt_eta_phi_m(muon.pt, muon.eta, muon.phi, 0.0));
        }
        objects.set_missing_energy(Vec4::from_pt_eta_phi_m(met.met, 0.0, met.phi, 0.0));
        Ok(objects)
    }

    /// Apply the jet-count window and then `selection` to a tagged object table.
    pub fn passes(&self, objects: &EventObjects, selection: EventSelection) -> bool {
        self.options.passes_jet_window(objects.n_jets()) && selection.passes(objects)
    }
}

impl EventSelection {
    /// Whether the (tagged) objects satisfy this selection's multiplicity requirements.
    pub fn passes(&self, objects: &EventObjects) -> bool {
        let n_jets = objects.n_jets();
        let n_b_jets = objects.n_b_jets();
        match self {
            EventSelection::None => true,
            EventSelection::LeptonPlusJets => {
                objects.n_leptons() == 1 && n_jets >= 4 && n_b_jets >= 2
            }
            EventSelection::ElectronPlusJets => {
                objects.n_electrons() == 1
                    && objects.n_muons() == 0
                    && n_jets >= 4
                    && n_b_jets >= 2
            }
            EventSelection::MuonPlusJets => {
                objects.n_electrons() == 0
                    && objects.n_muons() == 1
                    && n_jets >= 4
                    && n_b_jets >= 2
            }
            EventSelection::Dilepton => objects.n_leptons() == 2 && n_jets >= 2 && n_b_jets >= 2,
        }
    }
}
