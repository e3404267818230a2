use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::RecoError;

/// The kind of a reconstructed physics object.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// A hadronic jet (b-tagged or not).
    Jet,
    /// A selected electron.
    Electron,
    /// A selected muon.
    Muon,
    /// The event's missing transverse momentum.
    MissingEnergy,
    /// A neutrino candidate built from the missing energy and the $`W`$ mass constraint.
    Neutrino,
}

impl ObjectKind {
    /// Returns `true` for electrons and muons.
    pub fn is_lepton(&self) -> bool {
        matches!(self, ObjectKind::Electron | ObjectKind::Muon)
    }

    /// Whether a reconstructed object of this kind may be matched to a truth particle with the
    /// given PDG id.
    ///
    /// Jets match light, charm, and bottom quarks, electrons match $`e^\pm`$, and muons match
    /// $`\mu^\pm`$. Missing energy and neutrino candidates never match.
    pub fn is_compatible_with(&self, pdg_id: i32) -> bool {
        match self {
            ObjectKind::Jet => (1..=5).contains(&pdg_id.abs()),
            ObjectKind::Electron => pdg_id.abs() == 11,
            ObjectKind::Muon => pdg_id.abs() == 13,
            ObjectKind::MissingEnergy | ObjectKind::Neutrino => false,
        }
    }
}

impl Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectKind::Jet => write!(f, "Jet"),
            ObjectKind::Electron => write!(f, "Electron"),
            ObjectKind::Muon => write!(f, "Muon"),
            ObjectKind::MissingEnergy => write!(f, "MissingEnergy"),
            ObjectKind::Neutrino => write!(f, "Neutrino"),
        }
    }
}

impl FromStr for ObjectKind {
    type Err = RecoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jet" | "j" => Ok(Self::Jet),
            "electron" | "el" | "e" => Ok(Self::Electron),
            "muon" | "mu" => Ok(Self::Muon),
            "missingenergy" | "missing energy" | "met" => Ok(Self::MissingEnergy),
            "neutrino" | "nu" => Ok(Self::Neutrino),
            _ => Err(RecoError::ParseError {
                name: s.to_string(),
                object: "ObjectKind".to_string(),
            }),
        }
    }
}

/// The decay of a top (or antitop) quark, distinguished by the flavor of the prompt down-type
/// quark.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopDecay {
    /// No decay has been recognized.
    #[default]
    Undefined,
    /// $`t \to W^+ b`$ (or $`\bar{t} \to W^- \bar{b}`$).
    WB,
    /// $`t \to W^+ q`$ with $`q \in \{d, s\}`$.
    WLight,
}

impl TopDecay {
    /// The numeric code written to feature tables (0 = undefined, 1 = Wb, 2 = W+light).
    pub fn code(&self) -> u8 {
        match self {
            TopDecay::Undefined => 0,
            TopDecay::WB => 1,
            TopDecay::WLight => 2,
        }
    }
}

impl Display for TopDecay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopDecay::Undefined => write!(f, "Undefined"),
            TopDecay::WB => write!(f, "W+b"),
            TopDecay::WLight => write!(f, "W+light"),
        }
    }
}

impl FromStr for TopDecay {
    type Err = RecoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "undefined" | "none" => Ok(Self::Undefined),
            "wb" | "w+b" | "w b" => Ok(Self::WB),
            "wlight" | "w+light" | "w light" | "wq" => Ok(Self::WLight),
            _ => Err(RecoError::ParseError {
                name: s.to_string(),
                object: "TopDecay".to_string(),
            }),
        }
    }
}

/// The decay channel of a $`W`$ boson produced in a top decay.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WDecay {
    /// No decay has been recognized.
    #[default]
    Undefined,
    /// $`W \to q\bar{q}'`$.
    Jets,
    /// $`W \to e\nu`$.
    ElectronNu,
    /// $`W \to \mu\nu`$.
    MuonNu,
    /// $`W \to \tau\nu`$.
    TauNu,
}

impl WDecay {
    /// The numeric code written to feature tables (0 = undefined, 1 = jets, 2 = $`e\nu`$,
    /// 3 = $`\mu\nu`$, 4 = $`\tau\nu`$).
    pub fn code(&self) -> u8 {
        match self {
            WDecay::Undefined => 0,
            WDecay::Jets => 1,
            WDecay::ElectronNu => 2,
            WDecay::MuonNu => 3,
            WDecay::TauNu => 4,
        }
    }

    /// Classify a visible $`W`$ daughter by its PDG id.
    ///
    /// Returns `Ok(None)` for even PDG ids above the quarks (the neutrinos), which are recognized
    /// but carry no channel information.
    pub fn from_daughter(pdg_id: i32) -> Result<Option<Self>, RecoError> {
        let id = pdg_id.abs();
        if id <= 6 {
            return Ok(Some(WDecay::Jets));
        }
        match id {
            11 => Ok(Some(WDecay::ElectronNu)),
            13 => Ok(Some(WDecay::MuonNu)),
            15 => Ok(Some(WDecay::TauNu)),
            id if id % 2 == 0 => Ok(None),
            _ => Err(RecoError::UnexpectedWDaughter { pdg_id }),
        }
    }

    /// Returns `true` for the electron and muon channels.
    pub fn is_light_lepton(&self) -> bool {
        matches!(self, WDecay::ElectronNu | WDecay::MuonNu)
    }
}

impl Display for WDecay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WDecay::Undefined => write!(f, "Undefined"),
            WDecay::Jets => write!(f, "jets"),
            WDecay::ElectronNu => write!(f, "e nu"),
            WDecay::MuonNu => write!(f, "mu nu"),
            WDecay::TauNu => write!(f, "tau nu"),
        }
    }
}

impl FromStr for WDecay {
    type Err = RecoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "undefined" | "none" => Ok(Self::Undefined),
            "jets" | "hadronic" | "qq" => Ok(Self::Jets),
            "enu" | "e nu" | "electron" => Ok(Self::ElectronNu),
            "munu" | "mu nu" | "muon" => Ok(Self::MuonNu),
            "taunu" | "tau nu" | "tau" => Ok(Self::TauNu),
            _ => Err(RecoError::ParseError {
                name: s.to_string(),
                object: "WDecay".to_string(),
            }),
        }
    }
}

/// One of the four decay-chain slots filled while walking the truth record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecaySlot {
    /// The top quark branch.
    Top,
    /// The antitop quark branch.
    Antitop,
    /// The $`W^+`$ from the top.
    WPlus,
    /// The $`W^-`$ from the antitop.
    WMinus,
}

impl Display for DecaySlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecaySlot::Top => write!(f, "t"),
            DecaySlot::Antitop => write!(f, "tbar"),
            DecaySlot::WPlus => write!(f, "W+"),
            DecaySlot::WMinus => write!(f, "W-"),
        }
    }
}

impl FromStr for DecaySlot {
    type Err = RecoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "t" | "top" => Ok(Self::Top),
            "tbar" | "antitop" => Ok(Self::Antitop),
            "w+" | "wp" | "wplus" => Ok(Self::WPlus),
            "w-" | "wm" | "wminus" => Ok(Self::WMinus),
            _ => Err(RecoError::ParseError {
                name: s.to_string(),
                object: "DecaySlot".to_string(),
            }),
        }
    }
}

/// The top-quark branch a truth particle descends from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TopBranch {
    /// Produced by $`t`$ or $`W^+`$.
    Top,
    /// Produced by $`\bar{t}`$ or $`W^-`$.
    Antitop,
}

impl TopBranch {
    /// The branch of a particle whose direct parent has PDG id `parent_pdg_id`.
    pub fn from_parent(parent_pdg_id: i32) -> Option<Self> {
        match parent_pdg_id {
            6 | 24 => Some(TopBranch::Top),
            -6 | -24 => Some(TopBranch::Antitop),
            _ => None,
        }
    }
}

impl Display for TopBranch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopBranch::Top => write!(f, "t"),
            TopBranch::Antitop => write!(f, "tbar"),
        }
    }
}

impl FromStr for TopBranch {
    type Err = RecoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "t" | "top" => Ok(Self::Top),
            "tbar" | "antitop" => Ok(Self::Antitop),
            _ => Err(RecoError::ParseError {
                name: s.to_string(),
                object: "TopBranch".to_string(),
            }),
        }
    }
}

/// Event-level requirements on the selected reconstructed objects.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSelection {
    /// Only the jet-count window is applied.
    #[default]
    None,
    /// Exactly one lepton, at least four jets, at least two b-jets.
    LeptonPlusJets,
    /// Exactly one electron and no muons, at least four jets, at least two b-jets.
    ElectronPlusJets,
    /// Exactly one muon and no electrons, at least four jets, at least two b-jets.
    MuonPlusJets,
    /// Exactly two leptons, at least two jets, at least two b-jets.
    Dilepton,
}

impl Display for EventSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventSelection::None => write!(f, "none"),
            EventSelection::LeptonPlusJets => write!(f, "ljet"),
            EventSelection::ElectronPlusJets => write!(f, "ejet"),
            EventSelection::MuonPlusJets => write!(f, "mjet"),
            EventSelection::Dilepton => write!(f, "dil"),
        }
    }
}

impl FromStr for EventSelection {
    type Err = RecoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "ljet" | "lepton+jets" | "l+jets" => Ok(Self::LeptonPlusJets),
            "ejet" | "electron+jets" | "e+jets" => Ok(Self::ElectronPlusJets),
            "mjet" | "muon+jets" | "mu+jets" => Ok(Self::MuonPlusJets),
            "dil" | "dilepton" => Ok(Self::Dilepton),
            _ => Err(RecoError::ParseError {
                name: s.to_string(),
                object: "EventSelection".to_string(),
            }),
        }
    }
}

/// Requirements on the classified truth decay of an event.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TruthSelection {
    /// Every event passes.
    #[default]
    None,
    /// One $`W`$ decays to $`e\nu`$ or $`\mu\nu`$ and one decays to jets.
    LeptonPlusJets,
    /// Both $`W`$ bosons decay to jets.
    AllHadronic,
    /// Neither $`W`$ decays to jets or $`\tau\nu`$.
    Dilepton,
}

impl Display for TruthSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TruthSelection::None => write!(f, "none"),
            TruthSelection::LeptonPlusJets => write!(f, "ljet"),
            TruthSelection::AllHadronic => write!(f, "jets"),
            TruthSelection::Dilepton => write!(f, "dil"),
        }
    }
}

impl FromStr for TruthSelection {
    type Err = RecoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "ljet" | "lepton+jets" | "l+jets" => Ok(Self::LeptonPlusJets),
            "jets" | "allhad" | "all hadronic" => Ok(Self::AllHadronic),
            "dil" | "dilepton" => Ok(Self::Dilepton),
            _ => Err(RecoError::ParseError {
                name: s.to_string(),
                object: "TruthSelection".to_string(),
            }),
        }
    }
}

/// Event-shape variables derived from the eigenvalues of momentum tensors.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    /// $`\frac{3}{2}\lambda_3`$ of the quadratic tensor.
    Aplanarity,
    /// $`\frac{3}{2}\lambda_3`$ of the linear tensor.
    AplanarityO,
    /// $`\frac{3}{2}(\lambda_2 + \lambda_3)`$ of the quadratic tensor.
    Sphericity,
    /// $`\frac{3}{2}(\lambda_2 + \lambda_3)`$ of the linear tensor.
    SphericityO,
    /// $`2\lambda_2 / (\lambda_1 + \lambda_2)`$ of the transverse tensor.
    SphericityT,
    /// $`\lambda_2 - \lambda_3`$.
    Planarity,
    /// $`3(\lambda_1\lambda_2 + \lambda_1\lambda_3 + \lambda_2\lambda_3)`$.
    VariableC,
    /// $`27\lambda_1\lambda_2\lambda_3`$.
    VariableD,
    /// $`2\lambda_2 / (\lambda_1 + \lambda_2)`$.
    Circularity,
    /// $`4\lambda_1\lambda_2 / (\lambda_1 + \lambda_2)^2`$.
    PlanarFlow,
}

impl Shape {
    /// Every shape, in the order used for feature columns.
    pub const ALL: [Shape; 10] = [
        Shape::Aplanarity,
        Shape::AplanarityO,
        Shape::Sphericity,
        Shape::SphericityO,
        Shape::SphericityT,
        Shape::Planarity,
        Shape::VariableC,
        Shape::VariableD,
        Shape::Circularity,
        Shape::PlanarFlow,
    ];

    /// Shapes which are fully correlated with others for two-object systems.
    pub fn is_redundant_for_pairs(&self) -> bool {
        matches!(
            self,
            Shape::Planarity | Shape::Circularity | Shape::PlanarFlow
        )
    }
}

impl Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Shape::Aplanarity => write!(f, "Aplanarity"),
            Shape::AplanarityO => write!(f, "AplanarityO"),
            Shape::Sphericity => write!(f, "Sphericity"),
            Shape::SphericityO => write!(f, "SphericityO"),
            Shape::SphericityT => write!(f, "SphericityT"),
            Shape::Planarity => write!(f, "Planarity"),
            Shape::VariableC => write!(f, "VariableC"),
            Shape::VariableD => write!(f, "VariableD"),
            Shape::Circularity => write!(f, "Circularity"),
            Shape::PlanarFlow => write!(f, "PlanarFlow"),
        }
    }
}

impl FromStr for Shape {
    type Err = RecoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Shape::ALL
            .iter()
            .find(|shape| shape.to_string().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| RecoError::ParseError {
                name: s.to_string(),
                object: "Shape".to_string(),
            })
    }
}
