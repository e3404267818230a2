use std::fmt::Display;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    btag::N_WORKING_POINTS,
    combinations::Combination,
    data::{EventObjects, PhysicsObject},
    truth::DecayClassification,
    utils::{
        enums::{ObjectKind, Shape},
        get_or_pad,
        shapes::ParticleCollection,
        vectors::Vec4,
    },
    RecoError, RecoResult,
};

/// The value given to every feature of an object which is absent from the event.
pub const PAD_VALUE: f64 = -10.0;

const N_LEADING_JETS: usize = 6;
const N_LEADING_B_JETS: usize = 3;
const N_LEADING_LEPTONS: usize = 4;
const JET_PT_THRESHOLDS: [u32; 3] = [30, 40, 50];

/// A set of named scalar features, ordered by insertion.
pub type FeatureRow = IndexMap<String, f64>;

/// A rectangular table of feature rows sharing one set of column names.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    names: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureTable {
    pub fn new(names: Vec<String>) -> Self {
        Self {
            names,
            rows: Vec::new(),
        }
    }
    pub fn names(&self) -> &[String] {
        &self.names
    }
    pub fn n_columns(&self) -> usize {
        self.names.len()
    }
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row whose values follow the column order of the table.
    pub fn push(&mut self, row: Vec<f64>) -> RecoResult<()> {
        if row.len() != self.names.len() {
            return Err(RecoError::Custom(format!(
                "Feature row has {} values but the table has {} columns",
                row.len(),
                self.names.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Move every row of `other` into this table. Both tables must have the same columns.
    pub fn append(&mut self, other: FeatureTable) -> RecoResult<()> {
        if other.names != self.names {
            return Err(RecoError::Custom(
                "Cannot append feature tables with different columns".to_string(),
            ));
        }
        self.rows.extend(other.rows);
        Ok(())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|column| column == name)
    }

    /// The value of the feature `name` in row `row`.
    pub fn get(&self, row: usize, name: &str) -> Option<f64> {
        let column = self.position(name)?;
        self.rows.get(row).map(|values| values[column])
    }

    /// All values of the feature `name`.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let column = self.position(name)?;
        Some(self.rows.iter().map(|values| values[column]).collect())
    }
}

fn assemble(names: &[String], row: &FeatureRow) -> RecoResult<Vec<f64>> {
    names
        .iter()
        .map(|name| {
            row.get(name)
                .copied()
                .ok_or_else(|| RecoError::MissingFeature { name: name.clone() })
        })
        .collect()
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Kinematic features of a single object.
#[derive(Copy, Clone, Debug)]
enum ObjectField {
    Pt,
    Eta,
    Phi,
    M,
    Wp,
}

const OBJECT_FIELDS: [ObjectField; 5] = [
    ObjectField::Pt,
    ObjectField::Eta,
    ObjectField::Phi,
    ObjectField::M,
    ObjectField::Wp,
];

impl ObjectField {
    fn value(&self, object: &PhysicsObject) -> f64 {
        match self {
            ObjectField::Pt => object.pt(),
            ObjectField::Eta => object.eta(),
            ObjectField::Phi => object.phi(),
            ObjectField::M => object.m(),
            ObjectField::Wp => object.tag_value(),
        }
    }
}

impl Display for ObjectField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectField::Pt => write!(f, "pt"),
            ObjectField::Eta => write!(f, "eta"),
            ObjectField::Phi => write!(f, "phi"),
            ObjectField::M => write!(f, "m"),
            ObjectField::Wp => write!(f, "wp"),
        }
    }
}

/// Features of a multi-object system.
#[derive(Copy, Clone, Debug)]
enum SystemField {
    Pt,
    Eta,
    Phi,
    M,
    Mt,
    PtSum,
    WpSum,
    Shape(Shape),
}

impl SystemField {
    fn value(&self, system: &ParticleCollection) -> f64 {
        match self {
            SystemField::Pt => system.pt(),
            SystemField::Eta => system.eta(),
            SystemField::Phi => system.phi(),
            SystemField::M => system.m(),
            SystemField::Mt => system.mt(),
            SystemField::PtSum => system.ptsum(),
            SystemField::WpSum => system.wpsum() as f64,
            SystemField::Shape(shape) => system.shape(*shape),
        }
    }
}

impl Display for SystemField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SystemField::Pt => write!(f, "pt"),
            SystemField::Eta => write!(f, "eta"),
            SystemField::Phi => write!(f, "phi"),
            SystemField::M => write!(f, "m"),
            SystemField::Mt => write!(f, "mt"),
            SystemField::PtSum => write!(f, "ptsum"),
            SystemField::WpSum => write!(f, "wpsum"),
            SystemField::Shape(shape) => write!(f, "{}", shape),
        }
    }
}

/// Angular separations between two systems.
#[derive(Copy, Clone, Debug)]
enum PairField {
    DPhi,
    DEta,
    DR,
}

impl PairField {
    fn value(&self, a: &Vec4, b: &Vec4) -> f64 {
        match self {
            PairField::DPhi => a.delta_phi(b),
            PairField::DEta => a.delta_eta(b),
            PairField::DR => a.delta_r(b),
        }
    }
}

impl Display for PairField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PairField::DPhi => write!(f, "dphi"),
            PairField::DEta => write!(f, "deta"),
            PairField::DR => write!(f, "dr"),
        }
    }
}

/// The objects and systems of a semi-leptonic combination that features are built from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Role {
    LepTopJet,
    HadTopJet,
    HadWJet1,
    HadWJet2,
    Lep,
    NuSol1,
    NuSol2,
    HadW,
    LepWSol1,
    LepWSol2,
    HadTop,
    LepTopSol1,
    LepTopSol2,
    TtbarSol1,
    TtbarSol2,
}

impl Role {
    /// Systems built with the smaller-$`|p_z|`$ neutrino. Their transverse features duplicate
    /// those of the first solution.
    fn is_second_solution(&self) -> bool {
        matches!(
            self,
            Role::NuSol2 | Role::LepWSol2 | Role::LepTopSol2 | Role::TtbarSol2
        )
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Role::LepTopJet => "lepTopJet",
            Role::HadTopJet => "hadTopJet",
            Role::HadWJet1 => "hadWJet1",
            Role::HadWJet2 => "hadWJet2",
            Role::Lep => "lep",
            Role::NuSol1 => "nuSol1",
            Role::NuSol2 => "nuSol2",
            Role::HadW => "hadW",
            Role::LepWSol1 => "lepWSol1",
            Role::LepWSol2 => "lepWSol2",
            Role::HadTop => "hadTop",
            Role::LepTopSol1 => "lepTopSol1",
            Role::LepTopSol2 => "lepTopSol2",
            Role::TtbarSol1 => "ttbarSol1",
            Role::TtbarSol2 => "ttbarSol2",
        };
        write!(f, "{}", label)
    }
}

const ROLE_JETS: [Role; 4] = [Role::LepTopJet, Role::HadTopJet, Role::HadWJet1, Role::HadWJet2];
const LEPTON_W_SYSTEMS: [Role; 2] = [Role::LepWSol1, Role::LepWSol2];
const EXTENDED_SYSTEMS: [Role; 6] = [
    Role::HadW,
    Role::HadTop,
    Role::LepTopSol1,
    Role::LepTopSol2,
    Role::TtbarSol1,
    Role::TtbarSol2,
];

#[rustfmt::skip]
const PAIRS: [(Role, Role); 74] = {
    use Role::*;
    [
        (HadTop, LepTopSol1), (HadTop, LepTopSol2), (HadTop, HadW), (HadTop, LepWSol1),
        (HadTop, LepWSol2), (HadTop, HadTopJet), (HadTop, HadWJet1), (HadTop, HadWJet2),
        (HadTop, LepTopJet), (HadTop, Lep), (HadTop, NuSol1), (HadTop, NuSol2),
        (HadW, LepTopSol1), (HadW, LepTopSol2), (HadW, LepWSol1), (HadW, LepWSol2),
        (HadW, HadTopJet), (HadW, HadWJet1), (HadW, HadWJet2), (HadW, LepTopJet),
        (HadW, Lep), (HadW, NuSol1), (HadW, NuSol2),
        (HadTopJet, LepTopSol1), (HadTopJet, LepTopSol2), (HadTopJet, LepWSol1),
        (HadTopJet, LepWSol2), (HadTopJet, HadWJet1), (HadTopJet, HadWJet2),
        (HadTopJet, LepTopJet), (HadTopJet, Lep), (HadTopJet, NuSol1), (HadTopJet, NuSol2),
        (HadWJet1, LepTopSol1), (HadWJet1, LepTopSol2), (HadWJet1, LepWSol1),
        (HadWJet1, LepWSol2), (HadWJet1, HadWJet2), (HadWJet1, LepTopJet), (HadWJet1, Lep),
        (HadWJet1, NuSol1), (HadWJet1, NuSol2),
        (HadWJet2, LepTopSol1), (HadWJet2, LepTopSol2), (HadWJet2, LepWSol1),
        (HadWJet2, LepWSol2), (HadWJet2, LepTopJet), (HadWJet2, Lep), (HadWJet2, NuSol1),
        (HadWJet2, NuSol2),
        (LepTopSol1, LepWSol1), (LepTopSol1, LepWSol2), (LepWSol1, LepTopSol2),
        (LepWSol2, LepTopSol2), (LepTopJet, LepTopSol1), (LepTopJet, LepTopSol2),
        (Lep, LepTopSol1), (Lep, LepTopSol2), (LepTopSol1, NuSol1), (LepTopSol1, NuSol2),
        (NuSol1, LepTopSol2), (NuSol2, LepTopSol2),
        (LepTopJet, LepWSol1), (LepTopJet, LepWSol2), (Lep, LepWSol1), (Lep, LepWSol2),
        (LepWSol1, NuSol1), (LepWSol1, NuSol2), (NuSol1, LepWSol2), (NuSol2, LepWSol2),
        (Lep, LepTopJet), (LepTopJet, NuSol1), (LepTopJet, NuSol2),
        // dR(lep, nuSol2) equals dR(lep, nuSol1)
        (Lep, NuSol1),
    ]
};

fn lepton_w_fields(role: Role) -> Vec<SystemField> {
    let mut fields = vec![SystemField::Eta, SystemField::M];
    if !role.is_second_solution() {
        fields.extend([
            SystemField::Pt,
            SystemField::Phi,
            SystemField::Mt,
            SystemField::PtSum,
        ]);
    }
    fields.extend(
        Shape::ALL
            .into_iter()
            .filter(|shape| !shape.is_redundant_for_pairs())
            .filter(|shape| !(role.is_second_solution() && *shape == Shape::SphericityT))
            .map(SystemField::Shape),
    );
    fields
}

fn extended_fields(role: Role) -> Vec<SystemField> {
    let mut fields = vec![SystemField::Eta, SystemField::M];
    if !role.is_second_solution() {
        fields.extend([SystemField::Pt, SystemField::Phi, SystemField::PtSum]);
    }
    if matches!(role, Role::HadW | Role::HadTop | Role::TtbarSol1) {
        fields.push(SystemField::WpSum);
    }
    fields.extend(
        Shape::ALL
            .into_iter()
            .filter(|shape| !(role == Role::HadW && shape.is_redundant_for_pairs()))
            .filter(|shape| !(role.is_second_solution() && *shape == Shape::SphericityT))
            .map(SystemField::Shape),
    );
    fields
}

fn pair_fields(second: Role) -> &'static [PairField] {
    if second.is_second_solution() {
        &[PairField::DEta, PairField::DR]
    } else {
        &[PairField::DPhi, PairField::DEta, PairField::DR]
    }
}

fn multiplicity_names() -> Vec<String> {
    let mut names = vec!["nJets".to_string()];
    names.extend(JET_PT_THRESHOLDS.map(|pt| format!("nJetsPtAbove{pt}")));
    names.extend((1..=N_WORKING_POINTS).map(|wp| format!("nBtags{wp}")));
    names
}

fn insert_multiplicities(objects: &EventObjects, row: &mut FeatureRow) {
    row.insert("nJets".to_string(), objects.n_jets() as f64);
    for pt in JET_PT_THRESHOLDS {
        row.insert(
            format!("nJetsPtAbove{pt}"),
            objects.n_jets_pt_above(pt as f64) as f64,
        );
    }
    for wp in 1..=N_WORKING_POINTS as u8 {
        row.insert(format!("nBtags{wp}"), objects.n_b_jets_at(wp) as f64);
    }
}

fn leading_object_names(prefix: &str, n: usize) -> Vec<String> {
    (1..=n)
        .flat_map(|i| OBJECT_FIELDS.map(|field| format!("{field}_{prefix}{i}")))
        .collect()
}

fn insert_leading_objects(row: &mut FeatureRow, prefix: &str, objects: &[&PhysicsObject], n: usize) {
    for i in 1..=n {
        for field in OBJECT_FIELDS {
            row.insert(
                format!("{field}_{prefix}{i}"),
                get_or_pad(objects, i - 1, |object| field.value(object), PAD_VALUE),
            );
        }
    }
}

fn insert_jet_summary(objects: &EventObjects, row: &mut FeatureRow) {
    let jets: Vec<&PhysicsObject> = objects.jets().collect();
    insert_leading_objects(row, "jet", &jets, N_LEADING_JETS);
    insert_leading_objects(row, "bjet", &objects.b_jets(), N_LEADING_B_JETS);
    row.insert("HT_all".to_string(), objects.ht_all());
    row.insert("HT_had".to_string(), objects.ht_had());
}

fn jet_summary_names() -> Vec<String> {
    let mut names = leading_object_names("jet", N_LEADING_JETS);
    names.extend(leading_object_names("bjet", N_LEADING_B_JETS));
    names.extend(["HT_all", "HT_had"].map(String::from));
    names
}

/// The multi-object systems of one combination.
struct Systems {
    had_w: ParticleCollection,
    had_top: ParticleCollection,
    lep_top: [ParticleCollection; 2],
    ttbar: [ParticleCollection; 2],
}

impl Systems {
    fn new(combination: &Combination) -> Self {
        let had_top_jet = combination.had_top_jet;
        let w1 = combination.had_w_jet1;
        let w2 = combination.had_w_jet2;
        let lep_top_jet = combination.lep_top_jet;
        let lepton = combination.lepton;
        Self {
            had_w: ParticleCollection::new([w1, w2]),
            had_top: ParticleCollection::new([had_top_jet, w1, w2]),
            lep_top: combination
                .neutrinos
                .map(|nu| ParticleCollection::new([lep_top_jet, lepton, nu])),
            ttbar: combination.neutrinos.map(|nu| {
                ParticleCollection::new([had_top_jet, w1, w2, lep_top_jet, lepton, nu])
            }),
        }
    }

    fn get(&self, role: Role) -> Option<&ParticleCollection> {
        match role {
            Role::HadW => Some(&self.had_w),
            Role::HadTop => Some(&self.had_top),
            Role::LepTopSol1 => Some(&self.lep_top[0]),
            Role::LepTopSol2 => Some(&self.lep_top[1]),
            Role::TtbarSol1 => Some(&self.ttbar[0]),
            Role::TtbarSol2 => Some(&self.ttbar[1]),
            _ => None,
        }
    }

    fn momentum(&self, role: Role, combination: &Combination) -> Vec4 {
        let [nu1, nu2] = combination.neutrinos;
        match role {
            Role::LepTopJet => combination.lep_top_jet.p4,
            Role::HadTopJet => combination.had_top_jet.p4,
            Role::HadWJet1 => combination.had_w_jet1.p4,
            Role::HadWJet2 => combination.had_w_jet2.p4,
            Role::Lep => combination.lepton.p4,
            Role::NuSol1 => nu1.p4,
            Role::NuSol2 => nu2.p4,
            Role::LepWSol1 => combination.lepton.p4 + nu1.p4,
            Role::LepWSol2 => combination.lepton.p4 + nu2.p4,
            _ => self.get(role).map(ParticleCollection::p4).unwrap_or_default(),
        }
    }
}

/// Builds the semi-leptonic training row of each [`Combination`].
///
/// A row holds, in column order:
///
/// - bookkeeping (`EventId`, `CombId`);
/// - event-wide features: jet and b-tag multiplicities, lepton and neutrino kinematics, the six
///   leading jets and three leading b-jets (padded with [`PAD_VALUE`]), $`H_T`$, and the
///   leptonic $`W`$ system under each neutrino solution;
/// - per-combination features: b-tag counts of the role jets, the kinematics of each role jet,
///   the hadronic $`W`$, hadronic top, leptonic top and $`t\bar{t}`$ systems with their event
///   shapes, and the angular separations of a fixed list of object pairs;
/// - the `signal` label.
///
/// Event-wide features are computed when `CombId == 0` and reused for the other combinations of
/// the same event.
#[derive(Clone, Debug)]
pub struct CombinationFeatureExtractor {
    names: Vec<String>,
    event_features: Option<(usize, FeatureRow)>,
}

impl Default for CombinationFeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl CombinationFeatureExtractor {
    pub fn new() -> Self {
        Self {
            names: Self::declare(),
            event_features: None,
        }
    }

    fn declare() -> Vec<String> {
        let mut names = vec!["EventId".to_string(), "CombId".to_string()];
        names.extend(multiplicity_names());
        names.extend(
            [
                "leptonIsMuon",
                "nuMomentumSolved",
                "pt_lep",
                "eta_lep",
                "phi_lep",
                "pt_nuSol1",
                "eta_nuSol1",
                "eta_nuSol2",
                "phi_nuSol1",
            ]
            .map(String::from),
        );
        names.extend(jet_summary_names());
        for role in LEPTON_W_SYSTEMS {
            names.extend(
                lepton_w_fields(role)
                    .iter()
                    .map(|field| format!("{field}_{role}")),
            );
        }
        names.extend((1..=N_WORKING_POINTS).map(|wp| format!("nBtags{wp}_ttbar")));
        names.extend((1..=N_WORKING_POINTS).map(|wp| format!("nBtags{wp}_ttbarDecay")));
        for role in ROLE_JETS {
            names.extend(OBJECT_FIELDS.map(|field| format!("{field}_{role}")));
        }
        for role in EXTENDED_SYSTEMS {
            names.extend(
                extended_fields(role)
                    .iter()
                    .map(|field| format!("{field}_{role}")),
            );
        }
        for (a, b) in PAIRS {
            names.extend(
                pair_fields(b)
                    .iter()
                    .map(|field| format!("{field}_{a}_{b}")),
            );
        }
        names.push("signal".to_string());
        names
    }

    /// The column names, in row order.
    pub fn feature_names(&self) -> &[String] {
        &self.names
    }

    /// An empty table with this extractor's columns.
    pub fn table(&self) -> FeatureTable {
        FeatureTable::new(self.names.clone())
    }

    /// Compute the row of `combination`, whose objects must come from `objects`.
    ///
    /// # Errors
    ///
    /// Returns [`RecoError::MissingFeature`] if a declared column was not computed.
    pub fn fill(
        &mut self,
        event_id: usize,
        combination: &Combination,
        objects: &EventObjects,
    ) -> RecoResult<Vec<f64>> {
        let mut row = FeatureRow::with_capacity(self.names.len());
        row.insert("EventId".to_string(), event_id as f64);
        row.insert("CombId".to_string(), combination.comb_id as f64);

        let event_features = match self.event_features.take() {
            Some((id, features)) if id == event_id && combination.comb_id != 0 => features,
            _ => Self::event_wide_features(combination, objects),
        };
        row.extend(
            event_features
                .iter()
                .map(|(name, value)| (name.clone(), *value)),
        );
        self.event_features = Some((event_id, event_features));

        Self::insert_combination_features(combination, &mut row);
        row.insert("signal".to_string(), flag(combination.is_signal));
        assemble(&self.names, &row)
    }

    fn event_wide_features(combination: &Combination, objects: &EventObjects) -> FeatureRow {
        let lepton = combination.lepton;
        let [nu1, nu2] = combination.neutrinos;
        let mut row = FeatureRow::new();
        insert_multiplicities(objects, &mut row);
        row.insert(
            "leptonIsMuon".to_string(),
            flag(lepton.kind == ObjectKind::Muon),
        );
        row.insert(
            "nuMomentumSolved".to_string(),
            flag(objects.neutrino_solved()),
        );
        row.insert("pt_lep".to_string(), lepton.pt());
        row.insert("eta_lep".to_string(), lepton.eta());
        row.insert("phi_lep".to_string(), lepton.phi());
        row.insert("pt_nuSol1".to_string(), nu1.pt());
        row.insert("eta_nuSol1".to_string(), nu1.eta());
        row.insert("eta_nuSol2".to_string(), nu2.eta());
        row.insert("phi_nuSol1".to_string(), nu1.phi());
        insert_jet_summary(objects, &mut row);
        for (role, nu) in LEPTON_W_SYSTEMS.into_iter().zip([nu1, nu2]) {
            let system = ParticleCollection::new([lepton, nu]);
            for field in lepton_w_fields(role) {
                row.insert(format!("{field}_{role}"), field.value(&system));
            }
        }
        row
    }

    fn insert_combination_features(combination: &Combination, row: &mut FeatureRow) {
        for wp in 1..=N_WORKING_POINTS as u8 {
            row.insert(
                format!("nBtags{wp}_ttbar"),
                combination.n_btags_ttbar(wp) as f64,
            );
        }
        for wp in 1..=N_WORKING_POINTS as u8 {
            row.insert(
                format!("nBtags{wp}_ttbarDecay"),
                combination.n_btags_ttbar_decay(wp) as f64,
            );
        }
        for (role, jet) in ROLE_JETS.into_iter().zip(combination.jets()) {
            for field in OBJECT_FIELDS {
                row.insert(format!("{field}_{role}"), field.value(jet));
            }
        }
        let systems = Systems::new(combination);
        for role in EXTENDED_SYSTEMS {
            let Some(system) = systems.get(role) else {
                continue;
            };
            for field in extended_fields(role) {
                row.insert(format!("{field}_{role}"), field.value(system));
            }
        }
        for (a, b) in PAIRS {
            let p4_a = systems.momentum(a, combination);
            let p4_b = systems.momentum(b, combination);
            for field in pair_fields(b) {
                row.insert(format!("{field}_{a}_{b}"), field.value(&p4_a, &p4_b));
            }
        }
    }
}

/// Builds one summary row per selected event (`CombId = -1`).
///
/// The row holds the jet and b-tag multiplicities, the missing transverse energy, the four
/// leading leptons, six leading jets and three leading b-jets (padded with [`PAD_VALUE`]),
/// $`H_T`$, and the numeric codes of the truth decay classification.
#[derive(Clone, Debug)]
pub struct EventFeatureExtractor {
    names: Vec<String>,
}

impl Default for EventFeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl EventFeatureExtractor {
    pub fn new() -> Self {
        let mut names = vec![
            "EventId".to_string(),
            "CombId".to_string(),
            "Tag".to_string(),
        ];
        names.extend(multiplicity_names());
        names.extend(["pt_met", "phi_met"].map(String::from));
        for i in 1..=N_LEADING_LEPTONS {
            names.extend(["pt", "eta", "phi", "isMuon"].map(|field| format!("{field}_lep{i}")));
        }
        names.extend(jet_summary_names());
        names.extend(["decayT", "decayTbar", "decayWp", "decayWm"].map(String::from));
        Self { names }
    }

    /// The column names, in row order.
    pub fn feature_names(&self) -> &[String] {
        &self.names
    }

    /// An empty table with this extractor's columns.
    pub fn table(&self) -> FeatureTable {
        FeatureTable::new(self.names.clone())
    }

    /// Compute the summary row of one event. `tag` labels the sample the event came from.
    pub fn fill(
        &self,
        event_id: usize,
        tag: i32,
        objects: &EventObjects,
        classification: &DecayClassification,
    ) -> RecoResult<Vec<f64>> {
        let mut row = FeatureRow::with_capacity(self.names.len());
        row.insert("EventId".to_string(), event_id as f64);
        row.insert("CombId".to_string(), -1.0);
        row.insert("Tag".to_string(), tag as f64);
        insert_multiplicities(objects, &mut row);
        let met = objects.missing_energy();
        row.insert(
            "pt_met".to_string(),
            met.map(PhysicsObject::pt).unwrap_or(PAD_VALUE),
        );
        row.insert(
            "phi_met".to_string(),
            met.map(PhysicsObject::phi).unwrap_or(PAD_VALUE),
        );
        let leptons: Vec<&PhysicsObject> = objects.leptons().collect();
        for i in 1..=N_LEADING_LEPTONS {
            let value = |f: fn(&PhysicsObject) -> f64| get_or_pad(&leptons, i - 1, f, PAD_VALUE);
            row.insert(format!("pt_lep{i}"), value(PhysicsObject::pt));
            row.insert(format!("eta_lep{i}"), value(PhysicsObject::eta));
            row.insert(format!("phi_lep{i}"), value(PhysicsObject::phi));
            row.insert(
                format!("isMuon_lep{i}"),
                value(|lepton| flag(lepton.kind == ObjectKind::Muon)),
            );
        }
        insert_jet_summary(objects, &mut row);
        let [top, antitop, w_plus, w_minus] = classification.codes();
        row.insert("decayT".to_string(), top as f64);
        row.insert("decayTbar".to_string(), antitop as f64);
        row.insert("decayWp".to_string(), w_plus as f64);
        row.insert("decayWm".to_string(), w_minus as f64);
        assemble(&self.names, &row)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use approx::assert_relative_eq;

    use super::*;
    use crate::{
        combinations::CombinationEnumerator, data::test_event, matching::TruthMatcher,
        neutrino::NeutrinoReconstructor, selection::ObjectSelector,
        truth::TruthDecayClassifier, W_MASS,
    };

    fn prepared() -> (EventObjects, DecayClassification, crate::matching::TruthMatches) {
        let event = test_event();
        let mut objects = ObjectSelector::default().select(&event).unwrap();
        let ids = objects.jet_ids().to_vec();
        for (id, level) in ids.into_iter().zip([5, 0, 2, 1, 0]) {
            objects.set_tag_level(id, level);
        }
        let lepton = objects.lepton(0).unwrap().p4;
        let met = objects.missing_energy().unwrap().p4;
        let solutions = NeutrinoReconstructor::default().solve(&lepton, &met);
        objects.set_neutrinos(solutions.p4s(), solutions.solved);
        let truth = TruthDecayClassifier::default()
            .classify(&event.truth)
            .unwrap();
        let matches = TruthMatcher::default().match_objects(&objects, &truth.particles);
        (objects, truth.classification, matches)
    }

    fn combination_table() -> (EventObjects, FeatureTable) {
        let (objects, _, matches) = prepared();
        let mut extractor = CombinationFeatureExtractor::new();
        let mut table = extractor.table();
        for combination in CombinationEnumerator::default().enumerate(&objects, &matches) {
            table
                .push(extractor.fill(7, &combination, &objects).unwrap())
                .unwrap();
        }
        (objects, table)
    }

    #[test]
    fn test_combination_columns() {
        let extractor = CombinationFeatureExtractor::new();
        let names = extractor.feature_names();
        assert_eq!(names.len(), 394);
        let unique: HashSet<&String> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
        assert_eq!(names[0], "EventId");
        assert_eq!(names[1], "CombId");
        assert_eq!(names[2], "nJets");
        assert_eq!(names.last().map(String::as_str), Some("signal"));
        assert!(names.contains(&"m_lepWSol2".to_string()));
        assert!(!names.contains(&"pt_lepWSol2".to_string()));
        assert!(!names.contains(&"Planarity_hadW".to_string()));
        assert!(names.contains(&"Planarity_hadTop".to_string()));
        assert!(!names.contains(&"SphericityT_ttbarSol2".to_string()));
        assert!(names.contains(&"wpsum_ttbarSol1".to_string()));
        assert!(!names.contains(&"wpsum_ttbarSol2".to_string()));
        assert!(!names.contains(&"wpsum_lepTopSol1".to_string()));
        assert!(names.contains(&"dphi_hadTop_nuSol1".to_string()));
        assert!(!names.contains(&"dphi_hadTop_nuSol2".to_string()));
        assert!(names.contains(&"deta_hadTop_nuSol2".to_string()));
    }

    #[test]
    fn test_event_wide_combination_features() {
        let (_, table) = combination_table();
        assert_eq!(table.len(), 60);
        assert_eq!(table.get(0, "EventId"), Some(7.0));
        assert_eq!(table.get(59, "CombId"), Some(59.0));
        assert_eq!(table.get(0, "nJets"), Some(5.0));
        assert_eq!(table.get(0, "nJetsPtAbove30"), Some(4.0));
        assert_eq!(table.get(0, "nJetsPtAbove50"), Some(3.0));
        assert_eq!(table.get(0, "nBtags1"), Some(3.0));
        assert_eq!(table.get(0, "nBtags2"), Some(2.0));
        assert_eq!(table.get(0, "nBtags5"), Some(1.0));
        assert_eq!(table.get(0, "leptonIsMuon"), Some(0.0));
        assert_eq!(table.get(0, "nuMomentumSolved"), Some(1.0));
        assert_eq!(table.get(0, "pt_jet6"), Some(PAD_VALUE));
        assert_eq!(table.get(0, "wp_jet6"), Some(PAD_VALUE));
        assert_relative_eq!(table.get(0, "pt_bjet1").unwrap(), 120.0, epsilon = 1e-9);
        assert_relative_eq!(table.get(0, "pt_bjet3").unwrap(), 45.0, epsilon = 1e-9);
        assert_eq!(table.get(0, "wp_bjet2"), Some(2.0));
        assert_relative_eq!(table.get(0, "HT_had").unwrap(), 355.0, epsilon = 1e-9);
        assert_relative_eq!(table.get(0, "HT_all").unwrap(), 445.0, epsilon = 1e-9);
        assert_relative_eq!(table.get(0, "m_lepWSol1").unwrap(), W_MASS, epsilon = 1e-6);
        assert_relative_eq!(table.get(0, "m_lepWSol2").unwrap(), W_MASS, epsilon = 1e-6);
    }

    #[test]
    fn test_event_features_are_shared_across_combinations() {
        let (_, table) = combination_table();
        let event_block = 2..88;
        for row in table.rows() {
            assert_eq!(row[event_block.clone()], table.rows()[0][event_block.clone()]);
        }
    }

    #[test]
    fn test_cached_features_are_refreshed_for_a_new_event() {
        let (objects, _, matches) = prepared();
        let combinations = CombinationEnumerator::default().enumerate(&objects, &matches);
        let mut extractor = CombinationFeatureExtractor::new();
        let first = extractor.fill(0, &combinations[0], &objects).unwrap();

        let mut fewer = ObjectSelector::default().select(&test_event()).unwrap();
        let lepton = fewer.lepton(0).unwrap().p4;
        let met = fewer.missing_energy().unwrap().p4;
        fewer.set_neutrinos(
            NeutrinoReconstructor::default().solve(&lepton, &met).p4s(),
            true,
        );
        let fewer_matches = TruthMatcher::default().match_objects(&fewer, &[]);
        let other = CombinationEnumerator::default().enumerate(&fewer, &fewer_matches);
        // not CombId 0, but a different event
        let second = extractor.fill(1, &other[3], &fewer).unwrap();
        let n_btags1 = extractor
            .feature_names()
            .iter()
            .position(|name| name == "nBtags1")
            .unwrap();
        assert_eq!(first[n_btags1], 3.0);
        assert_eq!(second[n_btags1], 0.0);
    }

    #[test]
    fn test_signal_combination_features() {
        let (objects, table) = combination_table();
        let signals = table.column("signal").unwrap();
        assert_eq!(signals.iter().filter(|&&s| s == 1.0).count(), 1);
        let row = signals.iter().position(|&s| s == 1.0).unwrap();
        assert_eq!(table.get(row, "wp_hadTopJet"), Some(5.0));
        assert_eq!(table.get(row, "wpsum_hadTop"), Some(6.0));
        assert_eq!(table.get(row, "wpsum_hadW"), Some(1.0));
        assert_eq!(table.get(row, "wpsum_ttbarSol1"), Some(8.0));
        assert_eq!(table.get(row, "nBtags1_ttbar"), Some(3.0));
        assert_eq!(table.get(row, "nBtags1_ttbarDecay"), Some(2.0));
        assert_eq!(table.get(row, "nBtags3_ttbarDecay"), Some(1.0));
        assert_relative_eq!(
            table.get(row, "deta_hadTopJet_lepTopJet").unwrap(),
            0.5 - 1.2,
            epsilon = 1e-9
        );
        let w1 = objects.jet(1).unwrap().p4;
        let w2 = objects.jet(3).unwrap().p4;
        assert_relative_eq!(
            table.get(row, "m_hadW").unwrap(),
            (w1 + w2).m(),
            epsilon = 1e-9
        );
        assert_relative_eq!(
            table.get(row, "ptsum_hadTop").unwrap(),
            120.0 + 95.0 + 45.0,
            epsilon = 1e-9
        );
        let dr = table.get(row, "dr_hadW_hadWJet1").unwrap();
        let dphi = table.get(row, "dphi_hadW_hadWJet1").unwrap();
        let deta = table.get(row, "deta_hadW_hadWJet1").unwrap();
        assert_relative_eq!(dr, deta.hypot(dphi), epsilon = 1e-12);
        for value in &table.rows()[row] {
            assert!(value.is_finite());
        }
    }

    #[test]
    fn test_event_summary_features() {
        let (objects, classification, _) = prepared();
        let extractor = EventFeatureExtractor::new();
        assert_eq!(extractor.feature_names().len(), 3 + 9 + 2 + 16 + 30 + 15 + 2 + 4);
        let mut table = extractor.table();
        table
            .push(extractor.fill(3, 2, &objects, &classification).unwrap())
            .unwrap();
        assert_eq!(table.get(0, "EventId"), Some(3.0));
        assert_eq!(table.get(0, "CombId"), Some(-1.0));
        assert_eq!(table.get(0, "Tag"), Some(2.0));
        assert_relative_eq!(table.get(0, "pt_met").unwrap(), 40.0, epsilon = 1e-9);
        assert_relative_eq!(table.get(0, "phi_met").unwrap(), 1.5, epsilon = 1e-9);
        assert_relative_eq!(table.get(0, "pt_lep1").unwrap(), 50.0, epsilon = 1e-9);
        assert_eq!(table.get(0, "isMuon_lep1"), Some(0.0));
        assert_eq!(table.get(0, "pt_lep2"), Some(PAD_VALUE));
        assert_eq!(table.get(0, "isMuon_lep4"), Some(PAD_VALUE));
        assert_eq!(table.get(0, "decayT"), Some(1.0));
        assert_eq!(table.get(0, "decayTbar"), Some(1.0));
        assert_eq!(table.get(0, "decayWp"), Some(1.0));
        assert_eq!(table.get(0, "decayWm"), Some(2.0));
    }

    #[test]
    fn test_missing_feature() {
        let names = vec!["a".to_string(), "b".to_string()];
        let mut row = FeatureRow::new();
        row.insert("b".to_string(), 2.0);
        row.insert("a".to_string(), 1.0);
        assert_eq!(assemble(&names, &row).unwrap(), vec![1.0, 2.0]);
        row.shift_remove("b");
        assert!(matches!(
            assemble(&names, &row),
            Err(RecoError::MissingFeature { name }) if name == "b"
        ));
    }

    #[test]
    fn test_table_shape_is_checked() {
        let mut table = FeatureTable::new(vec!["x".to_string(), "y".to_string()]);
        assert!(table.push(vec![1.0]).is_err());
        table.push(vec![1.0, 2.0]).unwrap();
        let mut other = FeatureTable::new(vec!["x".to_string(), "y".to_string()]);
        other.push(vec![3.0, 4.0]).unwrap();
        table.append(other).unwrap();
        assert_eq!(table.column("y"), Some(vec![2.0, 4.0]));
        assert!(table.append(FeatureTable::new(vec!["z".to_string()])).is_err());
        assert_eq!(table.get(5, "x"), None);
        assert_eq!(table.get(0, "z"), None);
    }
}
