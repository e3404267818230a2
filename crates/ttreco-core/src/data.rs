use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::utils::{
    enums::{ObjectKind, TopBranch},
    vectors::Vec4,
};

/// A semi-leptonic $`t\bar{t}`$ event that can be used to test the reconstruction chain.
///
/// The top decays as $`t \to W^+ b`$ with $`W^+ \to u\bar{d}`$ and the antitop as
/// $`\bar{t} \to W^- \bar{b}`$ with $`W^- \to e^-\bar{\nu}_e`$. Each visible truth particle has a
/// reconstructed counterpart; there is one additional soft jet inside the acceptance, one jet
/// below the $`p_T`$ threshold, and one electron outside the $`\eta`$ acceptance.
pub fn test_event() -> RawEvent {
    let truth = |status, pdg_id, pt: f64, eta, phi: f64, mother1, mother2| RawTruthParticle {
        status,
        pdg_id,
        px: pt * phi.cos(),
        py: pt * phi.sin(),
        eta,
        phi,
        mother1,
        mother2,
    };
    RawEvent {
        jets: vec![
            RawJet::new(120.0, 0.5, 0.3, 10.0, 5),
            RawJet::new(95.0, -0.8, 2.0, 8.0, 2),
            RawJet::new(70.0, 1.2, -2.5, 7.0, -5),
            RawJet::new(45.0, -0.2, -1.0, 5.0, 1),
            RawJet::new(25.0, 2.0, 1.0, 4.0, 21),
            RawJet::new(15.0, 0.0, 0.0, 3.0, 4),
        ],
        electrons: vec![RawLepton::new(50.0, 0.1, 1.0), RawLepton::new(30.0, 2.7, 0.5)],
        muons: vec![],
        missing_energy: vec![RawMissingEnergy::new(40.0, 1.5)],
        truth: vec![
            truth(3, 21, 0.0, 0.0, 0.0, 0, 0),
            truth(3, 21, 0.0, 0.0, 0.0, 0, 0),
            truth(3, 6, 60.0, 0.4, 0.6, 1, 2),
            truth(3, -6, 60.0, 0.9, -2.5, 1, 2),
            truth(3, 24, 70.0, -0.5, 2.4, 3, 0),
            truth(3, 5, 110.0, 0.52, 0.28, 3, 0),
            truth(3, -24, 55.0, 0.6, 0.0, 4, 0),
            truth(3, -5, 65.0, 1.18, -2.52, 4, 0),
            truth(3, 2, 90.0, -0.78, 2.02, 5, 0),
            truth(3, -1, 40.0, -0.22, -0.98, 5, 0),
            truth(3, 11, 48.0, 0.1, 1.0, 7, 0),
            truth(3, -12, 42.0, 1.3, -1.9, 7, 0),
            truth(1, 22, 5.0, 0.0, 0.0, 11, 0),
        ],
    }
}

/// A reconstructed jet as delivered by the detector simulation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawJet {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    pub mass: f64,
    /// The truth flavor label (PDG id of the originating parton, sign ignored).
    pub flavor: i32,
}

impl RawJet {
    pub fn new(pt: f64, eta: f64, phi: f64, mass: f64, flavor: i32) -> Self {
        Self {
            pt,
            eta,
            phi,
            mass,
            flavor,
        }
    }
}

/// A reconstructed electron or muon.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLepton {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
}

impl RawLepton {
    pub fn new(pt: f64, eta: f64, phi: f64) -> Self {
        Self { pt, eta, phi }
    }
}

/// The missing transverse energy record.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMissingEnergy {
    pub met: f64,
    pub phi: f64,
}

impl RawMissingEnergy {
    pub fn new(met: f64, phi: f64) -> Self {
        Self { met, phi }
    }
}

/// One entry of the generator-level particle record.
///
/// Mother references are 1-indexed into the record, and any value `<= 0` means "no mother".
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTruthParticle {
    pub status: i32,
    pub pdg_id: i32,
    pub px: f64,
    pub py: f64,
    pub eta: f64,
    pub phi: f64,
    pub mother1: i32,
    pub mother2: i32,
}

impl RawTruthParticle {
    /// The 0-based record index of the first mother, if any.
    pub fn mother1_index(&self) -> Option<usize> {
        (self.mother1 > 0).then(|| (self.mother1 - 1) as usize)
    }
    pub fn has_second_mother(&self) -> bool {
        self.mother2 > 0
    }
    /// Returns `true` when the particle has exactly one mother (a direct decay product).
    pub fn has_single_mother(&self) -> bool {
        self.mother1 > 0 && !self.has_second_mother()
    }
    pub fn pt(&self) -> f64 {
        self.px.hypot(self.py)
    }
}

/// The raw per-event input: candidate objects plus the generator record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub jets: Vec<RawJet>,
    pub electrons: Vec<RawLepton>,
    pub muons: Vec<RawLepton>,
    /// Expected to hold exactly one record.
    pub missing_energy: Vec<RawMissingEnergy>,
    pub truth: Vec<RawTruthParticle>,
}

/// The position of a [`PhysicsObject`] in its event's [`EventObjects`] table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub usize);

impl Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A reconstructed particle candidate with its role metadata.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhysicsObject {
    pub id: ObjectId,
    pub p4: Vec4,
    pub kind: ObjectKind,
    /// The truth flavor label (jets only).
    pub flavor: Option<i32>,
    /// The emulated b-tag working point (jets only, `None` until tagging runs).
    pub tag_level: Option<u8>,
}

impl PhysicsObject {
    pub fn pt(&self) -> f64 {
        self.p4.pt()
    }
    pub fn eta(&self) -> f64 {
        self.p4.eta()
    }
    pub fn phi(&self) -> f64 {
        self.p4.phi()
    }
    pub fn m(&self) -> f64 {
        self.p4.m()
    }
    pub fn is_jet(&self) -> bool {
        self.kind == ObjectKind::Jet
    }
    /// A jet tagged at any working point.
    pub fn is_b_tagged(&self) -> bool {
        self.is_jet() && self.tag_level.is_some_and(|level| level > 0)
    }
    /// Returns `true` when this jet's tag level reaches the working point `wp`.
    pub fn passes_working_point(&self, wp: u8) -> bool {
        self.tag_level.is_some_and(|level| level >= wp)
    }
    /// The tag level as a feature value, with `-1` marking "unset or not a jet".
    pub fn tag_value(&self) -> f64 {
        match (self.kind, self.tag_level) {
            (ObjectKind::Jet, Some(level)) => level as f64,
            _ => -1.0,
        }
    }
}

/// A generator-level particle from the $`t\bar{t}`$ decay chain.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TruthParticle {
    /// Built from $`(p_T, \eta, \phi)`$ with zero mass.
    pub p4: Vec4,
    pub pdg_id: i32,
    pub parent_pdg_id: i32,
}

impl TruthParticle {
    pub fn new(pt: f64, eta: f64, phi: f64, pdg_id: i32, parent_pdg_id: i32) -> Self {
        Self {
            p4: Vec4::from_pt_eta_phi_m(pt, eta, phi, 0.0),
            pdg_id,
            parent_pdg_id,
        }
    }
    pub fn is_from_w_plus(&self) -> bool {
        self.parent_pdg_id == 24
    }
    pub fn is_from_w_minus(&self) -> bool {
        self.parent_pdg_id == -24
    }
    pub fn is_from_top(&self) -> bool {
        self.parent_pdg_id == 6
    }
    pub fn is_from_antitop(&self) -> bool {
        self.parent_pdg_id == -6
    }
    /// The top branch this particle belongs to, if its parent is a top or a $`W`$.
    pub fn branch(&self) -> Option<TopBranch> {
        TopBranch::from_parent(self.parent_pdg_id)
    }
}

/// The per-event table owning every reconstructed object.
///
/// Objects are stored in insertion order (jets, electrons, muons, missing energy, neutrino
/// candidates) and referenced by [`ObjectId`]. The role lists hold ids into the table.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventObjects {
    objects: Vec<PhysicsObject>,
    jets: Vec<ObjectId>,
    electrons: Vec<ObjectId>,
    muons: Vec<ObjectId>,
    missing_energy: Option<ObjectId>,
    neutrinos: Vec<ObjectId>,
    neutrino_solved: bool,
}

impl EventObjects {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, p4: Vec4, kind: ObjectKind, flavor: Option<i32>) -> ObjectId {
        let id = ObjectId(self.objects.len());
        self.objects.push(PhysicsObject {
            id,
            p4,
            kind,
            flavor,
            tag_level: None,
        });
        id
    }

    pub fn push_jet(&mut self, p4: Vec4, flavor: i32) -> ObjectId {
        let id = self.push(p4, ObjectKind::Jet, Some(flavor));
        self.jets.push(id);
        id
    }
    pub fn push_electron(&mut self, p4: Vec4) -> ObjectId {
        let id = self.push(p4, ObjectKind::Electron, None);
        self.electrons.push(id);
        id
    }
    pub fn push_muon(&mut self, p4: Vec4) -> ObjectId {
        let id = self.push(p4, ObjectKind::Muon, None);
        self.muons.push(id);
        id
    }
    /// Set the missing-energy object, replacing any previous one.
    pub fn set_missing_energy(&mut self, p4: Vec4) -> ObjectId {
        let id = self.push(p4, ObjectKind::MissingEnergy, None);
        self.missing_energy = Some(id);
        id
    }
    /// Append the neutrino candidates (solution order is preserved).
    pub fn set_neutrinos<I: IntoIterator<Item = Vec4>>(&mut self, p4s: I, solved: bool) {
        for p4 in p4s {
            let id = self.push(p4, ObjectKind::Neutrino, None);
            self.neutrinos.push(id);
        }
        self.neutrino_solved = solved;
    }
    pub fn set_tag_level(&mut self, id: ObjectId, level: u8) {
        if let Some(object) = self.objects.get_mut(id.0) {
            if object.is_jet() {
                object.tag_level = Some(level);
            }
        }
    }

    pub fn get(&self, id: ObjectId) -> Option<&PhysicsObject> {
        self.objects.get(id.0)
    }
    /// Every object in table order.
    pub fn objects(&self) -> &[PhysicsObject] {
        &self.objects
    }
    pub fn len(&self) -> usize {
        self.objects.len()
    }
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn resolve<'a>(&'a self, ids: &'a [ObjectId]) -> impl Iterator<Item = &'a PhysicsObject> {
        ids.iter().filter_map(|id| self.get(*id))
    }

    pub fn jet_ids(&self) -> &[ObjectId] {
        &self.jets
    }
    pub fn jets(&self) -> impl Iterator<Item = &PhysicsObject> {
        self.resolve(&self.jets)
    }
    pub fn jet(&self, index: usize) -> Option<&PhysicsObject> {
        self.jets.get(index).and_then(|id| self.get(*id))
    }
    /// Jets tagged at any working point, in jet order.
    pub fn b_jets(&self) -> Vec<&PhysicsObject> {
        self.jets().filter(|jet| jet.is_b_tagged()).collect()
    }
    /// Jets failing every working point, in jet order.
    pub fn light_jets(&self) -> Vec<&PhysicsObject> {
        self.jets().filter(|jet| !jet.is_b_tagged()).collect()
    }
    pub fn electrons(&self) -> impl Iterator<Item = &PhysicsObject> {
        self.resolve(&self.electrons)
    }
    pub fn muons(&self) -> impl Iterator<Item = &PhysicsObject> {
        self.resolve(&self.muons)
    }
    /// Electrons followed by muons.
    pub fn leptons(&self) -> impl Iterator<Item = &PhysicsObject> {
        self.electrons().chain(self.muons())
    }
    pub fn lepton(&self, index: usize) -> Option<&PhysicsObject> {
        self.leptons().nth(index)
    }
    pub fn missing_energy(&self) -> Option<&PhysicsObject> {
        self.missing_energy.and_then(|id| self.get(id))
    }
    pub fn neutrinos(&self) -> impl Iterator<Item = &PhysicsObject> {
        self.resolve(&self.neutrinos)
    }
    pub fn neutrino(&self, index: usize) -> Option<&PhysicsObject> {
        self.neutrinos.get(index).and_then(|id| self.get(*id))
    }
    /// Whether the neutrino quadratic had a real solution.
    pub fn neutrino_solved(&self) -> bool {
        self.neutrino_solved
    }

    pub fn n_jets(&self) -> usize {
        self.jets.len()
    }
    pub fn n_b_jets(&self) -> usize {
        self.jets().filter(|jet| jet.is_b_tagged()).count()
    }
    pub fn n_electrons(&self) -> usize {
        self.electrons.len()
    }
    pub fn n_muons(&self) -> usize {
        self.muons.len()
    }
    pub fn n_leptons(&self) -> usize {
        self.electrons.len() + self.muons.len()
    }
    /// The number of jets with $`p_T \geq`$ `pt`.
    pub fn n_jets_pt_above(&self, pt: f64) -> usize {
        self.jets().filter(|jet| jet.pt() >= pt).count()
    }
    /// The number of jets tagged at working point `wp` or tighter.
    pub fn n_b_jets_at(&self, wp: u8) -> usize {
        self.jets().filter(|jet| jet.passes_working_point(wp)).count()
    }
    /// The scalar sum of jet $`p_T`$.
    pub fn ht_had(&self) -> f64 {
        self.jets().map(PhysicsObject::pt).sum()
    }
    /// [`EventObjects::ht_had`] plus the lepton $`p_T`$ and the missing transverse energy.
    pub fn ht_all(&self) -> f64 {
        self.ht_had()
            + self.leptons().map(PhysicsObject::pt).sum::<f64>()
            + self.missing_energy().map(PhysicsObject::pt).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn table() -> EventObjects {
        let mut objects = EventObjects::new();
        let j0 = objects.push_jet(Vec4::from_pt_eta_phi_m(80.0, 0.1, 0.2, 8.0), 5);
        objects.push_jet(Vec4::from_pt_eta_phi_m(35.0, -1.0, 1.2, 4.0), 1);
        let j2 = objects.push_jet(Vec4::from_pt_eta_phi_m(25.0, 2.0, -2.2, 3.0), 4);
        objects.push_muon(Vec4::from_pt_eta_phi_m(30.0, 0.4, -0.5, 0.0));
        objects.push_electron(Vec4::from_pt_eta_phi_m(45.0, -0.2, 2.5, 0.0));
        objects.set_missing_energy(Vec4::from_pt_eta_phi_m(20.0, 0.0, 1.0, 0.0));
        objects.set_tag_level(j0, 4);
        objects.set_tag_level(j2, 1);
        objects
    }

    #[test]
    fn test_ids_follow_insertion_order() {
        let objects = table();
        assert_eq!(objects.len(), 6);
        for (index, object) in objects.objects().iter().enumerate() {
            assert_eq!(object.id, ObjectId(index));
        }
        assert_eq!(
            objects.missing_energy().map(|met| met.kind),
            Some(ObjectKind::MissingEnergy)
        );
    }

    #[test]
    fn test_leptons_are_electrons_then_muons() {
        let objects = table();
        let kinds: Vec<ObjectKind> = objects.leptons().map(|lep| lep.kind).collect();
        assert_eq!(kinds, vec![ObjectKind::Electron, ObjectKind::Muon]);
        assert_eq!(objects.n_leptons(), 2);
        assert_relative_eq!(objects.lepton(0).map(|l| l.pt()).unwrap(), 45.0, epsilon = 1e-10);
    }

    #[test]
    fn test_jet_counts() {
        let objects = table();
        assert_eq!(objects.n_jets(), 3);
        assert_eq!(objects.n_b_jets(), 2);
        assert_eq!(objects.light_jets().len(), 1);
        assert_eq!(objects.n_jets_pt_above(30.0), 2);
        assert_eq!(objects.n_jets_pt_above(80.0), 1);
        assert_eq!(objects.n_b_jets_at(1), 2);
        assert_eq!(objects.n_b_jets_at(2), 1);
        assert_eq!(objects.n_b_jets_at(5), 0);
    }

    #[test]
    fn test_ht() {
        let objects = table();
        assert_relative_eq!(objects.ht_had(), 140.0, epsilon = 1e-9);
        assert_relative_eq!(objects.ht_all(), 140.0 + 75.0 + 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_tag_levels_only_apply_to_jets() {
        let mut objects = table();
        let muon = objects.muons().next().map(|mu| mu.id).unwrap();
        objects.set_tag_level(muon, 3);
        let muon = objects.get(muon).unwrap();
        assert_eq!(muon.tag_level, None);
        assert_eq!(muon.tag_value(), -1.0);
        assert_eq!(objects.jet(0).unwrap().tag_value(), 4.0);
    }

    #[test]
    fn test_truth_particle_predicates() {
        let b = TruthParticle::new(50.0, 0.0, 0.0, 5, 6);
        let e = TruthParticle::new(30.0, 0.0, 0.0, 11, -24);
        assert!(b.is_from_top() && !b.is_from_antitop());
        assert!(e.is_from_w_minus() && !e.is_from_w_plus());
        assert_eq!(b.branch(), Some(TopBranch::Top));
        assert_eq!(e.branch(), Some(TopBranch::Antitop));
        assert_relative_eq!(b.p4.m(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_raw_truth_mothers() {
        let event = test_event();
        let w_plus = event.truth[4];
        assert_eq!(w_plus.mother1_index(), Some(2));
        assert!(w_plus.has_single_mother());
        let top = event.truth[2];
        assert!(!top.has_single_mother());
        assert_eq!(event.truth[0].mother1_index(), None);
        assert_relative_eq!(event.truth[5].pt(), 110.0, epsilon = 1e-10);
    }
}
