use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    data::{EventObjects, ObjectId, TruthParticle},
    utils::enums::TopBranch,
};

/// The default upper bound (exclusive) on $`\Delta R`$ for a match.
pub const DEFAULT_MAX_DELTA_R: f64 = 4.0;

/// A partial injective relation from reconstructed objects to truth particles.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TruthMatches {
    truth: Vec<TruthParticle>,
    pairs: IndexMap<ObjectId, usize>,
}

impl TruthMatches {
    /// The truth particles the relation refers to.
    pub fn truth(&self) -> &[TruthParticle] {
        &self.truth
    }
    /// The index into [`TruthMatches::truth`] matched to `id`.
    pub fn truth_index(&self, id: ObjectId) -> Option<usize> {
        self.pairs.get(&id).copied()
    }
    /// The truth particle matched to `id`.
    pub fn matched(&self, id: ObjectId) -> Option<&TruthParticle> {
        self.truth_index(id).and_then(|index| self.truth.get(index))
    }
    pub fn is_matched(&self, id: ObjectId) -> bool {
        self.pairs.contains_key(&id)
    }
    /// Match pairs in the order they were made.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &TruthParticle)> {
        self.pairs
            .iter()
            .filter_map(|(id, index)| self.truth.get(*index).map(|truth| (*id, truth)))
    }
    pub fn len(&self) -> usize {
        self.pairs.len()
    }
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// The top branch of the particle matched to `id`.
    pub fn branch(&self, id: ObjectId) -> Option<TopBranch> {
        self.matched(id).and_then(TruthParticle::branch)
    }

    /// Returns `true` if `a` and `b` are both matched to particles from the same top branch.
    pub fn from_common_top(&self, a: ObjectId, b: ObjectId) -> bool {
        match (self.branch(a), self.branch(b)) {
            (Some(branch_a), Some(branch_b)) => branch_a == branch_b,
            _ => false,
        }
    }

    /// Returns `true` if `top_jet` is matched to the prompt quark of a top and both `w_jet1` and
    /// `w_jet2` are matched to daughters of that top's $`W`$.
    pub fn from_common_w_of_same_top(
        &self,
        top_jet: ObjectId,
        w_jet1: ObjectId,
        w_jet2: ObjectId,
    ) -> bool {
        let w_parent = match self.matched(top_jet).map(|truth| truth.parent_pdg_id) {
            Some(6) => 24,
            Some(-6) => -24,
            _ => return false,
        };
        [w_jet1, w_jet2].into_iter().all(|id| {
            self.matched(id)
                .is_some_and(|truth| truth.parent_pdg_id == w_parent)
        })
    }
}

/// Matches reconstructed objects to flavor-compatible truth particles by angular distance.
///
/// Objects are visited in table order. Each takes its nearest available compatible truth
/// particle within `max_delta_r`, except that a candidate is passed over when any object later
/// in the table is compatible with it and strictly closer to it. A truth particle is removed
/// once matched.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TruthMatcher {
    pub max_delta_r: f64,
}

impl Default for TruthMatcher {
    fn default() -> Self {
        Self {
            max_delta_r: DEFAULT_MAX_DELTA_R,
        }
    }
}

impl TruthMatcher {
    pub fn new(max_delta_r: f64) -> Self {
        Self { max_delta_r }
    }

    pub fn match_objects(&self, objects: &EventObjects, truth: &[TruthParticle]) -> TruthMatches {
        let reco = objects.objects();
        let mut available: Vec<usize> = (0..truth.len()).collect();
        let mut pairs = IndexMap::new();
        for (position, object) in reco.iter().enumerate() {
            let mut best: Option<(usize, f64)> = None;
            for &index in &available {
                let candidate = &truth[index];
                if !object.kind.is_compatible_with(candidate.pdg_id) {
                    continue;
                }
                let dr = object.p4.delta_r(&candidate.p4);
                let bound = best.map_or(self.max_delta_r, |(_, best_dr)| best_dr);
                if dr >= bound {
                    continue;
                }
                let closer_later = reco[position + 1..].iter().any(|other| {
                    other.kind.is_compatible_with(candidate.pdg_id)
                        && other.p4.delta_r(&candidate.p4) < dr
                });
                if !closer_later {
                    best = Some((index, dr));
                }
            }
            if let Some((index, _)) = best {
                pairs.insert(object.id, index);
                available.retain(|&other| other != index);
            }
        }
        TruthMatches {
            truth: truth.to_vec(),
            pairs,
        }
    }
}

#[cfg(test)]
mod tests {
    use fastrand::Rng;

    use super::*;
    use crate::{
        data::test_event, selection::ObjectSelector, truth::TruthDecayClassifier,
        utils::vectors::Vec4,
    };

    fn jet(eta: f64, phi: f64) -> Vec4 {
        Vec4::from_pt_eta_phi_m(50.0, eta, phi, 5.0)
    }

    fn quark(eta: f64, phi: f64, pdg_id: i32) -> TruthParticle {
        TruthParticle::new(50.0, eta, phi, pdg_id, 24)
    }

    #[test]
    fn test_event_matching() {
        let event = test_event();
        let objects = ObjectSelector::default().select(&event).unwrap();
        let truth = TruthDecayClassifier::default().classify(&event.truth).unwrap();
        let matches = TruthMatcher::default().match_objects(&objects, &truth.particles);
        let matched_pdg: Vec<Option<i32>> = objects
            .objects()
            .iter()
            .map(|object| matches.matched(object.id).map(|t| t.pdg_id))
            .collect();
        // five jets, one electron, missing energy
        assert_eq!(
            matched_pdg,
            vec![Some(5), Some(2), Some(-5), Some(-1), None, Some(11), None]
        );
        assert_eq!(matches.len(), 5);
    }

    #[test]
    fn test_closer_later_object_keeps_its_match() {
        let mut objects = EventObjects::new();
        let j0 = objects.push_jet(jet(0.0, 0.0), 1);
        let j1 = objects.push_jet(jet(0.35, 0.0), 1);
        let truth = [quark(0.3, 0.0, 1), quark(-0.6, 0.0, -3)];
        let matches = TruthMatcher::default().match_objects(&objects, &truth);
        assert_eq!(matches.truth_index(j0), Some(1));
        assert_eq!(matches.truth_index(j1), Some(0));
    }

    #[test]
    fn test_incompatible_flavors_never_match() {
        let mut objects = EventObjects::new();
        let el = objects.push_electron(jet(0.0, 0.0));
        let mu = objects.push_muon(jet(1.0, 1.0));
        objects.set_missing_energy(Vec4::from_pt_eta_phi_m(30.0, 0.0, 0.0, 0.0));
        let truth = [
            quark(0.0, 0.0, 2),
            quark(1.0, 1.0, 11),
            TruthParticle::new(30.0, 0.0, 0.0, 12, 24),
        ];
        let matches = TruthMatcher::default().match_objects(&objects, &truth);
        assert_eq!(matches.matched(el).map(|t| t.pdg_id), Some(11));
        assert!(!matches.is_matched(mu));
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn test_delta_r_threshold() {
        let mut objects = EventObjects::new();
        let j0 = objects.push_jet(jet(0.0, 0.0), 5);
        let far = [quark(4.01, 0.0, 5)];
        assert!(TruthMatcher::default()
            .match_objects(&objects, &far)
            .is_empty());
        let near = [quark(3.9, 0.0, 5)];
        assert!(TruthMatcher::default()
            .match_objects(&objects, &near)
            .is_matched(j0));
        assert!(TruthMatcher::new(0.5)
            .match_objects(&objects, &near)
            .is_empty());
    }

    #[test]
    fn test_matching_is_injective_and_stable() {
        let mut rng = Rng::with_seed(8675309);
        let pdg_ids = [1, -1, 2, -3, 5, -5, 11, 13];
        for _ in 0..500 {
            let mut objects = EventObjects::new();
            for _ in 0..rng.usize(0..7) {
                objects.push_jet(jet(rng.f64() * 5.0 - 2.5, rng.f64() * 6.0 - 3.0), 0);
            }
            for _ in 0..rng.usize(0..3) {
                objects.push_electron(jet(rng.f64() * 5.0 - 2.5, rng.f64() * 6.0 - 3.0));
            }
            for _ in 0..rng.usize(0..3) {
                objects.push_muon(jet(rng.f64() * 5.0 - 2.5, rng.f64() * 6.0 - 3.0));
            }
            let truth: Vec<TruthParticle> = (0..rng.usize(0..7))
                .map(|_| {
                    quark(
                        rng.f64() * 5.0 - 2.5,
                        rng.f64() * 6.0 - 3.0,
                        pdg_ids[rng.usize(0..pdg_ids.len())],
                    )
                })
                .collect();
            let matches = TruthMatcher::default().match_objects(&objects, &truth);

            let mut used: Vec<usize> = objects
                .objects()
                .iter()
                .filter_map(|object| matches.truth_index(object.id))
                .collect();
            let n_matched = used.len();
            used.sort_unstable();
            used.dedup();
            assert_eq!(used.len(), n_matched);

            let reco = objects.objects();
            for (position, object) in reco.iter().enumerate() {
                let Some(truth) = matches.matched(object.id) else {
                    continue;
                };
                assert!(object.kind.is_compatible_with(truth.pdg_id));
                let dr = object.p4.delta_r(&truth.p4);
                assert!(dr < DEFAULT_MAX_DELTA_R);
                for other in &reco[position + 1..] {
                    assert!(
                        !(other.kind.is_compatible_with(truth.pdg_id)
                            && other.p4.delta_r(&truth.p4) < dr)
                    );
                }
            }
        }
    }

    #[test]
    fn test_branch_helpers() {
        let mut objects = EventObjects::new();
        let top_jet = objects.push_jet(jet(0.0, 0.0), 5);
        let w1 = objects.push_jet(jet(1.0, 1.5), 2);
        let w2 = objects.push_jet(jet(-1.0, -1.5), 1);
        let lep_jet = objects.push_jet(jet(2.0, 3.0), 5);
        let lep = objects.push_muon(jet(-2.0, 2.5));
        let truth = [
            TruthParticle::new(50.0, 0.0, 0.0, 5, 6),
            TruthParticle::new(50.0, 1.0, 1.5, 2, 24),
            TruthParticle::new(50.0, -1.0, -1.5, -1, 24),
            TruthParticle::new(50.0, 2.0, 3.0, -5, -6),
            TruthParticle::new(50.0, -2.0, 2.5, 13, -24),
        ];
        let matches = TruthMatcher::default().match_objects(&objects, &truth);
        assert!(matches.from_common_w_of_same_top(top_jet, w1, w2));
        assert!(!matches.from_common_w_of_same_top(lep_jet, w1, w2));
        assert!(!matches.from_common_w_of_same_top(w1, top_jet, w2));
        assert!(matches.from_common_top(lep_jet, lep));
        assert!(!matches.from_common_top(top_jet, lep));
        assert!(matches.from_common_top(top_jet, w2));
    }
}
