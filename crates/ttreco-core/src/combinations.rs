use serde::{Deserialize, Serialize};

use crate::{
    data::{EventObjects, PhysicsObject},
    matching::TruthMatches,
};

/// The default number of leading jets that take part in the enumeration.
pub const DEFAULT_MAX_JETS: usize = 6;

/// An assignment of four distinct jets (indices into the event's jet list) to the
/// semi-leptonic decay roles.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JetAssignment {
    /// The $`b`$ jet of the leptonically decaying top.
    pub lep_top_jet: usize,
    /// The $`b`$ jet of the hadronically decaying top.
    pub had_top_jet: usize,
    /// The first jet of the hadronic $`W`$ (always the lower index of the pair).
    pub had_w_jet1: usize,
    /// The second jet of the hadronic $`W`$.
    pub had_w_jet2: usize,
}

impl JetAssignment {
    pub fn indices(&self) -> [usize; 4] {
        [
            self.lep_top_jet,
            self.had_top_jet,
            self.had_w_jet1,
            self.had_w_jet2,
        ]
    }
}

/// One candidate reconstruction of a semi-leptonic event.
///
/// Both neutrino solutions are carried, so a combination describes the leptonic top under
/// either $`p_z`$ choice.
#[derive(Copy, Clone, Debug)]
pub struct Combination<'a> {
    /// The position of this combination in the enumeration order.
    pub comb_id: usize,
    pub assignment: JetAssignment,
    pub lep_top_jet: &'a PhysicsObject,
    pub had_top_jet: &'a PhysicsObject,
    pub had_w_jet1: &'a PhysicsObject,
    pub had_w_jet2: &'a PhysicsObject,
    pub lepton: &'a PhysicsObject,
    /// Neutrino candidates ordered as the solver returned them.
    pub neutrinos: [&'a PhysicsObject; 2],
    /// Whether this assignment is the truth-matched $`t\bar{t}`$ decay.
    pub is_signal: bool,
}

impl Combination<'_> {
    /// The four role jets as `(lepTopJet, hadTopJet, hadWJet1, hadWJet2)`.
    pub fn jets(&self) -> [&PhysicsObject; 4] {
        [
            self.lep_top_jet,
            self.had_top_jet,
            self.had_w_jet1,
            self.had_w_jet2,
        ]
    }
    /// The number of top-decay jets (leptonic and hadronic $`b`$ candidates) tagged at `wp`.
    pub fn n_btags_ttbar_decay(&self, wp: u8) -> usize {
        [self.lep_top_jet, self.had_top_jet]
            .iter()
            .filter(|jet| jet.passes_working_point(wp))
            .count()
    }
    /// The number of the four role jets tagged at `wp`.
    pub fn n_btags_ttbar(&self, wp: u8) -> usize {
        self.jets()
            .iter()
            .filter(|jet| jet.passes_working_point(wp))
            .count()
    }
}

/// Enumerates every assignment of selected jets to the semi-leptonic decay roles.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinationEnumerator {
    /// Only the leading `max_jets` jets participate.
    pub max_jets: usize,
}

impl Default for CombinationEnumerator {
    fn default() -> Self {
        Self {
            max_jets: DEFAULT_MAX_JETS,
        }
    }
}

impl CombinationEnumerator {
    pub fn new(max_jets: usize) -> Self {
        Self { max_jets }
    }

    /// The number of assignments for `n_jets` selected jets, $`n(n-1)\binom{n-2}{2}`$ with
    /// $`n = \min(n_{jets}, n_{max})`$.
    pub fn n_combinations(&self, n_jets: usize) -> usize {
        let n = n_jets.min(self.max_jets);
        if n < 4 {
            return 0;
        }
        n * (n - 1) * (n - 2) * (n - 3) / 2
    }

    /// Every assignment for `n_jets` selected jets.
    ///
    /// The order is fixed: the leptonic-top jet varies slowest, then the hadronic-top jet, then
    /// the hadronic $`W`$ pair.
    pub fn assignments(&self, n_jets: usize) -> Vec<JetAssignment> {
        let n = n_jets.min(self.max_jets);
        let mut assignments = Vec::with_capacity(self.n_combinations(n));
        for lep_top_jet in 0..n {
            for had_top_jet in (0..n).filter(|&j| j != lep_top_jet) {
                for had_w_jet1 in 0..n.saturating_sub(1) {
                    if had_w_jet1 == lep_top_jet || had_w_jet1 == had_top_jet {
                        continue;
                    }
                    for had_w_jet2 in had_w_jet1 + 1..n {
                        if had_w_jet2 == lep_top_jet || had_w_jet2 == had_top_jet {
                            continue;
                        }
                        assignments.push(JetAssignment {
                            lep_top_jet,
                            had_top_jet,
                            had_w_jet1,
                            had_w_jet2,
                        });
                    }
                }
            }
        }
        assignments
    }

    /// Build every [`Combination`] of an event.
    ///
    /// The event needs a lepton and two neutrino candidates; otherwise no combination exists.
    /// `matches` must come from matching the same `objects`.
    pub fn enumerate<'a>(
        &self,
        objects: &'a EventObjects,
        matches: &TruthMatches,
    ) -> Vec<Combination<'a>> {
        let (Some(lepton), Some(nu1), Some(nu2)) =
            (objects.lepton(0), objects.neutrino(0), objects.neutrino(1))
        else {
            return Vec::new();
        };
        let jets: Vec<&PhysicsObject> = objects.jets().collect();
        self.assignments(jets.len())
            .into_iter()
            .enumerate()
            .map(|(comb_id, assignment)| {
                let [lep_top_jet, had_top_jet, had_w_jet1, had_w_jet2] =
                    assignment.indices().map(|index| jets[index]);
                let is_signal = matches.from_common_w_of_same_top(
                    had_top_jet.id,
                    had_w_jet1.id,
                    had_w_jet2.id,
                ) && matches.from_common_top(lep_top_jet.id, lepton.id);
                Combination {
                    comb_id,
                    assignment,
                    lep_top_jet,
                    had_top_jet,
                    had_w_jet1,
                    had_w_jet2,
                    lepton,
                    neutrinos: [nu1, nu2],
                    is_signal,
                }
            })
            .collect()
    }
}
