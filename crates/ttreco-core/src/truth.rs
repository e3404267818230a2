use serde::{Deserialize, Serialize};

use crate::{
    data::{RawTruthParticle, TruthParticle},
    utils::enums::{DecaySlot, TopDecay, TruthSelection, WDecay},
    RecoError, RecoResult,
};

/// The generator status code of hard-process (pre-shower) particles.
pub const HARD_PROCESS_STATUS: i32 = 3;
/// The maximum number of visible decay-chain particles in a $`t\bar{t}`$ event.
pub const MAX_DECAY_PARTICLES: usize = 6;

/// The decay of each of the four slots of a $`t\bar{t}`$ chain.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecayClassification {
    pub top: TopDecay,
    pub antitop: TopDecay,
    pub w_plus: WDecay,
    pub w_minus: WDecay,
}

impl DecayClassification {
    /// The numeric codes of `(top, antitop, W+, W-)`.
    pub fn codes(&self) -> [u8; 4] {
        [
            self.top.code(),
            self.antitop.code(),
            self.w_plus.code(),
            self.w_minus.code(),
        ]
    }

    fn assign_top(&mut self, slot: DecaySlot, decay: TopDecay) -> RecoResult<()> {
        let current = match slot {
            DecaySlot::Top => &mut self.top,
            _ => &mut self.antitop,
        };
        if *current != TopDecay::Undefined {
            return Err(RecoError::DuplicateDecaySlot { slot });
        }
        *current = decay;
        Ok(())
    }

    fn assign_w(&mut self, slot: DecaySlot, decay: WDecay) -> RecoResult<()> {
        let current = match slot {
            DecaySlot::WPlus => &mut self.w_plus,
            _ => &mut self.w_minus,
        };
        let existing = *current;
        match existing {
            WDecay::Undefined => *current = decay,
            first if first == decay => {}
            first => {
                return Err(RecoError::ConflictingWDecay {
                    slot,
                    first,
                    second: decay,
                })
            }
        }
        Ok(())
    }

    /// The first slot left undefined, if any.
    pub fn unresolved(&self) -> Option<DecaySlot> {
        if self.top == TopDecay::Undefined {
            Some(DecaySlot::Top)
        } else if self.antitop == TopDecay::Undefined {
            Some(DecaySlot::Antitop)
        } else if self.w_plus == WDecay::Undefined {
            Some(DecaySlot::WPlus)
        } else if self.w_minus == WDecay::Undefined {
            Some(DecaySlot::WMinus)
        } else {
            None
        }
    }

    /// Returns `true` when exactly one $`W`$ decays hadronically and the other to $`e\nu`$ or
    /// $`\mu\nu`$.
    pub fn is_semileptonic(&self) -> bool {
        (self.w_plus == WDecay::Jets && self.w_minus.is_light_lepton())
            || (self.w_minus == WDecay::Jets && self.w_plus.is_light_lepton())
    }
}

/// The classified decay chain plus the visible decay products used for matching.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TruthRecord {
    pub classification: DecayClassification,
    /// Prompt quarks from the top branches and visible $`W`$ daughters, in record order.
    pub particles: Vec<TruthParticle>,
}

impl TruthRecord {
    /// All quarks (prompt top-branch quarks and hadronic $`W`$ daughters).
    pub fn jets(&self) -> impl Iterator<Item = &TruthParticle> {
        self.particles.iter().filter(|p| p.pdg_id.abs() <= 6)
    }
    /// Prompt $`b`$ quarks from the top branches.
    pub fn b_quarks(&self) -> impl Iterator<Item = &TruthParticle> {
        self.particles
            .iter()
            .filter(|p| p.pdg_id.abs() == 5 && p.parent_pdg_id.abs() == 6)
    }
    pub fn electrons(&self) -> impl Iterator<Item = &TruthParticle> {
        self.particles.iter().filter(|p| p.pdg_id.abs() == 11)
    }
    pub fn muons(&self) -> impl Iterator<Item = &TruthParticle> {
        self.particles.iter().filter(|p| p.pdg_id.abs() == 13)
    }
}

/// Walks the generator record and classifies the $`t\bar{t}`$ decay chain.
///
/// Only the leading block of hard-process particles is inspected; the scan stops at the first
/// particle with any other status. Of those, only direct decay products (one mother) are
/// considered:
///
/// - a $`d`$, $`s`$ or $`b`$ quark from a $`t`$ fills the top slot ($`\bar{d}`$, $`\bar{s}`$ or
///   $`\bar{b}`$ from a $`\bar{t}`$ fills the antitop slot);
/// - a daughter of a $`W^\pm`$ whose single mother is the same-sign top fills the $`W`$ slot
///   with the channel implied by the daughter's flavor; neutrinos are skipped.
///
/// # Errors
///
/// Every event must hold exactly one such chain. Filling a top slot twice, daughters disagreeing
/// on a $`W`$ channel, a $`W`$ daughter outside the known channels, a dangling mother reference,
/// any slot left undefined, or more particles than allowed are reported as data-integrity
/// errors.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruthDecayClassifier {
    pub hard_process_status: i32,
    pub max_particles: usize,
}

impl Default for TruthDecayClassifier {
    fn default() -> Self {
        Self {
            hard_process_status: HARD_PROCESS_STATUS,
            max_particles: MAX_DECAY_PARTICLES,
        }
    }
}

impl TruthDecayClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hard-process status code (defaults to 3).
    pub fn hard_process_status(mut self, status: i32) -> Self {
        self.hard_process_status = status;
        self
    }

    /// Set the maximum number of stored decay-chain particles (defaults to 6).
    pub fn max_particles(mut self, max: usize) -> Self {
        self.max_particles = max;
        self
    }

    fn mother<'a>(
        record: &'a [RawTruthParticle],
        index: usize,
    ) -> RecoResult<Option<&'a RawTruthParticle>> {
        let particle = &record[index];
        match particle.mother1_index() {
            None => Ok(None),
            Some(mother) => record
                .get(mother)
                .map(Some)
                .ok_or(RecoError::InvalidMotherIndex {
                    index,
                    mother: particle.mother1,
                }),
        }
    }

    pub fn classify(&self, record: &[RawTruthParticle]) -> RecoResult<TruthRecord> {
        let mut classification = DecayClassification::default();
        let mut particles = Vec::new();
        for (index, particle) in record.iter().enumerate() {
            if particle.status != self.hard_process_status {
                break;
            }
            if !particle.has_single_mother() {
                continue;
            }
            let Some(mother) = Self::mother(record, index)? else {
                continue;
            };
            let pdg_id = particle.pdg_id;
            let parent_pdg_id = mother.pdg_id;
            let truth = || {
                TruthParticle::new(particle.pt(), particle.eta, particle.phi, pdg_id, parent_pdg_id)
            };
            match (pdg_id, parent_pdg_id) {
                (5 | 3 | 1, 6) | (-5 | -3 | -1, -6) => {
                    let slot = if parent_pdg_id > 0 {
                        DecaySlot::Top
                    } else {
                        DecaySlot::Antitop
                    };
                    let decay = if pdg_id.abs() == 5 {
                        TopDecay::WB
                    } else {
                        TopDecay::WLight
                    };
                    classification.assign_top(slot, decay)?;
                    particles.push(truth());
                }
                (_, 24 | -24) => {
                    if !mother.has_single_mother() {
                        continue;
                    }
                    let Some(w_index) = particle.mother1_index() else {
                        continue;
                    };
                    let Some(grandmother) = Self::mother(record, w_index)? else {
                        continue;
                    };
                    if grandmother.pdg_id != 6 * parent_pdg_id.signum() {
                        continue;
                    }
                    let Some(channel) = WDecay::from_daughter(pdg_id)? else {
                        continue;
                    };
                    let slot = if parent_pdg_id > 0 {
                        DecaySlot::WPlus
                    } else {
                        DecaySlot::WMinus
                    };
                    classification.assign_w(slot, channel)?;
                    particles.push(truth());
                }
                _ => {}
            }
        }
        if let Some(slot) = classification.unresolved() {
            return Err(RecoError::UnresolvedDecaySlot { slot });
        }
        if particles.len() > self.max_particles {
            return Err(RecoError::TruthRecordOverflow {
                count: particles.len(),
                max: self.max_particles,
            });
        }
        Ok(TruthRecord {
            classification,
            particles,
        })
    }
}

impl TruthSelection {
    /// Whether the classified decay satisfies this selection.
    pub fn passes(&self, classification: &DecayClassification) -> bool {
        let (wp, wm) = (classification.w_plus, classification.w_minus);
        match self {
            TruthSelection::None => true,
            TruthSelection::LeptonPlusJets => {
                (wp.is_light_lepton() || wm.is_light_lepton())
                    && (wp == WDecay::Jets || wm == WDecay::Jets)
            }
            TruthSelection::AllHadronic => wp == WDecay::Jets && wm == WDecay::Jets,
            TruthSelection::Dilepton => {
                !matches!(wp, WDecay::Jets | WDecay::TauNu)
                    && !matches!(wm, WDecay::Jets | WDecay::TauNu)
            }
        }
    }
}
