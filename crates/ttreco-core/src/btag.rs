use std::fmt::Display;

use fastrand::Rng;
use serde::{Deserialize, Serialize};

use crate::data::EventObjects;

/// The number of nested b-tagging working points.
pub const N_WORKING_POINTS: usize = 5;

/// The jet flavor classes with distinct tagging efficiencies.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlavorClass {
    /// Jets from bottom quarks (PDG id $`\pm 5`$).
    B,
    /// Jets from charm quarks (PDG id $`\pm 4`$).
    C,
    /// Any other flavor label.
    Light,
}

impl FlavorClass {
    pub fn from_flavor(flavor: i32) -> Self {
        match flavor.abs() {
            5 => FlavorClass::B,
            4 => FlavorClass::C,
            _ => FlavorClass::Light,
        }
    }
}

impl Display for FlavorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlavorClass::B => write!(f, "b"),
            FlavorClass::C => write!(f, "c"),
            FlavorClass::Light => write!(f, "light"),
        }
    }
}

/// A tagging efficiency as a function of jet $`p_T`$ (GeV).
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EfficiencyCurve {
    /// $`a \tanh(r p_T) \cdot \frac{n}{1 + f p_T}`$: a turn-on that saturates and then falls.
    Saturating { a: f64, r: f64, n: f64, f: f64 },
    /// $`a \cdot s \cdot p_T`$.
    Linear { a: f64, s: f64 },
}

impl EfficiencyCurve {
    const fn saturating(a: f64, r: f64, n: f64, f: f64) -> Self {
        Self::Saturating { a, r, n, f }
    }
    const fn linear(a: f64, s: f64) -> Self {
        Self::Linear { a, s }
    }

    /// The efficiency at `pt`, clamped into $`[0, 1]`$.
    pub fn evaluate(&self, pt: f64) -> f64 {
        let eff = match *self {
            EfficiencyCurve::Saturating { a, r, n, f } => a * (r * pt).tanh() * n / (1.0 + f * pt),
            EfficiencyCurve::Linear { a, s } => a * s * pt,
        };
        eff.clamp(0.0, 1.0)
    }
}

/// Emulates a b-tagger with five nested working points, loosest first.
///
/// A jet's tag level is decided by a single correlated cascade: it reaches working point 1 with
/// probability $`\epsilon_1`$, and each further level $`k+1`$ is reached from level $`k`$ with the
/// conditional probability $`\epsilon_{k+1}/\epsilon_k`$. A tag at level $`k`$ therefore implies
/// a tag at every looser level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BTagEmulator {
    /// Efficiency curves for b-jets.
    pub b: [EfficiencyCurve; N_WORKING_POINTS],
    /// Efficiency curves for c-jets.
    pub c: [EfficiencyCurve; N_WORKING_POINTS],
    /// Efficiency curves for light jets.
    pub light: [EfficiencyCurve; N_WORKING_POINTS],
}

impl Default for BTagEmulator {
    fn default() -> Self {
        Self {
            b: [
                EfficiencyCurve::saturating(0.85, 0.0026, 30.0, 0.063),
                EfficiencyCurve::saturating(0.84, 0.0025, 28.0, 0.068),
                EfficiencyCurve::saturating(0.82, 0.0024, 27.0, 0.07),
                EfficiencyCurve::saturating(0.75, 0.0023, 25.0, 0.072),
                EfficiencyCurve::saturating(0.7, 0.0022, 25.0, 0.077),
            ],
            c: [
                EfficiencyCurve::saturating(0.25, 0.018, 1.0, 0.0013),
                EfficiencyCurve::saturating(0.24, 0.016, 1.0, 0.0012),
                EfficiencyCurve::saturating(0.23, 0.014, 1.0, 0.0011),
                EfficiencyCurve::saturating(0.22, 0.011, 1.0, 0.0010),
                EfficiencyCurve::saturating(0.20, 0.008, 1.0, 0.0009),
            ],
            light: [
                EfficiencyCurve::linear(0.01, 0.00038),
                EfficiencyCurve::linear(0.008, 0.00036),
                EfficiencyCurve::linear(0.006, 0.0003),
                EfficiencyCurve::linear(0.003, 0.00025),
                EfficiencyCurve::linear(0.001, 0.0001),
            ],
        }
    }
}

impl BTagEmulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn curves(&self, class: FlavorClass) -> &[EfficiencyCurve; N_WORKING_POINTS] {
        match class {
            FlavorClass::B => &self.b,
            FlavorClass::C => &self.c,
            FlavorClass::Light => &self.light,
        }
    }

    /// The efficiency of each working point for a jet, loosest first.
    pub fn efficiencies(&self, pt: f64, flavor: i32) -> [f64; N_WORKING_POINTS] {
        self.curves(FlavorClass::from_flavor(flavor))
            .map(|curve| curve.evaluate(pt))
    }

    /// Draw the tag level (0 = untagged, 5 = tightest) of a jet.
    ///
    /// `rng` must be the job's generator; one uniform is drawn per cascade step.
    pub fn tag_level(&self, pt: f64, flavor: i32, rng: &mut Rng) -> u8 {
        let mut level = 0;
        let mut reached = 1.0;
        for eff in self.efficiencies(pt, flavor) {
            let threshold = if reached > 0.0 { eff / reached } else { 0.0 };
            if rng.f64() >= threshold {
                break;
            }
            level += 1;
            reached = eff;
        }
        level
    }

    /// Tag every jet of an event in jet order.
    pub fn tag_jets(&self, objects: &mut EventObjects, rng: &mut Rng) {
        let jets: Vec<_> = objects
            .jets()
            .map(|jet| (jet.id, jet.pt(), jet.flavor.unwrap_or(0)))
            .collect();
        for (id, pt, flavor) in jets {
            let level = self.tag_level(pt, flavor, rng);
            objects.set_tag_level(id, level);
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::utils::vectors::Vec4;

    #[test]
    fn test_flavor_classes() {
        assert_eq!(FlavorClass::from_flavor(5), FlavorClass::B);
        assert_eq!(FlavorClass::from_flavor(-5), FlavorClass::B);
        assert_eq!(FlavorClass::from_flavor(-4), FlavorClass::C);
        assert_eq!(FlavorClass::from_flavor(21), FlavorClass::Light);
        assert_eq!(FlavorClass::from_flavor(0), FlavorClass::Light);
    }

    #[test]
    fn test_nominal_efficiencies() {
        let emulator = BTagEmulator::default();
        let b = emulator.efficiencies(100.0, 5);
        assert_relative_eq!(b[0], 0.85 * 0.26_f64.tanh() * 30.0 / 7.3, epsilon = 1e-12);
        let c = emulator.efficiencies(50.0, 4);
        assert_relative_eq!(c[4], 0.20 * 0.4_f64.tanh() / 1.045, epsilon = 1e-12);
        let light = emulator.efficiencies(100.0, 1);
        assert_relative_eq!(light[0], 0.01 * 0.038, epsilon = 1e-15);
    }

    #[test]
    fn test_efficiencies_decrease_with_tightness() {
        let emulator = BTagEmulator::default();
        for flavor in [5, 4, 0] {
            for pt in [20.0, 35.0, 50.0, 100.0, 200.0, 500.0] {
                let eff = emulator.efficiencies(pt, flavor);
                for pair in eff.windows(2) {
                    assert!(pair[0] >= pair[1], "flavor {flavor}, pt {pt}: {eff:?}");
                }
            }
        }
    }

    #[test]
    fn test_tag_levels_are_bounded() {
        let emulator = BTagEmulator::default();
        let mut rng = Rng::with_seed(8675309);
        for _ in 0..10_000 {
            for flavor in [5, 4, 1] {
                let pt = 20.0 + 480.0 * rng.f64();
                assert!(emulator.tag_level(pt, flavor, &mut rng) <= 5);
            }
        }
    }

    #[test]
    fn test_cascade_reproduces_working_point_efficiencies() {
        let emulator = BTagEmulator::default();
        let mut rng = Rng::with_seed(1);
        let n = 200_000;
        let mut at_least = [0usize; N_WORKING_POINTS + 1];
        for _ in 0..n {
            let level = emulator.tag_level(100.0, 5, &mut rng) as usize;
            for count in at_least.iter_mut().take(level + 1) {
                *count += 1;
            }
        }
        assert_eq!(at_least[0], n);
        let eff = emulator.efficiencies(100.0, 5);
        for k in 1..=N_WORKING_POINTS {
            // inclusion: every tag at level k is also a tag at level k - 1
            assert!(at_least[k] <= at_least[k - 1]);
            let rate = at_least[k] as f64 / n as f64;
            assert_relative_eq!(rate, eff[k - 1], epsilon = 0.01);
        }
    }

    #[test]
    fn test_same_seed_same_tags() {
        let emulator = BTagEmulator::default();
        let draw = |seed| {
            let mut rng = Rng::with_seed(seed);
            (0..100)
                .map(|i| emulator.tag_level(30.0 + i as f64, 5, &mut rng))
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(8675309), draw(8675309));
        assert_ne!(draw(8675309), draw(42));
    }

    #[test]
    fn test_zero_efficiency_never_tags() {
        let emulator = BTagEmulator::default();
        let mut rng = Rng::with_seed(3);
        for _ in 0..1000 {
            assert_eq!(emulator.tag_level(0.0, 5, &mut rng), 0);
        }
    }

    #[test]
    fn test_tag_jets() {
        let mut objects = EventObjects::new();
        objects.push_jet(Vec4::from_pt_eta_phi_m(100.0, 0.0, 0.0, 5.0), 5);
        objects.push_jet(Vec4::from_pt_eta_phi_m(60.0, 1.0, 2.0, 5.0), 1);
        objects.push_electron(Vec4::from_pt_eta_phi_m(40.0, 0.0, 1.0, 0.0));
        let mut rng = Rng::with_seed(8675309);
        BTagEmulator::default().tag_jets(&mut objects, &mut rng);
        assert!(objects.jets().all(|jet| jet.tag_level.is_some()));
        assert!(objects.leptons().all(|lep| lep.tag_level.is_none()));
    }
}
