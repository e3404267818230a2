use serde::{Deserialize, Serialize};

use crate::{utils::vectors::Vec4, W_MASS};

/// One neutrino candidate: the missing transverse momentum with a longitudinal component.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NeutrinoSolution {
    /// The massless four-momentum $`(p_x^{miss}, p_y^{miss}, p_z, |\vec{p}|)`$.
    pub p4: Vec4,
    pub pz: f64,
    /// $`\frac{1}{2}\ln\frac{E + p_z}{E - p_z}`$ (0 for the null vector).
    pub eta: f64,
}

impl NeutrinoSolution {
    fn new(pvx: f64, pvy: f64, pz: f64) -> Self {
        let e = (pvx * pvx + pvy * pvy + pz * pz).sqrt();
        let p4 = Vec4::new(pvx, pvy, pz, e);
        Self {
            p4,
            pz,
            eta: p4.eta(),
        }
    }
}

/// Both roots of the $`W`$ mass constraint, ordered by decreasing $`|p_z|`$.
///
/// When the quadratic has no real root, `solved` is `false` and both solutions carry $`p_z = 0`$.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NeutrinoSolutions {
    pub solved: bool,
    pub solutions: [NeutrinoSolution; 2],
}

impl NeutrinoSolutions {
    pub fn p4s(&self) -> [Vec4; 2] {
        self.solutions.map(|solution| solution.p4)
    }
}

/// Solves for the neutrino $`p_z`$ such that the lepton-neutrino system has the $`W`$ mass.
///
/// With $`\psi = \frac{1}{2}m_W^2 + p_x^\ell p_x^\nu + p_y^\ell p_y^\nu`$ the constraint becomes
///
/// ```math
/// (E_\ell^2 - p_{z,\ell}^2)\,p_{z,\nu}^2 - 2 p_{z,\ell}\psi\, p_{z,\nu}
///     + E_\ell^2 (p_{x,\nu}^2 + p_{y,\nu}^2) - \psi^2 = 0
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NeutrinoReconstructor {
    pub w_mass: f64,
}

impl Default for NeutrinoReconstructor {
    fn default() -> Self {
        Self { w_mass: W_MASS }
    }
}

impl NeutrinoReconstructor {
    pub fn new(w_mass: f64) -> Self {
        Self { w_mass }
    }

    /// Solve for the two neutrino candidates of a lepton and the missing transverse momentum
    /// `met` (only its $`x`$ and $`y`$ components are used).
    pub fn solve(&self, lepton: &Vec4, met: &Vec4) -> NeutrinoSolutions {
        let (pvx, pvy) = (met.px(), met.py());
        let e_lep = lepton.e();
        let plz = lepton.pz();
        let psi = 0.5 * self.w_mass * self.w_mass + lepton.px() * pvx + lepton.py() * pvy;
        let a = e_lep * e_lep - plz * plz;
        let b = -2.0 * plz * psi;
        let c = e_lep * e_lep * (pvx * pvx + pvy * pvy) - psi * psi;
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 || a <= 0.0 {
            let transverse = NeutrinoSolution::new(pvx, pvy, 0.0);
            return NeutrinoSolutions {
                solved: false,
                solutions: [transverse; 2],
            };
        }
        let root = discriminant.sqrt();
        let mut pz1 = (-b + root) / (2.0 * a);
        let mut pz2 = (-b - root) / (2.0 * a);
        if pz2.abs() > pz1.abs() {
            std::mem::swap(&mut pz1, &mut pz2);
        }
        NeutrinoSolutions {
            solved: true,
            solutions: [
                NeutrinoSolution::new(pvx, pvy, pz1),
                NeutrinoSolution::new(pvx, pvy, pz2),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn met(px: f64, py: f64) -> Vec4 {
        Vec4::new(px, py, 0.0, px.hypot(py))
    }

    #[test]
    fn test_both_roots_reproduce_w_mass() {
        let lepton = Vec4::from_pt_eta_phi_m(50.0, 0.1, 0.0, 0.0);
        let solutions = NeutrinoReconstructor::default().solve(&lepton, &met(20.0, 30.0));
        assert!(solutions.solved);
        for solution in solutions.solutions {
            assert_relative_eq!((lepton + solution.p4).m(), W_MASS, epsilon = 1e-6);
            assert_relative_eq!(solution.p4.px(), 20.0);
            assert_relative_eq!(solution.p4.py(), 30.0);
        }
        let [first, second] = solutions.solutions;
        assert!(first.pz.abs() >= second.pz.abs());
        assert_relative_eq!(first.pz, 85.4376, epsilon = 1e-3);
        assert_relative_eq!(second.pz, -68.4814, epsilon = 1e-3);
    }

    #[test]
    fn test_eta_matches_momentum() {
        let lepton = Vec4::from_pt_eta_phi_m(35.0, -1.2, 2.0, 0.0);
        let solutions = NeutrinoReconstructor::default().solve(&lepton, &met(-15.0, 25.0));
        assert!(solutions.solved);
        for solution in solutions.solutions {
            assert_relative_eq!(solution.eta, solution.p4.eta(), epsilon = 1e-9);
            assert_relative_eq!(solution.p4.m(), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_negative_discriminant_falls_back_to_transverse() {
        let lepton = Vec4::from_pt_eta_phi_m(50.0, 0.1, 0.0, 0.0);
        let solutions = NeutrinoReconstructor::default().solve(&lepton, &met(-200.0, 0.0));
        assert!(!solutions.solved);
        for solution in solutions.solutions {
            assert_eq!(solution.pz, 0.0);
            assert_eq!(solution.eta, 0.0);
            assert_relative_eq!(solution.p4.pt(), 200.0);
        }
    }

    #[test]
    fn test_beam_axis_lepton_without_met() {
        let lepton = Vec4::new(0.0, 0.0, 30.0, 30.0);
        let solutions = NeutrinoReconstructor::default().solve(&lepton, &met(0.0, 0.0));
        assert!(!solutions.solved);
        for solution in solutions.solutions {
            assert_eq!(solution.pz, 0.0);
            assert_eq!(solution.eta, 0.0);
            assert_eq!(solution.p4.e(), 0.0);
        }
    }

    #[test]
    fn test_custom_w_mass() {
        let lepton = Vec4::from_pt_eta_phi_m(40.0, 0.5, 1.0, 0.0);
        let reconstructor = NeutrinoReconstructor::new(90.0);
        let solutions = reconstructor.solve(&lepton, &met(10.0, 20.0));
        assert!(solutions.solved);
        for p4 in solutions.p4s() {
            assert_relative_eq!((lepton + p4).m(), 90.0, epsilon = 1e-6);
        }
    }
}
