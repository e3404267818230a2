use std::{f64::consts::PI, fmt::Display, iter::Sum};

use auto_ops::{impl_op_ex, impl_op_ex_commutative};
use serde::{Deserialize, Serialize};

/// A three-vector of momentum components.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// The $`x`$-component.
    pub x: f64,
    /// The $`y`$-component.
    pub y: f64,
    /// The $`z`$-component.
    pub z: f64,
}

impl Vec3 {
    /// Create a new [`Vec3`] from its components.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
    /// Promote this three-momentum to a four-momentum with the given invariant mass.
    pub fn with_mass(&self, mass: f64) -> Vec4 {
        let e = (mass * mass + self.mag2()).sqrt();
        Vec4::new(self.x, self.y, self.z, e)
    }
    /// Promote this three-momentum to a four-momentum with the given energy.
    pub fn with_energy(&self, energy: f64) -> Vec4 {
        Vec4::new(self.x, self.y, self.z, energy)
    }
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }
    pub fn cross(&self, other: &Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }
    pub fn mag2(&self) -> f64 {
        self.dot(self)
    }
    pub fn mag(&self) -> f64 {
        self.mag2().sqrt()
    }
    /// The magnitude of the transverse ($`xy`$) projection.
    pub fn pt(&self) -> f64 {
        self.x.hypot(self.y)
    }
    pub fn phi(&self) -> f64 {
        self.y.atan2(self.x)
    }
    /// The pseudorapidity $`\eta = \sinh^{-1}(p_z / p_T)`$.
    ///
    /// A vector along the beam axis has an infinite pseudorapidity with the sign of its
    /// $`z`$-component, and the null vector is assigned $`\eta = 0`$.
    pub fn eta(&self) -> f64 {
        let pt = self.pt();
        if pt == 0.0 {
            if self.z == 0.0 {
                return 0.0;
            }
            return f64::INFINITY.copysign(self.z);
        }
        (self.z / pt).asinh()
    }
    pub fn unit(&self) -> Self {
        let mag = self.mag();
        Self::new(self.x / mag, self.y / mag, self.z / mag)
    }
}

impl_op_ex!(+ |a: &Vec3, b: &Vec3| -> Vec3 { Vec3::new(a.x + b.x, a.y + b.y, a.z + b.z) });
impl_op_ex!(-|a: &Vec3, b: &Vec3| -> Vec3 { Vec3::new(a.x - b.x, a.y - b.y, a.z - b.z) });
impl_op_ex!(-|a: &Vec3| -> Vec3 { Vec3::new(-a.x, -a.y, -a.z) });
impl_op_ex_commutative!(*|a: &Vec3, b: &f64| -> Vec3 { Vec3::new(a.x * b, a.y * b, a.z * b) });
impl_op_ex!(/ |a: &Vec3, b: &f64| -> Vec3 { Vec3::new(a.x / b, a.y / b, a.z / b) });

/// A four-momentum stored as $`(p_x, p_y, p_z, E)`$.
///
/// Collider observables ($`p_T`$, $`\eta`$, $`\phi`$, $`m`$) are derived on request, and
/// [`Vec4::from_pt_eta_phi_m`] builds a vector from them.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec4 {
    /// The $`x`$-component of the momentum.
    pub x: f64,
    /// The $`y`$-component of the momentum.
    pub y: f64,
    /// The $`z`$-component of the momentum.
    pub z: f64,
    /// The energy.
    pub t: f64,
}

impl Display for Vec4 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_p4_string())
    }
}

impl Vec4 {
    /// Create a new [`Vec4`] from its Cartesian components and energy.
    pub fn new(px: f64, py: f64, pz: f64, e: f64) -> Self {
        Self {
            x: px,
            y: py,
            z: pz,
            t: e,
        }
    }
    /// Build a four-momentum from transverse momentum, pseudorapidity, azimuth and mass.
    pub fn from_pt_eta_phi_m(pt: f64, eta: f64, phi: f64, m: f64) -> Self {
        let pt = pt.abs();
        Vec3::new(pt * phi.cos(), pt * phi.sin(), pt * eta.sinh()).with_mass(m)
    }
    pub fn px(&self) -> f64 {
        self.x
    }
    pub fn py(&self) -> f64 {
        self.y
    }
    pub fn pz(&self) -> f64 {
        self.z
    }
    pub fn e(&self) -> f64 {
        self.t
    }
    pub fn vec3(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
    /// The magnitude of the three-momentum.
    pub fn p(&self) -> f64 {
        self.vec3().mag()
    }
    pub fn pt(&self) -> f64 {
        self.vec3().pt()
    }
    pub fn eta(&self) -> f64 {
        self.vec3().eta()
    }
    pub fn phi(&self) -> f64 {
        self.vec3().phi()
    }
    /// The squared invariant mass (may be negative for space-like vectors).
    pub fn m2(&self) -> f64 {
        self.t * self.t - self.vec3().mag2()
    }
    /// The invariant mass. Space-like vectors return $`-\sqrt{-m^2}`$.
    pub fn m(&self) -> f64 {
        let m2 = self.m2();
        if m2 < 0.0 {
            -(-m2).sqrt()
        } else {
            m2.sqrt()
        }
    }
    /// The transverse energy $`E_T = E\,p_T/|\vec{p}|`$.
    pub fn et(&self) -> f64 {
        let p = self.p();
        if p == 0.0 {
            return 0.0;
        }
        self.t * self.pt() / p
    }
    /// The transverse mass $`\sqrt{E_T^2 - p_T^2}`$ of this (combined) system.
    pub fn mt(&self) -> f64 {
        let et = self.et();
        (et * et - self.x * self.x - self.y * self.y).max(0.0).sqrt()
    }
    pub fn beta(&self) -> Vec3 {
        self.vec3() / self.t
    }
    pub fn gamma(&self) -> f64 {
        self.t / self.m2().sqrt()
    }
    /// Boost this four-momentum by the velocity `beta`.
    pub fn boost(&self, beta: &Vec3) -> Self {
        let b2 = beta.mag2();
        if b2 == 0.0 {
            return *self;
        }
        let gamma = 1.0 / (1.0 - b2).sqrt();
        let bp = beta.dot(&self.vec3());
        let p3 = self.vec3() + beta * ((gamma - 1.0) * bp / b2 + gamma * self.t);
        p3.with_energy(gamma * (self.t + bp))
    }
    /// The azimuthal separation to `other`, wrapped into $`[-\pi, \pi)`$.
    pub fn delta_phi(&self, other: &Self) -> f64 {
        wrap_phi(self.phi() - other.phi())
    }
    pub fn delta_eta(&self, other: &Self) -> f64 {
        self.eta() - other.eta()
    }
    /// The angular separation $`\Delta R = \sqrt{\Delta\eta^2 + \Delta\phi^2}`$.
    pub fn delta_r(&self, other: &Self) -> f64 {
        self.delta_eta(other).hypot(self.delta_phi(other))
    }
    pub fn to_p4_string(&self) -> String {
        format!(
            "[e = {:.5}; p = ({:.5}, {:.5}, {:.5}); m = {:.5}]",
            self.t,
            self.x,
            self.y,
            self.z,
            self.m()
        )
    }
}

/// Wrap an azimuthal difference into $`[-\pi, \pi)`$.
pub fn wrap_phi(dphi: f64) -> f64 {
    let mut d = dphi;
    while d >= PI {
        d -= 2.0 * PI;
    }
    while d < -PI {
        d += 2.0 * PI;
    }
    d
}

impl_op_ex!(+ |a: &Vec4, b: &Vec4| -> Vec4 { Vec4::new(a.x + b.x, a.y + b.y, a.z + b.z, a.t + b.t) });
impl_op_ex!(-|a: &Vec4, b: &Vec4| -> Vec4 { Vec4::new(a.x - b.x, a.y - b.y, a.z - b.z, a.t - b.t) });
impl_op_ex!(-|a: &Vec4| -> Vec4 { Vec4::new(-a.x, -a.y, -a.z, -a.t) });

impl Sum for Vec4 {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Vec4::default(), |acc, p4| acc + p4)
    }
}

impl<'a> Sum<&'a Vec4> for Vec4 {
    fn sum<I: Iterator<Item = &'a Vec4>>(iter: I) -> Self {
        iter.fold(Vec4::default(), |acc, p4| acc + p4)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_vec_sums() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);
        let res = a + b;
        assert_eq!(res.x, 5.0);
        assert_eq!(res.y, 7.0);
        assert_eq!(res.z, 9.0);
        let total: Vec4 = [Vec4::new(1.0, 0.0, 0.0, 2.0), Vec4::new(0.0, 1.0, 0.0, 2.0)]
            .iter()
            .sum();
        assert_eq!(total, Vec4::new(1.0, 1.0, 0.0, 4.0));
    }

    #[test]
    fn test_three_to_four_momentum_conversion() {
        let p3 = Vec3::new(1.0, 2.0, 3.0);
        let target = Vec4::new(1.0, 2.0, 3.0, 10.0);
        let from_mass = p3.with_mass(target.m());
        let from_energy = p3.with_energy(target.e());
        assert_relative_eq!(from_mass.e(), target.e());
        assert_eq!(from_energy, target);
    }

    #[test]
    fn test_four_momentum_basics() {
        let p = Vec4::new(3.0, 4.0, 5.0, 10.0);
        assert_relative_eq!(p.pt(), 5.0);
        assert_relative_eq!(p.m2(), 50.0);
        assert_relative_eq!(p.m(), 50.0_f64.sqrt());
        assert_relative_eq!(p.gamma(), 2.0_f64.sqrt());
        assert_relative_eq!(p.beta().x, 0.3);
        assert_relative_eq!(p.phi(), 4.0_f64.atan2(3.0));
        assert_relative_eq!(p.eta(), (1.0_f64).asinh());
    }

    #[test]
    fn test_pt_eta_phi_m_roundtrip() {
        let p = Vec4::from_pt_eta_phi_m(45.0, -1.3, 2.1, 4.7);
        assert_relative_eq!(p.pt(), 45.0, epsilon = 1e-10);
        assert_relative_eq!(p.eta(), -1.3, epsilon = 1e-12);
        assert_relative_eq!(p.phi(), 2.1, epsilon = 1e-12);
        assert_relative_eq!(p.m(), 4.7, epsilon = 1e-9);
    }

    #[test]
    fn test_eta_along_beam_axis() {
        assert_eq!(Vec3::new(0.0, 0.0, 0.0).eta(), 0.0);
        assert_eq!(Vec3::new(0.0, 0.0, 2.0).eta(), f64::INFINITY);
        assert_eq!(Vec3::new(0.0, 0.0, -2.0).eta(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_delta_phi_wraps() {
        let a = Vec4::from_pt_eta_phi_m(10.0, 0.0, 3.0, 0.0);
        let b = Vec4::from_pt_eta_phi_m(10.0, 0.0, -3.0, 0.0);
        assert_relative_eq!(a.delta_phi(&b), 6.0 - 2.0 * PI, epsilon = 1e-12);
        assert_relative_eq!(b.delta_phi(&a), 2.0 * PI - 6.0, epsilon = 1e-12);
        assert_relative_eq!(a.delta_r(&b), (2.0 * PI - 6.0).abs(), epsilon = 1e-12);
    }

    #[test]
    fn test_transverse_mass() {
        let lep = Vec4::from_pt_eta_phi_m(40.0, 0.0, 0.0, 0.0);
        let nu = Vec4::from_pt_eta_phi_m(40.0, 0.0, PI, 0.0);
        // back-to-back massless pair at eta = 0: mT = 2 * pt
        assert_relative_eq!((lep + nu).mt(), 80.0, epsilon = 1e-9);
    }

    #[test]
    fn test_boost_com() {
        let p = Vec4::new(3.0, 4.0, 5.0, 10.0);
        let zero = p.boost(&-p.beta()).vec3();
        assert_relative_eq!(zero.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(zero.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(zero.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_boost() {
        let pa = Vec4::new(3.0, 4.0, 5.0, 10.0);
        let pb = Vec4::new(3.4, 2.3, 1.2, 9.0);
        let boosted = pa.boost(&-pb.beta());
        assert_relative_eq!(boosted.e(), 8.157632144622882, epsilon = 1e-12);
        assert_relative_eq!(boosted.px(), -0.6489200627053444, epsilon = 1e-12);
        assert_relative_eq!(boosted.py(), 1.5316128987581492, epsilon = 1e-12);
        assert_relative_eq!(boosted.pz(), 3.712145860221643, epsilon = 1e-12);
    }
}
