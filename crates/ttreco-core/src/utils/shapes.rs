use nalgebra::{Matrix2, Matrix3};

use crate::{
    data::PhysicsObject,
    utils::{enums::Shape, vectors::Vec4},
};

/// A multi-object system with its combined four-momentum and the eigenvalues of its momentum
/// tensors.
///
/// Three tensors are built from the constituent three-momenta $`\vec{p}_k`$:
///
/// ```math
/// S^{ij} = \frac{\sum_k p_k^i p_k^j}{\sum_k |\vec{p}_k|^2},\qquad
/// O^{ij} = \frac{\sum_k p_k^i p_k^j / |\vec{p}_k|}{\sum_k |\vec{p}_k|}
/// ```
///
/// and the transverse ($`xy`$) block of $`S`$. Eigenvalues are stored in decreasing order, so
/// $`\lambda_1 \geq \lambda_2 \geq \lambda_3`$.
#[derive(Clone, Debug)]
pub struct ParticleCollection {
    p4: Vec4,
    wpsum: u32,
    ptsum: f64,
    eigenvalues: [f64; 3],
    eigenvalues_t: [f64; 2],
    eigenvalues_o: [f64; 3],
}

impl ParticleCollection {
    /// Build a collection from physics objects. Only jets contribute to the working-point sum.
    pub fn new<'a, I>(objects: I) -> Self
    where
        I: IntoIterator<Item = &'a PhysicsObject>,
    {
        let mut momenta = Vec::new();
        let mut wpsum = 0;
        for object in objects {
            momenta.push(object.p4);
            wpsum += object.tag_level.map(u32::from).unwrap_or(0);
        }
        Self::build(&momenta, wpsum)
    }

    /// Build a collection from bare four-momenta (with a working-point sum of zero).
    pub fn from_momenta(momenta: &[Vec4]) -> Self {
        Self::build(momenta, 0)
    }

    fn build(momenta: &[Vec4], wpsum: u32) -> Self {
        let p4: Vec4 = momenta.iter().sum();
        let ptsum = momenta.iter().map(Vec4::pt).sum();

        let mut s = Matrix3::zeros();
        let mut o = Matrix3::zeros();
        let mut normal = 0.0;
        let mut o_normal = 0.0;
        for momentum in momenta {
            let p3 = momentum.vec3();
            let components = [p3.x, p3.y, p3.z];
            let mag = p3.mag();
            for i in 0..3 {
                for j in 0..3 {
                    let pij = components[i] * components[j];
                    s[(i, j)] += pij;
                    if mag > 0.0 {
                        o[(i, j)] += pij / mag;
                    }
                }
            }
            normal += mag * mag;
            o_normal += mag;
        }
        if normal > 0.0 {
            s /= normal;
        }
        if o_normal > 0.0 {
            o /= o_normal;
        }
        let t = Matrix2::new(s[(0, 0)], s[(0, 1)], s[(1, 0)], s[(1, 1)]);

        Self {
            p4,
            wpsum,
            ptsum,
            eigenvalues: sorted_eigenvalues3(s),
            eigenvalues_t: sorted_eigenvalues2(t),
            eigenvalues_o: sorted_eigenvalues3(o),
        }
    }

    pub fn p4(&self) -> Vec4 {
        self.p4
    }
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
    pub fn mt(&self) -> f64 {
        self.p4.mt()
    }
    /// The sum of the tag levels of the jets in the collection.
    pub fn wpsum(&self) -> u32 {
        self.wpsum
    }
    /// The scalar sum of constituent $`p_T`$.
    pub fn ptsum(&self) -> f64 {
        self.ptsum
    }
    pub fn eigenvalues(&self) -> [f64; 3] {
        self.eigenvalues
    }

    /// Evaluate one of the event-shape variables.
    pub fn shape(&self, shape: Shape) -> f64 {
        let [l1, l2, l3] = self.eigenvalues;
        match shape {
            Shape::Aplanarity => 1.5 * l3,
            Shape::AplanarityO => 1.5 * self.eigenvalues_o[2],
            Shape::Sphericity => 1.5 * (l2 + l3),
            Shape::SphericityO => 1.5 * (self.eigenvalues_o[1] + self.eigenvalues_o[2]),
            Shape::SphericityT => {
                let [t1, t2] = self.eigenvalues_t;
                if t1 + t2 == 0.0 {
                    return 0.0;
                }
                2.0 * t2 / (t1 + t2)
            }
            Shape::Planarity => l2 - l3,
            Shape::VariableC => 3.0 * (l1 * l2 + l1 * l3 + l2 * l3),
            Shape::VariableD => 27.0 * l1 * l2 * l3,
            Shape::Circularity => {
                if l1 + l2 == 0.0 {
                    return 0.0;
                }
                2.0 * l2 / (l1 + l2)
            }
            Shape::PlanarFlow => {
                let denom = (l1 + l2) * (l1 + l2);
                if denom == 0.0 {
                    return 0.0;
                }
                4.0 * l1 * l2 / denom
            }
        }
    }
}

fn sorted_eigenvalues3(m: Matrix3<f64>) -> [f64; 3] {
    let mut values: [f64; 3] = m.symmetric_eigen().eigenvalues.into();
    values.sort_by(|a, b| b.total_cmp(a));
    values
}

fn sorted_eigenvalues2(m: Matrix2<f64>) -> [f64; 2] {
    let mut values: [f64; 2] = m.symmetric_eigen().eigenvalues.into();
    values.sort_by(|a, b| b.total_cmp(a));
    values
}
