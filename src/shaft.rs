//! Rotating shaft beam element.
//!
//! Two-node Euler-Bernoulli / Timoshenko beam bending in two transverse planes,
//! 4 DOF per node:
//! - x, y: transverse translations
//! - α, β: rotations about the x and y axes
//!
//! ## Element DOF ordering
//! ```text
//! Node 1: [x1, y1, α1, β1]
//! Node 2: [x2, y2, α2, β2]
//! Element DOFs: [x1, y1, α1, β1, x2, y2, α2, β2]
//! ```
//!
//! Bending in the xz plane uses `[x, β]`; bending in the yz plane uses `[y, α]`
//! with α = -dy/dz, so the yz-plane blocks are the xz-plane blocks with the
//! rotation rows and columns negated.
//!
//! The shear parameter φ = 12EI/(κGAL²) is zero for the Euler-Bernoulli
//! element; κ is Hutchinson's coefficient for hollow circular sections.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::material::Material;
use crate::types::{Matrix4, Matrix8};

/// xz-plane DOFs [x1, β1, x2, β2] within the element.
const XZ_DOFS: [usize; 4] = [0, 3, 4, 7];
/// yz-plane DOFs [y1, α1, y2, α2] within the element.
const YZ_DOFS: [usize; 4] = [1, 2, 5, 6];
const YZ_SIGN: [f64; 4] = [1.0, -1.0, 1.0, -1.0];

/// Hollow circular cross-section properties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossSection {
    /// Cross-sectional area (m²)
    pub area: f64,
    /// Diametral second moment of area (m⁴)
    pub ie: f64,
    /// Shear correction factor
    pub kappa: f64,
}

impl CrossSection {
    /// Build a tube section.
    ///
    /// # Arguments
    /// * `i_d` - Inner diameter (m), zero for a solid shaft
    /// * `o_d` - Outer diameter (m)
    /// * `poisson` - Poisson's ratio of the material
    pub fn tube(i_d: f64, o_d: f64, poisson: f64) -> Self {
        Self {
            area: PI * (o_d * o_d - i_d * i_d) / 4.0,
            ie: PI * (o_d.powi(4) - i_d.powi(4)) / 64.0,
            kappa: hutchinson_kappa(i_d / o_d, poisson),
        }
    }
}

/// Hutchinson (2001) shear coefficient for a tube with radius ratio `r = i_d / o_d`.
pub fn hutchinson_kappa(r: f64, nu: f64) -> f64 {
    let r2 = r * r;
    let r12 = (1.0 + r2) * (1.0 + r2);
    6.0 * r12 * (1.0 + nu) / (r12 * (7.0 + 6.0 * nu) + r2 * (20.0 + 12.0 * nu))
}

/// Spread a 4×4 single-plane block over both bending planes.
fn expand_planes(p: &Matrix4) -> Matrix8 {
    let mut out = Matrix8::zeros();
    for i in 0..4 {
        for j in 0..4 {
            out[(XZ_DOFS[i], XZ_DOFS[j])] = p[(i, j)];
            out[(YZ_DOFS[i], YZ_DOFS[j])] = YZ_SIGN[i] * YZ_SIGN[j] * p[(i, j)];
        }
    }
    out
}

/// Symmetric single-plane pattern shared by stiffness, rotary inertia and
/// geometric stiffness: translation terms (a), coupling (b), rotation
/// diagonal (c) and rotation off-diagonal (d).
#[rustfmt::skip]
fn bending_pattern(a: f64, b: f64, c: f64, d: f64) -> Matrix4 {
    Matrix4::from_row_slice(&[
        // x1   β1   x2   β2
         a,   b,  -a,   b,   // x1
         b,   c,  -b,   d,   // β1
        -a,  -b,   a,  -b,   // x2
         b,   d,  -b,   c,   // β2
    ])
}

/// Shaft element spanning nodes `n` and `n + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaftElement {
    /// Element index; the element connects nodes `n` and `n + 1`.
    pub n: usize,
    /// Element length (m)
    pub length: f64,
    /// Inner diameter (m)
    pub i_d: f64,
    /// Outer diameter (m)
    pub o_d: f64,
    pub material: Material,
    /// Include Timoshenko shear deformation.
    pub shear_effects: bool,
    /// Include rotary inertia in the mass matrix.
    pub rotary_inertia: bool,
    /// Include gyroscopic coupling.
    pub gyroscopic: bool,
    /// Axial force (N), positive in tension.
    pub axial_force: f64,
    /// Torque (N·m). Stored for reporting; not coupled into the matrices.
    pub torque: f64,
}

impl ShaftElement {
    /// Euler-Bernoulli element with gyroscopic effects, no axial load.
    pub fn new(n: usize, length: f64, i_d: f64, o_d: f64, material: Material) -> Result<Self> {
        let elem = Self {
            n,
            length,
            i_d,
            o_d,
            material,
            shear_effects: false,
            rotary_inertia: false,
            gyroscopic: true,
            axial_force: 0.0,
            torque: 0.0,
        };
        elem.validate()?;
        Ok(elem)
    }

    /// Timoshenko element: shear effects, rotary inertia and gyroscopic effects.
    pub fn timoshenko(
        n: usize,
        length: f64,
        i_d: f64,
        o_d: f64,
        material: Material,
    ) -> Result<Self> {
        Ok(Self::new(n, length, i_d, o_d, material)?
            .with_shear_effects(true)
            .with_rotary_inertia(true))
    }

    pub fn with_shear_effects(mut self, enabled: bool) -> Self {
        self.shear_effects = enabled;
        self
    }

    pub fn with_rotary_inertia(mut self, enabled: bool) -> Self {
        self.rotary_inertia = enabled;
        self
    }

    pub fn with_gyroscopic(mut self, enabled: bool) -> Self {
        self.gyroscopic = enabled;
        self
    }

    pub fn with_axial_force(mut self, force: f64) -> Self {
        self.axial_force = force;
        self
    }

    pub fn with_torque(mut self, torque: f64) -> Self {
        self.torque = torque;
        self
    }

    /// Check geometry and material; called by every constructor and by the rotor.
    pub fn validate(&self) -> Result<()> {
        if !(self.length > 0.0 && self.length.is_finite()) {
            return Err(Error::InvalidGeometry(format!(
                "shaft element {} has non-positive length {}",
                self.n, self.length
            )));
        }
        if !(self.o_d > 0.0 && self.o_d.is_finite()) {
            return Err(Error::InvalidGeometry(format!(
                "shaft element {} has non-positive outer diameter {}",
                self.n, self.o_d
            )));
        }
        if !(self.i_d >= 0.0 && self.i_d < self.o_d) {
            return Err(Error::InvalidGeometry(format!(
                "shaft element {} inner diameter {} must lie in [0, {})",
                self.n, self.i_d, self.o_d
            )));
        }
        if !self.axial_force.is_finite() || !self.torque.is_finite() {
            return Err(Error::InvalidGeometry(format!(
                "shaft element {} has non-finite loads",
                self.n
            )));
        }
        self.material.validate()
    }

    /// Split into `n_elements` equal elements starting at node `self.n`.
    pub fn split(&self, n_elements: usize) -> Result<Vec<ShaftElement>> {
        if n_elements == 0 {
            return Err(Error::InvalidInput("cannot split a shaft into 0 elements".into()));
        }
        let le = self.length / n_elements as f64;
        (0..n_elements)
            .map(|i| {
                let elem = ShaftElement {
                    n: self.n + i,
                    length: le,
                    ..self.clone()
                };
                elem.validate()?;
                Ok(elem)
            })
            .collect()
    }

    /// Global node indices `[n, n + 1]`.
    pub fn nodes(&self) -> [usize; 2] {
        [self.n, self.n + 1]
    }

    pub fn section(&self) -> CrossSection {
        CrossSection::tube(self.i_d, self.o_d, self.material.poisson)
    }

    /// Element mass (kg).
    pub fn mass(&self) -> f64 {
        self.material.rho * self.section().area * self.length
    }

    /// Shear parameter φ; zero when shear effects are disabled.
    pub fn phi(&self) -> f64 {
        if !self.shear_effects {
            return 0.0;
        }
        let cs = self.section();
        let l = self.length;
        12.0 * self.material.e * cs.ie / (self.material.g_s * cs.kappa * cs.area * l * l)
    }

    /// Consistent mass matrix (8×8), translational plus optional rotary inertia.
    pub fn mass_matrix(&self) -> Matrix8 {
        let cs = self.section();
        let phi = self.phi();
        let phi2 = phi * phi;
        let l = self.length;
        let rho = self.material.rho;
        let one_plus_phi2 = (1.0 + phi) * (1.0 + phi);

        let m01 = 312.0 + 588.0 * phi + 280.0 * phi2;
        let m02 = (44.0 + 77.0 * phi + 35.0 * phi2) * l;
        let m03 = 108.0 + 252.0 * phi + 140.0 * phi2;
        let m04 = -(26.0 + 63.0 * phi + 35.0 * phi2) * l;
        let m05 = (8.0 + 14.0 * phi + 7.0 * phi2) * l * l;
        let m06 = -(6.0 + 14.0 * phi + 7.0 * phi2) * l * l;

        #[rustfmt::skip]
        let plane = Matrix4::from_row_slice(&[
            // x1    β1     x2     β2
            m01,   m02,   m03,   m04,   // x1
            m02,   m05,  -m04,   m06,   // β1
            m03,  -m04,   m01,  -m02,   // x2
            m04,   m06,  -m02,   m05,   // β2
        ]);
        let mut m = expand_planes(&plane) * (rho * cs.area * l / (840.0 * one_plus_phi2));

        if self.rotary_inertia {
            let ms = bending_pattern(
                36.0,
                (3.0 - 15.0 * phi) * l,
                (4.0 + 5.0 * phi + 10.0 * phi2) * l * l,
                (-1.0 - 5.0 * phi + 5.0 * phi2) * l * l,
            );
            m += expand_planes(&ms) * (rho * cs.ie / (30.0 * l * one_plus_phi2));
        }

        m
    }

    /// Stiffness matrix (8×8): bending with shear correction plus the
    /// geometric stiffness of the axial force.
    pub fn stiffness_matrix(&self) -> Matrix8 {
        let cs = self.section();
        let phi = self.phi();
        let l = self.length;

        let bending = bending_pattern(12.0, 6.0 * l, (4.0 + phi) * l * l, (2.0 - phi) * l * l);
        let mut k = expand_planes(&bending) * (self.material.e * cs.ie / ((1.0 + phi) * l.powi(3)));

        if self.axial_force != 0.0 {
            let geometric = bending_pattern(36.0, 3.0 * l, 4.0 * l * l, -l * l);
            k += expand_planes(&geometric) * (self.axial_force / (30.0 * l));
        }

        k
    }

    /// Shafts carry no internal damping.
    pub fn damping_matrix(&self) -> Matrix8 {
        Matrix8::zeros()
    }

    /// Gyroscopic matrix (8×8) per unit speed; antisymmetric.
    pub fn gyroscopic_matrix(&self) -> Matrix8 {
        if !self.gyroscopic {
            return Matrix8::zeros();
        }
        let cs = self.section();
        let phi = self.phi();
        let phi2 = phi * phi;
        let l = self.length;

        let g1 = 36.0;
        let g2 = (3.0 - 15.0 * phi) * l;
        let g3 = (4.0 + 5.0 * phi + 10.0 * phi2) * l * l;
        let g4 = (-1.0 - 5.0 * phi + 5.0 * phi2) * l * l;

        #[rustfmt::skip]
        let g = Matrix8::from_row_slice(&[
            // x1    y1    α1    β1    x2    y2    α2    β2
            0.0,  -g1,   g2,  0.0,  0.0,   g1,   g2,  0.0,   // x1
             g1,  0.0,  0.0,   g2,  -g1,  0.0,  0.0,   g2,   // y1
            -g2,  0.0,  0.0,  -g3,   g2,  0.0,  0.0,  -g4,   // α1
            0.0,  -g2,   g3,  0.0,  0.0,   g2,   g4,  0.0,   // β1
            0.0,   g1,  -g2,  0.0,  0.0,  -g1,  -g2,  0.0,   // x2
            -g1,  0.0,  0.0,  -g2,   g1,  0.0,  0.0,  -g2,   // y2
            -g2,  0.0,  0.0,  -g4,   g2,  0.0,  0.0,  -g3,   // α2
            0.0,  -g2,   g4,  0.0,  0.0,   g2,   g3,  0.0,   // β2
        ]);

        g * (-self.material.rho * cs.ie / (15.0 * l * (1.0 + phi) * (1.0 + phi)))
    }
}
