//! Rigid disk attached at a single node.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::material::Material;
use crate::types::Matrix4;

/// Rigid disk: point mass plus diametral and polar inertia.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskElement {
    /// Node the disk is attached to.
    pub n: usize,
    /// Mass (kg)
    pub m: f64,
    /// Diametral moment of inertia (kg·m²)
    pub id: f64,
    /// Polar moment of inertia (kg·m²)
    pub ip: f64,
}

impl DiskElement {
    pub fn new(n: usize, m: f64, id: f64, ip: f64) -> Result<Self> {
        let disk = Self { n, m, id, ip };
        disk.validate()?;
        Ok(disk)
    }

    /// Mass and inertias must be finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        let props = [
            ("mass", self.m),
            ("diametral inertia", self.id),
            ("polar inertia", self.ip),
        ];
        for (label, value) in props {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(Error::InvalidGeometry(format!(
                    "disk at node {} has invalid {label} {value}",
                    self.n
                )));
            }
        }
        Ok(())
    }

    /// Disk from its geometry (solid annulus of uniform density).
    ///
    /// # Arguments
    /// * `n` - Node the disk is attached to
    /// * `material` - Disk material (only density is used)
    /// * `width` - Axial width (m)
    /// * `i_d` - Inner (bore) diameter (m)
    /// * `o_d` - Outer diameter (m)
    pub fn from_geometry(
        n: usize,
        material: &Material,
        width: f64,
        i_d: f64,
        o_d: f64,
    ) -> Result<Self> {
        if !(width > 0.0 && width.is_finite()) {
            return Err(Error::InvalidGeometry(format!(
                "disk at node {n} has non-positive width {width}"
            )));
        }
        if !(i_d >= 0.0 && o_d > i_d && o_d.is_finite()) {
            return Err(Error::InvalidGeometry(format!(
                "disk at node {n} needs 0 <= i_d < o_d, got i_d={i_d}, o_d={o_d}"
            )));
        }
        material.validate()?;

        let rho = material.rho;
        let d4 = o_d.powi(4) - i_d.powi(4);
        let m = 0.25 * rho * PI * width * (o_d * o_d - i_d * i_d);
        let id = 0.015625 * rho * PI * width * d4 + m * width * width / 12.0;
        let ip = 0.03125 * rho * PI * width * d4;

        Self::new(n, m, id, ip)
    }

    pub fn mass_matrix(&self) -> Matrix4 {
        Matrix4::from_diagonal(&nalgebra::Vector4::new(self.m, self.m, self.id, self.id))
    }

    pub fn stiffness_matrix(&self) -> Matrix4 {
        Matrix4::zeros()
    }

    pub fn damping_matrix(&self) -> Matrix4 {
        Matrix4::zeros()
    }

    /// Gyroscopic matrix per unit speed, coupling the two rotations through Ip.
    pub fn gyroscopic_matrix(&self) -> Matrix4 {
        let mut g = Matrix4::zeros();
        g[(2, 3)] = self.ip;
        g[(3, 2)] = -self.ip;
        g
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn geometry_gives_reference_inertias() {
        let disk = DiskElement::from_geometry(0, &Material::steel(), 0.07, 0.05, 0.28).unwrap();
        assert_relative_eq!(disk.m, 32.589_73, max_relative = 1e-6);
        assert_relative_eq!(disk.id, 0.178_09, max_relative = 1e-4);
        assert_relative_eq!(disk.ip, 0.329_56, max_relative = 1e-4);
    }

    #[test]
    fn mass_matrix_is_diagonal() {
        let disk = DiskElement::new(3, 10.0, 0.2, 0.4).unwrap();
        let m = disk.mass_matrix();
        assert_eq!(m[(0, 0)], 10.0);
        assert_eq!(m[(1, 1)], 10.0);
        assert_eq!(m[(2, 2)], 0.2);
        assert_eq!(m[(3, 3)], 0.2);
        assert_eq!(m.sum(), 20.4);
    }

    #[test]
    fn gyroscopic_is_antisymmetric_in_ip() {
        let g = DiskElement::new(0, 10.0, 0.2, 0.4).unwrap().gyroscopic_matrix();
        assert_eq!(g[(2, 3)], 0.4);
        assert_eq!(g[(3, 2)], -0.4);
        assert_eq!(g + g.transpose(), Matrix4::zeros());
    }

    #[test]
    fn rejects_bad_geometry() {
        let steel = Material::steel();
        assert!(DiskElement::from_geometry(0, &steel, 0.0, 0.05, 0.28).is_err());
        assert!(DiskElement::from_geometry(0, &steel, 0.07, 0.3, 0.28).is_err());
        assert!(DiskElement::new(0, -1.0, 0.1, 0.1).is_err());
    }
}
