//! Isotropic shaft/disk materials.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Compute shear modulus from Young's modulus and Poisson's ratio.
///
/// G = E / (2 * (1 + ν))
#[inline]
pub fn shear_modulus(e: f64, nu: f64) -> f64 {
    e / (2.0 * (1.0 + nu))
}

/// Material properties for shaft and disk elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    /// Density (kg/m³)
    pub rho: f64,
    /// Young's modulus (Pa)
    pub e: f64,
    /// Shear modulus (Pa)
    pub g_s: f64,
    /// Poisson's ratio
    pub poisson: f64,
}

impl Material {
    /// Create a material from density, Young's modulus and Poisson's ratio.
    ///
    /// # Arguments
    /// * `name` - Display name
    /// * `rho` - Density (kg/m³)
    /// * `e` - Young's modulus (Pa)
    /// * `poisson` - Poisson's ratio
    pub fn new(name: &str, rho: f64, e: f64, poisson: f64) -> Result<Self> {
        let material = Self {
            name: name.to_string(),
            rho,
            e,
            g_s: shear_modulus(e, poisson),
            poisson,
        };
        material.validate()?;
        Ok(material)
    }

    /// Create a material from density, Young's and shear moduli.
    ///
    /// ν = E / (2G) - 1
    pub fn from_shear_modulus(name: &str, rho: f64, e: f64, g_s: f64) -> Result<Self> {
        if g_s <= 0.0 || !g_s.is_finite() {
            return Err(Error::InvalidGeometry(format!(
                "shear modulus must be positive, got {g_s}"
            )));
        }
        let material = Self {
            name: name.to_string(),
            rho,
            e,
            g_s,
            poisson: 0.5 * e / g_s - 1.0,
        };
        material.validate()?;
        Ok(material)
    }

    /// Structural steel (ρ = 7810 kg/m³, E = 211 GPa, G = 81.2 GPa).
    pub fn steel() -> Self {
        Self {
            name: "Steel".to_string(),
            rho: 7810.0,
            e: 211e9,
            g_s: 81.2e9,
            poisson: 0.5 * 211e9 / 81.2e9 - 1.0,
        }
    }

    /// Reject non-physical properties.
    pub fn validate(&self) -> Result<()> {
        let moduli = [
            ("density", self.rho),
            ("Young's modulus", self.e),
            ("shear modulus", self.g_s),
        ];
        for (label, value) in moduli {
            if value <= 0.0 || !value.is_finite() {
                return Err(Error::InvalidGeometry(format!(
                    "{label} of {} must be positive, got {value}",
                    self.name
                )));
            }
        }
        if !(self.poisson > -1.0 && self.poisson < 0.5) {
            return Err(Error::InvalidGeometry(format!(
                "Poisson's ratio of {} must lie in (-1, 0.5), got {}",
                self.name, self.poisson
            )));
        }
        Ok(())
    }
}
