//! Analysis configuration.
//!
//! All numerical policies that affect modal post-processing and time
//! integration live here and are passed into [`crate::Rotor`] explicitly.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{
    RotationSense, BISECTION_TOL, MAX_BISECTION_ITER, PLANAR_TOL, RIGID_BODY_THRESHOLD,
    STABILITY_TOL,
};

/// Newmark integration parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewmarkParameters {
    pub beta: f64,
    pub gamma: f64,
}

impl NewmarkParameters {
    /// Average acceleration (unconditionally stable): γ = 1/2, β = 1/4
    pub fn average_acceleration() -> Self {
        Self {
            beta: 0.25,
            gamma: 0.5,
        }
    }

    /// Linear acceleration (conditionally stable): γ = 1/2, β = 1/6
    pub fn linear_acceleration() -> Self {
        Self {
            beta: 1.0 / 6.0,
            gamma: 0.5,
        }
    }
}

impl Default for NewmarkParameters {
    fn default() -> Self {
        Self::average_acceleration()
    }
}

/// Configuration shared by the modal, Campbell and response engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Rotation sense used to decide forward vs backward whirl.
    pub rotation_sense: RotationSense,
    /// Node used for whirl classification. `None` picks the node with the
    /// largest translational amplitude in each mode.
    pub reference_node: Option<usize>,
    /// |κ| below which a mode is reported as planar.
    pub planar_tolerance: f64,
    /// Eigenvalues with |λ| below this (rad/s) are discarded as rigid-body modes.
    pub rigid_body_threshold: f64,
    /// Modes are unstable only when ζ < -stability_tolerance.
    pub stability_tolerance: f64,
    /// Relative bracket width for critical speed bisection.
    pub bisection_tolerance: f64,
    pub max_bisection_iterations: usize,
    pub newmark: NewmarkParameters,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            rotation_sense: RotationSense::default(),
            reference_node: None,
            planar_tolerance: PLANAR_TOL,
            rigid_body_threshold: RIGID_BODY_THRESHOLD,
            stability_tolerance: STABILITY_TOL,
            bisection_tolerance: BISECTION_TOL,
            max_bisection_iterations: MAX_BISECTION_ITER,
            newmark: NewmarkParameters::default(),
        }
    }
}

impl AnalysisConfig {
    /// Parse a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_rotation_sense(mut self, sense: RotationSense) -> Self {
        self.rotation_sense = sense;
        self
    }

    pub fn with_reference_node(mut self, node: usize) -> Self {
        self.reference_node = Some(node);
        self
    }

    pub fn with_newmark(mut self, newmark: NewmarkParameters) -> Self {
        self.newmark = newmark;
        self
    }
}
