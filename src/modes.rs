//! Whirl classification of complex mode shapes.
//!
//! The two translational DOFs of a node trace an ellipse
//! `x = |u| cos(ωt + ∠u)`, `y = |v| cos(ωt + ∠v)`. The ellipse axes come from
//! the eigenvalues of `H = T Tᵀ` with
//!
//! ```text
//! T = [ |u| cos ∠u   -|u| sin ∠u ]
//!     [ |v| cos ∠v   -|v| sin ∠v ]
//! ```
//!
//! κ = minor / major, negative when the orbit precesses against the rotation.
//! |κ| is 0 for a straight-line orbit and 1 for a circle.
//!
//! ## Parallelization
//!
//! When the `parallel` feature is enabled, classification of a batch of modes
//! is parallelized using Rayon.

use std::f64::consts::PI;

use num_complex::Complex;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::AnalysisConfig;
use crate::types::{global_dof, RotationSense, WhirlDirection, ORBIT_AMPLITUDE_TOL, X_DOF, Y_DOF};

/// Orbit of one node in one mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orbit {
    /// Natural frequency of the mode (rad/s).
    pub frequency: f64,
    pub minor: f64,
    pub major: f64,
    pub kappa: f64,
}

/// Wrap an angle into (-π, π].
fn wrap_angle(mut a: f64) -> f64 {
    while a <= -PI {
        a += 2.0 * PI;
    }
    while a > PI {
        a -= 2.0 * PI;
    }
    a
}

/// Minor axis, major axis and signed κ of the orbit traced by `(u, v)`.
pub fn orbit_axes(u: Complex<f64>, v: Complex<f64>, sense: RotationSense) -> (f64, f64, f64) {
    let (ru, nu) = u.to_polar();
    let (rv, nv) = v.to_polar();
    if ru * rv < ORBIT_AMPLITUDE_TOL {
        return (0.0, ru.max(rv), 0.0);
    }

    let t11 = ru * nu.cos();
    let t12 = -ru * nu.sin();
    let t21 = rv * nv.cos();
    let t22 = -rv * nv.sin();
    // H = T Tᵀ
    let h11 = t11 * t11 + t12 * t12;
    let h12 = t11 * t21 + t12 * t22;
    let h22 = t21 * t21 + t22 * t22;

    let half_trace = 0.5 * (h11 + h22);
    let spread = (0.25 * (h11 - h22) * (h11 - h22) + h12 * h12).sqrt();
    let major = (half_trace + spread).sqrt();
    let minor = (half_trace - spread).max(0.0).sqrt();

    let mut kappa = if major > 0.0 { minor / major } else { 0.0 };
    let diff = wrap_angle(nv - nu);
    if diff == 0.0 || diff == PI {
        kappa = 0.0;
    } else if diff > 0.0 {
        kappa = -kappa;
    }

    (minor, major, kappa * sense.sign())
}

/// Orbit at `node` for a full-length complex shape.
pub fn node_orbit(
    shape: &[Complex<f64>],
    node: usize,
    frequency: f64,
    sense: RotationSense,
) -> Orbit {
    let u = shape
        .get(global_dof(node, X_DOF))
        .copied()
        .unwrap_or_default();
    let v = shape
        .get(global_dof(node, Y_DOF))
        .copied()
        .unwrap_or_default();
    let (minor, major, kappa) = orbit_axes(u, v, sense);
    Orbit {
        frequency,
        minor,
        major,
        kappa,
    }
}

/// Whirl direction from κ.
pub fn whirl_from_kappa(kappa: f64, planar_tolerance: f64) -> WhirlDirection {
    if kappa.abs() < planar_tolerance {
        WhirlDirection::Planar
    } else if kappa > 0.0 {
        WhirlDirection::Forward
    } else {
        WhirlDirection::Backward
    }
}

/// Node with the largest translational amplitude.
pub fn dominant_node(shape: &[Complex<f64>], n_nodes: usize) -> usize {
    (0..n_nodes)
        .map(|n| {
            let u = shape.get(global_dof(n, X_DOF)).map_or(0.0, |c| c.norm_sqr());
            let v = shape.get(global_dof(n, Y_DOF)).map_or(0.0, |c| c.norm_sqr());
            (n, u + v)
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(n, _)| n)
        .unwrap_or(0)
}

/// Classify one mode at the configured reference node.
///
/// Returns the whirl direction and κ at the node used.
pub fn classify_mode(
    shape: &[Complex<f64>],
    n_nodes: usize,
    config: &AnalysisConfig,
) -> (WhirlDirection, f64) {
    let node = config
        .reference_node
        .unwrap_or_else(|| dominant_node(shape, n_nodes));
    let orbit = node_orbit(shape, node, 0.0, config.rotation_sense);
    (whirl_from_kappa(orbit.kappa, config.planar_tolerance), orbit.kappa)
}

/// Classify a batch of modes (parallel).
#[cfg(feature = "parallel")]
pub fn classify_modes(
    shapes: &[Vec<Complex<f64>>],
    n_nodes: usize,
    config: &AnalysisConfig,
) -> Vec<(WhirlDirection, f64)> {
    shapes
        .par_iter()
        .map(|s| classify_mode(s, n_nodes, config))
        .collect()
}

/// Classify a batch of modes (sequential).
#[cfg(not(feature = "parallel"))]
pub fn classify_modes(
    shapes: &[Vec<Complex<f64>>],
    n_nodes: usize,
    config: &AnalysisConfig,
) -> Vec<(WhirlDirection, f64)> {
    shapes
        .iter()
        .map(|s| classify_mode(s, n_nodes, config))
        .collect()
}
