//! Type aliases, constants, and core enums for the rotordynamics library.

use nalgebra::SMatrix;
use serde::{Deserialize, Serialize};

// Type aliases for element matrix sizes
pub type Matrix2 = SMatrix<f64, 2, 2>;
pub type Matrix4 = SMatrix<f64, 4, 4>;
pub type Matrix8 = SMatrix<f64, 8, 8>;

/// DOFs per node: [x, y, α, β] (two translations, two rotations).
pub const DOF_PER_NODE: usize = 4;

/// Local index of the x translation within a node.
pub const X_DOF: usize = 0;
/// Local index of the y translation within a node.
pub const Y_DOF: usize = 1;

/// Eigenvalue magnitude (rad/s) below which a mode is treated as a rigid-body mode.
pub const RIGID_BODY_THRESHOLD: f64 = 1e-3;

/// |κ| below which an orbit is reported as planar.
pub const PLANAR_TOL: f64 = 1e-4;

/// Negative damping ratios smaller than this are numerical noise, not instability.
pub const STABILITY_TOL: f64 = 1e-8;

/// Relative imaginary part below which an eigenvalue is considered real.
pub const REAL_EIGENVALUE_TOL: f64 = 1e-9;

/// Relative distance below which two eigenvalues form a repeated pair.
pub const REPEATED_EIGENVALUE_TOL: f64 = 1e-7;

/// Translational amplitude product below which an orbit is degenerate.
pub const ORBIT_AMPLITUDE_TOL: f64 = 1e-16;

/// Relative bracket width at which critical speed bisection stops.
pub const BISECTION_TOL: f64 = 1e-8;

/// Maximum bisection iterations for critical speed refinement.
pub const MAX_BISECTION_ITER: usize = 100;

/// |λh| below which the exponential integrator switches to series expansions.
pub const SERIES_SWITCH: f64 = 1e-3;

/// Global DOF index of a node-local DOF.
#[inline]
pub fn global_dof(node: usize, local: usize) -> usize {
    DOF_PER_NODE * node + local
}

/// Precession direction of a mode relative to shaft rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WhirlDirection {
    Forward,
    Backward,
    Planar,
}

/// Sense of shaft rotation, used as the reference for whirl direction.
///
/// `XToY` means positive speed rotates the x axis toward the y axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RotationSense {
    #[default]
    XToY,
    YToX,
}

impl RotationSense {
    /// Sign applied to κ so that positive values mean forward whirl.
    pub fn sign(self) -> f64 {
        match self {
            RotationSense::XToY => 1.0,
            RotationSense::YToX => -1.0,
        }
    }
}
