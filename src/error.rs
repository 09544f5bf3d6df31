//! Error types for rotor construction and analysis.

use thiserror::Error;

/// Errors raised by element construction, assembly and the analysis engines.
#[derive(Debug, Error)]
pub enum Error {
    /// Non-physical element parameters (lengths, diameters, moduli).
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Bad node/element graph.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// Interpolation outside the table domain.
    #[error("value {value} outside table range [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },

    /// Eigensolver failure at a given rotation speed.
    #[error("eigen solve failed at speed {speed} rad/s: {reason}")]
    EigenSolve { speed: f64, reason: String },

    /// DOF index outside the global DOF range.
    #[error("dof {dof} out of range (rotor has {n_dofs} dofs)")]
    InvalidDof { dof: usize, n_dofs: usize },

    /// Malformed time/frequency vectors or mismatched inputs.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Dynamic stiffness could not be factorized.
    #[error("singular system at frequency {frequency} rad/s, speed {speed} rad/s")]
    SingularSystem { frequency: f64, speed: f64 },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
