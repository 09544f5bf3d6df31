//! Modal analysis of the rotating system.
//!
//! Solves the state-space eigenproblem `A z = λ z` at a fixed speed, keeping
//! one eigenvalue of each complex-conjugate pair (Im λ ≥ 0). Rigid-body
//! eigenvalues (|λ| below the configured threshold) are discarded.
//!
//! For each retained eigenvalue λ = -ζωn + iωn√(1-ζ²):
//! - ωn = |λ|, ωd = Im λ
//! - ζ = -Re λ / |λ|
//! - log decrement δ = 2πζ / √(1-ζ²)
//!
//! An isotropic rotor at rest has every eigenvalue twice. The solver returns
//! an arbitrary basis of each two-dimensional eigenspace, so the orbit of a
//! single basis vector carries no whirl information. Such modes are flagged
//! `repeated` and classified `Planar` with κ = 0.

use faer::complex_native::c64;
use faer::linalg::solvers::Eigendecomposition;
use faer::Mat;
use log::{debug, warn};
use nalgebra::DMatrix;
use num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::modes::{classify_modes, node_orbit, Orbit};
use crate::rotor::Rotor;
use crate::types::{
    RotationSense, WhirlDirection, REAL_EIGENVALUE_TOL, REPEATED_EIGENVALUE_TOL,
};

/// One mode at a given speed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mode {
    /// Undamped natural frequency |λ| (rad/s).
    pub wn: f64,
    /// Damped natural frequency Im λ (rad/s).
    pub wd: f64,
    pub damping_ratio: f64,
    pub log_dec: f64,
    pub eigenvalue: Complex<f64>,
    /// Displacement part of the eigenvector over all global DOFs
    /// (zero at supported DOFs), unit 2-norm over the full state.
    pub shape: Vec<Complex<f64>>,
    pub whirl: WhirlDirection,
    /// κ at the node used for classification.
    pub kappa: f64,
    /// Eigenvalue shared with another mode (within a relative tolerance).
    pub repeated: bool,
}

impl Mode {
    pub fn is_unstable(&self, tolerance: f64) -> bool {
        self.damping_ratio < -tolerance
    }
}

/// Governing stability indicator of a modal result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stability {
    /// Index of the lowest-damped mode.
    pub governing_mode: usize,
    pub damping_ratio: f64,
    pub log_dec: f64,
    pub stable: bool,
}

/// Modes at one speed, sorted by ascending natural frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalResult {
    pub speed: f64,
    pub modes: Vec<Mode>,
    n_nodes: usize,
    rotation_sense: RotationSense,
    stability_tolerance: f64,
}

impl ModalResult {
    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    pub fn n_nodes(&self) -> usize {
        self.n_nodes
    }

    /// Natural frequencies ωn (rad/s).
    pub fn frequencies(&self) -> Vec<f64> {
        self.modes.iter().map(|m| m.wn).collect()
    }

    /// Damped natural frequencies ωd (rad/s).
    pub fn damped_frequencies(&self) -> Vec<f64> {
        self.modes.iter().map(|m| m.wd).collect()
    }

    pub fn damping_ratios(&self) -> Vec<f64> {
        self.modes.iter().map(|m| m.damping_ratio).collect()
    }

    pub fn whirl_directions(&self) -> Vec<WhirlDirection> {
        self.modes.iter().map(|m| m.whirl).collect()
    }

    /// Lowest-damped mode; unstable when its ζ is below -tolerance.
    pub fn stability(&self) -> Option<Stability> {
        let (idx, mode) = self
            .modes
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.damping_ratio.total_cmp(&b.1.damping_ratio))?;
        Some(Stability {
            governing_mode: idx,
            damping_ratio: mode.damping_ratio,
            log_dec: mode.log_dec,
            stable: !mode.is_unstable(self.stability_tolerance),
        })
    }

    /// Orbit of `node` in mode `mode`.
    pub fn kappa(&self, node: usize, mode: usize) -> Result<Orbit> {
        if node >= self.n_nodes {
            return Err(Error::InvalidInput(format!(
                "node {node} outside rotor with {} nodes",
                self.n_nodes
            )));
        }
        let m = self.mode(mode)?;
        let mut orbit = node_orbit(&m.shape, node, m.wd, self.rotation_sense);
        if m.repeated {
            orbit.kappa = 0.0;
        }
        Ok(orbit)
    }

    /// κ at every node for mode `mode`; all zero for a repeated mode.
    pub fn kappa_mode(&self, mode: usize) -> Result<Vec<f64>> {
        let m = self.mode(mode)?;
        if m.repeated {
            return Ok(vec![0.0; self.n_nodes]);
        }
        Ok((0..self.n_nodes)
            .map(|n| node_orbit(&m.shape, n, m.wd, self.rotation_sense).kappa)
            .collect())
    }

    fn mode(&self, mode: usize) -> Result<&Mode> {
        self.modes.get(mode).ok_or_else(|| {
            Error::InvalidInput(format!(
                "mode {mode} not available ({} modes computed)",
                self.modes.len()
            ))
        })
    }
}

/// Modal assurance criterion between two complex shapes.
///
/// MAC = |aᴴb|² / ((aᴴa)(bᴴb)); 1 for parallel shapes, 0 for orthogonal.
pub fn mac(a: &[Complex<f64>], b: &[Complex<f64>]) -> f64 {
    let ab: Complex<f64> = a.iter().zip(b).map(|(x, y)| x.conj() * y).sum();
    let aa: f64 = a.iter().map(|x| x.norm_sqr()).sum();
    let bb: f64 = b.iter().map(|x| x.norm_sqr()).sum();
    if aa == 0.0 || bb == 0.0 {
        return 0.0;
    }
    ab.norm_sqr() / (aa * bb)
}

/// Eigenvalues and eigenvectors (columns) of a real square matrix.
pub(crate) fn eigen_decompose(
    a: &DMatrix<f64>,
    speed: f64,
) -> Result<(Vec<Complex<f64>>, DMatrix<Complex<f64>>)> {
    if a.iter().any(|v| !v.is_finite()) {
        return Err(Error::EigenSolve {
            speed,
            reason: "state matrix has non-finite entries".into(),
        });
    }
    let n = a.nrows();
    let a_faer = Mat::<f64>::from_fn(n, n, |i, j| a[(i, j)]);
    let eig: Eigendecomposition<c64> = a_faer.eigendecomposition();
    let s = eig.s().column_vector();
    let u = eig.u();

    let values: Vec<Complex<f64>> = (0..n).map(|i| Complex::new(s[i].re, s[i].im)).collect();
    let vectors = DMatrix::from_fn(n, n, |i, j| Complex::new(u[(i, j)].re, u[(i, j)].im));

    if values.iter().any(|v| !v.re.is_finite() || !v.im.is_finite()) {
        return Err(Error::EigenSolve {
            speed,
            reason: "eigensolver did not converge".into(),
        });
    }
    Ok((values, vectors))
}

/// For each candidate, whether its eigenvalue coincides with another candidate.
///
/// `candidates` is sorted by |λ|, so only the neighbours with |λ| inside the
/// tolerance band need checking.
fn repeated_flags(values: &[Complex<f64>], candidates: &[usize]) -> Vec<bool> {
    candidates
        .iter()
        .enumerate()
        .map(|(k, &i)| {
            let lambda = values[i];
            let tol = REPEATED_EIGENVALUE_TOL * lambda.norm();
            let in_band = |j: &&usize| (values[**j].norm() - lambda.norm()).abs() <= tol;
            let coincides = |j: &usize| (values[*j] - lambda).norm() <= tol;
            let before = candidates[..k].iter().rev().take_while(in_band).any(coincides);
            let after = candidates[k + 1..].iter().take_while(in_band).any(coincides);
            before || after
        })
        .collect()
}

fn log_decrement(zeta: f64) -> f64 {
    if zeta.abs() >= 1.0 {
        f64::INFINITY * zeta.signum()
    } else {
        2.0 * std::f64::consts::PI * zeta / (1.0 - zeta * zeta).sqrt()
    }
}

impl Rotor {
    /// Solve the modal problem at `speed` (rad/s) and return the lowest `n_modes` modes.
    ///
    /// # Arguments
    /// * `speed` - Rotation speed (rad/s)
    /// * `n_modes` - Number of modes to return, sorted by ascending ωn
    ///
    /// # Returns
    /// `ModalResult`, or `EigenSolve` when fewer than `n_modes` modes exist
    pub fn modal(&self, speed: f64, n_modes: usize) -> Result<ModalResult> {
        if n_modes == 0 {
            return Err(Error::InvalidInput("n_modes must be at least 1".into()));
        }
        let config = self.config();
        let a = self.state_matrix(speed)?;
        let n_free = a.nrows() / 2;
        let free = self.free_dofs();
        let (values, vectors) = eigen_decompose(&a, speed)?;

        let mut rigid = 0;
        let mut candidates: Vec<usize> = Vec::with_capacity(n_free);
        for (i, lambda) in values.iter().enumerate() {
            let mag = lambda.norm();
            if mag < config.rigid_body_threshold {
                rigid += 1;
                continue;
            }
            // One of each conjugate pair; real eigenvalues are overdamped modes.
            if lambda.im >= -REAL_EIGENVALUE_TOL * mag {
                candidates.push(i);
            }
        }
        if rigid > 0 {
            warn!("discarded {rigid} rigid-body eigenvalues at {speed} rad/s");
        }
        candidates.sort_by(|&i, &j| {
            values[i]
                .norm()
                .total_cmp(&values[j].norm())
                .then(values[i].im.total_cmp(&values[j].im))
        });

        if candidates.len() < n_modes {
            return Err(Error::EigenSolve {
                speed,
                reason: format!(
                    "requested {n_modes} modes but only {} are available",
                    candidates.len()
                ),
            });
        }
        let mut repeated = repeated_flags(&values, &candidates);
        candidates.truncate(n_modes);
        repeated.truncate(n_modes);

        let shapes: Vec<Vec<Complex<f64>>> = candidates
            .iter()
            .map(|&j| {
                let col = vectors.column(j);
                let norm = col.iter().map(|c| c.norm_sqr()).sum::<f64>().sqrt();
                let scale = if norm > 0.0 { 1.0 / norm } else { 1.0 };
                let reduced: Vec<Complex<f64>> =
                    (0..n_free).map(|i| col[i] * scale).collect();
                self.expand(&reduced, &free)
            })
            .collect();
        let whirl = classify_modes(&shapes, self.n_nodes(), config);

        let modes: Vec<Mode> = candidates
            .iter()
            .zip(shapes)
            .zip(whirl)
            .zip(repeated)
            .map(|(((&j, shape), (whirl, kappa)), repeated)| {
                let (whirl, kappa) = if repeated {
                    (WhirlDirection::Planar, 0.0)
                } else {
                    (whirl, kappa)
                };
                let lambda = values[j];
                let wn = lambda.norm();
                let zeta = -lambda.re / wn;
                Mode {
                    wn,
                    wd: lambda.im.abs(),
                    damping_ratio: zeta,
                    log_dec: log_decrement(zeta),
                    eigenvalue: lambda,
                    shape,
                    whirl,
                    kappa,
                    repeated,
                }
            })
            .collect();

        debug!(
            "modal at {speed} rad/s: {:?}",
            modes.iter().map(|m| m.wn).collect::<Vec<_>>()
        );

        Ok(ModalResult {
            speed,
            modes,
            n_nodes: self.n_nodes(),
            rotation_sense: config.rotation_sense,
            stability_tolerance: config.stability_tolerance,
        })
    }
}
