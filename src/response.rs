//! Steady-state harmonic response.
//!
//! For each excitation frequency ω the complex dynamic stiffness
//!
//! ```text
//! Z(ω, Ω) = K(Ω) - ω²M + iω(C(Ω) + ΩG)
//! ```
//!
//! is factored with LU and solved for the complex amplitude `x = Z⁻¹F`.
//! The running speed Ω either follows the excitation (synchronous, unbalance)
//! or stays fixed while ω sweeps.
//!
//! ## Parallelization
//!
//! When the `parallel` feature is enabled, frequencies are solved in parallel
//! using Rayon.

use log::{debug, info};
use nalgebra::{DMatrix, DVector};
use num_complex::Complex;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::rotor::{Rotor, SystemMatrices};
use crate::types::{global_dof, X_DOF, Y_DOF};

/// Harmonic force `amplitude · e^{i(ωt + phase)}` on one global DOF.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HarmonicForce {
    pub dof: usize,
    /// N (or N·m for rotational DOFs).
    pub amplitude: f64,
    /// rad
    pub phase: f64,
}

impl HarmonicForce {
    pub fn new(dof: usize, amplitude: f64, phase: f64) -> Self {
        Self {
            dof,
            amplitude,
            phase,
        }
    }

    fn phasor(&self) -> Complex<f64> {
        Complex::from_polar(self.amplitude, self.phase)
    }
}

/// Running speed used while sweeping the excitation frequency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SpeedSchedule {
    /// Ω = ω
    Synchronous,
    /// Ω held fixed (rad/s).
    Fixed(f64),
}

impl SpeedSchedule {
    pub fn speed_at(self, frequency: f64) -> f64 {
        match self {
            SpeedSchedule::Synchronous => frequency,
            SpeedSchedule::Fixed(speed) => speed,
        }
    }
}

/// Complex response at the probe DOFs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyResponse {
    /// Excitation frequencies (rad/s).
    pub frequencies: Vec<f64>,
    /// Global DOFs of the rows of `response`.
    pub probes: Vec<usize>,
    /// Complex amplitude, one row per probe and one column per frequency.
    pub response: DMatrix<Complex<f64>>,
}

impl FrequencyResponse {
    /// |x| per probe per frequency.
    pub fn magnitude(&self) -> DMatrix<f64> {
        self.response.map(|c| c.norm())
    }

    /// 20·log10|x|.
    pub fn magnitude_db(&self) -> DMatrix<f64> {
        self.response.map(|c| 20.0 * c.norm().log10())
    }

    /// Phase angle in (-π, π].
    pub fn phase(&self) -> DMatrix<f64> {
        self.response.map(|c| c.arg())
    }

    /// Complex response of one probe DOF over all frequencies.
    pub fn probe(&self, dof: usize) -> Option<Vec<Complex<f64>>> {
        let row = self.probes.iter().position(|&p| p == dof)?;
        Some(self.response.row(row).iter().copied().collect())
    }
}

fn validate_frequencies(frequencies: &[f64]) -> Result<()> {
    if frequencies.is_empty() {
        return Err(Error::InvalidInput("frequency list is empty".into()));
    }
    if let Some(bad) = frequencies.iter().find(|f| !f.is_finite()) {
        return Err(Error::InvalidInput(format!("non-finite frequency {bad}")));
    }
    Ok(())
}

/// Solve `Z x = f` at one frequency over the free DOFs.
fn solve_harmonic(
    sys: &SystemMatrices,
    force: &DVector<Complex<f64>>,
    frequency: f64,
    speed: f64,
) -> Result<DVector<Complex<f64>>> {
    let n = sys.n_dofs();
    let w = frequency;
    let z = DMatrix::from_fn(n, n, |i, j| {
        Complex::new(
            sys.k[(i, j)] - w * w * sys.m[(i, j)],
            w * (sys.c[(i, j)] + speed * sys.g[(i, j)]),
        )
    });
    let x = z
        .lu()
        .solve(force)
        .ok_or(Error::SingularSystem { frequency, speed })?;
    if x.iter().any(|c| !c.re.is_finite() || !c.im.is_finite()) {
        return Err(Error::SingularSystem { frequency, speed });
    }
    Ok(x)
}

impl Rotor {
    /// Steady-state response to harmonic forces.
    ///
    /// # Arguments
    /// * `forces` - Harmonic forces at global DOFs
    /// * `frequencies` - Excitation frequencies (rad/s)
    /// * `probes` - Global DOFs to report; empty means every DOF
    /// * `schedule` - Running speed during the sweep
    ///
    /// # Returns
    /// `FrequencyResponse` with one row per probe
    pub fn frequency_response(
        &self,
        forces: &[HarmonicForce],
        frequencies: &[f64],
        probes: &[usize],
        schedule: SpeedSchedule,
    ) -> Result<FrequencyResponse> {
        validate_frequencies(frequencies)?;
        for f in forces {
            self.check_dof(f.dof)?;
        }
        for &p in probes {
            self.check_dof(p)?;
        }
        let probes: Vec<usize> = if probes.is_empty() {
            (0..self.n_dofs()).collect()
        } else {
            probes.to_vec()
        };

        let mut full_force = vec![Complex::new(0.0, 0.0); self.n_dofs()];
        for f in forces {
            full_force[f.dof] += f.phasor();
        }
        let shape = move |_: f64| full_force.clone();
        let columns = self.sweep(frequencies, schedule, &shape)?;

        let response = DMatrix::from_fn(probes.len(), frequencies.len(), |r, c| {
            columns[c][probes[r]]
        });
        info!(
            "frequency response: {} frequencies, {} probes",
            frequencies.len(),
            probes.len()
        );
        Ok(FrequencyResponse {
            frequencies: frequencies.to_vec(),
            probes,
            response,
        })
    }

    /// Synchronous response to an unbalance `unbalance` (kg·m) at `node`.
    ///
    /// The rotating force `me·ω²` acts on both translational DOFs with y
    /// lagging x by 90° in the rotation sense.
    pub fn unbalance_response(
        &self,
        node: usize,
        unbalance: f64,
        phase: f64,
        frequencies: &[f64],
        probes: &[usize],
    ) -> Result<FrequencyResponse> {
        validate_frequencies(frequencies)?;
        if node >= self.n_nodes() {
            return Err(Error::InvalidDof {
                dof: global_dof(node, X_DOF),
                n_dofs: self.n_dofs(),
            });
        }
        for &p in probes {
            self.check_dof(p)?;
        }
        let probes: Vec<usize> = if probes.is_empty() {
            (0..self.n_dofs()).collect()
        } else {
            probes.to_vec()
        };

        let n_dofs = self.n_dofs();
        let sense = self.config().rotation_sense.sign();
        let x_dof = global_dof(node, X_DOF);
        let y_dof = global_dof(node, Y_DOF);
        let shape = move |w: f64| {
            let mut f = vec![Complex::new(0.0, 0.0); n_dofs];
            let amp = unbalance * w * w;
            f[x_dof] = Complex::from_polar(amp, phase);
            f[y_dof] = Complex::from_polar(amp, phase - sense * std::f64::consts::FRAC_PI_2);
            f
        };
        let columns = self.sweep(frequencies, SpeedSchedule::Synchronous, &shape)?;

        let response = DMatrix::from_fn(probes.len(), frequencies.len(), |r, c| {
            columns[c][probes[r]]
        });
        Ok(FrequencyResponse {
            frequencies: frequencies.to_vec(),
            probes,
            response,
        })
    }

    /// Full-length response vectors, one per frequency.
    fn sweep<F>(
        &self,
        frequencies: &[f64],
        schedule: SpeedSchedule,
        force: &F,
    ) -> Result<Vec<Vec<Complex<f64>>>>
    where
        F: Fn(f64) -> Vec<Complex<f64>> + Sync,
    {
        let free = self.free_dofs();
        let fixed = match schedule {
            SpeedSchedule::Fixed(speed) => Some(self.reduced_system(speed)?),
            SpeedSchedule::Synchronous => None,
        };

        let solve_one = |&w: &f64| -> Result<Vec<Complex<f64>>> {
            let speed = schedule.speed_at(w);
            let owned;
            let sys = match &fixed {
                Some(sys) => sys,
                None => {
                    owned = self.reduced_system(speed)?;
                    &owned
                }
            };
            let full = force(w);
            let rhs = DVector::from_iterator(free.len(), free.iter().map(|&d| full[d]));
            let x = solve_harmonic(sys, &rhs, w, speed)?;
            debug!("harmonic solve at ω = {w} rad/s, Ω = {speed} rad/s");
            Ok(self.expand(x.as_slice(), &free))
        };

        #[cfg(feature = "parallel")]
        {
            frequencies.par_iter().map(solve_one).collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            frequencies.iter().map(solve_one).collect()
        }
    }
}
