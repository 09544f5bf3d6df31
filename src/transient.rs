//! Time-domain response.
//!
//! Integrates `M ü + (C + ΩG) u̇ + K u = F(t)` at a fixed speed Ω over a
//! caller-supplied time vector. Two integrators are available:
//!
//! - Newmark-β direct integration of the second-order system (average
//!   acceleration by default, unconditionally stable).
//! - Modal superposition on the complete complex state-space basis
//!   `A = Φ Λ Φ⁻¹`. Each modal coordinate obeys `q̇ = λq + p(t)` and is
//!   advanced exactly for loads varying linearly between samples:
//!
//! ```text
//! q(k+1) = e^{λh} q(k) + (c0 - c1) p(k) + c1 p(k+1)
//! c0 = (e^{λh} - 1) / λ
//! c1 = (c0 - h) / (λ h)
//! ```

use log::{debug, info};
use nalgebra::{DMatrix, DVector};
use num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::config::NewmarkParameters;
use crate::error::{Error, Result};
use crate::modal::eigen_decompose;
use crate::rotor::{invert_mass, state_matrix_from, Rotor, SystemMatrices};
use crate::types::SERIES_SWITCH;

/// Tolerance on `Φ⁻¹Φ - I` before the modal basis is considered defective.
const BASIS_RESIDUAL_TOL: f64 = 1e-6;

/// Force samples on one global DOF, aligned with the time vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadHistory {
    pub dof: usize,
    /// N (or N·m), one value per time sample.
    pub values: Vec<f64>,
}

impl LoadHistory {
    pub fn new(dof: usize, values: Vec<f64>) -> Self {
        Self { dof, values }
    }

    /// Sample `f(t)` on `time`.
    pub fn from_fn(dof: usize, time: &[f64], f: impl Fn(f64) -> f64) -> Self {
        Self {
            dof,
            values: time.iter().map(|&t| f(t)).collect(),
        }
    }
}

/// Initial displacement and velocity over all global DOFs.
///
/// Empty vectors mean zero. Values at supported DOFs are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InitialConditions {
    pub displacement: Vec<f64>,
    pub velocity: Vec<f64>,
}

impl InitialConditions {
    /// System at rest.
    pub fn at_rest() -> Self {
        Self::default()
    }
}

/// Time integration scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeIntegration {
    #[default]
    Newmark,
    ModalSuperposition,
}

/// Displacement and velocity histories at the probe DOFs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeResponse {
    pub time: Vec<f64>,
    pub probes: Vec<usize>,
    /// One row per probe, one column per time sample.
    pub displacement: DMatrix<f64>,
    pub velocity: DMatrix<f64>,
}

impl TimeResponse {
    /// Displacement history of one probe DOF.
    pub fn displacement_of(&self, dof: usize) -> Option<Vec<f64>> {
        let row = self.probes.iter().position(|&p| p == dof)?;
        Some(self.displacement.row(row).iter().copied().collect())
    }

    /// Largest absolute displacement over all probes and samples.
    pub fn peak_displacement(&self) -> f64 {
        self.displacement.iter().fold(0.0, |acc, v| acc.max(v.abs()))
    }
}

fn validate_time(time: &[f64]) -> Result<()> {
    if time.len() < 2 {
        return Err(Error::InvalidInput(format!(
            "time vector needs at least two samples, got {}",
            time.len()
        )));
    }
    if let Some(bad) = time.iter().find(|t| !t.is_finite()) {
        return Err(Error::InvalidInput(format!("non-finite time sample {bad}")));
    }
    if let Some(i) = (1..time.len()).find(|&i| time[i] <= time[i - 1]) {
        return Err(Error::InvalidInput(format!(
            "non-positive time step at sample {i} ({} -> {})",
            time[i - 1],
            time[i]
        )));
    }
    Ok(())
}

fn initial_vector(
    values: &[f64],
    n_dofs: usize,
    free: &[usize],
    name: &str,
) -> Result<DVector<f64>> {
    if values.is_empty() {
        return Ok(DVector::zeros(free.len()));
    }
    if values.len() != n_dofs {
        return Err(Error::InvalidInput(format!(
            "initial {name} has {} entries, rotor has {n_dofs} dofs",
            values.len()
        )));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(Error::InvalidInput(format!("initial {name} has non-finite entries")));
    }
    Ok(DVector::from_iterator(free.len(), free.iter().map(|&d| values[d])))
}

/// Reduced force vectors, one per time sample.
struct ForceSamples {
    samples: Vec<DVector<f64>>,
}

impl ForceSamples {
    fn build(loads: &[LoadHistory], n_samples: usize, free: &[usize]) -> Self {
        let samples = (0..n_samples)
            .map(|k| {
                DVector::from_iterator(
                    free.len(),
                    free.iter().map(|&d| {
                        loads
                            .iter()
                            .filter(|l| l.dof == d)
                            .map(|l| l.values[k])
                            .sum::<f64>()
                    }),
                )
            })
            .collect();
        Self { samples }
    }

    fn at(&self, k: usize) -> &DVector<f64> {
        &self.samples[k]
    }
}

/// Reduced-state histories `(u, v)` per time sample.
type States = (Vec<DVector<f64>>, Vec<DVector<f64>>);

impl Rotor {
    /// Time response at constant `speed` (rad/s).
    ///
    /// # Arguments
    /// * `speed` - Rotation speed (rad/s)
    /// * `loads` - Force histories sampled on `time`
    /// * `time` - Strictly increasing time samples (s)
    /// * `initial` - Initial displacement and velocity
    /// * `probes` - Global DOFs to report; empty means every DOF
    /// * `method` - Integration scheme
    ///
    /// # Returns
    /// `TimeResponse` with displacement and velocity per probe
    pub fn time_response(
        &self,
        speed: f64,
        loads: &[LoadHistory],
        time: &[f64],
        initial: &InitialConditions,
        probes: &[usize],
        method: TimeIntegration,
    ) -> Result<TimeResponse> {
        validate_time(time)?;
        for load in loads {
            self.check_dof(load.dof)?;
            if load.values.len() != time.len() {
                return Err(Error::InvalidInput(format!(
                    "load on dof {} has {} samples for {} time points",
                    load.dof,
                    load.values.len(),
                    time.len()
                )));
            }
            if load.values.iter().any(|v| !v.is_finite()) {
                return Err(Error::InvalidInput(format!(
                    "load on dof {} has non-finite samples",
                    load.dof
                )));
            }
        }
        for &p in probes {
            self.check_dof(p)?;
        }
        let probes: Vec<usize> = if probes.is_empty() {
            (0..self.n_dofs()).collect()
        } else {
            probes.to_vec()
        };

        let free = self.free_dofs();
        let u0 = initial_vector(&initial.displacement, self.n_dofs(), &free, "displacement")?;
        let v0 = initial_vector(&initial.velocity, self.n_dofs(), &free, "velocity")?;
        let forces = ForceSamples::build(loads, time.len(), &free);
        let sys = self.reduced_system(speed)?;

        let config = self.config();
        let (u, v) = match method {
            TimeIntegration::Newmark => {
                newmark(&sys, speed, config.newmark, time, &forces, u0, v0)?
            }
            TimeIntegration::ModalSuperposition => {
                let threshold = config.rigid_body_threshold;
                modal_superposition(&sys, speed, threshold, time, &forces, u0, v0)?
            }
        };

        // probe rows in the reduced numbering; supported DOFs stay zero
        let rows: Vec<Option<usize>> = probes.iter().map(|p| free.binary_search(p).ok()).collect();
        let gather = |states: &[DVector<f64>]| {
            DMatrix::from_fn(probes.len(), time.len(), |r, c| {
                rows[r].map_or(0.0, |i| states[c][i])
            })
        };
        let displacement = gather(&u);
        let velocity = gather(&v);

        info!(
            "time response ({method:?}): {} samples, {} probes, Ω = {speed} rad/s",
            time.len(),
            probes.len()
        );
        Ok(TimeResponse {
            time: time.to_vec(),
            probes,
            displacement,
            velocity,
        })
    }
}

/// Newmark-β integration over the reduced system.
fn newmark(
    sys: &SystemMatrices,
    speed: f64,
    params: NewmarkParameters,
    time: &[f64],
    forces: &ForceSamples,
    u0: DVector<f64>,
    v0: DVector<f64>,
) -> Result<States> {
    let NewmarkParameters { beta, gamma } = params;
    if beta <= 0.0 || gamma <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "Newmark parameters must be positive (beta = {beta}, gamma = {gamma})"
        )));
    }
    let m = &sys.m;
    let k = &sys.k;
    let d = sys.velocity_matrix(speed);

    let a0_rhs = forces.at(0) - &d * &v0 - k * &u0;
    let mut a = m
        .clone()
        .lu()
        .solve(&a0_rhs)
        .ok_or_else(|| Error::InvalidInput("mass matrix is singular".into()))?;
    let mut u = u0;
    let mut v = v0;

    let mut us = Vec::with_capacity(time.len());
    let mut vs = Vec::with_capacity(time.len());
    us.push(u.clone());
    vs.push(v.clone());

    let mut factored: Option<(f64, nalgebra::LU<f64, nalgebra::Dyn, nalgebra::Dyn>)> = None;
    for step in 1..time.len() {
        let h = time[step] - time[step - 1];
        let refactor = factored
            .as_ref()
            .map_or(true, |(h_prev, _)| (h - h_prev).abs() > 1e-12 * h);
        if refactor {
            let k_eff = k + &d * (gamma / (beta * h)) + m * (1.0 / (beta * h * h));
            debug!("newmark: factoring effective stiffness for h = {h:e} s");
            factored = Some((h, k_eff.lu()));
        }
        let lu = match &factored {
            Some((_, lu)) => lu,
            None => continue,
        };

        let rhs = forces.at(step)
            + m * (&u * (1.0 / (beta * h * h)) + &v * (1.0 / (beta * h)) + &a * (0.5 / beta - 1.0))
            + &d * (&u * (gamma / (beta * h))
                + &v * (gamma / beta - 1.0)
                + &a * (h * (0.5 * gamma / beta - 1.0)));
        let u_next = lu.solve(&rhs).ok_or_else(|| {
            Error::InvalidInput(format!("effective stiffness is singular for step {h:e} s"))
        })?;
        let a_next = (&u_next - &u) * (1.0 / (beta * h * h))
            - &v * (1.0 / (beta * h))
            - &a * (0.5 / beta - 1.0);
        v += (&a * (1.0 - gamma) + &a_next * gamma) * h;
        u = u_next;
        a = a_next;

        us.push(u.clone());
        vs.push(v.clone());
    }
    Ok((us, vs))
}

/// Exact-integration coefficients `(e^{λh}, c0, c1)`.
fn step_coefficients(lambda: Complex<f64>, h: f64) -> (Complex<f64>, Complex<f64>, Complex<f64>) {
    let x = lambda * h;
    let e = x.exp();
    if x.norm() < SERIES_SWITCH {
        let c0 = (1.0 + x * (0.5 + x * (1.0 / 6.0 + x / 24.0))) * h;
        let c1 = (0.5 + x * (1.0 / 6.0 + x * (1.0 / 24.0 + x / 120.0))) * h;
        (e, c0, c1)
    } else {
        let c0 = (e - 1.0) / lambda;
        let c1 = (c0 - h) / x;
        (e, c0, c1)
    }
}

/// Modal superposition over the complete state-space basis.
fn modal_superposition(
    sys: &SystemMatrices,
    speed: f64,
    rigid_body_threshold: f64,
    time: &[f64],
    forces: &ForceSamples,
    u0: DVector<f64>,
    v0: DVector<f64>,
) -> Result<States> {
    let n = sys.n_dofs();
    let a = state_matrix_from(sys, speed)?;
    let (lambdas, phi) = eigen_decompose(&a, speed)?;

    if let Some(l) = lambdas.iter().find(|l| l.norm() < rigid_body_threshold) {
        return Err(Error::EigenSolve {
            speed,
            reason: format!("rigid-body eigenvalue {l} leaves the modal basis defective"),
        });
    }
    let phi_inv = phi.clone().lu().try_inverse().ok_or_else(|| Error::EigenSolve {
        speed,
        reason: "modal basis is singular".into(),
    })?;
    let residual = (&phi_inv * &phi - DMatrix::<Complex<f64>>::identity(2 * n, 2 * n)).norm();
    if !residual.is_finite() || residual > BASIS_RESIDUAL_TOL * (2 * n) as f64 {
        return Err(Error::EigenSolve {
            speed,
            reason: format!("modal basis is defective (residual {residual:e})"),
        });
    }

    let to_complex = |m: &DMatrix<f64>| m.map(|v| Complex::new(v, 0.0));
    let m_inv = to_complex(&invert_mass(&sys.m, speed)?);
    let w = phi_inv.columns(n, n) * m_inv;
    let modal_force = |f: &DVector<f64>| &w * f.map(|v| Complex::new(v, 0.0));

    let mut z0 = DVector::<Complex<f64>>::zeros(2 * n);
    for i in 0..n {
        z0[i] = Complex::new(u0[i], 0.0);
        z0[n + i] = Complex::new(v0[i], 0.0);
    }
    let mut q = &phi_inv * z0;
    let mut p = modal_force(forces.at(0));

    let split = |q: &DVector<Complex<f64>>| {
        let z = &phi * q;
        let u = DVector::from_fn(n, |i, _| z[i].re);
        let v = DVector::from_fn(n, |i, _| z[n + i].re);
        (u, v)
    };

    let mut us = Vec::with_capacity(time.len());
    let mut vs = Vec::with_capacity(time.len());
    us.push(u0);
    vs.push(v0);

    let mut coeffs: Option<(f64, Vec<(Complex<f64>, Complex<f64>, Complex<f64>)>)> = None;
    for step in 1..time.len() {
        let h = time[step] - time[step - 1];
        let recompute = coeffs
            .as_ref()
            .map_or(true, |(h_prev, _)| (h - h_prev).abs() > 1e-12 * h);
        if recompute {
            coeffs = Some((h, lambdas.iter().map(|&l| step_coefficients(l, h)).collect()));
        }
        let table = match &coeffs {
            Some((_, table)) => table,
            None => continue,
        };

        let p_next = modal_force(forces.at(step));
        for (j, &(e, c0, c1)) in table.iter().enumerate() {
            q[j] = e * q[j] + (c0 - c1) * p[j] + c1 * p_next[j];
        }
        p = p_next;

        let (u, v) = split(&q);
        us.push(u);
        vs.push(v);
    }
    Ok((us, vs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bearing::BearingElement;
    use crate::disk::DiskElement;
    use crate::material::Material;
    use crate::rotor::rotor_example;
    use crate::shaft::ShaftElement;

    fn damped_rotor() -> Rotor {
        let steel = Material::steel();
        let shafts = (0..2)
            .map(|n| ShaftElement::timoshenko(n, 0.25, 0.0, 0.05, steel.clone()).unwrap())
            .collect();
        let disk = DiskElement::from_geometry(1, &steel, 0.07, 0.05, 0.28).unwrap();
        let bearings = vec![
            BearingElement::new(0, 1e6, 200.0),
            BearingElement::new(2, 1e6, 200.0),
        ];
        Rotor::from_parts(shafts, vec![disk], bearings).unwrap()
    }

    fn linspace(end: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| end * i as f64 / (n - 1) as f64).collect()
    }

    #[test]
    fn newmark_agrees_with_modal_superposition() {
        let rotor = damped_rotor();
        let time = linspace(0.05, 2001);
        let load = LoadHistory::from_fn(4, &time, |t| 100.0 * (1.0 - (100.0 * t).cos()));
        let run = |method| {
            rotor
                .time_response(500.0, &[load.clone()], &time, &InitialConditions::at_rest(), &[4, 5], method)
                .unwrap()
        };
        let direct = run(TimeIntegration::Newmark);
        let modal = run(TimeIntegration::ModalSuperposition);
        let peak = direct.peak_displacement();
        assert!(peak > 0.0);
        let diff = (&direct.displacement - &modal.displacement).amax();
        assert!(diff < 1e-2 * peak, "max difference {diff} vs peak {peak}");
        assert_eq!(modal.displacement_of(5).unwrap().len(), time.len());
    }

    #[test]
    fn zero_input_stays_at_rest() {
        let rotor = rotor_example().unwrap();
        let time = linspace(0.01, 101);
        for method in [TimeIntegration::Newmark, TimeIntegration::ModalSuperposition] {
            let resp = rotor
                .time_response(100.0, &[], &time, &InitialConditions::at_rest(), &[], method)
                .unwrap();
            assert_eq!(resp.displacement.shape(), (12, 101));
            assert!(resp.peak_displacement() < 1e-14);
        }
    }

    #[test]
    fn free_vibration_decays_with_damping() {
        let rotor = damped_rotor();
        let time = linspace(1.0, 4001);
        // static deflection under a midspan load, dominated by the first mode
        let k = rotor.system_matrices(0.0).unwrap().k;
        let mut f = DVector::<f64>::zeros(rotor.n_dofs());
        f[4] = 100.0;
        let x0 = k.lu().solve(&f).unwrap();
        let start = x0[4];
        let initial = InitialConditions {
            displacement: x0.iter().copied().collect(),
            velocity: Vec::new(),
        };
        let resp = rotor
            .time_response(0.0, &[], &time, &initial, &[4], TimeIntegration::ModalSuperposition)
            .unwrap();
        let x = resp.displacement_of(4).unwrap();
        assert!((x[0] - start).abs() < 1e-12 * start.abs());
        let tail = x[3500..].iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        assert!(tail < 0.5 * start.abs());
    }

    #[test]
    fn variable_step_is_handled() {
        let rotor = damped_rotor();
        let mut time = linspace(0.01, 201);
        time.extend(linspace(0.01, 101).into_iter().skip(1).map(|t| 0.01 + t));
        let load = LoadHistory::from_fn(4, &time, |t| 10.0 * t);
        let run = |method| {
            rotor
                .time_response(0.0, &[load.clone()], &time, &InitialConditions::at_rest(), &[4], method)
                .unwrap()
        };
        let direct = run(TimeIntegration::Newmark);
        let modal = run(TimeIntegration::ModalSuperposition);
        let peak = modal.peak_displacement();
        assert!((&direct.displacement - &modal.displacement).amax() < 2e-2 * peak);
    }

    #[test]
    fn step_coefficients_match_series_near_zero() {
        let lambda = Complex::new(-2.0, 300.0);
        let h = 1e-3;
        let (_, c0, c1) = step_coefficients(lambda, h);
        let (_, s0, s1) = step_coefficients(lambda, 2e-6);
        assert!((c0 - (((lambda * h).exp() - 1.0) / lambda)).norm() < 1e-15);
        assert!((c1 - (c0 - h) / (lambda * h)).norm() < 1e-15);
        // below the switch the series gives ≈ h and h/2
        assert!((s0 - 2e-6).norm() < 1e-8);
        assert!((s1 - 1e-6).norm() < 1e-8);
    }

    #[test]
    fn invalid_inputs() {
        let rotor = rotor_example().unwrap();
        let rest = InitialConditions::at_rest();
        let nm = TimeIntegration::Newmark;
        assert!(matches!(
            rotor.time_response(0.0, &[], &[0.0], &rest, &[], nm),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            rotor.time_response(0.0, &[], &[0.0, 0.1, 0.1], &rest, &[], nm),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            rotor.time_response(0.0, &[], &[0.0, f64::NAN], &rest, &[], nm),
            Err(Error::InvalidInput(_))
        ));
        let short = LoadHistory::new(0, vec![1.0]);
        assert!(matches!(
            rotor.time_response(0.0, &[short], &[0.0, 0.1], &rest, &[], nm),
            Err(Error::InvalidInput(_))
        ));
        let bad_dof = LoadHistory::new(99, vec![1.0, 1.0]);
        assert!(matches!(
            rotor.time_response(0.0, &[bad_dof], &[0.0, 0.1], &rest, &[], nm),
            Err(Error::InvalidDof { dof: 99, .. })
        ));
        // rotor_example has 12 dofs
        for method in [nm, TimeIntegration::ModalSuperposition] {
            assert!(matches!(
                rotor.time_response(0.0, &[], &[0.0, 0.1], &rest, &[3, 12], method),
                Err(Error::InvalidDof { dof: 12, n_dofs: 12 })
            ));
        }
        let bad_initial = InitialConditions {
            displacement: vec![0.0; 3],
            velocity: Vec::new(),
        };
        assert!(matches!(
            rotor.time_response(0.0, &[], &[0.0, 0.1], &bad_initial, &[], nm),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn free_rotor_modal_superposition_is_rejected() {
        let rotor = Rotor::uniform_shaft(1.0, 0.0, 0.05, Material::steel(), 2, false).unwrap();
        let time = linspace(0.01, 11);
        let result = rotor.time_response(
            0.0,
            &[],
            &time,
            &InitialConditions::at_rest(),
            &[],
            TimeIntegration::ModalSuperposition,
        );
        assert!(matches!(result, Err(Error::EigenSolve { .. })));
        // direct integration has no such restriction
        assert!(rotor
            .time_response(0.0, &[], &time, &InitialConditions::at_rest(), &[], TimeIntegration::Newmark)
            .is_ok());
    }
}
