//! Campbell diagrams and critical speeds.
//!
//! A Campbell diagram tabulates the lowest natural frequencies over a sweep of
//! rotation speeds. A critical speed lies where a forward-whirl curve crosses
//! the excitation line ω = order·Ω; crossings are bracketed from sign
//! changes of `f(Ω) = ωk(Ω) - order·Ω` between adjacent samples.
//!
//! A pair of samples counts when one end whirls forward and neither end
//! whirls backward; zero-speed modes are planar. A crossing that falls exactly
//! on a sample is attributed to the interval ending at that sample, or to the
//! first interval for the first sample.
//!
//! ## Parallelization
//!
//! When the `parallel` feature is enabled, the speed sweep is parallelized
//! using Rayon. Each speed builds its own working matrices from the shared
//! rotor.

use log::{debug, info, warn};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::modal::ModalResult;
use crate::rotor::Rotor;
use crate::types::WhirlDirection;

/// Natural frequencies over a speed sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampbellDiagram {
    /// Rotation speeds (rad/s).
    pub speeds: Vec<f64>,
    /// ωn (rad/s), one row per mode and one column per speed.
    pub frequencies: DMatrix<f64>,
    /// Damping ratios, same layout as `frequencies`.
    pub damping: DMatrix<f64>,
    /// Whirl direction `whirl[speed][mode]`.
    pub whirl: Vec<Vec<WhirlDirection>>,
}

/// Crossing of a forward-whirl curve with ω = order·Ω.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalSpeed {
    /// Mode index (row of the diagram).
    pub mode: usize,
    /// Rotation speed at the crossing (rad/s).
    pub speed: f64,
    /// Natural frequency at the crossing (rad/s).
    pub frequency: f64,
}

/// Bracket `[lo, hi]` of a sign change for mode `mode`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bracket {
    mode: usize,
    lo: usize,
    hi: usize,
}

impl CampbellDiagram {
    fn from_results(speeds: &[f64], results: &[ModalResult], n_modes: usize) -> Self {
        let n_speeds = speeds.len();
        let frequencies = DMatrix::from_fn(n_modes, n_speeds, |k, i| results[i].modes[k].wn);
        let damping =
            DMatrix::from_fn(n_modes, n_speeds, |k, i| results[i].modes[k].damping_ratio);
        let whirl = results.iter().map(ModalResult::whirl_directions).collect();
        Self {
            speeds: speeds.to_vec(),
            frequencies,
            damping,
            whirl,
        }
    }

    pub fn n_modes(&self) -> usize {
        self.frequencies.nrows()
    }

    pub fn n_speeds(&self) -> usize {
        self.speeds.len()
    }

    /// Frequency curve of mode `mode` over the sweep.
    pub fn curve(&self, mode: usize) -> Option<Vec<f64>> {
        (mode < self.n_modes()).then(|| self.frequencies.row(mode).iter().copied().collect())
    }

    /// Synchronous critical speeds (ω = Ω) by linear interpolation.
    pub fn critical_speeds(&self) -> Vec<CriticalSpeed> {
        self.critical_speeds_for_order(1.0)
    }

    /// Critical speeds for excitation at `order` times the running speed.
    pub fn critical_speeds_for_order(&self, order: f64) -> Vec<CriticalSpeed> {
        self.brackets(order)
            .into_iter()
            .map(|b| {
                let (s0, s1) = (self.speeds[b.lo], self.speeds[b.hi]);
                let (w0, w1) = (
                    self.frequencies[(b.mode, b.lo)],
                    self.frequencies[(b.mode, b.hi)],
                );
                let (f0, f1) = (w0 - order * s0, w1 - order * s1);
                let t = if f0 == f1 { 0.0 } else { f0 / (f0 - f1) };
                CriticalSpeed {
                    mode: b.mode,
                    speed: s0 + t * (s1 - s0),
                    frequency: w0 + t * (w1 - w0),
                }
            })
            .collect()
    }

    /// Sign changes of ωk - order·Ω between adjacent samples on forward curves.
    fn brackets(&self, order: f64) -> Vec<Bracket> {
        let mut out = Vec::new();
        for mode in 0..self.n_modes() {
            for i in 1..self.n_speeds() {
                let ends = [self.whirl[i - 1][mode], self.whirl[i][mode]];
                let forward = ends.contains(&WhirlDirection::Forward)
                    && !ends.contains(&WhirlDirection::Backward);
                if !forward {
                    continue;
                }
                let f0 = self.frequencies[(mode, i - 1)] - order * self.speeds[i - 1];
                let f1 = self.frequencies[(mode, i)] - order * self.speeds[i];
                if f0 * f1 < 0.0 || f1 == 0.0 || (i == 1 && f0 == 0.0) {
                    out.push(Bracket {
                        mode,
                        lo: i - 1,
                        hi: i,
                    });
                }
            }
        }
        out
    }
}

fn validate_speeds(speeds: &[f64]) -> Result<()> {
    if speeds.is_empty() {
        return Err(Error::InvalidInput("speed list is empty".into()));
    }
    if let Some(bad) = speeds.iter().find(|s| !s.is_finite()) {
        return Err(Error::InvalidInput(format!("non-finite speed {bad}")));
    }
    Ok(())
}

/// Modal results at every speed (sequential).
#[cfg_attr(feature = "parallel", allow(dead_code))]
fn sweep_sequential(rotor: &Rotor, speeds: &[f64], n_modes: usize) -> Result<Vec<ModalResult>> {
    speeds.iter().map(|&s| rotor.modal(s, n_modes)).collect()
}

/// Modal results at every speed, computed in parallel.
#[cfg(feature = "parallel")]
fn sweep_parallel(rotor: &Rotor, speeds: &[f64], n_modes: usize) -> Result<Vec<ModalResult>> {
    speeds.par_iter().map(|&s| rotor.modal(s, n_modes)).collect()
}

impl Rotor {
    /// Campbell diagram over `speeds` (rad/s) for the lowest `n_modes` modes.
    ///
    /// Fails with the first `EigenSolve` error encountered, tagged with its speed.
    pub fn campbell(&self, speeds: &[f64], n_modes: usize) -> Result<CampbellDiagram> {
        validate_speeds(speeds)?;

        #[cfg(feature = "parallel")]
        let results = sweep_parallel(self, speeds, n_modes)?;
        #[cfg(not(feature = "parallel"))]
        let results = sweep_sequential(self, speeds, n_modes)?;

        info!(
            "campbell diagram: {} speeds, {} modes",
            speeds.len(),
            n_modes
        );
        Ok(CampbellDiagram::from_results(speeds, &results, n_modes))
    }

    /// Synchronous critical speeds refined by bisection.
    ///
    /// # Arguments
    /// * `speeds` - Sweep used to bracket the crossings (rad/s)
    /// * `n_modes` - Number of modes tracked
    ///
    /// # Returns
    /// One `CriticalSpeed` per bracketed crossing, sorted by speed
    pub fn critical_speeds(&self, speeds: &[f64], n_modes: usize) -> Result<Vec<CriticalSpeed>> {
        let diagram = self.campbell(speeds, n_modes)?;
        let brackets = diagram.brackets(1.0);
        if brackets.is_empty() {
            warn!(
                "no critical speed bracketed in {:?}..{:?} rad/s",
                speeds.first(),
                speeds.last()
            );
        }

        let mut out = brackets
            .into_iter()
            .map(|b| self.bisect_critical(&diagram, b, n_modes))
            .collect::<Result<Vec<_>>>()?;
        out.sort_by(|a, b| a.speed.total_cmp(&b.speed));
        Ok(out)
    }

    fn bisect_critical(
        &self,
        diagram: &CampbellDiagram,
        bracket: Bracket,
        n_modes: usize,
    ) -> Result<CriticalSpeed> {
        let mode = bracket.mode;
        let (speed, frequency) = bisect_crossing(
            (diagram.speeds[bracket.lo], diagram.frequencies[(mode, bracket.lo)]),
            (diagram.speeds[bracket.hi], diagram.frequencies[(mode, bracket.hi)]),
            self.config().bisection_tolerance,
            self.config().max_bisection_iterations,
            |s| Ok(self.modal(s, n_modes)?.modes[mode].wn),
        )?;
        debug!("critical speed of mode {mode} at {speed} rad/s");
        Ok(CriticalSpeed {
            mode,
            speed,
            frequency,
        })
    }
}

/// Root of `ω(Ω) - Ω` between two `(Ω, ω)` samples of opposite sign.
///
/// Returns the speed and ω evaluated at that speed. A sample that already
/// sits on the line is returned as is.
fn bisect_crossing<F>(
    lo: (f64, f64),
    hi: (f64, f64),
    tolerance: f64,
    max_iter: usize,
    mut wn_at: F,
) -> Result<(f64, f64)>
where
    F: FnMut(f64) -> Result<f64>,
{
    let (mut s_lo, w_lo) = lo;
    let (mut s_hi, w_hi) = hi;
    let mut f_lo = w_lo - s_lo;
    if f_lo == 0.0 {
        return Ok(lo);
    }
    if w_hi - s_hi == 0.0 {
        return Ok(hi);
    }

    for iter in 0..max_iter {
        if (s_hi - s_lo).abs() <= tolerance * s_hi.abs().max(1.0) {
            debug!("bisection converged after {iter} steps");
            break;
        }
        let mid = 0.5 * (s_lo + s_hi);
        let wn = wn_at(mid)?;
        let f_mid = wn - mid;
        if f_mid == 0.0 {
            return Ok((mid, wn));
        }
        if f_mid * f_lo > 0.0 {
            s_lo = mid;
            f_lo = f_mid;
        } else {
            s_hi = mid;
        }
    }

    let speed = 0.5 * (s_lo + s_hi);
    Ok((speed, wn_at(speed)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagram(curves: &[&[f64]], speeds: &[f64], whirl: WhirlDirection) -> CampbellDiagram {
        let n_modes = curves.len();
        CampbellDiagram {
            speeds: speeds.to_vec(),
            frequencies: DMatrix::from_fn(n_modes, speeds.len(), |k, i| curves[k][i]),
            damping: DMatrix::zeros(n_modes, speeds.len()),
            whirl: vec![vec![whirl; n_modes]; speeds.len()],
        }
    }

    #[test]
    fn linear_interpolation_of_crossing() {
        // ω = 100 + 0.1Ω crosses Ω at 100/0.9
        let speeds = [0.0, 100.0, 200.0];
        let d = diagram(&[&[100.0, 110.0, 120.0]], &speeds, WhirlDirection::Forward);
        let crit = d.critical_speeds();
        assert_eq!(crit.len(), 1);
        assert!((crit[0].speed - 100.0 / 0.9).abs() < 1e-9);
        assert!((crit[0].frequency - crit[0].speed).abs() < 1e-9);
    }

    #[test]
    fn backward_curves_are_ignored() {
        let speeds = [0.0, 100.0, 200.0];
        let d = diagram(&[&[100.0, 95.0, 90.0]], &speeds, WhirlDirection::Backward);
        assert!(d.critical_speeds().is_empty());
    }

    #[test]
    fn harmonic_order_moves_crossing() {
        let speeds = [0.0, 100.0];
        let d = diagram(&[&[100.0, 100.0]], &speeds, WhirlDirection::Forward);
        assert!(d.critical_speeds().is_empty());
        let crit = d.critical_speeds_for_order(2.0);
        assert_eq!(crit.len(), 1);
        assert!((crit[0].speed - 50.0).abs() < 1e-12);
    }

    #[test]
    fn crossing_on_a_sample_is_reported_once() {
        let speeds = [0.0, 100.0, 200.0];
        let d = diagram(&[&[50.0, 100.0, 150.0]], &speeds, WhirlDirection::Forward);
        let crit = d.critical_speeds();
        assert_eq!(crit.len(), 1);
        assert_eq!(crit[0].speed, 100.0);
        assert_eq!(crit[0].frequency, 100.0);

        // crossing at the first sample
        let d = diagram(&[&[0.0, 50.0]], &[0.0, 100.0], WhirlDirection::Forward);
        let crit = d.critical_speeds();
        assert_eq!(crit.len(), 1);
        assert_eq!(crit[0].speed, 0.0);
    }

    #[test]
    fn planar_to_backward_curve_is_not_bracketed() {
        let mut d = diagram(&[&[274.3, 252.8]], &[0.0, 400.0], WhirlDirection::Planar);
        d.whirl[1][0] = WhirlDirection::Backward;
        assert!(d.critical_speeds().is_empty());

        d.whirl[1][0] = WhirlDirection::Forward;
        assert_eq!(d.critical_speeds().len(), 1);

        // a curve that switches from forward to backward is ambiguous
        d.whirl[0][0] = WhirlDirection::Forward;
        d.whirl[1][0] = WhirlDirection::Backward;
        assert!(d.critical_speeds().is_empty());
    }

    #[test]
    fn bisection_returns_a_sample_on_the_line() {
        let mut calls = 0;
        let (speed, wn) = bisect_crossing((100.0, 100.0), (200.0, 250.0), 1e-10, 100, |s| {
            calls += 1;
            Ok(50.0 + s)
        })
        .unwrap();
        assert_eq!((speed, wn), (100.0, 100.0));
        assert_eq!(calls, 0);
    }

    #[test]
    fn bisection_frequency_is_evaluated_at_returned_speed() {
        // ω = 50 + 0.5Ω crosses Ω at 100
        let (speed, wn) =
            bisect_crossing((0.0, 50.0), (150.0, 125.0), 1e-12, 200, |s| Ok(50.0 + 0.5 * s))
                .unwrap();
        assert!((speed - 100.0).abs() < 1e-8);
        assert_eq!(wn, 50.0 + 0.5 * speed);
    }

    #[test]
    fn diagram_accessors() {
        let speeds = [0.0, 1.0];
        let d = diagram(&[&[1.0, 2.0], &[3.0, 4.0]], &speeds, WhirlDirection::Forward);
        assert_eq!(d.n_modes(), 2);
        assert_eq!(d.n_speeds(), 2);
        assert_eq!(d.curve(1), Some(vec![3.0, 4.0]));
        assert_eq!(d.curve(2), None);
    }

    #[test]
    fn empty_or_non_finite_sweep_is_rejected() {
        let rotor = crate::rotor::rotor_example().unwrap();
        assert!(matches!(rotor.campbell(&[], 4), Err(Error::InvalidInput(_))));
        assert!(matches!(
            rotor.campbell(&[0.0, f64::INFINITY], 4),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn example_rotor_sweep_shapes() {
        let rotor = crate::rotor::rotor_example().unwrap();
        let d = rotor.campbell(&[0.0, 200.0, 400.0], 4).unwrap();
        assert_eq!(d.frequencies.shape(), (4, 3));
        assert_eq!(d.whirl.len(), 3);
        assert!(d.whirl.iter().all(|w| w.len() == 4));
    }
}
