//! Speed-indexed lookup tables with linear interpolation.
//!
//! Queries outside the tabulated domain are errors; values are never clamped.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Piecewise-linear table y(x) over strictly increasing x.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupTable {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl LookupTable {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        if x.is_empty() {
            return Err(Error::InvalidInput("lookup table needs at least one point".into()));
        }
        if x.len() != y.len() {
            return Err(Error::InvalidInput(format!(
                "lookup table has {} abscissae but {} values",
                x.len(),
                y.len()
            )));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(Error::InvalidInput("lookup table contains non-finite values".into()));
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::InvalidInput(
                "lookup table abscissae must be strictly increasing".into(),
            ));
        }
        Ok(Self { x, y })
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Domain `(min, max)` of the table.
    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    /// Linearly interpolate at `x`.
    pub fn eval(&self, x: f64) -> Result<f64> {
        let (min, max) = self.domain();
        if !(x >= min && x <= max) {
            return Err(Error::OutOfRange { value: x, min, max });
        }
        // First index with abscissa >= x
        let hi = self.x.partition_point(|&xi| xi < x);
        if hi == 0 {
            return Ok(self.y[0]);
        }
        let lo = hi - 1;
        let t = (x - self.x[lo]) / (self.x[hi] - self.x[lo]);
        Ok(self.y[lo] + t * (self.y[hi] - self.y[lo]))
    }
}
