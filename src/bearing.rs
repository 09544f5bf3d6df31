//! Linear bearing/seal elements with speed-dependent coefficients.
//!
//! Stiffness and damping act on the two translational DOFs of a node. A
//! bearing may instead link two rotor nodes, in which case the coefficients
//! act on their relative displacement.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::interp::LookupTable;
use crate::types::{Matrix2, DOF_PER_NODE};

/// A bearing coefficient, either fixed or tabulated against speed (rad/s).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Coefficient {
    Constant(f64),
    Table(LookupTable),
}

impl Coefficient {
    pub fn at(&self, speed: f64) -> Result<f64> {
        match self {
            Coefficient::Constant(v) => Ok(*v),
            Coefficient::Table(table) => table.eval(speed),
        }
    }

    pub fn is_speed_dependent(&self) -> bool {
        matches!(self, Coefficient::Table(_))
    }
}

impl From<f64> for Coefficient {
    fn from(v: f64) -> Self {
        Coefficient::Constant(v)
    }
}

/// Tabulated bearing coefficients, one row per speed.
///
/// Omitted direct terms default to the x-direction values (kyy = kxx,
/// cyy = cxx); omitted cross terms default to zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BearingTable {
    pub speed: Vec<f64>,
    pub kxx: Vec<f64>,
    #[serde(default)]
    pub kyy: Option<Vec<f64>>,
    #[serde(default)]
    pub kxy: Option<Vec<f64>>,
    #[serde(default)]
    pub kyx: Option<Vec<f64>>,
    pub cxx: Vec<f64>,
    #[serde(default)]
    pub cyy: Option<Vec<f64>>,
    #[serde(default)]
    pub cxy: Option<Vec<f64>>,
    #[serde(default)]
    pub cyx: Option<Vec<f64>>,
}

impl BearingTable {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn column(&self, label: &str, values: &[f64]) -> Result<Coefficient> {
        if values.len() != self.speed.len() {
            return Err(Error::InvalidInput(format!(
                "bearing table column {label} has {} values for {} speeds",
                values.len(),
                self.speed.len()
            )));
        }
        Ok(Coefficient::Table(LookupTable::new(
            self.speed.clone(),
            values.to_vec(),
        )?))
    }

    fn optional_column(
        &self,
        label: &str,
        values: Option<&Vec<f64>>,
        fallback: &Coefficient,
    ) -> Result<Coefficient> {
        match values {
            Some(v) => self.column(label, v),
            None => Ok(fallback.clone()),
        }
    }
}

/// Bearing element at node `n`, optionally linked to node `n_link`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BearingElement {
    pub n: usize,
    pub n_link: Option<usize>,
    pub kxx: Coefficient,
    pub kxy: Coefficient,
    pub kyx: Coefficient,
    pub kyy: Coefficient,
    pub cxx: Coefficient,
    pub cxy: Coefficient,
    pub cyx: Coefficient,
    pub cyy: Coefficient,
}

impl BearingElement {
    /// Isotropic bearing: kyy = kxx, cyy = cxx, no cross coupling.
    pub fn new(n: usize, kxx: impl Into<Coefficient>, cxx: impl Into<Coefficient>) -> Self {
        let kxx = kxx.into();
        let cxx = cxx.into();
        Self {
            n,
            n_link: None,
            kyy: kxx.clone(),
            kxx,
            kxy: Coefficient::Constant(0.0),
            kyx: Coefficient::Constant(0.0),
            cyy: cxx.clone(),
            cxx,
            cxy: Coefficient::Constant(0.0),
            cyx: Coefficient::Constant(0.0),
        }
    }

    /// Bearing with coefficients tabulated against speed.
    pub fn from_table(n: usize, table: &BearingTable) -> Result<Self> {
        if table.speed.is_empty() {
            return Err(Error::InvalidInput("bearing table has no speeds".into()));
        }
        let zero = Coefficient::Constant(0.0);
        let kxx = table.column("kxx", &table.kxx)?;
        let cxx = table.column("cxx", &table.cxx)?;
        let bearing = Self {
            n,
            n_link: None,
            kyy: table.optional_column("kyy", table.kyy.as_ref(), &kxx)?,
            kxy: table.optional_column("kxy", table.kxy.as_ref(), &zero)?,
            kyx: table.optional_column("kyx", table.kyx.as_ref(), &zero)?,
            cyy: table.optional_column("cyy", table.cyy.as_ref(), &cxx)?,
            cxy: table.optional_column("cxy", table.cxy.as_ref(), &zero)?,
            cyx: table.optional_column("cyx", table.cyx.as_ref(), &zero)?,
            kxx,
            cxx,
        };
        Ok(bearing)
    }

    pub fn with_kyy(mut self, kyy: impl Into<Coefficient>) -> Self {
        self.kyy = kyy.into();
        self
    }

    pub fn with_cyy(mut self, cyy: impl Into<Coefficient>) -> Self {
        self.cyy = cyy.into();
        self
    }

    pub fn with_cross_stiffness(
        mut self,
        kxy: impl Into<Coefficient>,
        kyx: impl Into<Coefficient>,
    ) -> Self {
        self.kxy = kxy.into();
        self.kyx = kyx.into();
        self
    }

    pub fn with_cross_damping(
        mut self,
        cxy: impl Into<Coefficient>,
        cyx: impl Into<Coefficient>,
    ) -> Self {
        self.cxy = cxy.into();
        self.cyx = cyx.into();
        self
    }

    /// Connect the bearing between node `n` and `node` instead of ground.
    pub fn linked_to(mut self, node: usize) -> Self {
        self.n_link = Some(node);
        self
    }

    /// Nodes touched by the element.
    pub fn nodes(&self) -> Vec<usize> {
        match self.n_link {
            Some(link) => vec![self.n, link],
            None => vec![self.n],
        }
    }

    pub fn is_speed_dependent(&self) -> bool {
        self.coefficients()
            .iter()
            .any(|c| c.is_speed_dependent())
    }

    fn coefficients(&self) -> [&Coefficient; 8] {
        [
            &self.kxx, &self.kxy, &self.kyx, &self.kyy, &self.cxx, &self.cxy, &self.cyx,
            &self.cyy,
        ]
    }

    /// Check coefficient values and the optional link.
    pub fn validate(&self) -> Result<()> {
        if self.n_link == Some(self.n) {
            return Err(Error::InvalidTopology(format!(
                "bearing at node {} is linked to itself",
                self.n
            )));
        }
        for c in self.coefficients() {
            if let Coefficient::Constant(v) = c {
                if !v.is_finite() {
                    return Err(Error::InvalidGeometry(format!(
                        "bearing at node {} has non-finite coefficient {v}",
                        self.n
                    )));
                }
            }
        }
        Ok(())
    }

    /// 2×2 translational stiffness `[[kxx, kxy], [kyx, kyy]]` at `speed`.
    pub fn k(&self, speed: f64) -> Result<Matrix2> {
        Ok(Matrix2::new(
            self.kxx.at(speed)?,
            self.kxy.at(speed)?,
            self.kyx.at(speed)?,
            self.kyy.at(speed)?,
        ))
    }

    /// 2×2 translational damping `[[cxx, cxy], [cyx, cyy]]` at `speed`.
    pub fn c(&self, speed: f64) -> Result<Matrix2> {
        Ok(Matrix2::new(
            self.cxx.at(speed)?,
            self.cxy.at(speed)?,
            self.cyx.at(speed)?,
            self.cyy.at(speed)?,
        ))
    }

    /// Local stiffness over the element DOFs (4×4, or 8×8 when linked).
    pub fn stiffness_matrix(&self, speed: f64) -> Result<DMatrix<f64>> {
        Ok(self.expand(&self.k(speed)?))
    }

    /// Local damping over the element DOFs (4×4, or 8×8 when linked).
    pub fn damping_matrix(&self, speed: f64) -> Result<DMatrix<f64>> {
        Ok(self.expand(&self.c(speed)?))
    }

    fn expand(&self, block: &Matrix2) -> DMatrix<f64> {
        let n_nodes = self.nodes().len();
        let mut out = DMatrix::<f64>::zeros(DOF_PER_NODE * n_nodes, DOF_PER_NODE * n_nodes);
        for a in 0..n_nodes {
            for b in 0..n_nodes {
                let sign = if a == b { 1.0 } else { -1.0 };
                for i in 0..2 {
                    for j in 0..2 {
                        out[(DOF_PER_NODE * a + i, DOF_PER_NODE * b + j)] = sign * block[(i, j)];
                    }
                }
            }
        }
        out
    }
}
