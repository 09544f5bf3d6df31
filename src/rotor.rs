//! Rotor system model.
//!
//! Owns the validated element list and the speed-independent global matrices.
//! Speed-dependent pieces (tabulated bearings) are re-evaluated for each
//! requested speed; the gyroscopic matrix is stored per unit speed.
//!
//! Global DOF numbering is `[x, y, α, β]` per node, node `i` at DOFs `4i..4i+4`.

use log::{debug, info};
use nalgebra::DMatrix;
use nalgebra_sparse::CsrMatrix;
use serde::{Deserialize, Serialize};

use crate::assembly::{assemble_dense, assemble_sparse, local_matrices, scatter_add, MatrixKind};
use crate::bearing::BearingElement;
use crate::config::AnalysisConfig;
use crate::disk::DiskElement;
use crate::element::{Element, ElementMatrices};
use crate::error::{Error, Result};
use crate::material::Material;
use crate::shaft::ShaftElement;
use crate::types::{global_dof, DOF_PER_NODE, X_DOF, Y_DOF};

/// Rigid support applied directly to a node's DOFs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Support {
    /// Translations constrained, rotations free.
    Pinned,
    /// All four DOFs constrained.
    Fixed,
}

impl Support {
    fn local_dofs(self) -> &'static [usize] {
        match self {
            Support::Pinned => &[X_DOF, Y_DOF],
            Support::Fixed => &[0, 1, 2, 3],
        }
    }
}

/// Global system matrices at one speed.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemMatrices {
    pub m: DMatrix<f64>,
    pub k: DMatrix<f64>,
    pub c: DMatrix<f64>,
    /// Gyroscopic matrix per unit speed; the velocity coefficient is `c + speed * g`.
    pub g: DMatrix<f64>,
}

impl SystemMatrices {
    pub fn n_dofs(&self) -> usize {
        self.m.nrows()
    }

    /// Total velocity-proportional matrix C + ΩG.
    pub fn velocity_matrix(&self, speed: f64) -> DMatrix<f64> {
        &self.c + &self.g * speed
    }

    /// Keep only the rows/columns listed in `dofs`.
    pub fn restrict(&self, dofs: &[usize]) -> SystemMatrices {
        SystemMatrices {
            m: restrict(&self.m, dofs),
            k: restrict(&self.k, dofs),
            c: restrict(&self.c, dofs),
            g: restrict(&self.g, dofs),
        }
    }
}

fn restrict(mat: &DMatrix<f64>, dofs: &[usize]) -> DMatrix<f64> {
    DMatrix::from_fn(dofs.len(), dofs.len(), |i, j| mat[(dofs[i], dofs[j])])
}

/// Assembled rotor.
#[derive(Debug, Clone)]
pub struct Rotor {
    elements: Vec<Element>,
    config: AnalysisConfig,
    n_nodes: usize,
    /// Shaft indices sorted by element number.
    shaft_order: Vec<usize>,
    supports: Vec<(usize, Support)>,
    /// Bearings whose coefficients depend on speed.
    speed_dependent: Vec<usize>,
    m: DMatrix<f64>,
    k_base: DMatrix<f64>,
    c_base: DMatrix<f64>,
    g: DMatrix<f64>,
}

impl Rotor {
    /// Validate the elements and assemble the speed-independent matrices.
    pub fn new(elements: Vec<Element>) -> Result<Self> {
        Self::with_config(elements, AnalysisConfig::default())
    }

    /// Build a rotor from separate shaft, disk and bearing lists.
    pub fn from_parts(
        shafts: Vec<ShaftElement>,
        disks: Vec<DiskElement>,
        bearings: Vec<BearingElement>,
    ) -> Result<Self> {
        let elements = shafts
            .into_iter()
            .map(Element::from)
            .chain(disks.into_iter().map(Element::from))
            .chain(bearings.into_iter().map(Element::from))
            .collect();
        Self::new(elements)
    }

    pub fn with_config(elements: Vec<Element>, config: AnalysisConfig) -> Result<Self> {
        let (n_nodes, shaft_order) = validate_topology(&elements)?;
        let n_dofs = DOF_PER_NODE * n_nodes;

        if let Some(node) = config.reference_node {
            if node >= n_nodes {
                return Err(Error::InvalidTopology(format!(
                    "reference node {node} outside rotor with {n_nodes} nodes"
                )));
            }
        }

        let speed_dependent: Vec<usize> = elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.as_bearing().is_some_and(|b| b.is_speed_dependent()))
            .map(|(i, _)| i)
            .collect();

        let base: Vec<Element> = elements
            .iter()
            .enumerate()
            .filter(|(i, _)| !speed_dependent.contains(i))
            .map(|(_, e)| e.clone())
            .collect();
        // Constant elements ignore the speed argument.
        let locals = local_matrices(&base, 0.0)?;

        let m = assemble_dense(n_dofs, &locals, MatrixKind::Mass)?;
        let k_base = assemble_dense(n_dofs, &locals, MatrixKind::Stiffness)?;
        let c_base = assemble_dense(n_dofs, &locals, MatrixKind::Damping)?;
        let g = assemble_dense(n_dofs, &locals, MatrixKind::Gyroscopic)?;

        info!(
            "assembled rotor: {} elements, {} nodes, {} dofs ({} speed-dependent bearings)",
            elements.len(),
            n_nodes,
            n_dofs,
            speed_dependent.len()
        );

        Ok(Self {
            elements,
            config,
            n_nodes,
            shaft_order,
            supports: Vec::new(),
            speed_dependent,
            m,
            k_base,
            c_base,
            g,
        })
    }

    /// Bare uniform shaft of `n_elements` equal elements.
    ///
    /// # Arguments
    /// * `length` - Total length (m)
    /// * `i_d`, `o_d` - Inner and outer diameter (m)
    /// * `material` - Shaft material
    /// * `n_elements` - Number of elements
    /// * `timoshenko` - Use Timoshenko elements instead of Euler-Bernoulli
    pub fn uniform_shaft(
        length: f64,
        i_d: f64,
        o_d: f64,
        material: Material,
        n_elements: usize,
        timoshenko: bool,
    ) -> Result<Self> {
        let template = if timoshenko {
            ShaftElement::timoshenko(0, length, i_d, o_d, material)?
        } else {
            ShaftElement::new(0, length, i_d, o_d, material)?
        };
        let shafts = template.split(n_elements)?;
        Self::from_parts(shafts, Vec::new(), Vec::new())
    }

    /// Add a rigid support at `node`. Supported DOFs are removed before solving.
    pub fn with_support(mut self, node: usize, support: Support) -> Result<Self> {
        if node >= self.n_nodes {
            return Err(Error::InvalidTopology(format!(
                "support at node {node} outside rotor with {} nodes",
                self.n_nodes
            )));
        }
        self.supports.retain(|(n, _)| *n != node);
        self.supports.push((node, support));
        Ok(self)
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn n_nodes(&self) -> usize {
        self.n_nodes
    }

    pub fn n_dofs(&self) -> usize {
        DOF_PER_NODE * self.n_nodes
    }

    pub fn shafts(&self) -> impl Iterator<Item = &ShaftElement> {
        self.shaft_order
            .iter()
            .filter_map(|&i| self.elements[i].as_shaft())
    }

    pub fn disks(&self) -> impl Iterator<Item = &DiskElement> {
        self.elements.iter().filter_map(Element::as_disk)
    }

    pub fn bearings(&self) -> impl Iterator<Item = &BearingElement> {
        self.elements.iter().filter_map(Element::as_bearing)
    }

    /// Axial position of every node (m), starting at 0.
    pub fn nodes_pos(&self) -> Vec<f64> {
        let mut pos = Vec::with_capacity(self.n_nodes);
        pos.push(0.0);
        let mut z = 0.0;
        for shaft in self.shafts() {
            z += shaft.length;
            pos.push(z);
        }
        pos
    }

    /// Total shaft length (m).
    pub fn length(&self) -> f64 {
        self.shafts().map(|s| s.length).sum()
    }

    pub fn m_shaft(&self) -> f64 {
        self.shafts().map(ShaftElement::mass).sum()
    }

    pub fn m_disks(&self) -> f64 {
        self.disks().map(|d| d.m).sum()
    }

    pub fn total_mass(&self) -> f64 {
        self.m_shaft() + self.m_disks()
    }

    /// Constrained global DOFs, sorted.
    pub fn constrained_dofs(&self) -> Vec<usize> {
        let mut dofs: Vec<usize> = self
            .supports
            .iter()
            .flat_map(|&(n, s)| s.local_dofs().iter().map(move |&d| global_dof(n, d)))
            .collect();
        dofs.sort_unstable();
        dofs.dedup();
        dofs
    }

    /// Unconstrained global DOFs, sorted.
    pub fn free_dofs(&self) -> Vec<usize> {
        let constrained = self.constrained_dofs();
        (0..self.n_dofs())
            .filter(|d| constrained.binary_search(d).is_err())
            .collect()
    }

    /// Speed-independent global mass matrix.
    pub fn mass_matrix(&self) -> &DMatrix<f64> {
        &self.m
    }

    /// Global gyroscopic matrix per unit speed.
    pub fn gyroscopic_matrix(&self) -> &DMatrix<f64> {
        &self.g
    }

    /// Full (unconstrained) system matrices at `speed` (rad/s).
    pub fn system_matrices(&self, speed: f64) -> Result<SystemMatrices> {
        if !speed.is_finite() {
            return Err(Error::InvalidInput(format!("speed must be finite, got {speed}")));
        }
        let mut k = self.k_base.clone();
        let mut c = self.c_base.clone();
        for &i in &self.speed_dependent {
            if let Some(bearing) = self.elements[i].as_bearing() {
                let dofs = bearing.dof_indices();
                scatter_add(&mut k, &bearing.stiffness_matrix(speed)?, &dofs)?;
                scatter_add(&mut c, &bearing.damping_matrix(speed)?, &dofs)?;
            }
        }
        debug!(
            "system matrices at {speed} rad/s ({} bearings re-evaluated)",
            self.speed_dependent.len()
        );
        Ok(SystemMatrices {
            m: self.m.clone(),
            k,
            c,
            g: self.g.clone(),
        })
    }

    /// One full system matrix at `speed` in CSR form, assembled from every element.
    ///
    /// `MatrixKind::Gyroscopic` is per unit speed, as in `system_matrices`.
    pub fn sparse_matrix(&self, kind: MatrixKind, speed: f64) -> Result<CsrMatrix<f64>> {
        if !speed.is_finite() {
            return Err(Error::InvalidInput(format!("speed must be finite, got {speed}")));
        }
        let locals = local_matrices(&self.elements, speed)?;
        let csr = assemble_sparse(self.n_dofs(), &locals, kind)?;
        debug!(
            "sparse {kind:?} matrix at {speed} rad/s: {} stored entries",
            csr.nnz()
        );
        Ok(csr)
    }

    /// System matrices restricted to the free DOFs.
    pub fn reduced_system(&self, speed: f64) -> Result<SystemMatrices> {
        let full = self.system_matrices(speed)?;
        if self.supports.is_empty() {
            return Ok(full);
        }
        Ok(full.restrict(&self.free_dofs()))
    }

    /// First-order state matrix over the free DOFs:
    ///
    /// ```text
    /// A = [    0          I       ]
    ///     [ -M⁻¹K   -M⁻¹(C + ΩG) ]
    /// ```
    pub fn state_matrix(&self, speed: f64) -> Result<DMatrix<f64>> {
        let sys = self.reduced_system(speed)?;
        state_matrix_from(&sys, speed)
    }

    /// Expand a vector over the free DOFs to all global DOFs, zero at supports.
    pub(crate) fn expand<T: Copy + Default>(&self, reduced: &[T], free: &[usize]) -> Vec<T> {
        let mut full = vec![T::default(); self.n_dofs()];
        for (value, &dof) in reduced.iter().zip(free) {
            full[dof] = *value;
        }
        full
    }

    /// Check that a global DOF index exists.
    pub(crate) fn check_dof(&self, dof: usize) -> Result<()> {
        if dof >= self.n_dofs() {
            return Err(Error::InvalidDof {
                dof,
                n_dofs: self.n_dofs(),
            });
        }
        Ok(())
    }
}

/// Inverse of a mass matrix, or an `EigenSolve` error tagged with `speed`.
pub(crate) fn invert_mass(m: &DMatrix<f64>, speed: f64) -> Result<DMatrix<f64>> {
    m.clone().lu().try_inverse().ok_or_else(|| Error::EigenSolve {
        speed,
        reason: "mass matrix is singular".into(),
    })
}

pub(crate) fn state_matrix_from(sys: &SystemMatrices, speed: f64) -> Result<DMatrix<f64>> {
    let n = sys.n_dofs();
    let m_inv = invert_mass(&sys.m, speed)?;
    let minv_k = &m_inv * &sys.k;
    let minv_d = &m_inv * sys.velocity_matrix(speed);

    let mut a = DMatrix::<f64>::zeros(2 * n, 2 * n);
    for i in 0..n {
        a[(i, n + i)] = 1.0;
    }
    a.view_mut((n, 0), (n, n)).copy_from(&(-minv_k));
    a.view_mut((n, n), (n, n)).copy_from(&(-minv_d));
    Ok(a)
}

/// Check the element graph; returns the node count and the shaft order.
fn validate_topology(elements: &[Element]) -> Result<(usize, Vec<usize>)> {
    let mut shafts: Vec<(usize, usize)> = Vec::new();
    for (i, element) in elements.iter().enumerate() {
        match element {
            Element::Shaft(s) => {
                s.validate()?;
                shafts.push((s.n, i));
            }
            Element::Bearing(b) => b.validate()?,
            Element::Disk(d) => d.validate()?,
        }
    }
    if shafts.is_empty() {
        return Err(Error::InvalidTopology(
            "rotor needs at least one shaft element".into(),
        ));
    }

    shafts.sort_by_key(|&(n, _)| n);
    for (expected, &(n, _)) in shafts.iter().enumerate() {
        if n < expected {
            return Err(Error::InvalidTopology(format!(
                "duplicate shaft element spanning nodes {n}-{}",
                n + 1
            )));
        }
        if n > expected {
            return Err(Error::InvalidTopology(format!(
                "shaft elements must span contiguous nodes from 0; missing element {expected}"
            )));
        }
    }

    let n_nodes = shafts.len() + 1;
    for element in elements {
        let (kind, nodes) = match element {
            Element::Shaft(_) => continue,
            Element::Disk(d) => ("disk", vec![d.n]),
            Element::Bearing(b) => ("bearing", b.nodes()),
        };
        if let Some(&bad) = nodes.iter().find(|&&n| n >= n_nodes) {
            return Err(Error::InvalidTopology(format!(
                "{kind} at node {bad} is outside the shaft (nodes 0..{})",
                n_nodes - 1
            )));
        }
    }

    Ok((n_nodes, shafts.into_iter().map(|(_, i)| i).collect()))
}

/// Two Timoshenko shaft elements, one disk at the middle node and two
/// isotropic bearings (1 MN/m) at the ends.
pub fn rotor_example() -> Result<Rotor> {
    let steel = Material::steel();
    let shafts = (0..2)
        .map(|n| ShaftElement::timoshenko(n, 0.25, 0.0, 0.05, steel.clone()))
        .collect::<Result<Vec<_>>>()?;
    let disk = DiskElement::from_geometry(1, &steel, 0.07, 0.05, 0.28)?;
    let bearings = vec![
        BearingElement::new(0, 1e6, 0.0),
        BearingElement::new(2, 1e6, 0.0),
    ];
    Rotor::from_parts(shafts, vec![disk], bearings)
}
