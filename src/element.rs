//! Common element interface.
//!
//! Every element maps a small dense block per system matrix onto global DOFs.
//! Gyroscopic blocks are per unit speed; bearing stiffness and damping are
//! evaluated at the requested speed.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::bearing::BearingElement;
use crate::disk::DiskElement;
use crate::error::Result;
use crate::shaft::ShaftElement;
use crate::types::{global_dof, DOF_PER_NODE};

/// Local element contributions and their global DOF indices.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalMatrices {
    pub dofs: Vec<usize>,
    pub m: DMatrix<f64>,
    pub k: DMatrix<f64>,
    pub c: DMatrix<f64>,
    /// Gyroscopic matrix per unit speed.
    pub g: DMatrix<f64>,
}

/// Capability set shared by all element kinds.
pub trait ElementMatrices {
    /// Global nodes touched by the element.
    fn nodes(&self) -> Vec<usize>;

    /// Global DOF indices in local matrix order.
    fn dof_indices(&self) -> Vec<usize> {
        self.nodes()
            .into_iter()
            .flat_map(|n| (0..DOF_PER_NODE).map(move |d| global_dof(n, d)))
            .collect()
    }

    fn local_matrices(&self, speed: f64) -> Result<LocalMatrices>;
}

fn to_dynamic<const N: usize>(m: &nalgebra::SMatrix<f64, N, N>) -> DMatrix<f64> {
    DMatrix::from_column_slice(N, N, m.as_slice())
}

impl ElementMatrices for ShaftElement {
    fn nodes(&self) -> Vec<usize> {
        ShaftElement::nodes(self).to_vec()
    }

    fn local_matrices(&self, _speed: f64) -> Result<LocalMatrices> {
        Ok(LocalMatrices {
            dofs: self.dof_indices(),
            m: to_dynamic(&self.mass_matrix()),
            k: to_dynamic(&self.stiffness_matrix()),
            c: to_dynamic(&self.damping_matrix()),
            g: to_dynamic(&self.gyroscopic_matrix()),
        })
    }
}

impl ElementMatrices for DiskElement {
    fn nodes(&self) -> Vec<usize> {
        vec![self.n]
    }

    fn local_matrices(&self, _speed: f64) -> Result<LocalMatrices> {
        Ok(LocalMatrices {
            dofs: self.dof_indices(),
            m: to_dynamic(&self.mass_matrix()),
            k: to_dynamic(&self.stiffness_matrix()),
            c: to_dynamic(&self.damping_matrix()),
            g: to_dynamic(&self.gyroscopic_matrix()),
        })
    }
}

impl ElementMatrices for BearingElement {
    fn nodes(&self) -> Vec<usize> {
        BearingElement::nodes(self)
    }

    fn local_matrices(&self, speed: f64) -> Result<LocalMatrices> {
        let k = self.stiffness_matrix(speed)?;
        let size = k.nrows();
        Ok(LocalMatrices {
            dofs: self.dof_indices(),
            m: DMatrix::zeros(size, size),
            k,
            c: self.damping_matrix(speed)?,
            g: DMatrix::zeros(size, size),
        })
    }
}

/// Any rotor element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Element {
    Shaft(ShaftElement),
    Disk(DiskElement),
    Bearing(BearingElement),
}

impl Element {
    pub fn as_shaft(&self) -> Option<&ShaftElement> {
        match self {
            Element::Shaft(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_disk(&self) -> Option<&DiskElement> {
        match self {
            Element::Disk(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_bearing(&self) -> Option<&BearingElement> {
        match self {
            Element::Bearing(b) => Some(b),
            _ => None,
        }
    }
}

impl ElementMatrices for Element {
    fn nodes(&self) -> Vec<usize> {
        match self {
            Element::Shaft(s) => ElementMatrices::nodes(s),
            Element::Disk(d) => ElementMatrices::nodes(d),
            Element::Bearing(b) => ElementMatrices::nodes(b),
        }
    }

    fn local_matrices(&self, speed: f64) -> Result<LocalMatrices> {
        match self {
            Element::Shaft(s) => s.local_matrices(speed),
            Element::Disk(d) => d.local_matrices(speed),
            Element::Bearing(b) => b.local_matrices(speed),
        }
    }
}

impl From<ShaftElement> for Element {
    fn from(e: ShaftElement) -> Self {
        Element::Shaft(e)
    }
}

impl From<DiskElement> for Element {
    fn from(e: DiskElement) -> Self {
        Element::Disk(e)
    }
}

impl From<BearingElement> for Element {
    fn from(e: BearingElement) -> Self {
        Element::Bearing(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;

    #[test]
    fn shaft_dofs_span_both_nodes() {
        let shaft = ShaftElement::new(2, 0.1, 0.0, 0.05, Material::steel()).unwrap();
        assert_eq!(shaft.dof_indices(), (8..16).collect::<Vec<_>>());
        let local = shaft.local_matrices(0.0).unwrap();
        assert_eq!(local.m.shape(), (8, 8));
        assert_eq!(local.m[(0, 3)], shaft.mass_matrix()[(0, 3)]);
        assert_eq!(local.g[(2, 3)], shaft.gyroscopic_matrix()[(2, 3)]);
    }

    #[test]
    fn disk_and_bearing_are_single_node() {
        let disk: Element = DiskElement::new(1, 5.0, 0.1, 0.2).unwrap().into();
        assert_eq!(disk.dof_indices(), vec![4, 5, 6, 7]);
        let bearing: Element = BearingElement::new(0, 1e6, 0.0).into();
        let local = bearing.local_matrices(10.0).unwrap();
        assert_eq!(local.dofs, vec![0, 1, 2, 3]);
        assert_eq!(local.k[(0, 0)], 1e6);
        assert_eq!(local.m, DMatrix::zeros(4, 4));
    }

    #[test]
    fn linked_bearing_covers_both_nodes() {
        let bearing: Element = BearingElement::new(0, 1e6, 0.0).linked_to(3).into();
        assert_eq!(bearing.dof_indices(), vec![0, 1, 2, 3, 12, 13, 14, 15]);
    }
}
