//! Global matrix assembly in dense and sparse formats.
//!
//! Local element blocks are scatter-added into the global DOF space: global
//! entry (i, j) is the sum of every element entry whose DOF map hits (i, j).

use nalgebra::DMatrix;
use nalgebra_sparse::{CooMatrix, CsrMatrix};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::element::{ElementMatrices, LocalMatrices};
use crate::error::{Error, Result};

/// Which system matrix to assemble from a set of local blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixKind {
    Mass,
    Stiffness,
    Damping,
    /// Per unit speed.
    Gyroscopic,
}

impl MatrixKind {
    pub fn select(self, local: &LocalMatrices) -> &DMatrix<f64> {
        match self {
            MatrixKind::Mass => &local.m,
            MatrixKind::Stiffness => &local.k,
            MatrixKind::Damping => &local.c,
            MatrixKind::Gyroscopic => &local.g,
        }
    }
}

fn check_dof_map(n_dofs: usize, local: &DMatrix<f64>, dofs: &[usize]) -> Result<()> {
    if local.nrows() != dofs.len() || local.ncols() != dofs.len() {
        return Err(Error::InvalidTopology(format!(
            "local matrix is {}x{} but maps to {} dofs",
            local.nrows(),
            local.ncols(),
            dofs.len()
        )));
    }
    if let Some(&bad) = dofs.iter().find(|&&d| d >= n_dofs) {
        return Err(Error::InvalidTopology(format!(
            "element dof {bad} outside global range 0..{n_dofs}"
        )));
    }
    Ok(())
}

/// Add `local` into `global` at the rows/columns listed in `dofs`.
pub fn scatter_add(global: &mut DMatrix<f64>, local: &DMatrix<f64>, dofs: &[usize]) -> Result<()> {
    check_dof_map(global.nrows(), local, dofs)?;
    for (i, &gi) in dofs.iter().enumerate() {
        for (j, &gj) in dofs.iter().enumerate() {
            global[(gi, gj)] += local[(i, j)];
        }
    }
    Ok(())
}

/// Dense assembly of one system matrix.
pub fn assemble_dense(
    n_dofs: usize,
    locals: &[LocalMatrices],
    kind: MatrixKind,
) -> Result<DMatrix<f64>> {
    let mut global = DMatrix::<f64>::zeros(n_dofs, n_dofs);
    for local in locals {
        scatter_add(&mut global, kind.select(local), &local.dofs)?;
    }
    Ok(global)
}

/// Sparse (CSR) assembly of one system matrix; duplicates are summed.
///
/// Only exact zeros are skipped, so entries of any magnitude survive.
pub fn assemble_sparse(
    n_dofs: usize,
    locals: &[LocalMatrices],
    kind: MatrixKind,
) -> Result<CsrMatrix<f64>> {
    let mut coo = CooMatrix::new(n_dofs, n_dofs);
    for local in locals {
        let block = kind.select(local);
        check_dof_map(n_dofs, block, &local.dofs)?;
        for (i, &gi) in local.dofs.iter().enumerate() {
            for (j, &gj) in local.dofs.iter().enumerate() {
                let val = block[(i, j)];
                if val != 0.0 {
                    coo.push(gi, gj, val);
                }
            }
        }
    }
    Ok(CsrMatrix::from(&coo))
}

/// Local matrices of every element at `speed` (sequential).
#[cfg_attr(feature = "parallel", allow(dead_code))]
fn local_matrices_sequential<E: ElementMatrices>(
    elements: &[E],
    speed: f64,
) -> Result<Vec<LocalMatrices>> {
    elements.iter().map(|e| e.local_matrices(speed)).collect()
}

/// Local matrices of every element at `speed`, computed in parallel.
#[cfg(feature = "parallel")]
fn local_matrices_parallel<E: ElementMatrices + Sync>(
    elements: &[E],
    speed: f64,
) -> Result<Vec<LocalMatrices>> {
    elements.par_iter().map(|e| e.local_matrices(speed)).collect()
}

/// Local matrices of every element, using parallel computation when available.
#[inline]
pub fn local_matrices<E: ElementMatrices + Sync>(
    elements: &[E],
    speed: f64,
) -> Result<Vec<LocalMatrices>> {
    #[cfg(feature = "parallel")]
    {
        local_matrices_parallel(elements, speed)
    }
    #[cfg(not(feature = "parallel"))]
    {
        local_matrices_sequential(elements, speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::DiskElement;
    use crate::element::Element;
    use crate::material::Material;
    use crate::shaft::ShaftElement;

    const TOL: f64 = 1e-9;

    fn two_shafts_and_disk() -> Vec<Element> {
        let steel = Material::steel();
        vec![
            ShaftElement::new(0, 0.25, 0.0, 0.05, steel.clone()).unwrap().into(),
            ShaftElement::new(1, 0.30, 0.0, 0.06, steel).unwrap().into(),
            DiskElement::new(1, 20.0, 0.1, 0.2).unwrap().into(),
        ]
    }

    #[test]
    fn shared_node_block_is_sum_of_contributions() {
        let elements = two_shafts_and_disk();
        let locals = local_matrices(&elements, 0.0).unwrap();
        let k = assemble_dense(12, &locals, MatrixKind::Stiffness).unwrap();
        let m = assemble_dense(12, &locals, MatrixKind::Mass).unwrap();

        let (s0, s1, d) = (&locals[0], &locals[1], &locals[2]);
        for i in 0..4 {
            for j in 0..4 {
                // node 1 is local dofs 4..8 of shaft 0 and 0..4 of shaft 1
                let expected_k = s0.k[(4 + i, 4 + j)] + s1.k[(i, j)];
                assert!((k[(4 + i, 4 + j)] - expected_k).abs() < TOL * expected_k.abs().max(1.0));
                let expected_m = s0.m[(4 + i, 4 + j)] + s1.m[(i, j)] + d.m[(i, j)];
                assert!((m[(4 + i, 4 + j)] - expected_m).abs() < TOL);
            }
        }
        // nodes 0 and 2 are not coupled
        for i in 0..4 {
            for j in 8..12 {
                assert_eq!(k[(i, j)], 0.0);
            }
        }
    }

    #[test]
    fn sparse_and_dense_assembly_agree() {
        let elements = two_shafts_and_disk();
        let locals = local_matrices(&elements, 0.0).unwrap();
        let dense = assemble_dense(12, &locals, MatrixKind::Gyroscopic).unwrap();
        let sparse = assemble_sparse(12, &locals, MatrixKind::Gyroscopic).unwrap();
        assert_eq!(sparse.nrows(), 12);
        let mut from_sparse = DMatrix::<f64>::zeros(12, 12);
        for (i, j, v) in sparse.triplet_iter() {
            from_sparse[(i, j)] += *v;
        }
        assert!((dense - from_sparse).norm() < TOL);
    }

    #[test]
    fn sparse_assembly_keeps_tiny_entries() {
        // 0.2 mm wire, 1 mm long: rotary gyroscopic terms fall below f64::EPSILON
        let wire = ShaftElement::new(0, 1e-3, 0.0, 2e-4, Material::steel()).unwrap();
        let locals = local_matrices(&[Element::from(wire)], 0.0).unwrap();
        let g = &locals[0].g;
        assert!(g.iter().any(|v| *v != 0.0 && v.abs() < f64::EPSILON));

        let sparse = assemble_sparse(8, &locals, MatrixKind::Gyroscopic).unwrap();
        let nonzero = g.iter().filter(|v| **v != 0.0).count();
        assert_eq!(sparse.nnz(), nonzero);
        for (i, j, v) in sparse.triplet_iter() {
            assert_eq!(*v, g[(i, j)]);
        }
    }

    #[test]
    fn out_of_range_dof_is_topology_error() {
        let elements = two_shafts_and_disk();
        let locals = local_matrices(&elements, 0.0).unwrap();
        assert!(matches!(
            assemble_dense(8, &locals, MatrixKind::Mass),
            Err(Error::InvalidTopology(_))
        ));
        assert!(matches!(
            assemble_sparse(8, &locals, MatrixKind::Mass),
            Err(Error::InvalidTopology(_))
        ));
    }

    #[test]
    fn scatter_add_rejects_mismatched_block() {
        let mut global = DMatrix::<f64>::zeros(8, 8);
        let local = DMatrix::<f64>::identity(3, 3);
        assert!(scatter_add(&mut global, &local, &[0, 1]).is_err());
    }
}
