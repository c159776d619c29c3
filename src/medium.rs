//! On-grid medium maps: bulk-modulus inverse and density inverse, plus the
//! harmonic averages needed at the two staggered velocity positions
//! (spec.md §3).

use crate::errors::*;
use crate::grid::Grid;
use ndarray::Array2;

/// Bulk modulus inverse (`KI`) and density inverse (`RhoI`), both sampled at
/// pressure nodes on the extended mesh, plus their harmonic averages onto
/// the staggered velocity positions.
#[derive(Debug, Clone)]
pub struct Medium {
    pub ki: Array2<f64>,
    pub rho_i: Array2<f64>,
    pub rho_i_vx: Array2<f64>,
    pub rho_i_vz: Array2<f64>,
}

impl Medium {
    /// Builds medium maps already sampled on the extended mesh (shape
    /// `(nz, nx)`), typically produced by padding a physical-domain medium
    /// out into the PML (medium-gallery construction is out of scope here;
    /// the core only consumes the already-extended fields).
    pub fn from_extended(ki: Array2<f64>, rho_i: Array2<f64>, grid: &Grid) -> Result<Medium> {
        if ki.dim() != (grid.nz(), grid.nx()) || rho_i.dim() != (grid.nz(), grid.nx()) {
            bail!(ErrorKind::ConfigError(format!(
                "medium maps must have shape {:?}, got KI={:?}, RhoI={:?}",
                (grid.nz(), grid.nx()),
                ki.dim(),
                rho_i.dim()
            )));
        }
        let rho_i_vx = harmonic_mean_x(&rho_i);
        let rho_i_vz = harmonic_mean_z(&rho_i);
        Ok(Medium {
            ki,
            rho_i,
            rho_i_vx,
            rho_i_vz,
        })
    }
}

/// `RhoI_vx[i,j] = 2 RhoI[i,j] RhoI[i,j+1] / (RhoI[i,j] + RhoI[i,j+1])`, wrapping
/// the last column onto itself (edge cells reuse their own value; they are
/// read-only padding anyway, see `stepper`).
fn harmonic_mean_x(rho_i: &Array2<f64>) -> Array2<f64> {
    let (nz, nx) = rho_i.dim();
    let mut out = Array2::zeros((nz, nx));
    for iz in 0..nz {
        for ix in 0..nx {
            let jx = (ix + 1).min(nx - 1);
            out[[iz, ix]] = harmonic_pair(rho_i[[iz, ix]], rho_i[[iz, jx]]);
        }
    }
    out
}

/// `RhoI_vz` analogously along z.
fn harmonic_mean_z(rho_i: &Array2<f64>) -> Array2<f64> {
    let (nz, nx) = rho_i.dim();
    let mut out = Array2::zeros((nz, nx));
    for iz in 0..nz {
        let jz = (iz + 1).min(nz - 1);
        for ix in 0..nx {
            out[[iz, ix]] = harmonic_pair(rho_i[[iz, ix]], rho_i[[jz, ix]]);
        }
    }
    out
}

fn harmonic_pair(a: f64, b: f64) -> f64 {
    if a + b == 0. {
        0.
    } else {
        2. * a * b / (a + b)
    }
}

/// A medium perturbation driving Born secondary sources (spec.md §4.8).
#[derive(Debug, Clone)]
pub struct Perturbation {
    pub delta_ki: Array2<f64>,
    pub delta_rho_i: Array2<f64>,
}

impl Perturbation {
    pub fn scale(&self, c: f64) -> Perturbation {
        Perturbation {
            delta_ki: &self.delta_ki * c,
            delta_rho_i: &self.delta_rho_i * c,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn harmonic_mean_is_symmetric_in_its_two_neighbors() {
        let rho_i = Array2::from_shape_fn((4, 4), |(i, j)| 1. + i as f64 + 2. * j as f64);
        let vx = harmonic_mean_x(&rho_i);
        for iz in 0..4 {
            for ix in 0..3 {
                let expect = harmonic_pair(rho_i[[iz, ix]], rho_i[[iz, ix + 1]]);
                assert_eq!(vx[[iz, ix]], expect);
            }
        }
    }

    #[test]
    fn harmonic_mean_of_equal_values_is_that_value() {
        assert_eq!(harmonic_pair(2.0, 2.0), 2.0);
    }

    #[test]
    fn rejects_mismatched_shapes() {
        let grid = Grid::with_npml(10, 10, 1., 1., 5).unwrap();
        let bad = Array2::zeros((3, 3));
        let good = Array2::zeros((grid.nz(), grid.nx()));
        assert!(Medium::from_extended(bad, good, &grid).is_err());
    }

    #[test]
    fn accepts_matching_extended_shape() {
        let grid = Grid::with_npml(10, 10, 1., 1., 5).unwrap();
        let ki = Array2::from_elem((grid.nz(), grid.nx()), 1e-9);
        let rho_i = Array2::from_elem((grid.nz(), grid.nx()), 1.0);
        assert!(Medium::from_extended(ki, rho_i, &grid).is_ok());
    }
}
