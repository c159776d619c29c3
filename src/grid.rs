//! The extended computational mesh.
//!
//! The physical domain `(nzd, nxd)` is padded by `NPML` absorbing cells on
//! each side to form the extended mesh `(nz, nx)` that the stepper actually
//! advances. Grounded on the grid-size/grid-width bookkeeping of the
//! reference distribution grid (`GridWidth`), generalized from a 3-axis
//! particle-orientation grid to a 2-axis spatial one.

use crate::errors::*;
use serde::{Deserialize, Serialize};

/// Default PML thickness, in cells, on every absorbing face.
pub const NPML: usize = 50;

/// One of the four faces a PML layer can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Face {
    ZMin,
    ZMax,
    XMin,
    XMax,
}

impl Face {
    pub const ALL: [Face; 4] = [Face::ZMin, Face::ZMax, Face::XMin, Face::XMax];
}

/// The extended mesh: physical dimensions, PML thickness, and grid spacing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    /// Physical domain size along z.
    pub nzd: usize,
    /// Physical domain size along x.
    pub nxd: usize,
    /// PML thickness in cells, per side.
    pub npml: usize,
    /// Extra inert stretch cells beyond the PML, per side (default 0).
    ///
    /// TODO: the random-stretch profile itself (spec.md §3) is not
    /// implemented; cells in this layer behave as plain padding (`a=0,
    /// b=1, kinv=1`), not as a graded stretch.
    pub stretch_cells: usize,
    /// Grid spacing along z, in meters.
    pub dz: f64,
    /// Grid spacing along x, in meters.
    pub dx: f64,
}

impl Grid {
    pub fn new(nzd: usize, nxd: usize, dz: f64, dx: f64) -> Result<Grid> {
        Grid::with_npml(nzd, nxd, dz, dx, NPML)
    }

    pub fn with_npml(nzd: usize, nxd: usize, dz: f64, dx: f64, npml: usize) -> Result<Grid> {
        if nzd < 2 || nxd < 2 {
            bail!(ErrorKind::ConfigError(format!(
                "physical mesh must be at least 2x2, got ({}, {})",
                nzd, nxd
            )));
        }
        if dz <= 0. || dx <= 0. {
            bail!(ErrorKind::ConfigError(format!(
                "grid spacing must be positive, got dz={}, dx={}",
                dz, dx
            )));
        }
        Ok(Grid {
            nzd,
            nxd,
            npml,
            stretch_cells: 0,
            dz,
            dx,
        })
    }

    /// Total padding on each side, PML plus stretch layer.
    pub fn pad(&self) -> usize {
        self.npml + self.stretch_cells
    }

    /// Extended mesh size along z.
    pub fn nz(&self) -> usize {
        self.nzd + 2 * self.pad()
    }

    /// Extended mesh size along x.
    pub fn nx(&self) -> usize {
        self.nxd + 2 * self.pad()
    }

    /// Maps a physical-domain cell index to its index on the extended mesh.
    pub fn to_extended(&self, iz: usize, ix: usize) -> (usize, usize) {
        (iz + self.pad(), ix + self.pad())
    }

    /// True if a continuous physical coordinate lies inside the physical
    /// (unpadded) domain.
    pub fn contains_physical(&self, z: f64, x: f64) -> bool {
        z >= 0. && x >= 0. && z <= (self.nzd - 1) as f64 * self.dz && x <= (self.nxd - 1) as f64 * self.dx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extended_mesh_size_includes_padding_on_both_sides() {
        let g = Grid::with_npml(100, 120, 10., 10., 10).unwrap();
        assert_eq!(g.nz(), 100 + 20);
        assert_eq!(g.nx(), 120 + 20);
    }

    #[test]
    fn to_extended_shifts_by_pad() {
        let g = Grid::with_npml(100, 120, 10., 10., 10).unwrap();
        assert_eq!(g.to_extended(0, 0), (10, 10));
        assert_eq!(g.to_extended(99, 119), (109, 129));
    }

    #[test]
    fn rejects_degenerate_mesh() {
        assert!(Grid::new(1, 100, 10., 10.).is_err());
        assert!(Grid::new(100, 100, 0., 10.).is_err());
    }

    #[test]
    fn contains_physical_respects_bounds() {
        let g = Grid::with_npml(10, 10, 1., 1., 5).unwrap();
        assert!(g.contains_physical(0., 0.));
        assert!(g.contains_physical(9., 9.));
        assert!(!g.contains_physical(-0.1, 0.));
        assert!(!g.contains_physical(0., 9.1));
    }
}
