//! Source injection and receiver recording coupling (spec.md §4.4).
//!
//! For a continuous coordinate, finds the enclosing cell and the bilinear
//! weights of its four corners, generalizing the nearest-grid-point lookup
//! the reference distribution uses (`Distribution::coord_to_grid`) to a
//! 4-point interpolation stencil.

use crate::errors::*;
use crate::grid::Grid;
use ndarray::Array2;

/// Bilinear spray/interpolation weights and the integer grid index of the
/// cell's low corner, on the extended mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BilinearWeights {
    pub iz: usize,
    pub ix: usize,
    /// Weights for (iz, ix), (iz, ix+1), (iz+1, ix), (iz+1, ix+1).
    pub w00: f64,
    pub w01: f64,
    pub w10: f64,
    pub w11: f64,
}

impl BilinearWeights {
    /// Accumulates `amount * weight` into the four surrounding nodes of
    /// `field`.
    pub fn spray_into(&self, field: &mut Array2<f64>, amount: f64) {
        field[[self.iz, self.ix]] += amount * self.w00;
        field[[self.iz, self.ix + 1]] += amount * self.w01;
        field[[self.iz + 1, self.ix]] += amount * self.w10;
        field[[self.iz + 1, self.ix + 1]] += amount * self.w11;
    }

    /// Interpolates `field` at this point.
    pub fn interpolate(&self, field: &Array2<f64>) -> f64 {
        field[[self.iz, self.ix]] * self.w00
            + field[[self.iz, self.ix + 1]] * self.w01
            + field[[self.iz + 1, self.ix]] * self.w10
            + field[[self.iz + 1, self.ix + 1]] * self.w11
    }
}

/// Computes the bilinear weights for a continuous coordinate `(z, x)` given
/// in physical-domain units, placed onto the extended mesh.
pub fn bilinear_weights(grid: &Grid, z: f64, x: f64) -> Result<BilinearWeights> {
    if !grid.contains_physical(z, x) {
        bail!(ErrorKind::ConfigError(format!(
            "coordinate (z={}, x={}) lies outside the physical mesh ({} x {} at spacing {} x {})",
            z, x, grid.nzd, grid.nxd, grid.dz, grid.dx
        )));
    }

    let fz = z / grid.dz;
    let fx = x / grid.dx;
    let iz0 = fz.floor() as usize;
    let ix0 = fx.floor() as usize;
    let tz = fz - iz0 as f64;
    let tx = fx - ix0 as f64;

    let (ez, ex) = grid.to_extended(iz0, ix0);

    Ok(BilinearWeights {
        iz: ez,
        ix: ex,
        w00: (1. - tz) * (1. - tx),
        w01: (1. - tz) * tx,
        w10: tz * (1. - tx),
        w11: tz * tx,
    })
}
