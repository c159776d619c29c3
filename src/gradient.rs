//! Zero-lag cross-correlation gradient accumulation (spec.md §4.7).
//!
//! The adjoint-state gradient for bulk modulus and density is the running
//! cross-correlation of the forward and adjoint wavefields, scaled by cell
//! area. Density's gradient is accumulated on the staggered velocity grid
//! and must be pulled back onto the pressure-node grid with the transpose
//! of the harmonic-averaging operator used to build `rho_i_vx`/`rho_i_vz`
//! in the first place (`medium::harmonic_pair` is self-adjoint only in the
//! equal-neighbor case, so the pullback is a true transpose, not a reuse).

use ndarray::Array2;

/// Gradient accumulators for one supersource, on the extended mesh.
#[derive(Debug, Clone)]
pub struct GradientAccumulator {
    pub g_ktt: Array2<f64>,
    pub g_rr_vx: Array2<f64>,
    pub g_rr_vz: Array2<f64>,
}

impl GradientAccumulator {
    pub fn zeros(nz: usize, nx: usize) -> GradientAccumulator {
        GradientAccumulator {
            g_ktt: Array2::zeros((nz, nx)),
            g_rr_vx: Array2::zeros((nz, nx)),
            g_rr_vz: Array2::zeros((nz, nx)),
        }
    }

    /// Accumulates one time step's cross-correlation contribution.
    ///
    /// `p_fwd`/`vx_fwd`/`vz_fwd` are the replayed forward wavefield at this
    /// step (see `boundary`); `p_adj`/`vx_adj`/`vz_adj` are the adjoint
    /// wavefield at the same step. `cell_area = dz * dx`.
    #[allow(clippy::too_many_arguments)]
    pub fn accumulate(
        &mut self,
        p_fwd: &Array2<f64>,
        vx_fwd: &Array2<f64>,
        vz_fwd: &Array2<f64>,
        p_adj: &Array2<f64>,
        vx_adj: &Array2<f64>,
        vz_adj: &Array2<f64>,
        cell_area: f64,
    ) {
        ndarray::Zip::from(&mut self.g_ktt)
            .and(p_fwd)
            .and(p_adj)
            .for_each(|g, &f, &a| *g += cell_area * f * a);
        ndarray::Zip::from(&mut self.g_rr_vx)
            .and(vx_fwd)
            .and(vx_adj)
            .for_each(|g, &f, &a| *g += cell_area * f * a);
        ndarray::Zip::from(&mut self.g_rr_vz)
            .and(vz_fwd)
            .and(vz_adj)
            .for_each(|g, &f, &a| *g += cell_area * f * a);
    }

    /// Folds another accumulator (e.g. another supersource's contribution)
    /// into this one. Addition is commutative, so callers may reduce
    /// supersource results in any order (spec.md §5).
    pub fn add_assign(&mut self, other: &GradientAccumulator) {
        self.g_ktt += &other.g_ktt;
        self.g_rr_vx += &other.g_rr_vx;
        self.g_rr_vz += &other.g_rr_vz;
    }

    /// Pulls `g_rr_vx`/`g_rr_vz` back onto the pressure-node grid using the
    /// transpose of the forward harmonic-mean-in-x/z operator, and returns
    /// the combined density gradient alongside the bulk-modulus gradient.
    pub fn pulled_back(&self) -> (Array2<f64>, Array2<f64>) {
        let g_rho = transpose_harmonic_x(&self.g_rr_vx) + transpose_harmonic_z(&self.g_rr_vz);
        (self.g_ktt.clone(), g_rho)
    }
}

/// Transpose of `medium::harmonic_mean_x`: scatters each `g_rr_vx[iz,ix]`
/// contribution back onto the pressure nodes `(iz,ix)` and `(iz,ix+1)` it
/// was derived from. Edge columns that were folded onto themselves in the
/// forward map scatter their full contribution back onto that same column.
fn transpose_harmonic_x(g: &Array2<f64>) -> Array2<f64> {
    let (nz, nx) = g.dim();
    let mut out = Array2::zeros((nz, nx));
    for iz in 0..nz {
        for ix in 0..nx {
            let jx = (ix + 1).min(nx - 1);
            let half = g[[iz, ix]] * 0.5;
            out[[iz, ix]] += half;
            out[[iz, jx]] += half;
        }
    }
    out
}

fn transpose_harmonic_z(g: &Array2<f64>) -> Array2<f64> {
    let (nz, nx) = g.dim();
    let mut out = Array2::zeros((nz, nx));
    for iz in 0..nz {
        let jz = (iz + 1).min(nz - 1);
        for ix in 0..nx {
            let half = g[[iz, ix]] * 0.5;
            out[[iz, ix]] += half;
            out[[jz, ix]] += half;
        }
    }
    out
}
