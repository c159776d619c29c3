//! Convolutional PML profile construction (spec.md §4.2).
//!
//! Builds the per-axis damping (`a`), stretch (`b`), and inverse-stretch
//! (`kinv`) vectors used by the memory-variable recursion in `stepper`.
//! Faces absent from the requested absorbing set get an inert profile
//! (`a=0, b=1, kinv=1` everywhere), which also holds automatically for every
//! cell strictly inside the physical domain.

use crate::grid::{Face, Grid};
use ndarray::Array1;
use std::collections::HashSet;
use std::f64::consts::PI;

/// Polynomial order of the damping/stretch profile.
pub const PML_ORDER: f64 = 2.;
/// Target theoretical reflection coefficient at the PML's design frequency.
pub const PML_REFLECTION: f64 = 1e-6;
/// Maximum coordinate stretch at the outer edge of the PML.
const KMAX: f64 = 1.;
/// PML absorption parameter (CFS shift), held fixed at a small value.
const ALPHA_MAX: f64 = 0.;

/// Per-axis C-PML profile: one triple `(a, b, kinv)` per grid line along the
/// axis, length `nz` or `nx` of the extended mesh.
#[derive(Debug, Clone)]
pub struct AxisProfile {
    pub a: Array1<f64>,
    pub b: Array1<f64>,
    pub kinv: Array1<f64>,
}

impl AxisProfile {
    fn inert(n: usize) -> AxisProfile {
        AxisProfile {
            a: Array1::zeros(n),
            b: Array1::ones(n),
            kinv: Array1::ones(n),
        }
    }
}

/// The PML profiles for both axes of the extended mesh.
#[derive(Debug, Clone)]
pub struct PmlProfiles {
    pub z: AxisProfile,
    pub x: AxisProfile,
}

impl PmlProfiles {
    /// Builds profiles for an extended mesh given the set of absorbing
    /// faces, the maximum P-wave velocity in the medium, the peak source
    /// frequency, and the PML thickness carried by `grid`.
    pub fn build(grid: &Grid, abs_trbl: &HashSet<Face>, vpmax: f64, fpeak: f64, dt: f64) -> PmlProfiles {
        let npml = grid.npml;
        let thickness = npml.saturating_sub(3).max(1);

        let d_max = pml_dmax(thickness as f64 * grid.dz.min(grid.dx), vpmax, PML_REFLECTION);

        let z = build_axis(
            grid.nz(),
            grid.pad(),
            thickness,
            abs_trbl.contains(&Face::ZMin),
            abs_trbl.contains(&Face::ZMax),
            d_max,
            dt,
        );
        let x = build_axis(
            grid.nx(),
            grid.pad(),
            thickness,
            abs_trbl.contains(&Face::XMin),
            abs_trbl.contains(&Face::XMax),
            d_max,
            dt,
        );
        let _ = fpeak; // reserved: a frequency-dependent d_max variant is a future refinement
        PmlProfiles { z, x }
    }
}

/// `d_max` chosen so the theoretical normal-incidence reflection at the PML
/// matches `reflection` for a layer of physical thickness `l` in a medium of
/// velocity `vpmax` (standard log-reflection formula for polynomial grading).
fn pml_dmax(l: f64, vpmax: f64, reflection: f64) -> f64 {
    -(PML_ORDER + 1.) * vpmax * reflection.ln() / (2. * l)
}

#[allow(clippy::too_many_arguments)]
fn build_axis(
    n_total: usize,
    pad: usize,
    thickness: usize,
    absorb_min: bool,
    absorb_max: bool,
    d_max: f64,
    dt: f64,
) -> AxisProfile {
    if !absorb_min && !absorb_max {
        return AxisProfile::inert(n_total);
    }

    let mut a = Array1::zeros(n_total);
    let mut b = Array1::ones(n_total);
    let mut kinv = Array1::ones(n_total);

    // `i = pad` is the inner edge of the min-side layer (touching the
    // physical domain, d=0); `i = 0` is the outer boundary (d=1 plateau for
    // any cell farther than `thickness` from the inner edge).
    if absorb_min {
        for i in 0..pad {
            let depth = pad - i;
            let d = (depth as f64 / thickness as f64).min(1.0);
            set_cell(&mut a, &mut b, &mut kinv, i, d, d_max, dt);
        }
    }
    // Symmetric on the max side: `i = n_total - pad - 1` is the inner edge,
    // `i = n_total - 1` is the outer boundary.
    if absorb_max {
        let inner = n_total - pad - 1;
        for i in (n_total - pad)..n_total {
            let depth = i - inner;
            let d = (depth as f64 / thickness as f64).min(1.0);
            set_cell(&mut a, &mut b, &mut kinv, i, d, d_max, dt);
        }
    }

    AxisProfile { a, b, kinv }
}

fn set_cell(a: &mut Array1<f64>, b: &mut Array1<f64>, kinv: &mut Array1<f64>, i: usize, d: f64, d_max: f64, dt: f64) {
    let d_damp = d * d * d_max;
    let k = 1. + (KMAX - 1.) * d * d;
    let alpha = ALPHA_MAX * (1. - d);

    let bi = (-(d_damp / k + alpha) * dt).exp();
    let ai = if d_damp.abs() < f64::EPSILON {
        0.
    } else {
        d_damp * (bi - 1.) / (k * (d_damp + k * alpha))
    };

    a[i] = ai;
    b[i] = bi;
    kinv[i] = 1. / k;
}

/// Sanity helper: number of PI radians in a full damping cycle, unused by the
/// profile math but kept for callers building frequency-dependent variants.
#[allow(dead_code)]
fn _reserved_two_pi() -> f64 {
    2. * PI
}
