//! The innermost FDTD time loop (spec.md §4.3, `advance!`).
//!
//! Per step: compute `dpdx, dpdz`; update the `dpdx/dpdz` PML memory
//! variables; advance `vx, vz`; compute `dvxdx, dvzdz`; update their memory
//! variables; advance `p`. The stencil radius is 2, so the outermost two
//! cells of the extended mesh are read-only padding and never written.

use crate::attrib::AttribMod;
use crate::errors::*;
use crate::medium::Medium;
use crate::pml::PmlProfiles;
use crate::wavefield::WavefieldState;
use ndarray::parallel::prelude::*;
use ndarray::{Array2, Axis};

/// Radius of the 4th-order stencil; cells closer than this to the edge of
/// the extended mesh are never written by `advance`.
pub const STENCIL_RADIUS: usize = 2;

/// Advances one wavefield by one time step under the given attribute.
///
/// `p_source` is an optional pressure-rate injection to add to `p` *before*
/// the pressure update reads it (used by Born secondary sourcing, see
/// `born`); pass `None` for a plain step.
pub fn advance(
    attrib: AttribMod,
    state: &mut WavefieldState,
    medium: &Medium,
    pml: &PmlProfiles,
    dt: f64,
    dz: f64,
    dx: f64,
) -> Result<()> {
    if attrib == AttribMod::AcousticVisco {
        bail!(ErrorKind::ConfigError(
            "AcousticVisco stepping is not implemented; the viscoacoustic update equations are \
             a separate specification pass"
                .to_string()
        ));
    }

    let (nz, nx) = state.fields.p.dim();

    compute_dpdx(&state.fields.p, &mut state.scratch.dpdx, nx, dx);
    compute_dpdz(&state.fields.p, &mut state.scratch.dpdz, nz, dz);

    update_memory_x(&mut state.memory.m_dpdx, &state.scratch.dpdx, pml, nx);
    update_memory_z(&mut state.memory.m_dpdz, &state.scratch.dpdz, pml, nz);

    advance_velocity(
        &mut state.fields.vx,
        &state.scratch.dpdx,
        &state.memory.m_dpdx,
        &medium.rho_i_vx,
        &pml.x.kinv,
        dt,
        Axis2::X,
    );
    advance_velocity(
        &mut state.fields.vz,
        &state.scratch.dpdz,
        &state.memory.m_dpdz,
        &medium.rho_i_vz,
        &pml.z.kinv,
        dt,
        Axis2::Z,
    );

    compute_dvxdx(&state.fields.vx, &mut state.scratch.dvxdx, nx, dx);
    compute_dvzdz(&state.fields.vz, &mut state.scratch.dvzdz, nz, dz);

    update_memory_x(&mut state.memory.m_dvxdx, &state.scratch.dvxdx, pml, nx);
    update_memory_z(&mut state.memory.m_dvzdz, &state.scratch.dvzdz, pml, nz);

    advance_pressure(state, medium, pml, dt, nz, nx);

    Ok(())
}

/// Exactly inverts one `advance` step: given the state `advance` produced,
/// recovers the state it was called with. The PML memory recursion
/// `m_new = b*m_old + a*d` doesn't take `dt` as a parameter (it's baked
/// into the precomputed `a`/`b` coefficients), so it cannot be undone by
/// re-running it with a negated `dt`; it has to be solved for `m_old`
/// directly. The pressure/velocity updates are linear in `dt` and invert
/// by re-running them with `-dt`, but only in the reverse order: `advance`
/// updates velocity before pressure, so its exact inverse undoes pressure
/// before velocity.
pub fn reverse(
    attrib: AttribMod,
    state: &mut WavefieldState,
    medium: &Medium,
    pml: &PmlProfiles,
    dt: f64,
    dz: f64,
    dx: f64,
) -> Result<()> {
    if attrib == AttribMod::AcousticVisco {
        bail!(ErrorKind::ConfigError(
            "AcousticVisco stepping is not implemented; the viscoacoustic update equations are \
             a separate specification pass"
                .to_string()
        ));
    }

    let (nz, nx) = state.fields.p.dim();

    // state.scratch.{dvxdx,dvzdz} and state.memory.{m_dvxdx,m_dvzdz} are
    // exactly as `advance` left them (post-update), since nothing has
    // touched vx/vz since. Undo the pressure update with them, then
    // recover the pre-update memory variables algebraically.
    compute_dvxdx(&state.fields.vx, &mut state.scratch.dvxdx, nx, dx);
    compute_dvzdz(&state.fields.vz, &mut state.scratch.dvzdz, nz, dz);

    advance_pressure(state, medium, pml, -dt, nz, nx);

    invert_memory_x(&mut state.memory.m_dvxdx, &state.scratch.dvxdx, pml, nx);
    invert_memory_z(&mut state.memory.m_dvzdz, &state.scratch.dvzdz, pml, nz);

    // p is now the pre-step pressure; recompute its derivatives to undo
    // the velocity update the same way.
    compute_dpdx(&state.fields.p, &mut state.scratch.dpdx, nx, dx);
    compute_dpdz(&state.fields.p, &mut state.scratch.dpdz, nz, dz);

    advance_velocity(
        &mut state.fields.vx,
        &state.scratch.dpdx,
        &state.memory.m_dpdx,
        &medium.rho_i_vx,
        &pml.x.kinv,
        -dt,
        Axis2::X,
    );
    advance_velocity(
        &mut state.fields.vz,
        &state.scratch.dpdz,
        &state.memory.m_dpdz,
        &medium.rho_i_vz,
        &pml.z.kinv,
        -dt,
        Axis2::Z,
    );

    invert_memory_x(&mut state.memory.m_dpdx, &state.scratch.dpdx, pml, nx);
    invert_memory_z(&mut state.memory.m_dpdz, &state.scratch.dpdz, pml, nz);

    Ok(())
}

/// Which axis a PML-corrected derivative belongs to, so the same
/// `advance_velocity` body can serve both `vx` and `vz`.
enum Axis2 {
    X,
    Z,
}

#[allow(clippy::too_many_arguments)]
fn advance_velocity(
    v: &mut Array2<f64>,
    dpd: &Array2<f64>,
    m_dpd: &Array2<f64>,
    rho_i: &Array2<f64>,
    kinv: &ndarray::Array1<f64>,
    dt: f64,
    axis: Axis2,
) {
    let (nz, nx) = v.dim();
    v.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(iz, mut row)| {
            if iz < STENCIL_RADIUS || iz >= nz - STENCIL_RADIUS {
                return;
            }
            for ix in STENCIL_RADIUS..(nx - STENCIL_RADIUS) {
                let k = match axis {
                    Axis2::X => kinv[ix],
                    Axis2::Z => kinv[iz],
                };
                let corrected = k * dpd[[iz, ix]] + m_dpd[[iz, ix]];
                row[ix] -= dt * rho_i[[iz, ix]] * corrected;
            }
        });
}

fn advance_pressure(state: &mut WavefieldState, medium: &Medium, pml: &PmlProfiles, dt: f64, nz: usize, nx: usize) {
    let dvxdx = &state.scratch.dvxdx;
    let dvzdz = &state.scratch.dvzdz;
    let m_dvxdx = &state.memory.m_dvxdx;
    let m_dvzdz = &state.memory.m_dvzdz;
    let ki = &medium.ki;
    let kinv_x = &pml.x.kinv;
    let kinv_z = &pml.z.kinv;

    state
        .fields
        .p
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(iz, mut row)| {
            if iz < STENCIL_RADIUS || iz >= nz - STENCIL_RADIUS {
                return;
            }
            for ix in STENCIL_RADIUS..(nx - STENCIL_RADIUS) {
                let div_x = kinv_x[ix] * dvxdx[[iz, ix]] + m_dvxdx[[iz, ix]];
                let div_z = kinv_z[iz] * dvzdz[[iz, ix]] + m_dvzdz[[iz, ix]];
                row[ix] -= dt * ki[[iz, ix]] * (div_x + div_z);
            }
        });
}

fn compute_dpdx(p: &Array2<f64>, out: &mut Array2<f64>, nx: usize, dx: f64) {
    out.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(iz, mut row)| {
            for ix in STENCIL_RADIUS..(nx - STENCIL_RADIUS) {
                row[ix] = (9. * (p[[iz, ix + 1]] - p[[iz, ix]]) - (p[[iz, ix + 2]] - p[[iz, ix - 1]])) / (24. * dx);
            }
        });
}

fn compute_dpdz(p: &Array2<f64>, out: &mut Array2<f64>, nz: usize, dz: f64) {
    out.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(iz, mut row)| {
            if iz < STENCIL_RADIUS || iz >= nz - STENCIL_RADIUS {
                return;
            }
            let width = row.len();
            for ix in 0..width {
                row[ix] = (9. * (p[[iz + 1, ix]] - p[[iz, ix]]) - (p[[iz + 2, ix]] - p[[iz - 1, ix]])) / (24. * dz);
            }
        });
}

fn compute_dvxdx(vx: &Array2<f64>, out: &mut Array2<f64>, nx: usize, dx: f64) {
    out.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(iz, mut row)| {
            for ix in STENCIL_RADIUS..(nx - STENCIL_RADIUS) {
                row[ix] =
                    (9. * (vx[[iz, ix]] - vx[[iz, ix - 1]]) - (vx[[iz, ix + 1]] - vx[[iz, ix - 2]])) / (24. * dx);
            }
        });
}

fn compute_dvzdz(vz: &Array2<f64>, out: &mut Array2<f64>, nz: usize, dz: f64) {
    out.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(iz, mut row)| {
            if iz < STENCIL_RADIUS || iz >= nz - STENCIL_RADIUS {
                return;
            }
            let width = row.len();
            for ix in 0..width {
                row[ix] =
                    (9. * (vz[[iz, ix]] - vz[[iz - 1, ix]]) - (vz[[iz + 1, ix]] - vz[[iz - 2, ix]])) / (24. * dz);
            }
        });
}

fn update_memory_x(m: &mut Array2<f64>, d: &Array2<f64>, pml: &PmlProfiles, nx: usize) {
    ndarray::Zip::from(m.rows_mut()).and(d.rows()).par_for_each(|mut mrow, drow| {
        for ix in STENCIL_RADIUS..(nx - STENCIL_RADIUS) {
            mrow[ix] = pml.x.b[ix] * mrow[ix] + pml.x.a[ix] * drow[ix];
        }
    });
}

fn update_memory_z(m: &mut Array2<f64>, d: &Array2<f64>, pml: &PmlProfiles, nz: usize) {
    ndarray::Zip::indexed(m.rows_mut()).and(d.rows()).par_for_each(|iz, mut mrow, drow| {
        if iz < STENCIL_RADIUS || iz >= nz - STENCIL_RADIUS {
            return;
        }
        for (mv, dv) in mrow.iter_mut().zip(drow.iter()) {
            *mv = pml.z.b[iz] * *mv + pml.z.a[iz] * *dv;
        }
    });
}

/// Solves `m_new = b*m_old + a*d` for `m_old`, given `m` holding `m_new`
/// and the same `d` the forward update used. The exact algebraic inverse
/// of `update_memory_x`, not a re-run with a negated step.
fn invert_memory_x(m: &mut Array2<f64>, d: &Array2<f64>, pml: &PmlProfiles, nx: usize) {
    ndarray::Zip::from(m.rows_mut()).and(d.rows()).par_for_each(|mut mrow, drow| {
        for ix in STENCIL_RADIUS..(nx - STENCIL_RADIUS) {
            mrow[ix] = (mrow[ix] - pml.x.a[ix] * drow[ix]) / pml.x.b[ix];
        }
    });
}

/// The exact algebraic inverse of `update_memory_z`.
fn invert_memory_z(m: &mut Array2<f64>, d: &Array2<f64>, pml: &PmlProfiles, nz: usize) {
    ndarray::Zip::indexed(m.rows_mut()).and(d.rows()).par_for_each(|iz, mut mrow, drow| {
        if iz < STENCIL_RADIUS || iz >= nz - STENCIL_RADIUS {
            return;
        }
        for (mv, dv) in mrow.iter_mut().zip(drow.iter()) {
            *mv = (*mv - pml.z.a[iz] * *dv) / pml.z.b[iz];
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Face, Grid};
    use crate::medium::Medium;
    use std::collections::HashSet;

    fn setup(nzd: usize, nxd: usize) -> (Grid, Medium, PmlProfiles) {
        let grid = Grid::with_npml(nzd, nxd, 10., 10., 10).unwrap();
        let ki = Array2::from_elem((grid.nz(), grid.nx()), 1. / (2000f64.powi(2) * 1000.));
        let rho_i = Array2::from_elem((grid.nz(), grid.nx()), 1. / 1000.);
        let medium = Medium::from_extended(ki, rho_i, &grid).unwrap();
        let abs: HashSet<Face> = HashSet::new();
        let pml = PmlProfiles::build(&grid, &abs, 2000., 25., 0.001);
        (grid, medium, pml)
    }

    #[test]
    fn a_quiet_field_stays_quiet() {
        let (grid, medium, pml) = setup(40, 40);
        let mut state = WavefieldState::zeros(&grid);
        advance(AttribMod::Acoustic, &mut state, &medium, &pml, 0.001, 10., 10.).unwrap();
        assert!(state.fields.p.iter().all(|&v| v == 0.));
        assert!(state.fields.vx.iter().all(|&v| v == 0.));
    }

    #[test]
    fn a_single_pressure_perturbation_spreads_to_velocity() {
        let (grid, medium, pml) = setup(40, 40);
        let mut state = WavefieldState::zeros(&grid);
        let (cz, cx) = (grid.nz() / 2, grid.nx() / 2);
        state.fields.p[[cz, cx]] = 1.0;
        advance(AttribMod::Acoustic, &mut state, &medium, &pml, 0.001, 10., 10.).unwrap();
        // velocity at the staggered neighbor should have moved off zero.
        assert!(state.fields.vx[[cz, cx]] != 0. || state.fields.vx[[cz, cx - 1]] != 0.);
    }

    #[test]
    fn outer_two_cells_are_never_written() {
        let (grid, medium, pml) = setup(40, 40);
        let mut state = WavefieldState::zeros(&grid);
        state.fields.p.fill(1.0);
        state.fields.vx.fill(1.0);
        state.fields.vz.fill(1.0);
        advance(AttribMod::Acoustic, &mut state, &medium, &pml, 0.001, 10., 10.).unwrap();
        let (nz, nx) = (grid.nz(), grid.nx());
        for ix in 0..nx {
            assert_eq!(state.fields.p[[0, ix]], 1.0);
            assert_eq!(state.fields.p[[1, ix]], 1.0);
            assert_eq!(state.fields.p[[nz - 1, ix]], 1.0);
            assert_eq!(state.fields.p[[nz - 2, ix]], 1.0);
        }
    }

    #[test]
    fn viscoacoustic_stepping_is_rejected() {
        let (grid, medium, pml) = setup(40, 40);
        let mut state = WavefieldState::zeros(&grid);
        assert!(advance(AttribMod::AcousticVisco, &mut state, &medium, &pml, 0.001, 10., 10.).is_err());
    }

    #[test]
    fn a_random_low_amplitude_field_stays_finite_after_a_step() {
        use rand::SeedableRng;
        use rand_distr::{Distribution, Normal};

        let (grid, medium, pml) = setup(40, 40);
        let mut state = WavefieldState::zeros(&grid);
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let noise = Normal::new(0.0, 1e-6).unwrap();
        for v in state.fields.p.iter_mut() {
            *v = noise.sample(&mut rng);
        }
        advance(AttribMod::Acoustic, &mut state, &medium, &pml, 0.001, 10., 10.).unwrap();
        assert!(state.fields.p.iter().all(|v| v.is_finite()));
        assert!(state.fields.vx.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn reverse_exactly_undoes_an_advance_step() {
        let (grid, medium, pml) = setup(40, 40);
        let mut state = WavefieldState::zeros(&grid);
        let (cz, cx) = (grid.nz() / 2, grid.nx() / 2);
        state.fields.p[[cz, cx]] = 1.0;
        state.fields.p[[cz + 3, cx - 2]] = -0.5;

        let before = state.clone();
        advance(AttribMod::Acoustic, &mut state, &medium, &pml, 0.001, 10., 10.).unwrap();
        reverse(AttribMod::Acoustic, &mut state, &medium, &pml, 0.001, 10., 10.).unwrap();

        for (a, b) in state.fields.p.iter().zip(before.fields.p.iter()) {
            assert!((a - b).abs() < 1e-10, "p mismatch: {} vs {}", a, b);
        }
        for (a, b) in state.fields.vx.iter().zip(before.fields.vx.iter()) {
            assert!((a - b).abs() < 1e-10, "vx mismatch: {} vs {}", a, b);
        }
        for (a, b) in state.fields.vz.iter().zip(before.fields.vz.iter()) {
            assert!((a - b).abs() < 1e-10, "vz mismatch: {} vs {}", a, b);
        }
    }

    #[test]
    fn reverse_rejects_viscoacoustic_stepping() {
        let (grid, medium, pml) = setup(40, 40);
        let mut state = WavefieldState::zeros(&grid);
        assert!(reverse(AttribMod::AcousticVisco, &mut state, &medium, &pml, 0.001, 10., 10.).is_err());
    }
}
