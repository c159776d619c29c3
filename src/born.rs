//! Born linearized secondary sourcing (spec.md §4.8).
//!
//! Under `AttribMod::AcousticBorn`, wavefield 1 propagates in the background
//! medium as usual; at every step its pressure and velocity derivatives
//! drive a secondary source term into wavefield 2, which then propagates
//! the scattered field in the same background medium. The secondary source
//! is proportional to the medium perturbation, so the scattered field is
//! linear in it (spec.md §8 Born-linearity property).

use crate::medium::Perturbation;
use crate::wavefield::WavefieldState;
use ndarray::Array2;

/// Computes the Born secondary pressure-rate source for this step from
/// wavefield 1's current state and the perturbation, and adds it directly
/// into wavefield 2's pressure field.
///
/// `gmodel_flag` gates this: Born injection only runs on the forward
/// gradient-model pass, never on a plain adjoint run (callers are expected
/// to simply not call this function when `gmodel_flag` is false, but the
/// guard is kept here too since a caller bug here is unusually easy to get
/// wrong and silently corrupt gradients).
pub fn inject_secondary_source(
    primary: &WavefieldState,
    secondary: &mut WavefieldState,
    perturbation: &Perturbation,
    dt: f64,
    gmodel_flag: bool,
) {
    if !gmodel_flag {
        return;
    }
    let div_v = &primary.scratch.dvxdx + &primary.scratch.dvzdz;
    add_scaled(&mut secondary.fields.p, &(&perturbation.delta_ki * &div_v), -dt);

    add_scaled(
        &mut secondary.fields.vx,
        &(&perturbation.delta_rho_i * &primary.scratch.dpdx),
        -dt,
    );
    add_scaled(
        &mut secondary.fields.vz,
        &(&perturbation.delta_rho_i * &primary.scratch.dpdz),
        -dt,
    );
}

fn add_scaled(target: &mut Array2<f64>, source: &Array2<f64>, scale: f64) {
    ndarray::Zip::from(target).and(source).for_each(|t, &s| *t += scale * s);
}
