//! Courant and dispersion admissibility checks (spec.md §4.1).

use crate::errors::*;
use log::warn;

/// `C_max` for the 4th-order staggered scheme used by `stepper`.
pub const C_MAX: f64 = 0.5;
/// Minimum grid points per wavelength for the dispersion bound.
pub const MIN_PPW: f64 = 5.;

/// Velocity bounds of the medium, used by both the Courant and dispersion
/// checks.
#[derive(Debug, Clone, Copy)]
pub struct VelocityBounds {
    pub vpmin: f64,
    pub vpmax: f64,
}

/// The source frequency band driving the dispersion check.
#[derive(Debug, Clone, Copy)]
pub struct FrequencyBand {
    pub fmin: f64,
    pub fmax: f64,
}

/// Fails fast with a `StabilityError` if either the Courant or dispersion
/// bound is violated; logs a warning if the Courant number is within 10% of
/// `C_MAX` (stable, but thin margin).
pub fn check(bounds: VelocityBounds, dz: f64, dx: f64, dt: f64, band: FrequencyBand) -> Result<()> {
    let courant = dt * bounds.vpmax * (1. / (dz * dz) + 1. / (dx * dx)).sqrt();
    if courant > C_MAX {
        bail!(ErrorKind::StabilityError(format!(
            "Courant number {:.4} exceeds stability limit {:.4} (dt={}, vpmax={}, dz={}, dx={})",
            courant, C_MAX, dt, bounds.vpmax, dz, dx
        )));
    }
    if courant > 0.9 * C_MAX {
        warn!(
            "Courant number {:.4} is within 10% of the stability limit {:.4}",
            courant, C_MAX
        );
    }

    let min_spacing = dz.min(dx);
    let dispersion_limit = bounds.vpmin / (MIN_PPW * band.fmax);
    if min_spacing > dispersion_limit {
        bail!(ErrorKind::StabilityError(format!(
            "grid spacing {:.4} is too coarse for dispersion-free propagation at {} Hz in a {} \
             m/s medium (limit {:.4})",
            min_spacing, band.fmax, bounds.vpmin, dispersion_limit
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_comfortably_stable_setup() {
        let bounds = VelocityBounds {
            vpmin: 2000.,
            vpmax: 2000.,
        };
        let band = FrequencyBand {
            fmin: 5.,
            fmax: 40.,
        };
        assert!(check(bounds, 10., 10., 0.001, band).is_ok());
    }

    #[test]
    fn rejects_courant_violation() {
        let bounds = VelocityBounds {
            vpmin: 2000.,
            vpmax: 2000.,
        };
        let band = FrequencyBand {
            fmin: 5.,
            fmax: 40.,
        };
        // dt way too large for the grid spacing.
        assert!(check(bounds, 10., 10., 0.01, band).is_err());
    }

    #[test]
    fn rejects_dispersion_violation() {
        let bounds = VelocityBounds {
            vpmin: 500.,
            vpmax: 500.,
        };
        let band = FrequencyBand {
            fmin: 5.,
            fmax: 80.,
        };
        // 10 m spacing is far too coarse for 500 m/s at 80 Hz.
        assert!(check(bounds, 10., 10., 0.0001, band).is_err());
    }
}
