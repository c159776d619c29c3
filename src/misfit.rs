//! Least-squares scaling and residual utility (spec.md §4.10), generalized
//! over a `Signal` trait so the same scaling formula serves both real
//! time-domain traces and complex frequency-domain spectra (SPEC_FULL.md
//! §4.14).

use num_complex::Complex;

/// A value a misfit can be computed over, expressed as a complex sample so
/// the optimal-scaling formula stays fully complex-valued even when `Self`
/// is real; for real signals the imaginary part is simply zero.
pub trait Signal: Copy {
    fn to_complex(self) -> Complex<f64>;
}

impl Signal for f64 {
    fn to_complex(self) -> Complex<f64> {
        Complex::new(self, 0.0)
    }
}

impl Signal for Complex<f64> {
    fn to_complex(self) -> Complex<f64> {
        self
    }
}

/// Optimal scalar `alpha` minimizing `||observed - alpha * synthetic||^2`,
/// and the resulting least-squares residual energy. `alpha` is genuinely
/// complex: `⟨synthetic, observed⟩ / ⟨synthetic, synthetic⟩`, which only
/// degenerates to a real number when `synthetic` and `observed` share a
/// common phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledMisfit {
    pub alpha: Complex<f64>,
    pub residual_energy: f64,
}

/// Computes the optimal amplitude scaling of `synthetic` onto `observed`
/// and the misfit after applying it. Both slices must have equal length;
/// an empty or all-zero `synthetic` returns `alpha = 0`.
pub fn scale_and_misfit<T: Signal>(observed: &[T], synthetic: &[T]) -> ScaledMisfit {
    assert_eq!(observed.len(), synthetic.len(), "observed/synthetic length mismatch");

    let mut numerator = Complex::new(0.0, 0.0);
    let mut denominator = 0.0;
    for (&o, &s) in observed.iter().zip(synthetic.iter()) {
        let (o, s) = (o.to_complex(), s.to_complex());
        numerator += s.conj() * o;
        denominator += s.norm_sqr();
    }

    let alpha = if denominator == 0.0 { Complex::new(0.0, 0.0) } else { numerator / denominator };

    let mut residual_energy = 0.0;
    for (&o, &s) in observed.iter().zip(synthetic.iter()) {
        let (o, s) = (o.to_complex(), s.to_complex());
        residual_energy += (o - alpha * s).norm_sqr();
    }

    ScaledMisfit { alpha, residual_energy }
}
