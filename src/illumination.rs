//! Source illumination accumulation (spec.md §4.9): a time-integrated
//! energy proxy used to precondition the raw cross-correlation gradient.

use ndarray::Array2;

/// Running `sum(p^2)` over time, on the extended mesh.
#[derive(Debug, Clone)]
pub struct Illumination {
    pub energy: Array2<f64>,
}

impl Illumination {
    pub fn zeros(nz: usize, nx: usize) -> Illumination {
        Illumination {
            energy: Array2::zeros((nz, nx)),
        }
    }

    pub fn accumulate(&mut self, p: &Array2<f64>) {
        ndarray::Zip::from(&mut self.energy).and(p).for_each(|e, &v| *e += v * v);
    }

    /// Folds another supersource's illumination into this one; addition is
    /// commutative so supersource results may be reduced in any order
    /// (spec.md §5).
    pub fn add_assign(&mut self, other: &Illumination) {
        self.energy += &other.energy;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulation_is_monotonic() {
        let mut illum = Illumination::zeros(3, 3);
        let p = Array2::from_elem((3, 3), 2.0);
        illum.accumulate(&p);
        let after_one = illum.energy[[1, 1]];
        illum.accumulate(&p);
        assert!(illum.energy[[1, 1]] > after_one);
    }

    #[test]
    fn a_quiet_field_contributes_nothing() {
        let mut illum = Illumination::zeros(3, 3);
        illum.accumulate(&Array2::zeros((3, 3)));
        assert!(illum.energy.iter().all(|&v| v == 0.));
    }

    #[test]
    fn add_assign_sums_independently_accumulated_illuminations() {
        let mut a = Illumination::zeros(2, 2);
        a.accumulate(&Array2::from_elem((2, 2), 1.0));
        let mut b = Illumination::zeros(2, 2);
        b.accumulate(&Array2::from_elem((2, 2), 3.0));
        a.add_assign(&b);
        assert_eq!(a.energy[[0, 0]], 1.0 + 9.0);
    }
}
