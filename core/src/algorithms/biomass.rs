use crate::prelude::NmbimResult;
use ndarray::ArrayView1;

/// `dz · Σ dp_dz·|ht|^hse` ignoring NaN bins; exactly 0 for a single-mode shot.
pub fn calc_biomass_index(
    dp_dz: ArrayView1<f64>,
    dz: f64,
    ht: ArrayView1<f64>,
    hse: f64,
    n_modes: i64,
) -> NmbimResult<f64> {
    if n_modes == 1 {
        return Ok(0.0);
    }
    super::same_length(&[("dp_dz", dp_dz.len()), ("ht", ht.len())])?;
    let weighted: f64 = dp_dz
        .iter()
        .zip(ht.iter())
        .map(|(&p, &h)| p * h.abs().powf(hse))
        .filter(|v| !v.is_nan())
        .sum();
    Ok(weighted * dz)
}

/// Signed variant over `[floor, ceiling]`: bins below ground subtract.
pub fn calc_biomass_index_simple(
    dp_dz: ArrayView1<f64>,
    dz: f64,
    ht: ArrayView1<f64>,
    floor: f64,
    ceiling: f64,
    hse: f64,
) -> NmbimResult<f64> {
    super::same_length(&[("dp_dz", dp_dz.len()), ("ht", ht.len())])?;
    let weighted: f64 = dp_dz
        .iter()
        .zip(ht.iter())
        .filter(|&(_, &h)| h >= floor && h <= ceiling)
        .map(|(&p, &h)| p * h.abs().powf(hse) * sign(h))
        .filter(|v| !v.is_nan())
        .sum();
    Ok(weighted * dz)
}

fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};

    #[test]
    fn single_mode_is_exactly_zero() {
        let dp_dz = array![1.0, 2.0, 3.0];
        let ht = array![10.0, 5.0, 0.0];
        assert_eq!(calc_biomass_index(dp_dz.view(), 0.15, ht.view(), 1.7, 1).unwrap(), 0.0);
        let mismatched = Array1::<f64>::zeros(1);
        assert_eq!(
            calc_biomass_index(mismatched.view(), f64::NAN, ht.view(), 1.7, 1).unwrap(),
            0.0
        );
    }

    #[test]
    fn index_weights_density_by_height() {
        let dp_dz = array![1.0, f64::NAN, 2.0, 4.0];
        let ht = array![4.0, 3.0, 1.0, 0.0];
        let bi = calc_biomass_index(dp_dz.view(), 0.5, ht.view(), 2.0, 3).unwrap();
        assert!((bi - 0.5 * (16.0 + 2.0)).abs() < 1e-12);
        assert!(calc_biomass_index(dp_dz.view(), 0.5, array![1.0].view(), 2.0, 3).is_err());
    }

    #[test]
    fn simple_index_cancels_below_ground() {
        let dp_dz = array![1.0, 1.0, 1.0, 1.0];
        let ht = array![3.0, 1.0, -1.0, -3.0];
        let bi = calc_biomass_index_simple(dp_dz.view(), 1.0, ht.view(), -1.0, 2.0, 1.0).unwrap();
        assert!(bi.abs() < 1e-12);
    }
}
