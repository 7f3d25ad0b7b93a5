use crate::math::StatsHelper;
use crate::prelude::{NmbimError, NmbimResult};
use log::warn;
use ndarray::{Array1, ArrayView1};

/// `max(wf - mean_noise, 0)`; NaN bins stay NaN.
pub fn remove_noise(wf: ArrayView1<f64>, mean_noise: f64) -> Array1<f64> {
    wf.mapv(|v| {
        let d = v - mean_noise;
        if d.is_nan() {
            d
        } else {
            d.max(0.0)
        }
    })
}

/// Scales the waveform to unit NaN-ignoring sum.
///
/// A zero-sum waveform comes back as all zeros with a warning.
pub fn normalize_waveform(wf: ArrayView1<f64>) -> Array1<f64> {
    let total = StatsHelper::nansum(wf);
    if total == 0.0 {
        warn!("waveform sums to zero; normalized to all zeros");
        return Array1::zeros(wf.len());
    }
    wf.mapv(|v| v / total)
}

/// Return density per metre of height; negatives clamp to zero.
pub fn calc_dp_dz(wf: ArrayView1<f64>, dz: f64) -> NmbimResult<Array1<f64>> {
    if dz == 0.0 || dz.is_nan() {
        return Err(NmbimError::InvalidInput(format!("dz must be non-zero, got {}", dz)));
    }
    Ok(wf.mapv(|v| {
        let density = v / dz;
        if density < 0.0 {
            0.0
        } else {
            density
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::capture_warnings;
    use ndarray::array;

    #[test]
    fn noise_removal_never_goes_negative() {
        let wf = array![-3.0, 0.0, 9.5, 10.0, 250.0, -1e9];
        let out = remove_noise(wf.view(), 10.0);
        assert!(out.iter().all(|&v| v >= 0.0));
        assert_eq!(out[4], 240.0);
        assert!(remove_noise(array![f64::NAN].view(), 1.0)[0].is_nan());
    }

    #[test]
    fn normalized_waveform_sums_to_one() {
        let wf = array![0.0, 2.0, f64::NAN, 6.0, 12.0];
        let out = normalize_waveform(wf.view());
        assert!((StatsHelper::nansum(out.view()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_sum_waveform_normalizes_to_zeros() {
        let (out, warnings) = capture_warnings(|| normalize_waveform(array![0.0, 0.0, 0.0].view()));
        assert_eq!(out.to_vec(), vec![0.0, 0.0, 0.0]);
        assert_eq!(warnings, vec!["waveform sums to zero; normalized to all zeros".to_string()]);
        let out = normalize_waveform(array![1.0, -1.0].view());
        assert_eq!(out.to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn dp_dz_clamps_for_either_sign_of_input() {
        let wf = array![-0.2, 0.1, 0.3];
        for dz in [0.15, -0.15] {
            let out = calc_dp_dz(wf.view(), dz).unwrap();
            assert!(out.iter().all(|&v| v >= 0.0));
        }
        assert!((calc_dp_dz(wf.view(), 0.1).unwrap()[2] - 3.0).abs() < 1e-12);
        assert!(calc_dp_dz(wf.view(), 0.0).is_err());
    }
}
