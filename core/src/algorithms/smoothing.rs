use crate::math::GaussianKernel;
use crate::prelude::{NmbimError, NmbimResult};
use ndarray::{Array1, ArrayView1};

/// Gaussian smoothing with mirrored edges; `sd == 0` returns the input.
pub fn smooth_waveform(wf: ArrayView1<f64>, sd: f64) -> NmbimResult<Array1<f64>> {
    if sd.is_nan() || sd < 0.0 {
        return Err(NmbimError::InvalidInput(format!(
            "smoothing sd must be non-negative, got {}",
            sd
        )));
    }
    if sd == 0.0 {
        return Ok(wf.to_owned());
    }
    Ok(GaussianKernel::new(sd).convolve(wf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn smoothing_spreads_a_spike() {
        let wf = array![0.0, 0.0, 0.0, 10.0, 0.0, 0.0, 0.0];
        let out = smooth_waveform(wf.view(), 1.0).unwrap();
        assert!(out[3] < 10.0 && out[2] > 0.0 && out[4] > 0.0);
        assert!((out[2] - out[4]).abs() < 1e-12);
        assert!((out.sum() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn zero_sd_is_identity_and_negative_is_rejected() {
        let wf = array![1.0, 5.0, 2.0];
        assert_eq!(smooth_waveform(wf.view(), 0.0).unwrap(), wf);
        assert!(matches!(
            smooth_waveform(wf.view(), -1.0),
            Err(NmbimError::InvalidInput(_))
        ));
    }
}
