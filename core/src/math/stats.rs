use ndarray::{Array1, ArrayView1};

/// NaN-aware reductions over waveform bins.
pub struct StatsHelper;

impl StatsHelper {
    /// Sum ignoring NaN; all-NaN or empty input sums to zero.
    pub fn nansum(samples: ArrayView1<f64>) -> f64 {
        samples.iter().filter(|v| !v.is_nan()).sum()
    }

    /// Running sum treating NaN as zero.
    pub fn nancumsum(samples: ArrayView1<f64>) -> Array1<f64> {
        let mut total = 0.0;
        samples
            .iter()
            .map(|&v| {
                if !v.is_nan() {
                    total += v;
                }
                total
            })
            .collect()
    }

    pub fn mean(samples: ArrayView1<f64>) -> f64 {
        if samples.is_empty() {
            return f64::NAN;
        }
        samples.sum() / samples.len() as f64
    }

    /// Population standard deviation; NaN for an empty slice.
    pub fn std(samples: ArrayView1<f64>) -> f64 {
        let mean = Self::mean(samples);
        if mean.is_nan() {
            return f64::NAN;
        }
        let var = samples.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / samples.len() as f64;
        var.sqrt()
    }

    /// First index holding the smallest absolute value.
    pub fn argmin_abs(samples: ArrayView1<f64>) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, v) in samples.iter().enumerate() {
            let a = v.abs();
            if a.is_nan() {
                continue;
            }
            match best {
                Some((_, current)) if a >= current => {}
                _ => best = Some((i, a)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// `num` evenly spaced values from `start` to `stop` inclusive.
    pub fn linspace(start: f64, stop: f64, num: usize) -> Array1<f64> {
        match num {
            0 => Array1::zeros(0),
            1 => Array1::from(vec![start]),
            _ => Array1::linspace(start, stop, num),
        }
    }
}
