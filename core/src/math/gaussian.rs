use ndarray::{Array1, ArrayView1};

/// Kernel extends this many standard deviations each side.
pub const TRUNCATE: f64 = 4.0;

/// Normalized 1-D Gaussian kernel and its convolution with a signal.
#[derive(Debug, Clone)]
pub struct GaussianKernel {
    weights: Vec<f64>,
    radius: usize,
}

impl GaussianKernel {
    /// Kernel for a strictly positive `sd`.
    pub fn new(sd: f64) -> Self {
        let radius = (TRUNCATE * sd + 0.5) as usize;
        let raw: Vec<f64> = (0..=2 * radius)
            .map(|i| {
                let x = i as f64 - radius as f64;
                (-0.5 * x * x / (sd * sd)).exp()
            })
            .collect();
        let total: f64 = raw.iter().sum();
        Self {
            weights: raw.into_iter().map(|w| w / total).collect(),
            radius,
        }
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Convolves `signal`, mirroring it about its edges (`d c b a | a b c d | d c b a`).
    pub fn convolve(&self, signal: ArrayView1<f64>) -> Array1<f64> {
        let n = signal.len();
        if n == 0 {
            return Array1::zeros(0);
        }
        let r = self.radius as isize;
        (0..n)
            .map(|i| {
                self.weights
                    .iter()
                    .enumerate()
                    .map(|(k, w)| w * signal[reflect(i as isize + k as isize - r, n)])
                    .sum()
            })
            .collect()
    }
}

fn reflect(index: isize, n: usize) -> usize {
    let period = 2 * n as isize;
    let folded = index.rem_euclid(period);
    if folded < n as isize {
        folded as usize
    } else {
        (period - 1 - folded) as usize
    }
}

/// Unnormalized Gaussian `exp(-x² / 2σ²)`.
pub fn bell(x: f64, sigma: f64) -> f64 {
    (-(x * x) / (2.0 * sigma * sigma)).exp()
}
