use crate::math::StatsHelper;
use crate::prelude::{NmbimError, NmbimResult};
use ndarray::{Array1, ArrayView1};

/// Height above ground of every bin, highest first.
pub fn calc_height(wf: ArrayView1<f64>, elev_top: f64, elev_bottom: f64, elev_ground: f64) -> Array1<f64> {
    StatsHelper::linspace(elev_top, elev_bottom, wf.len()) - elev_ground
}

/// Vertical bin size from the first two heights.
pub fn calc_dz(ht: ArrayView1<f64>) -> NmbimResult<f64> {
    if ht.len() < 2 {
        return Err(NmbimError::InvalidInput(format!(
            "need at least two heights for dz, got {}",
            ht.len()
        )));
    }
    Ok(ht[0] - ht[1])
}

/// Masks every bin outside `[floor, ceiling]` with NaN.
pub fn truncate_waveform(
    wf: ArrayView1<f64>,
    ht: ArrayView1<f64>,
    floor: f64,
    ceiling: f64,
) -> NmbimResult<Array1<f64>> {
    super::same_length(&[("wf", wf.len()), ("ht", ht.len())])?;
    Ok(wf
        .iter()
        .zip(ht.iter())
        .map(|(&v, &h)| if h >= floor && h <= ceiling { v } else { f64::NAN })
        .collect())
}
