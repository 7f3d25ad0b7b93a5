use crate::math::{bell, StatsHelper};
use crate::prelude::{NmbimError, NmbimResult};
use crate::store::{map_of, Value};
use log::warn;
use ndarray::{s, Array1, ArrayView1};

/// Half-width of the ground window used when no below-noise bin exists.
pub const FALLBACK_GROUND_HALF_WIDTH_M: f64 = 5.0;

/// Ground and vegetation boundaries of one waveform.
///
/// Heights are metres above ground; indices count bins from the top.
#[derive(Debug, Clone, PartialEq)]
pub struct VegGroundSeparation {
    pub ground_top: f64,
    pub ground_bottom: f64,
    pub veg_top: f64,
    pub veg_bottom: f64,
    pub veg_first_idx: usize,
    pub veg_last_idx: usize,
    pub ground_first_idx: usize,
    pub ground_last_idx: usize,
}

impl From<VegGroundSeparation> for Value {
    fn from(sep: VegGroundSeparation) -> Self {
        map_of([
            ("ground_top", Value::Float(sep.ground_top)),
            ("ground_bottom", Value::Float(sep.ground_bottom)),
            ("veg_top", Value::Float(sep.veg_top)),
            ("veg_bottom", Value::Float(sep.veg_bottom)),
            ("veg_first_idx", Value::from(sep.veg_first_idx)),
            ("veg_last_idx", Value::from(sep.veg_last_idx)),
            ("ground_first_idx", Value::from(sep.ground_first_idx)),
            ("ground_last_idx", Value::from(sep.ground_last_idx)),
        ])
    }
}

/// Tunables of [`separate_veg_ground`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeparationParams {
    pub min_veg_bottom: f64,
    pub max_veg_bottom: f64,
    pub veg_buffer: f64,
}

fn below_noise_offset(wf: ArrayView1<f64>, ground_idx: usize, noise: f64) -> Option<usize> {
    wf.slice(s![ground_idx..]).iter().position(|&v| v < noise)
}

/// Splits a waveform into ground and vegetation zones.
///
/// The ground bin is the first bin of smallest absolute height. The ground
/// zone extends from it by the offset to the first bin below twice the noise
/// std, measured first above the canopy top and then over the whole
/// above-ground waveform. When neither level is crossed the zone is a fixed
/// ±5 m window. The last vegetation bin is the last bin at or above the
/// ground half-width, clamped into `[min_veg_bottom, max_veg_bottom]`. When
/// that bin lies above the canopy top the vegetation zone collapses to
/// `veg_last_idx == veg_first_idx`, with a warning.
pub fn separate_veg_ground(
    wf: ArrayView1<f64>,
    ht: ArrayView1<f64>,
    dz: f64,
    rh100: f64,
    params: SeparationParams,
) -> NmbimResult<VegGroundSeparation> {
    super::same_length(&[("wf", wf.len()), ("ht", ht.len())])?;
    let n = wf.len();
    if n < 2 {
        return Err(NmbimError::InvalidInput("waveform has fewer than two bins".into()));
    }
    if dz.is_nan() || dz <= 0.0 {
        return Err(NmbimError::InvalidInput(format!("dz must be positive, got {}", dz)));
    }
    if params.min_veg_bottom > params.max_veg_bottom {
        return Err(NmbimError::InvalidInput(format!(
            "min_veg_bottom {} exceeds max_veg_bottom {}",
            params.min_veg_bottom, params.max_veg_bottom
        )));
    }

    let veg_first_idx = ht.iter().position(|&h| h <= rh100).unwrap_or(0);
    let ground_idx = StatsHelper::argmin_abs(ht)
        .ok_or_else(|| NmbimError::InvalidInput("heights are all NaN".into()))?;

    let noise = 2.0 * StatsHelper::std(wf.slice(s![..veg_first_idx]));
    let offset = match below_noise_offset(wf, ground_idx, noise) {
        Some(offset) => offset,
        None => {
            let noise = 2.0 * StatsHelper::std(wf.slice(s![..ground_idx]));
            match below_noise_offset(wf, ground_idx, noise) {
                Some(offset) => offset,
                None => {
                    let offset = (FALLBACK_GROUND_HALF_WIDTH_M / dz).round() as usize;
                    warn!(
                        "no below-noise bin after ground index {}; using ±{} m window ({} bins)",
                        ground_idx, FALLBACK_GROUND_HALF_WIDTH_M, offset
                    );
                    offset
                }
            }
        }
    };
    let ground_last_idx = ground_idx.saturating_add(offset).min(n - 1);
    let ground_first_idx = ground_idx.saturating_sub(offset);

    let last_veg_height = ht[ground_last_idx]
        .abs()
        .clamp(params.min_veg_bottom, params.max_veg_bottom);
    let mut veg_last_idx = match ht.iter().rposition(|&h| h >= last_veg_height) {
        Some(idx) => idx,
        None => match ht.iter().rposition(|&h| h > 0.0) {
            Some(idx) => {
                warn!(
                    "no bin at or above {} m; last vegetation bin falls back to lowest positive height",
                    last_veg_height
                );
                idx
            }
            None => {
                warn!("no positive heights; last vegetation bin falls back to the ground bin");
                ground_idx
            }
        },
    };
    if veg_last_idx < veg_first_idx {
        warn!(
            "vegetation bottom {} m is above canopy top {} m; vegetation zone is empty",
            last_veg_height, rh100
        );
        veg_last_idx = veg_first_idx;
    }

    Ok(VegGroundSeparation {
        ground_top: ht[ground_first_idx],
        ground_bottom: ht[ground_last_idx],
        veg_top: rh100 + params.veg_buffer,
        veg_bottom: ht[veg_last_idx],
        veg_first_idx,
        veg_last_idx,
        ground_first_idx,
        ground_last_idx,
    })
}

/// Symmetric Gaussian model of the ground return, scaled to the ground peak.
///
/// `sigma = |ground_bottom| * sd_ratio`; the unit bell is rounded to two
/// decimals before scaling. A ground zone of zero depth gives an all-zero
/// model with a warning.
pub fn create_ground_return(
    wf: ArrayView1<f64>,
    ht: ArrayView1<f64>,
    ground_bottom: f64,
    sd_ratio: f64,
) -> NmbimResult<Array1<f64>> {
    super::same_length(&[("wf", wf.len()), ("ht", ht.len())])?;
    if sd_ratio.is_nan() || sd_ratio <= 0.0 {
        return Err(NmbimError::InvalidInput(format!(
            "sd_ratio must be positive, got {}",
            sd_ratio
        )));
    }
    let sigma = ground_bottom.abs() * sd_ratio;
    if !sigma.is_finite() || sigma == 0.0 {
        warn!("ground return width {} from ground bottom {}; ground model is zero", sigma, ground_bottom);
        return Ok(Array1::zeros(wf.len()));
    }
    let ground_idx = StatsHelper::argmin_abs(ht)
        .ok_or_else(|| NmbimError::InvalidInput("heights are empty or all NaN".into()))?;
    let peak = wf[ground_idx];
    Ok(ht.mapv(|h| (bell(h, sigma) * 100.0).round() / 100.0 * peak))
}

/// Waveform minus the ground model, clamped at zero and cut above `veg_top`.
pub fn isolate_vegetation(
    wf: ArrayView1<f64>,
    ht: ArrayView1<f64>,
    veg_top: f64,
    ground_return: ArrayView1<f64>,
) -> NmbimResult<Array1<f64>> {
    super::same_length(&[
        ("wf", wf.len()),
        ("ht", ht.len()),
        ("ground_return", ground_return.len()),
    ])?;
    Ok(wf
        .iter()
        .zip(ht.iter())
        .zip(ground_return.iter())
        .map(|((&v, &h), &g)| if h > veg_top { 0.0 } else { (v - g).max(0.0) })
        .collect())
}
