use crate::math::StatsHelper;
use crate::prelude::{NmbimError, NmbimResult};
use crate::store::{map_of, Value};
use log::warn;
use ndarray::{s, Array1, ArrayView1};

/// Assumed ratio of vegetation to ground reflectance scaling the foliage terms.
const PROJECTION: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct GapProbability {
    pub veg_cover: f64,
    pub gap_prob: Array1<f64>,
    pub foliage_accum: Array1<f64>,
    pub foliage_density: Array1<f64>,
}

impl From<GapProbability> for Value {
    fn from(gap: GapProbability) -> Self {
        map_of([
            ("veg_cover", Value::Float(gap.veg_cover)),
            ("gap_prob", Value::Array(gap.gap_prob)),
            ("foliage_accum", Value::Array(gap.foliage_accum)),
            ("foliage_density", Value::Array(gap.foliage_density)),
        ])
    }
}

/// Vegetation cover and gap-probability profile of one waveform.
///
/// Vegetation energy spans `[veg_first_idx, veg_last_idx)`, ground energy
/// `[veg_last_idx + 1, ground_last_idx)`. Curves are NaN outside the
/// vegetation span. An empty vegetation span, or no energy at all, yields
/// `veg_cover = 0` and all-NaN curves with a warning.
pub fn calc_gap_prob(
    wf_per_height: ArrayView1<f64>,
    veg_first_idx: usize,
    veg_last_idx: usize,
    ground_last_idx: usize,
) -> NmbimResult<GapProbability> {
    let n = wf_per_height.len();
    if veg_first_idx > veg_last_idx {
        return Err(NmbimError::InvalidInput(format!(
            "veg_first_idx {} is after veg_last_idx {}",
            veg_first_idx, veg_last_idx
        )));
    }
    if veg_last_idx > n || ground_last_idx > n {
        return Err(NmbimError::InvalidInput(format!(
            "indices ({}, {}) exceed waveform length {}",
            veg_last_idx, ground_last_idx, n
        )));
    }

    let veg = wf_per_height.slice(s![veg_first_idx..veg_last_idx]);
    let veg_sum = StatsHelper::nansum(veg);
    let ground_start = (veg_last_idx + 1).min(n);
    let ground_sum = if ground_start < ground_last_idx {
        StatsHelper::nansum(wf_per_height.slice(s![ground_start..ground_last_idx]))
    } else {
        0.0
    };
    let total = veg_sum + ground_sum;

    if veg.is_empty() || total == 0.0 || total.is_nan() {
        warn!(
            "empty vegetation zone [{}, {}) or zero energy; gap probability undefined",
            veg_first_idx, veg_last_idx
        );
        let nan = Array1::from_elem(n, f64::NAN);
        return Ok(GapProbability {
            veg_cover: 0.0,
            gap_prob: nan.clone(),
            foliage_accum: nan.clone(),
            foliage_density: nan,
        });
    }

    let mut gap_prob = Array1::from_elem(n, f64::NAN);
    let cumulative = StatsHelper::nancumsum(veg);
    gap_prob
        .slice_mut(s![veg_first_idx..veg_last_idx])
        .assign(&cumulative.mapv(|c| 1.0 - c / total));

    let foliage_accum = gap_prob.mapv(|p| -p.ln() / PROJECTION);
    let foliage_density = ndarray::Zip::from(&wf_per_height)
        .and(&gap_prob)
        .map_collect(|&e, &p| e / p / PROJECTION);

    Ok(GapProbability {
        veg_cover: veg_sum / total,
        gap_prob,
        foliage_accum,
        foliage_density,
    })
}
