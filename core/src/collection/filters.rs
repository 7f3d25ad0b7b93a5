use crate::store::GeoPoint;
use crate::waveform::Waveform;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Caller-supplied acceptance test.
pub type PredicateFn = Arc<dyn Fn(&Waveform) -> bool + Send + Sync>;

/// Polygon ring as `[lon, lat]` vertices; closing the ring is optional.
pub type Ring = Vec<[f64; 2]>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub exterior: Ring,
    #[serde(default)]
    pub holes: Vec<Ring>,
}

impl Polygon {
    pub fn contains(&self, point: GeoPoint) -> bool {
        ring_contains(&self.exterior, point) && !self.holes.iter().any(|hole| ring_contains(hole, point))
    }
}

/// Even-odd ray casting towards +lon.
fn ring_contains(ring: &[[f64; 2]], point: GeoPoint) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let [xi, yi] = ring[i];
        let [xj, yj] = ring[j];
        if (yi > point.lat) != (yj > point.lat) {
            let crossing = xj + (point.lat - yj) / (yi - yj) * (xi - xj);
            if point.lon < crossing {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Shot filter applied while a collection is assembled.
///
/// Every variant is total: a waveform missing the field a filter reads is
/// rejected.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
    /// L2A quality flag equals 1.
    QualityFlag,
    Modes { min_modes: i64 },
    LandCover { min_treecover: f64 },
    /// Shot time within `[start, end]`; an open end is unbounded.
    Temporal {
        #[serde(default)]
        start: Option<DateTime<Utc>>,
        #[serde(default)]
        end: Option<DateTime<Utc>>,
    },
    Spatial { polygons: Vec<Polygon> },
    /// Relative ground position inside the recorded elevation window,
    /// 0 at the top and 1 at the bottom.
    PlausibleGround { min_ratio: f64, max_ratio: f64 },
    MinSpan { min_span: f64 },
    L2Loaded,
    #[serde(skip)]
    Predicate(PredicateFn),
}

impl Filter {
    pub fn predicate<F>(accept: F) -> Self
    where
        F: Fn(&Waveform) -> bool + Send + Sync + 'static,
    {
        Filter::Predicate(Arc::new(accept))
    }

    pub fn accepts(&self, waveform: &Waveform) -> bool {
        let float = |path: &str| waveform.get_f64(path).ok().filter(|v| !v.is_nan());
        match self {
            Filter::QualityFlag => float("metadata/flags/quality") == Some(1.0),
            Filter::Modes { min_modes } => float("metadata/modes/num_modes")
                .map_or(false, |modes| modes >= *min_modes as f64),
            Filter::LandCover { min_treecover } => float("metadata/landcover/modis_treecover")
                .map_or(false, |cover| cover >= *min_treecover),
            Filter::Temporal { start, end } => {
                let Some(seconds) = float("metadata/timestamp") else {
                    return false;
                };
                let Some(time) = DateTime::<Utc>::from_timestamp(seconds.floor() as i64, 0) else {
                    return false;
                };
                start.map_or(true, |s| time >= s) && end.map_or(true, |e| time <= e)
            }
            Filter::Spatial { polygons } => waveform
                .coords()
                .map_or(false, |point| polygons.iter().any(|polygon| polygon.contains(point))),
            Filter::PlausibleGround { min_ratio, max_ratio } => {
                match (float("raw/elev/top"), float("raw/elev/bottom"), float("raw/elev/ground")) {
                    (Some(top), Some(bottom), Some(ground)) if top != bottom => {
                        let ratio = (top - ground) / (top - bottom);
                        ratio >= *min_ratio && ratio <= *max_ratio
                    }
                    _ => false,
                }
            }
            Filter::MinSpan { min_span } => match (float("raw/elev/top"), float("raw/elev/ground")) {
                (Some(top), Some(ground)) => top - ground >= *min_span,
                _ => false,
            },
            Filter::L2Loaded => waveform
                .get_ref("metadata/flags/l2_loaded")
                .ok()
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            Filter::Predicate(accept) => accept(waveform),
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::QualityFlag => write!(f, "QualityFlag"),
            Filter::Modes { min_modes } => write!(f, "Modes(>= {})", min_modes),
            Filter::LandCover { min_treecover } => write!(f, "LandCover(>= {})", min_treecover),
            Filter::Temporal { start, end } => write!(f, "Temporal({:?}..{:?})", start, end),
            Filter::Spatial { polygons } => write!(f, "Spatial({} polygons)", polygons.len()),
            Filter::PlausibleGround { min_ratio, max_ratio } => {
                write!(f, "PlausibleGround({}..{})", min_ratio, max_ratio)
            }
            Filter::MinSpan { min_span } => write!(f, "MinSpan(>= {})", min_span),
            Filter::L2Loaded => write!(f, "L2Loaded"),
            Filter::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}
