//! Per-waveform model parameters written under `metadata/parameters`.

use crate::prelude::{NmbimError, NmbimResult};
use crate::store::{GeoPoint, Value};
use crate::waveform::Waveform;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Something that can yield a parameter value for a waveform.
pub trait ParameterSource: fmt::Debug + Send + Sync {
    /// Checks configuration once, before any waveform is touched.
    fn validate(&self) -> NmbimResult<()>;

    /// `None` when the source has no valid value for this waveform.
    fn value_at(&self, waveform: &Waveform) -> Option<f64>;
}

/// The same value for every waveform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalarSource {
    pub value: f64,
}

impl ScalarSource {
    pub fn new(value: f64) -> Self {
        Self { value }
    }

    pub fn parse(text: &str) -> NmbimResult<Self> {
        text.trim()
            .parse()
            .map(Self::new)
            .map_err(|_| NmbimError::Config(format!("invalid scalar parameter '{}'", text)))
    }
}

impl ParameterSource for ScalarSource {
    fn validate(&self) -> NmbimResult<()> {
        if self.value.is_nan() {
            return Err(NmbimError::Config("scalar parameter is NaN".into()));
        }
        Ok(())
    }

    fn value_at(&self, _waveform: &Waveform) -> Option<f64> {
        Some(self.value)
    }
}

/// North-up geographic grid sampled at the footprint location.
///
/// `west`/`north` are the outer edges of the first cell; rows run south.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSource {
    pub west: f64,
    pub north: f64,
    pub cell_width: f64,
    pub cell_height: f64,
    pub cols: usize,
    pub rows: usize,
    pub values: Vec<f64>,
    #[serde(default)]
    pub nodata: Option<f64>,
}

impl GridSource {
    fn cell(&self, point: GeoPoint) -> Option<usize> {
        let col = ((point.lon - self.west) / self.cell_width).floor();
        let row = ((self.north - point.lat) / self.cell_height).floor();
        if col < 0.0 || row < 0.0 || col >= self.cols as f64 || row >= self.rows as f64 {
            return None;
        }
        Some(row as usize * self.cols + col as usize)
    }
}

impl ParameterSource for GridSource {
    fn validate(&self) -> NmbimResult<()> {
        if !(self.cell_width > 0.0 && self.cell_height > 0.0) {
            return Err(NmbimError::Config(format!(
                "grid cells must have positive size, got {} x {}",
                self.cell_width, self.cell_height
            )));
        }
        if self.values.len() != self.rows * self.cols {
            return Err(NmbimError::Config(format!(
                "grid of {} x {} holds {} values",
                self.rows,
                self.cols,
                self.values.len()
            )));
        }
        Ok(())
    }

    fn value_at(&self, waveform: &Waveform) -> Option<f64> {
        let point = waveform
            .get_ref("metadata/point_geom")
            .ok()
            .and_then(Value::as_point)
            .or_else(|| waveform.coords())?;
        let value = self.values.get(self.cell(point)?).copied()?;
        if value.is_nan() || self.nodata == Some(value) {
            return None;
        }
        Some(value)
    }
}

/// The primary source's value, else the fallback's.
#[derive(Debug)]
pub struct FallbackSource {
    pub primary: Box<dyn ParameterSource>,
    pub fallback: Box<dyn ParameterSource>,
}

impl ParameterSource for FallbackSource {
    fn validate(&self) -> NmbimResult<()> {
        self.primary.validate()?;
        self.fallback.validate()
    }

    fn value_at(&self, waveform: &Waveform) -> Option<f64> {
        self.primary
            .value_at(waveform)
            .or_else(|| self.fallback.value_at(waveform))
    }
}

/// Serializable description of a parameter source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterSpec {
    Scalar(f64),
    Grid { grid: GridSource },
    Fallback {
        primary: Box<ParameterSpec>,
        fallback: Box<ParameterSpec>,
    },
}

impl ParameterSpec {
    pub fn build(&self) -> Box<dyn ParameterSource> {
        match self {
            ParameterSpec::Scalar(value) => Box::new(ScalarSource::new(*value)),
            ParameterSpec::Grid { grid } => Box::new(grid.clone()),
            ParameterSpec::Fallback { primary, fallback } => Box::new(FallbackSource {
                primary: primary.build(),
                fallback: fallback.build(),
            }),
        }
    }
}

/// Writes every configured parameter into each waveform.
#[derive(Debug)]
pub struct ParameterLoader {
    sources: BTreeMap<String, Box<dyn ParameterSource>>,
}

impl ParameterLoader {
    pub fn new(sources: BTreeMap<String, Box<dyn ParameterSource>>) -> NmbimResult<Self> {
        for (name, source) in &sources {
            source
                .validate()
                .map_err(|err| NmbimError::Config(format!("parameter '{}': {}", name, err)))?;
        }
        Ok(Self { sources })
    }

    pub fn from_specs(specs: &BTreeMap<String, ParameterSpec>) -> NmbimResult<Self> {
        Self::new(specs.iter().map(|(name, spec)| (name.clone(), spec.build())).collect())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// Saves `metadata/parameters/<name>`; Null where a source has no value.
    pub fn parameterize<'w, I>(&self, waveforms: I) -> NmbimResult<()>
    where
        I: IntoIterator<Item = &'w mut Waveform>,
    {
        for waveform in waveforms {
            for (name, source) in &self.sources {
                let value = source.value_at(waveform);
                if value.is_none() {
                    log::debug!("no {} value for shot {}", name, waveform.shot_number());
                }
                waveform.save(&format!("metadata/parameters/{}", name), value)?;
            }
        }
        Ok(())
    }
}
