//! One lidar footprint and its path-addressed data.

pub mod gedi;
pub mod lvis;

pub use gedi::GediSources;
pub use lvis::{LvisSources, ShotSelector, LVIS_SHOT_FIELD};

use crate::prelude::{NmbimError, NmbimResult};
use crate::store::{GeoPoint, NestedPathStore, Value};
use ndarray::Array1;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Top-level path segment of every waveform path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Metadata,
    Raw,
    Processed,
    Results,
}

impl Namespace {
    pub fn of(path: &str) -> NmbimResult<Self> {
        let head = path.trim_start_matches('/').split('/').next().unwrap_or("");
        match head {
            "metadata" => Ok(Namespace::Metadata),
            "raw" => Ok(Namespace::Raw),
            "processed" => Ok(Namespace::Processed),
            "results" => Ok(Namespace::Results),
            _ => Err(NmbimError::InvalidPath(format!(
                "'{}' must start with metadata, raw, processed or results",
                path
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Metadata => "metadata",
            Namespace::Raw => "raw",
            Namespace::Processed => "processed",
            Namespace::Results => "results",
        }
    }
}

/// Identity of a waveform: the source file identifier and the shot number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaveformKey {
    pub file_id: String,
    pub shot_number: i64,
}

/// Data for one laser shot.
///
/// Raw fields are written only while the waveform is built; afterwards every
/// public write goes through [`Waveform::save`] or [`Waveform::overwrite`] and
/// may target `metadata`, `processed` or `results` only.
#[derive(Debug, Clone)]
pub struct Waveform {
    key: WaveformKey,
    store: NestedPathStore,
}

impl Waveform {
    /// Empty waveform holding only `metadata/shot_number`.
    pub fn new(file_id: impl Into<String>, shot_number: i64) -> NmbimResult<Self> {
        let mut waveform = Self {
            key: WaveformKey {
                file_id: file_id.into(),
                shot_number,
            },
            store: NestedPathStore::new(),
        };
        waveform.save("metadata/shot_number", Value::Int(shot_number))?;
        Ok(waveform)
    }

    pub fn key(&self) -> &WaveformKey {
        &self.key
    }

    pub fn shot_number(&self) -> i64 {
        self.key.shot_number
    }

    pub fn file_id(&self) -> &str {
        &self.key.file_id
    }

    pub fn paths(&self) -> &BTreeSet<String> {
        self.store.paths()
    }

    pub fn has(&self, path: &str) -> bool {
        self.store.has(path)
    }

    pub fn get(&self, path: &str) -> NmbimResult<Value> {
        self.store.get(path)
    }

    pub fn get_ref(&self, path: &str) -> NmbimResult<&Value> {
        self.store.get_ref(path)
    }

    pub fn get_f64(&self, path: &str) -> NmbimResult<f64> {
        let value = self.get_ref(path)?;
        value.as_f64().ok_or_else(|| {
            NmbimError::TypeMismatch(format!("{} holds {}, not a number", path, value.type_name()))
        })
    }

    pub fn get_array(&self, path: &str) -> NmbimResult<&Array1<f64>> {
        let value = self.get_ref(path)?;
        value.as_array().ok_or_else(|| {
            NmbimError::TypeMismatch(format!("{} holds {}, not an array", path, value.type_name()))
        })
    }

    /// Footprint location from `metadata/coords`.
    pub fn coords(&self) -> Option<GeoPoint> {
        let lon = self.get_f64("metadata/coords/lon").ok()?;
        let lat = self.get_f64("metadata/coords/lat").ok()?;
        Some(GeoPoint::new(lon, lat))
    }

    /// Write-once save into `metadata`, `processed` or `results`.
    pub fn save(&mut self, path: &str, value: impl Into<Value>) -> NmbimResult<()> {
        self.write(path, value.into(), false)
    }

    pub fn overwrite(&mut self, path: &str, value: impl Into<Value>) -> NmbimResult<()> {
        self.write(path, value.into(), true)
    }

    fn write(&mut self, path: &str, value: Value, overwrite: bool) -> NmbimResult<()> {
        if Namespace::of(path)? == Namespace::Raw {
            return Err(NmbimError::ReadOnlyViolation(format!(
                "raw data of shot {} is fixed at construction; refused '{}'",
                self.key.shot_number, path
            )));
        }
        self.store.set(path, value, overwrite)
    }

    /// Construction-time writer; the only way into `raw`.
    pub(crate) fn save_raw(&mut self, path: &str, value: impl Into<Value>) -> NmbimResult<()> {
        Namespace::of(path)?;
        self.store.set(path, value.into(), false)
    }
}

impl PartialEq for Waveform {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Waveform {}

impl Hash for Waveform {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Waveform {} ({})", self.key.shot_number, self.key.file_id)
    }
}
