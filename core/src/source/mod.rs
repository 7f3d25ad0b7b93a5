//! Read access to per-beam product groups.
//!
//! A [`BeamSource`] hides whether a beam is read lazily through its open
//! group or from an in-memory snapshot; the variant is fixed when the source
//! is opened.

pub mod beam;
pub mod cached;
pub mod dataset;
pub mod group;
pub mod lvis;
pub mod memory;

pub use beam::LazyBeam;
pub use cached::CachedBeam;
pub use dataset::Dataset;
pub use group::{BeamGroup, Entry, EntryKind, GranuleFile};
pub use lvis::LvisL2Table;
pub use memory::{MemoryBeamGroup, MemoryGranule};

use crate::prelude::{NmbimError, NmbimResult};
use crate::store::Value;
use ndarray::Array1;
use std::borrow::Cow;
use std::cell::OnceCell;
use std::collections::HashMap;

#[derive(Debug)]
pub enum SourceKind {
    Lazy(LazyBeam),
    Cached(CachedBeam),
}

/// One product's view of one beam, plus the name of its shot-number field.
#[derive(Debug)]
pub struct BeamSource {
    kind: SourceKind,
    shot_field: String,
    shot_lookup: OnceCell<HashMap<i64, usize>>,
}

impl BeamSource {
    /// Opens `group` lazily, or materializes it when `cache` is set.
    pub fn open(group: Box<dyn BeamGroup>, cache: bool, shot_field: &str) -> NmbimResult<Self> {
        let kind = if cache {
            SourceKind::Cached(CachedBeam::load(group.as_ref())?)
        } else {
            SourceKind::Lazy(LazyBeam::new(group))
        };
        Ok(Self::from_kind(kind, shot_field))
    }

    pub fn from_kind(kind: SourceKind, shot_field: &str) -> Self {
        Self {
            kind,
            shot_field: shot_field.to_string(),
            shot_lookup: OnceCell::new(),
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self.kind, SourceKind::Cached(_))
    }

    pub fn file_path(&self) -> &str {
        match &self.kind {
            SourceKind::Lazy(beam) => beam.file_path(),
            SourceKind::Cached(beam) => beam.file_path(),
        }
    }

    pub fn beam_name(&self) -> &str {
        match &self.kind {
            SourceKind::Lazy(beam) => beam.beam_name(),
            SourceKind::Cached(beam) => beam.beam_name(),
        }
    }

    /// Full dataset at `path`; borrowed when the beam is cached.
    pub fn extract(&self, path: &str) -> NmbimResult<Cow<'_, Dataset>> {
        match &self.kind {
            SourceKind::Lazy(beam) => beam.read(path).map(Cow::Owned),
            SourceKind::Cached(beam) => beam.dataset(path).map(Cow::Borrowed),
        }
    }

    pub fn extract_value(&self, path: &str, index: usize) -> NmbimResult<Value> {
        match &self.kind {
            SourceKind::Lazy(beam) => beam.read_element(path, index),
            SourceKind::Cached(beam) => beam.dataset(path)?.element(index),
        }
    }

    pub fn extract_f64(&self, path: &str, index: usize) -> NmbimResult<f64> {
        let value = self.extract_value(path, index)?;
        value.as_f64().ok_or_else(|| {
            NmbimError::TypeMismatch(format!("{} holds {}, not a number", path, value.type_name()))
        })
    }

    pub fn extract_i64(&self, path: &str, index: usize) -> NmbimResult<i64> {
        let value = self.extract_value(path, index)?;
        value.as_i64().ok_or_else(|| {
            NmbimError::TypeMismatch(format!("{} holds {}, not an integer", path, value.type_name()))
        })
    }

    pub fn extract_row(&self, path: &str, index: usize) -> NmbimResult<Array1<f64>> {
        match &self.kind {
            SourceKind::Lazy(beam) => beam.read_row(path, index),
            SourceKind::Cached(beam) => beam.dataset(path)?.row(index),
        }
    }

    pub fn extract_slice(&self, path: &str, start: usize, count: usize) -> NmbimResult<Array1<f64>> {
        match &self.kind {
            SourceKind::Lazy(beam) => beam.read_slice(path, start, count),
            SourceKind::Cached(beam) => beam.dataset(path)?.slice(start, count),
        }
    }

    pub fn shot_numbers(&self) -> NmbimResult<Vec<i64>> {
        self.extract(&self.shot_field)?.to_i64_vec()
    }

    /// Position of the first occurrence of `shot_number`, if present.
    pub fn where_shot(&self, shot_number: i64) -> NmbimResult<Option<usize>> {
        if let Some(lookup) = self.shot_lookup.get() {
            return Ok(lookup.get(&shot_number).copied());
        }
        let mut lookup = HashMap::new();
        for (index, shot) in self.shot_numbers()?.into_iter().enumerate() {
            lookup.entry(shot).or_insert(index);
        }
        let position = lookup.get(&shot_number).copied();
        let _ = self.shot_lookup.set(lookup);
        Ok(position)
    }
}
