use crate::prelude::{NmbimError, NmbimResult};
use crate::source::dataset::Dataset;
use crate::source::group::{BeamGroup, Entry, EntryKind};
use log::debug;
use std::collections::BTreeMap;

/// Beam group materialized into memory at construction.
///
/// Every later access is plain indexing; the snapshot is read-only.
#[derive(Debug, Clone)]
pub struct CachedBeam {
    file_path: String,
    beam: String,
    data: Entry,
}

impl CachedBeam {
    /// Recursively reads every dataset below the beam group.
    pub fn load(group: &dyn BeamGroup) -> NmbimResult<Self> {
        let data = load_group(group, "")?;
        debug!(
            "cached beam {} from {}",
            group.beam_name(),
            group.file_path()
        );
        Ok(Self {
            file_path: group.file_path().to_string(),
            beam: group.beam_name().to_string(),
            data,
        })
    }

    pub fn from_entry(file_path: impl Into<String>, beam: impl Into<String>, data: Entry) -> Self {
        Self {
            file_path: file_path.into(),
            beam: beam.into(),
            data,
        }
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn beam_name(&self) -> &str {
        &self.beam
    }

    pub fn dataset(&self, path: &str) -> NmbimResult<&Dataset> {
        match self.data.lookup(path) {
            Some(Entry::Dataset(dataset)) => Ok(dataset),
            Some(Entry::Group(_)) => Err(NmbimError::TypeMismatch(format!(
                "'{}' is a group, not an array",
                path
            ))),
            None => Err(NmbimError::PathNotFound(format!(
                "{} in cached beam {} of {}",
                path, self.beam, self.file_path
            ))),
        }
    }

    /// Always rejected: cached beams are snapshots of the file.
    pub fn write(&mut self, path: &str, _dataset: Dataset) -> NmbimResult<()> {
        Err(NmbimError::ReadOnlyViolation(format!(
            "cached beam {} is read-only; refused write to '{}'",
            self.beam, path
        )))
    }
}

fn load_group(group: &dyn BeamGroup, path: &str) -> NmbimResult<Entry> {
    let mut children = BTreeMap::new();
    for key in group.keys(path)? {
        let child = if path.is_empty() {
            key.clone()
        } else {
            format!("{}/{}", path, key)
        };
        let entry = match group.kind(&child)? {
            EntryKind::Group => load_group(group, &child)?,
            EntryKind::Dataset => Entry::Dataset(group.read(&child)?),
        };
        children.insert(key, entry);
    }
    Ok(Entry::Group(children))
}
