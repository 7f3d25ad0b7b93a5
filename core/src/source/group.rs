use crate::prelude::{NmbimError, NmbimResult};
use crate::source::dataset::Dataset;
use crate::store::nested::split_path;
use crate::store::Value;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Group,
    Dataset,
}

/// Node of a product hierarchy: a dataset or a group of named children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entry {
    Dataset(Dataset),
    Group(BTreeMap<String, Entry>),
}

impl Default for Entry {
    fn default() -> Self {
        Entry::Group(BTreeMap::new())
    }
}

impl Entry {
    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::Dataset(_) => EntryKind::Dataset,
            Entry::Group(_) => EntryKind::Group,
        }
    }

    /// Resolves a `/`-joined path below this entry; the empty path is `self`.
    pub fn lookup(&self, path: &str) -> Option<&Entry> {
        if path.trim_matches('/').is_empty() {
            return Some(self);
        }
        let keys = split_path(path).ok()?;
        let mut current = self;
        for key in keys {
            current = match current {
                Entry::Group(children) => children.get(key)?,
                Entry::Dataset(_) => return None,
            };
        }
        Some(current)
    }

    /// Inserts `dataset` at `path`, creating groups on the way.
    pub fn insert(&mut self, path: &str, dataset: Dataset) -> NmbimResult<()> {
        let keys = split_path(path)?;
        let (last, parents) = keys
            .split_last()
            .ok_or_else(|| NmbimError::InvalidPath(path.to_string()))?;
        let mut current = self;
        for key in parents {
            current = match current {
                Entry::Group(children) => children.entry(key.to_string()).or_default(),
                Entry::Dataset(_) => {
                    return Err(NmbimError::TypeMismatch(format!(
                        "'{}' crosses a dataset",
                        path
                    )))
                }
            };
        }
        match current {
            Entry::Group(children) => {
                children.insert(last.to_string(), Entry::Dataset(dataset));
                Ok(())
            }
            Entry::Dataset(_) => Err(NmbimError::TypeMismatch(format!(
                "'{}' crosses a dataset",
                path
            ))),
        }
    }

    pub fn with(mut self, path: &str, dataset: Dataset) -> NmbimResult<Self> {
        self.insert(path, dataset)?;
        Ok(self)
    }
}

/// An open per-beam group of parallel arrays inside one product file.
///
/// Implementations own the file handle; the core only reads through this
/// trait. The element/row/slice readers default to reading the full dataset
/// and can be overridden by backends supporting partial reads.
pub trait BeamGroup {
    fn file_path(&self) -> &str;

    fn beam_name(&self) -> &str;

    /// Child names of the group at `path` (empty path is the beam itself).
    fn keys(&self, path: &str) -> NmbimResult<Vec<String>>;

    fn kind(&self, path: &str) -> NmbimResult<EntryKind>;

    /// Reads the dataset at `path`; a group is a `TypeMismatch`.
    fn read(&self, path: &str) -> NmbimResult<Dataset>;

    fn read_element(&self, path: &str, index: usize) -> NmbimResult<Value> {
        self.read(path)?.element(index)
    }

    fn read_row(&self, path: &str, index: usize) -> NmbimResult<Array1<f64>> {
        self.read(path)?.row(index)
    }

    fn read_slice(&self, path: &str, start: usize, count: usize) -> NmbimResult<Array1<f64>> {
        self.read(path)?.slice(start, count)
    }
}

/// A multi-beam product file.
pub trait GranuleFile {
    fn path(&self) -> &str;

    /// Beam group names in file order, excluding metadata groups.
    fn beam_names(&self) -> Vec<String>;

    fn open_beam(&self, beam: &str) -> NmbimResult<Box<dyn BeamGroup>>;
}
