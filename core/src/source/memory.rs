use crate::prelude::{NmbimError, NmbimResult};
use crate::source::dataset::Dataset;
use crate::source::group::{BeamGroup, Entry, EntryKind, GranuleFile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;

/// Product file held entirely in memory, one `Entry` tree per beam.
///
/// Used by tests and by the driver, which loads granules dumped to JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryGranule {
    #[serde(default)]
    pub path: String,
    pub beams: BTreeMap<String, Entry>,
}

impl MemoryGranule {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            beams: BTreeMap::new(),
        }
    }

    pub fn from_json_reader<R: Read>(reader: R) -> NmbimResult<Self> {
        serde_json::from_reader(reader)
            .map_err(|err| NmbimError::MalformedSource(format!("granule JSON: {}", err)))
    }

    pub fn with_beam(mut self, beam: impl Into<String>, entry: Entry) -> Self {
        self.beams.insert(beam.into(), entry);
        self
    }

    pub fn beam_mut(&mut self, beam: &str) -> Option<&mut Entry> {
        self.beams.get_mut(beam)
    }
}

impl GranuleFile for MemoryGranule {
    fn path(&self) -> &str {
        &self.path
    }

    fn beam_names(&self) -> Vec<String> {
        self.beams
            .keys()
            .filter(|name| name.as_str() != "METADATA")
            .cloned()
            .collect()
    }

    fn open_beam(&self, beam: &str) -> NmbimResult<Box<dyn BeamGroup>> {
        let root = self.beams.get(beam).ok_or_else(|| {
            NmbimError::PathNotFound(format!("beam {} in {}", beam, self.path))
        })?;
        Ok(Box::new(MemoryBeamGroup {
            file_path: self.path.clone(),
            beam: beam.to_string(),
            root: root.clone(),
        }))
    }
}

/// A beam of a [`MemoryGranule`].
#[derive(Debug, Clone)]
pub struct MemoryBeamGroup {
    file_path: String,
    beam: String,
    root: Entry,
}

impl MemoryBeamGroup {
    pub fn new(file_path: impl Into<String>, beam: impl Into<String>, root: Entry) -> Self {
        Self {
            file_path: file_path.into(),
            beam: beam.into(),
            root,
        }
    }

    fn entry(&self, path: &str) -> NmbimResult<&Entry> {
        self.root.lookup(path).ok_or_else(|| {
            NmbimError::PathNotFound(format!("{} in beam {} of {}", path, self.beam, self.file_path))
        })
    }
}

impl BeamGroup for MemoryBeamGroup {
    fn file_path(&self) -> &str {
        &self.file_path
    }

    fn beam_name(&self) -> &str {
        &self.beam
    }

    fn keys(&self, path: &str) -> NmbimResult<Vec<String>> {
        match self.entry(path)? {
            Entry::Group(children) => Ok(children.keys().cloned().collect()),
            Entry::Dataset(_) => Err(NmbimError::TypeMismatch(format!("'{}' is a dataset", path))),
        }
    }

    fn kind(&self, path: &str) -> NmbimResult<EntryKind> {
        self.entry(path).map(Entry::kind)
    }

    fn read(&self, path: &str) -> NmbimResult<Dataset> {
        match self.entry(path)? {
            Entry::Dataset(dataset) => Ok(dataset.clone()),
            Entry::Group(_) => Err(NmbimError::TypeMismatch(format!(
                "'{}' is a group, not an array",
                path
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn granule() -> MemoryGranule {
        let beam = Entry::default()
            .with("shot_number", Dataset::int1(vec![1, 2, 3]))
            .unwrap();
        MemoryGranule::new("l1b.h5")
            .with_beam("BEAM0000", beam.clone())
            .with_beam("METADATA", Entry::default())
            .with_beam("BEAM0101", beam)
    }

    #[test]
    fn metadata_group_is_not_a_beam() {
        assert_eq!(granule().beam_names(), vec!["BEAM0000", "BEAM0101"]);
    }

    #[test]
    fn reading_a_group_is_a_type_mismatch() {
        let group = granule().open_beam("BEAM0000").unwrap();
        assert_eq!(group.read("shot_number").unwrap().len(), 3);
        assert!(matches!(group.read(""), Err(NmbimError::TypeMismatch(_))));
        assert!(matches!(group.read("nope"), Err(NmbimError::PathNotFound(_))));
    }

    #[test]
    fn missing_beam_is_reported() {
        assert!(granule().open_beam("BEAM1011").is_err());
    }
}
