use crate::prelude::NmbimResult;
use crate::source::dataset::Dataset;
use crate::source::group::BeamGroup;
use crate::store::Value;
use ndarray::Array1;

/// Beam read straight from the open group on every access.
///
/// Lower peak memory than [`CachedBeam`](super::CachedBeam) at the price of
/// repeated reads.
pub struct LazyBeam {
    group: Box<dyn BeamGroup>,
}

impl LazyBeam {
    pub fn new(group: Box<dyn BeamGroup>) -> Self {
        Self { group }
    }

    pub fn file_path(&self) -> &str {
        self.group.file_path()
    }

    pub fn beam_name(&self) -> &str {
        self.group.beam_name()
    }

    pub fn read(&self, path: &str) -> NmbimResult<Dataset> {
        self.group.read(path)
    }

    pub fn read_element(&self, path: &str, index: usize) -> NmbimResult<Value> {
        self.group.read_element(path, index)
    }

    pub fn read_row(&self, path: &str, index: usize) -> NmbimResult<Array1<f64>> {
        self.group.read_row(path, index)
    }

    pub fn read_slice(&self, path: &str, start: usize, count: usize) -> NmbimResult<Array1<f64>> {
        self.group.read_slice(path, start, count)
    }
}

impl std::fmt::Debug for LazyBeam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyBeam")
            .field("file", &self.file_path())
            .field("beam", &self.beam_name())
            .finish()
    }
}
