//! Ordered, filtered sets of waveforms assembled from granules.

pub mod filters;

pub use filters::{Filter, Polygon, Ring};

use crate::prelude::{NmbimError, NmbimResult};
use crate::source::{BeamGroup, BeamSource, GranuleFile, LvisL2Table};
use crate::telemetry::{LogManager, MetricsRecorder};
use crate::waveform::{GediSources, LvisSources, ShotSelector, Waveform, LVIS_SHOT_FIELD};
use std::sync::Arc;

const GEDI_SHOT_FIELD: &str = "shot_number";

/// Assembly options shared by every constructor.
#[derive(Debug, Clone, Default)]
pub struct CollectionOptions {
    /// Beams to read; all beams of the L1B granule when `None`.
    pub beams: Option<Vec<String>>,
    pub cache_beams: bool,
    /// Maximum shots read per beam.
    pub limit: Option<usize>,
    pub filters: Vec<Filter>,
    pub metrics: Option<Arc<MetricsRecorder>>,
}

impl CollectionOptions {
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

/// The GEDI products of one acquisition.
#[derive(Clone, Copy)]
pub struct GediGranules<'a> {
    pub l1b: &'a dyn GranuleFile,
    pub l2a: &'a dyn GranuleFile,
    pub l4a: Option<&'a dyn GranuleFile>,
}

impl<'a> GediGranules<'a> {
    pub fn new(l1b: &'a dyn GranuleFile, l2a: &'a dyn GranuleFile, l4a: Option<&'a dyn GranuleFile>) -> Self {
        Self { l1b, l2a, l4a }
    }

    fn products(&self) -> Vec<(&'static str, &'a dyn GranuleFile)> {
        let mut products = vec![("L1B", self.l1b), ("L2A", self.l2a)];
        if let Some(l4a) = self.l4a {
            products.push(("L4A", l4a));
        }
        products
    }
}

/// Product beam groups of one beam whose shot arrays agree.
struct CheckedBeam {
    beam: String,
    groups: Vec<Box<dyn BeamGroup>>,
    shots: Vec<i64>,
}

#[derive(Debug, Default)]
pub struct WaveformCollection {
    waveforms: Vec<Waveform>,
    filters: Vec<Filter>,
}

impl WaveformCollection {
    /// Builds waveforms from every requested beam of a GEDI granule set.
    ///
    /// Shot-number arrays of all beams are compared across products before
    /// any waveform is built; one disagreement fails the whole collection.
    pub fn from_gedi(granules: &GediGranules<'_>, options: CollectionOptions) -> NmbimResult<Self> {
        let logger = LogManager::new("collection");
        let beams = options.beams.clone().unwrap_or_else(|| granules.l1b.beam_names());
        let checked = beams
            .iter()
            .map(|beam| check_beam(granules, beam))
            .collect::<NmbimResult<Vec<_>>>()?;

        let mut collection = Self::empty(&options);
        for CheckedBeam { beam, groups, shots } in checked {
            let mut sources = groups
                .into_iter()
                .map(|group| BeamSource::open(group, options.cache_beams, GEDI_SHOT_FIELD))
                .collect::<NmbimResult<Vec<_>>>()?
                .into_iter();
            let (Some(l1b), Some(l2a)) = (sources.next(), sources.next()) else {
                return Err(NmbimError::InvalidInput(format!("beam {} lacks L1B or L2A", beam)));
            };
            let sources = GediSources::new(l1b, l2a, sources.next());

            let before = collection.len();
            for &shot in shots.iter().take(options.limit.unwrap_or(usize::MAX)) {
                let waveform = Waveform::from_gedi(shot, &sources)?;
                collection.admit(waveform, &options);
            }
            logger.detail(&format!("beam {}: kept {} waveforms", beam, collection.len() - before));
        }
        collection.finish(&logger);
        Ok(collection)
    }

    /// Builds one waveform per L1 shot, in file order.
    pub fn from_lvis(
        l1: Box<dyn BeamGroup>,
        l2: LvisL2Table,
        options: CollectionOptions,
    ) -> NmbimResult<Self> {
        let logger = LogManager::new("collection");
        let l1 = BeamSource::open(l1, options.cache_beams, LVIS_SHOT_FIELD)?;
        let shots = l1.shot_numbers()?.len();
        let sources = LvisSources::new(l1, l2);

        let mut collection = Self::empty(&options);
        for index in 0..shots.min(options.limit.unwrap_or(usize::MAX)) {
            let waveform = Waveform::from_lvis(&sources, ShotSelector::Index(index))?;
            collection.admit(waveform, &options);
        }
        collection.finish(&logger);
        Ok(collection)
    }

    /// Wraps prebuilt waveforms, keeping those the filters accept.
    pub fn from_waveforms(waveforms: Vec<Waveform>, options: CollectionOptions) -> Self {
        let logger = LogManager::new("collection");
        let mut collection = Self::empty(&options);
        for waveform in waveforms {
            collection.admit(waveform, &options);
        }
        collection.finish(&logger);
        collection
    }

    fn empty(options: &CollectionOptions) -> Self {
        Self {
            waveforms: Vec::new(),
            filters: options.filters.clone(),
        }
    }

    fn admit(&mut self, waveform: Waveform, options: &CollectionOptions) {
        let retained = self.filters.iter().all(|filter| filter.accepts(&waveform));
        if let Some(metrics) = &options.metrics {
            metrics.record_built(retained);
        }
        if retained {
            self.waveforms.push(waveform);
        }
    }

    fn finish(&self, logger: &LogManager) {
        if self.waveforms.is_empty() {
            logger.warn("no waveforms retained; check filters and inputs");
        } else {
            logger.record(&format!("{} waveforms retained", self.waveforms.len()));
        }
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn len(&self) -> usize {
        self.waveforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waveforms.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Waveform> {
        self.waveforms.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Waveform> {
        self.waveforms.iter_mut()
    }

    pub fn waveforms(&self) -> &[Waveform] {
        &self.waveforms
    }

    pub fn waveforms_mut(&mut self) -> &mut [Waveform] {
        &mut self.waveforms
    }

    pub fn into_waveforms(self) -> Vec<Waveform> {
        self.waveforms
    }
}

impl<'a> IntoIterator for &'a WaveformCollection {
    type Item = &'a Waveform;
    type IntoIter = std::slice::Iter<'a, Waveform>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn check_beam(granules: &GediGranules<'_>, beam: &str) -> NmbimResult<CheckedBeam> {
    let mut groups = Vec::new();
    let mut reference: Option<(&str, Vec<i64>)> = None;
    for (product, granule) in granules.products() {
        let group = granule.open_beam(beam)?;
        let shots = group.read(GEDI_SHOT_FIELD)?.to_i64_vec()?;
        let difference = reference
            .as_ref()
            .and_then(|(first, expected)| shot_difference(first, expected, product, &shots));
        if let Some(detail) = difference {
            return Err(NmbimError::ShotNumberMismatch {
                beam: beam.to_string(),
                detail,
            });
        }
        if reference.is_none() {
            reference = Some((product, shots));
        }
        groups.push(group);
    }
    let shots = reference.map(|(_, shots)| shots).unwrap_or_default();
    Ok(CheckedBeam {
        beam: beam.to_string(),
        groups,
        shots,
    })
}

fn shot_difference(first: &str, expected: &[i64], product: &str, shots: &[i64]) -> Option<String> {
    if expected.len() != shots.len() {
        return Some(format!(
            "{} has {} shots, {} has {}",
            first,
            expected.len(),
            product,
            shots.len()
        ));
    }
    expected
        .iter()
        .zip(shots)
        .position(|(a, b)| a != b)
        .map(|i| format!("index {}: {} shot {} != {} shot {}", i, first, expected[i], product, shots[i]))
}
