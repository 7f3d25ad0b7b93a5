use crate::workflow::config::WorkflowConfig;
use crate::workflow::inputs::{GranuleSet, LvisInputs};
use crate::workflow::report::{self, BeamReport, RunReport};
use anyhow::Context;
use nmbimcore::collection::{CollectionOptions, GediGranules, WaveformCollection};
use nmbimcore::params::ParameterLoader;
use nmbimcore::processing::Pipeline;
use nmbimcore::source::GranuleFile;
use nmbimcore::telemetry::MetricsRecorder;
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;

/// Runs one workflow beam by beam; shares only its metrics between beams.
pub struct Runner {
    config: WorkflowConfig,
    pipeline: Pipeline,
    parameters: ParameterLoader,
    metrics: Arc<MetricsRecorder>,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> anyhow::Result<Self> {
        let pipeline = config.pipeline()?;
        let parameters = config.parameter_loader()?;
        Ok(Self {
            config,
            pipeline,
            parameters,
            metrics: Arc::new(MetricsRecorder::new()),
        })
    }

    fn beams(&self, granule: &dyn GranuleFile) -> Vec<String> {
        self.config.beams.clone().unwrap_or_else(|| granule.beam_names())
    }

    fn options(&self, beam: &str) -> CollectionOptions {
        CollectionOptions {
            beams: Some(vec![beam.to_string()]),
            cache_beams: self.config.cache_beams,
            limit: self.config.limit,
            filters: self.config.filters.clone(),
            metrics: Some(Arc::clone(&self.metrics)),
        }
    }

    /// Builds, parameterizes and processes one GEDI beam.
    pub fn process_beam(&self, granules: &GranuleSet, beam: &str) -> anyhow::Result<BeamReport> {
        let products = GediGranules::new(
            &granules.l1b,
            &granules.l2a,
            granules.l4a.as_ref().map(|g| g as &dyn GranuleFile),
        );
        let collection = WaveformCollection::from_gedi(&products, self.options(beam))
            .with_context(|| format!("loading waveforms for beam {}", beam))?;
        self.process_collection(beam, collection)
    }

    /// Same as [`Runner::process_beam`] for one group of an LVIS L1B granule.
    pub fn process_lvis_group(&self, inputs: &LvisInputs, group: &str) -> anyhow::Result<BeamReport> {
        let l1 = inputs
            .l1
            .open_beam(group)
            .with_context(|| format!("opening LVIS group {}", group))?;
        let collection = WaveformCollection::from_lvis(l1, inputs.l2.clone(), self.options(group))
            .with_context(|| format!("loading LVIS waveforms for {}", group))?;
        self.process_collection(group, collection)
    }

    fn process_collection(&self, beam: &str, mut collection: WaveformCollection) -> anyhow::Result<BeamReport> {
        log::info!("{} waveforms loaded for beam {}", collection.len(), beam);
        self.parameters
            .parameterize(collection.iter_mut())
            .with_context(|| format!("loading parameters for beam {}", beam))?;
        if let Err(err) = self.pipeline.run_collection(&mut collection) {
            self.metrics.record_error();
            return Err(err).with_context(|| format!("processing beam {}", beam));
        }
        self.metrics.record_processed(collection.len());

        Ok(BeamReport {
            beam: beam.to_string(),
            waveforms: collection.len(),
            rows: collection.iter().map(|w| report::row(w, &self.config.columns)).collect(),
        })
    }

    pub fn execute(&self, granules: &GranuleSet) -> anyhow::Result<RunReport> {
        let beams = self
            .beams(&granules.l1b)
            .iter()
            .map(|beam| self.process_beam(granules, beam))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(RunReport {
            beams,
            metrics: self.metrics.snapshot(),
        })
    }

    pub fn execute_lvis(&self, inputs: &LvisInputs) -> anyhow::Result<RunReport> {
        let groups = self
            .beams(&inputs.l1)
            .iter()
            .map(|group| self.process_lvis_group(inputs, group))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(RunReport {
            beams: groups,
            metrics: self.metrics.snapshot(),
        })
    }

    /// Processes beams concurrently on blocking tasks, reporting in beam order.
    pub fn execute_parallel(self: Arc<Self>, granules: Arc<GranuleSet>, workers: usize) -> anyhow::Result<RunReport> {
        let workers = workers.max(1);
        let runtime = TokioBuilder::new_multi_thread()
            .worker_threads(workers)
            .max_blocking_threads(workers)
            .build()
            .context("creating worker runtime")?;
        let beams = self.beams(&granules.l1b);
        let reports = runtime.block_on(async {
            let handles: Vec<_> = beams
                .into_iter()
                .map(|beam| {
                    let runner = Arc::clone(&self);
                    let granules = Arc::clone(&granules);
                    tokio::task::spawn_blocking(move || runner.process_beam(&granules, &beam))
                })
                .collect();
            let mut reports = Vec::with_capacity(handles.len());
            for handle in handles {
                reports.push(handle.await.context("beam worker panicked")??);
            }
            Ok::<_, anyhow::Error>(reports)
        })?;
        Ok(RunReport {
            beams: reports,
            metrics: self.metrics.snapshot(),
        })
    }
}
