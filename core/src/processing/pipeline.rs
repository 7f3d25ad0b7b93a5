use crate::algorithms::Algorithm;
use crate::collection::WaveformCollection;
use crate::prelude::{NmbimError, NmbimResult};
use crate::processing::processor::WaveformProcessor;
use crate::processing::stage::StageConfig;
use crate::telemetry::log::LogManager;
use crate::waveform::Waveform;
use std::collections::BTreeSet;

/// Ordered processing stages, applied breadth-first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<StageConfig>,
}

impl Pipeline {
    /// Validates every stage; stage names must be unique.
    pub fn new(stages: Vec<StageConfig>) -> NmbimResult<Self> {
        let mut seen = BTreeSet::new();
        for stage in &stages {
            stage.validate()?;
            if !seen.insert(stage.name.as_str()) {
                return Err(NmbimError::Config(format!("duplicate stage name '{}'", stage.name)));
            }
        }
        Ok(Self { stages })
    }

    /// Builds from `(name, stage)` pairs, naming each stage after its key.
    pub fn from_named<I>(stages: I) -> NmbimResult<Self>
    where
        I: IntoIterator<Item = (String, StageConfig)>,
    {
        Self::new(
            stages
                .into_iter()
                .map(|(name, mut stage)| {
                    stage.name = name;
                    stage
                })
                .collect(),
        )
    }

    pub fn stages(&self) -> &[StageConfig] {
        &self.stages
    }

    /// Runs each stage over every waveform before the next stage starts.
    pub fn run(&self, waveforms: &mut [Waveform]) -> NmbimResult<()> {
        let logger = LogManager::new("pipeline");
        for stage in &self.stages {
            let mut processor = WaveformProcessor::new(stage)?;
            for waveform in waveforms.iter_mut() {
                processor.enqueue(waveform);
            }
            let processed = processor.run()?;
            logger.record(&format!("stage {} processed {} waveforms", stage.name, processed));
        }
        Ok(())
    }

    pub fn run_collection(&self, collection: &mut WaveformCollection) -> NmbimResult<()> {
        self.run(collection.waveforms_mut())
    }

    /// Default GEDI biomass-index pipeline.
    ///
    /// The modelled ground return is removed before the height weighting.
    /// Expects `metadata/parameters/hse` to have been loaded.
    pub fn biomass_index() -> Self {
        let stages = vec![
            StageConfig::new("height", Algorithm::CalcHeight, "processed/ht")
                .input("wf", "raw/wf")
                .input("elev_top", "raw/elev/top")
                .input("elev_bottom", "raw/elev/bottom")
                .input("elev_ground", "raw/elev/ground"),
            StageConfig::new("dz", Algorithm::CalcDz, "processed/dz").input("ht", "processed/ht"),
            StageConfig::new("noise", Algorithm::RemoveNoise, "processed/wf_noise_removed")
                .input("wf", "raw/wf")
                .input("mean_noise", "raw/mean_noise"),
            StageConfig::new("normalize", Algorithm::NormalizeWaveform, "processed/wf_noise_norm")
                .input("wf", "processed/wf_noise_removed"),
            StageConfig::new("scale_raw", Algorithm::CalcDpDz, "processed/wf_raw_scaled")
                .input("wf", "processed/wf_noise_norm")
                .input("dz", "processed/dz"),
            StageConfig::new("smooth", Algorithm::SmoothWaveform, "processed/wf_noise_norm_smooth")
                .input("wf", "processed/wf_noise_norm")
                .param("sd", 3_i64),
            StageConfig::new("dp_dz", Algorithm::CalcDpDz, "processed/dp_dz")
                .input("wf", "processed/wf_noise_norm_smooth")
                .input("dz", "processed/dz"),
            StageConfig::new("segment", Algorithm::SeparateVegGround, "processed/veg_ground_sep")
                .input("wf", "processed/dp_dz")
                .input("ht", "processed/ht")
                .input("dz", "processed/dz")
                .input("rh", "raw/rh")
                .param("min_veg_bottom", 0.5)
                .param("max_veg_bottom", 5.0),
            StageConfig::new("ground_return", Algorithm::CreateGroundReturn, "processed/ground_return")
                .input("wf", "processed/dp_dz")
                .input("ht", "processed/ht")
                .input("ground_bottom", "processed/veg_ground_sep/ground_bottom")
                .param("sd_ratio", 0.25),
            StageConfig::new("isolate_veg", Algorithm::IsolateVegetation, "processed/dp_dz_veg_only")
                .input("wf", "processed/dp_dz")
                .input("ht", "processed/ht")
                .input("veg_top", "processed/veg_ground_sep/veg_top")
                .input("ground_return", "processed/ground_return"),
            StageConfig::new("gap", Algorithm::CalcGapProb, "processed/gap")
                .input("wf_per_height", "processed/dp_dz")
                .input("veg_first_idx", "processed/veg_ground_sep/veg_first_idx")
                .input("veg_last_idx", "processed/veg_ground_sep/veg_last_idx")
                .input("ground_last_idx", "processed/veg_ground_sep/ground_last_idx"),
            StageConfig::new("bi", Algorithm::CalcBiomassIndex, "results/biomass_index")
                .input("dp_dz", "processed/dp_dz_veg_only")
                .input("dz", "processed/dz")
                .input("ht", "processed/ht")
                .input("hse", "metadata/parameters/hse")
                .input("n_modes", "metadata/modes/num_modes"),
        ];
        Self { stages }
    }
}
