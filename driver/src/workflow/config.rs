use anyhow::{anyhow, Context};
use nmbimcore::collection::Filter;
use nmbimcore::params::{ParameterLoader, ParameterSpec};
use nmbimcore::processing::{Pipeline, StageConfig};
use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Built-in GEDI biomass-index workflow.
pub const DEFAULT_WORKFLOW: &str = include_str!("../../config/gedi_biwf.yaml");
/// Built-in LVIS biomass-index workflow.
pub const LVIS_WORKFLOW: &str = include_str!("../../config/lvis_biwf.yaml");

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Beams to process; every beam of the L1B granule when absent.
    #[serde(default)]
    pub beams: Option<Vec<String>>,
    #[serde(default)]
    pub cache_beams: bool,
    /// Shots read per beam.
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterSpec>,
    /// Stage name to stage record, in execution order.
    pub processing_pipeline: Mapping,
    /// Report column name to waveform path.
    #[serde(default)]
    pub columns: BTreeMap<String, String>,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        Self::parse(&contents).with_context(|| format!("parsing workflow config {}", path_ref.display()))
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let config: WorkflowConfig = serde_yaml::from_str(contents)?;
        config.pipeline()?;
        Ok(config)
    }

    pub fn builtin() -> anyhow::Result<Self> {
        Self::parse(DEFAULT_WORKFLOW).context("parsing built-in workflow")
    }

    pub fn builtin_lvis() -> anyhow::Result<Self> {
        Self::parse(LVIS_WORKFLOW).context("parsing built-in LVIS workflow")
    }

    pub fn pipeline(&self) -> anyhow::Result<Pipeline> {
        let mut stages = Vec::with_capacity(self.processing_pipeline.len());
        for (key, record) in &self.processing_pipeline {
            let name = key
                .as_str()
                .ok_or_else(|| anyhow!("stage name {:?} is not a string", key))?;
            let stage: StageConfig = serde_yaml::from_value(record.clone())
                .with_context(|| format!("reading stage {}", name))?;
            stages.push((name.to_string(), stage));
        }
        Ok(Pipeline::from_named(stages)?)
    }

    pub fn parameter_loader(&self) -> anyhow::Result<ParameterLoader> {
        ParameterLoader::from_specs(&self.parameters).context("validating parameter sources")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nmbimcore::algorithms::Algorithm;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn builtin_workflow_keeps_stage_order() {
        let cfg = WorkflowConfig::builtin().unwrap();
        let pipeline = cfg.pipeline().unwrap();
        let names: Vec<&str> = pipeline.stages().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names.first(), Some(&"height"));
        assert_eq!(names.last(), Some(&"bi"));
        assert_eq!(pipeline.stages()[5].algorithm, Algorithm::SmoothWaveform);
        assert!(cfg.cache_beams);
        assert_eq!(cfg.filters.len(), 2);
        assert!(cfg.parameter_loader().is_ok());
        assert_eq!(cfg.columns.get("biomass_index").map(String::as_str), Some("results/biomass_index"));
    }

    #[test]
    fn builtin_workflow_matches_core_default() {
        let cfg = WorkflowConfig::builtin().unwrap();
        assert_eq!(cfg.pipeline().unwrap(), Pipeline::biomass_index());
    }

    #[test]
    fn builtin_lvis_workflow_reads_scalar_rh100() {
        let cfg = WorkflowConfig::builtin_lvis().unwrap();
        let pipeline = cfg.pipeline().unwrap();
        let segment = pipeline.stages().iter().find(|s| s.name == "segment").unwrap();
        assert_eq!(segment.input_map.get("rh").map(String::as_str), Some("raw/rh/rh100"));
        let bi = pipeline.stages().last().unwrap();
        assert_eq!(bi.algorithm, Algorithm::CalcBiomassIndexSimple);
        assert_eq!(bi.input_map.get("dp_dz").map(String::as_str), Some("processed/dp_dz_veg_only"));
        assert!(cfg.filters.iter().any(|f| matches!(f, Filter::L2Loaded)));
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"beams: [BEAM0101]\nlimit: 10\nfilters:\n  - type: modes\n    min_modes: 2\n\
              processing_pipeline:\n  dz:\n    alg_fun: calc_dz\n    input_map: {ht: processed/ht}\n    output_path: processed/dz\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert_eq!(cfg.beams, Some(vec!["BEAM0101".to_string()]));
        assert_eq!(cfg.limit, Some(10));
        assert!(!cfg.cache_beams);
        assert_eq!(cfg.pipeline().unwrap().stages()[0].name, "dz");
    }

    #[test]
    fn invalid_stage_fails_at_load() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"processing_pipeline:\n  dz:\n    alg_fun: calc_dz\n    input_map: {ht: processed/ht}\n    output_path: raw/dz\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        assert!(WorkflowConfig::load(&path).is_err());
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let yaml = "processing_pipeline:\n  x:\n    alg_fun: fourier\n    output_path: processed/x\n";
        assert!(WorkflowConfig::parse(yaml).is_err());
    }
}
