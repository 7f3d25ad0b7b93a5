use crate::algorithms::AlgorithmArgs;
use crate::prelude::{NmbimError, NmbimResult};
use crate::processing::stage::StageConfig;
use crate::store::Value;
use crate::telemetry::log::LogManager;
use crate::waveform::Waveform;
use std::collections::VecDeque;

/// Runs one configured algorithm over a FIFO of waveforms, in place.
pub struct WaveformProcessor<'w> {
    config: StageConfig,
    queue: VecDeque<&'w mut Waveform>,
    logger: LogManager,
}

impl<'w> WaveformProcessor<'w> {
    pub fn new(config: &StageConfig) -> NmbimResult<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            queue: VecDeque::new(),
            logger: LogManager::new(format!("stage {}", config.name)),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn enqueue(&mut self, waveform: &'w mut Waveform) {
        self.queue.push_back(waveform);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Drains the queue and returns how many waveforms were processed.
    ///
    /// The first failure is returned as `Processing` and the rest of the
    /// queue is dropped unprocessed.
    pub fn run(&mut self) -> NmbimResult<usize> {
        let mut processed = 0;
        while let Some(waveform) = self.queue.pop_front() {
            if let Err(source) = self.process(waveform) {
                let skipped = self.queue.len();
                self.queue.clear();
                self.logger.warn(&format!(
                    "shot {} failed; {} queued waveforms not processed",
                    waveform.shot_number(),
                    skipped
                ));
                return Err(NmbimError::Processing {
                    stage: self.config.name.clone(),
                    shot_number: waveform.shot_number(),
                    source: Box::new(source),
                });
            }
            processed += 1;
        }
        self.logger
            .detail(&format!("{} applied to {} waveforms", self.config.algorithm, processed));
        Ok(processed)
    }

    fn process(&self, waveform: &mut Waveform) -> NmbimResult<()> {
        let mut args = AlgorithmArgs::new();
        for (argument, path) in &self.config.input_map {
            args.insert(argument.as_str(), waveform.get(path)?);
        }
        for (argument, literal) in &self.config.params {
            args.insert(argument.as_str(), Value::from(literal));
        }
        let result = self.config.algorithm.run(&args)?;
        waveform.save(&self.config.output_path, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::Algorithm;

    fn waveform(shot: i64, wf: Vec<f64>) -> Waveform {
        let mut waveform = Waveform::new("test", shot).unwrap();
        waveform.save_raw("raw/wf", wf).unwrap();
        waveform.save_raw("raw/mean_noise", 1.0).unwrap();
        waveform
    }

    fn noise_stage() -> StageConfig {
        StageConfig::new("noise", Algorithm::RemoveNoise, "processed/wf_noise_removed")
            .input("wf", "raw/wf")
            .input("mean_noise", "raw/mean_noise")
    }

    #[test]
    fn queue_is_processed_in_order() {
        let mut a = waveform(1, vec![3.0, 0.5]);
        let mut b = waveform(2, vec![1.5, 2.0]);
        let mut processor = WaveformProcessor::new(&noise_stage()).unwrap();
        processor.enqueue(&mut a);
        processor.enqueue(&mut b);
        assert_eq!(processor.pending(), 2);
        assert_eq!(processor.run().unwrap(), 2);
        assert_eq!(processor.pending(), 0);
        drop(processor);
        assert_eq!(
            a.get_array("processed/wf_noise_removed").unwrap().to_vec(),
            vec![2.0, 0.0]
        );
        assert_eq!(
            b.get_array("processed/wf_noise_removed").unwrap().to_vec(),
            vec![0.5, 1.0]
        );
    }

    #[test]
    fn failure_names_stage_and_shot_and_aborts_queue() {
        let mut good = waveform(1, vec![3.0]);
        let mut bad = Waveform::new("test", 2).unwrap();
        let mut after = waveform(3, vec![3.0]);
        let mut processor = WaveformProcessor::new(&noise_stage()).unwrap();
        processor.enqueue(&mut good);
        processor.enqueue(&mut bad);
        processor.enqueue(&mut after);
        let err = processor.run().unwrap_err();
        match err {
            NmbimError::Processing { stage, shot_number, source } => {
                assert_eq!(stage, "noise");
                assert_eq!(shot_number, 2);
                assert!(matches!(*source, NmbimError::PathNotFound(_)));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(processor.pending(), 0);
        drop(processor);
        assert!(good.has("processed/wf_noise_removed"));
        assert!(!after.has("processed/wf_noise_removed"));
    }

    #[test]
    fn failed_algorithm_leaves_no_output() {
        let mut w = waveform(1, vec![0.0, 0.0]);
        w.save("processed/dz", 0.0).unwrap();
        let stage = StageConfig::new("dp", Algorithm::CalcDpDz, "processed/dp_dz")
            .input("wf", "raw/wf")
            .input("dz", "processed/dz");
        let mut processor = WaveformProcessor::new(&stage).unwrap();
        processor.enqueue(&mut w);
        assert!(processor.run().is_err());
        drop(processor);
        assert!(!w.has("processed/dp_dz"));
    }

    #[test]
    fn mapping_results_become_sibling_leaves() {
        let mut w = waveform(1, vec![0.0, 1.0, 1.0, 0.0, 2.0, 0.0]);
        w.save("processed/idx", crate::store::map_of([("first", 1_i64), ("last", 3), ("ground", 6)]))
            .unwrap();
        let stage = StageConfig::new("gap", Algorithm::CalcGapProb, "processed/gap")
            .input("wf_per_height", "raw/wf")
            .input("veg_first_idx", "processed/idx/first")
            .input("veg_last_idx", "processed/idx/last")
            .input("ground_last_idx", "processed/idx/ground");
        let mut processor = WaveformProcessor::new(&stage).unwrap();
        processor.enqueue(&mut w);
        processor.run().unwrap();
        drop(processor);
        assert_eq!(w.get_f64("processed/gap/veg_cover").unwrap(), 0.5);
        assert!(w.paths().contains("processed/gap/gap_prob"));
        assert!(w.paths().contains("processed/gap/foliage_density"));
    }

    #[test]
    fn rerunning_a_stage_is_rejected() {
        let mut w = waveform(1, vec![3.0]);
        for expect_ok in [true, false] {
            let mut processor = WaveformProcessor::new(&noise_stage()).unwrap();
            processor.enqueue(&mut w);
            assert_eq!(processor.run().is_ok(), expect_ok);
        }
    }
}
