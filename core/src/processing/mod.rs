//! Stage configuration, the per-stage waveform processor and pipelines.

pub mod pipeline;
pub mod processor;
pub mod stage;

pub use pipeline::Pipeline;
pub use processor::WaveformProcessor;
pub use stage::{Literal, StageConfig};
