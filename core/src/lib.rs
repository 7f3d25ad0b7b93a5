//! Waveform data model and processing engine for NMBIM lidar biomass metrics.
//!
//! Raw GEDI and LVIS returns are read through [`source`] adapters into
//! per-shot [`Waveform`](waveform::Waveform) stores, gathered and filtered
//! into a [`WaveformCollection`](collection::WaveformCollection), and run
//! through a [`Pipeline`](processing::Pipeline) of [`algorithms`] whose
//! results land back in each waveform.

pub mod algorithms;
pub mod collection;
pub mod math;
pub mod params;
pub mod prelude;
pub mod processing;
pub mod source;
pub mod store;
pub mod telemetry;
pub mod waveform;

#[cfg(test)]
mod fixtures;

pub use prelude::{NmbimError, NmbimResult};
