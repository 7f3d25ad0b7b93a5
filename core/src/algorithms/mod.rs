//! Numerical waveform algorithms.
//!
//! Every function is pure over its array arguments. Recoverable degeneracies
//! (zero-sum waveforms, no below-noise ground boundary, empty vegetation
//! zones) log a warning and return a defined result; invalid arguments are
//! `InvalidInput` errors. [`Algorithm`] names each function for processing
//! stages and binds its arguments by name.

pub mod biomass;
pub mod gap;
pub mod height;
pub mod noise;
pub mod registry;
pub mod separation;
pub mod smoothing;

pub use biomass::{calc_biomass_index, calc_biomass_index_simple};
pub use gap::{calc_gap_prob, GapProbability};
pub use height::{calc_dz, calc_height, truncate_waveform};
pub use noise::{calc_dp_dz, normalize_waveform, remove_noise};
pub use registry::{Algorithm, AlgorithmArgs};
pub use separation::{
    create_ground_return, isolate_vegetation, separate_veg_ground, SeparationParams, VegGroundSeparation,
};
pub use smoothing::smooth_waveform;

use crate::prelude::{NmbimError, NmbimResult};

fn same_length(arrays: &[(&str, usize)]) -> NmbimResult<()> {
    if let Some(((first, expected), rest)) = arrays.split_first().map(|(f, r)| (*f, r)) {
        if let Some((name, len)) = rest.iter().find(|(_, len)| *len != expected) {
            return Err(NmbimError::InvalidInput(format!(
                "{} has {} bins but {} has {}",
                name, len, first, expected
            )));
        }
    }
    Ok(())
}
