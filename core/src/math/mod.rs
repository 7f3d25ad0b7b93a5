pub mod gaussian;
pub mod stats;

pub use gaussian::{bell, GaussianKernel};
pub use stats::StatsHelper;
