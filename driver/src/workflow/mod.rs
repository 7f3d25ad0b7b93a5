pub mod config;
pub mod inputs;
pub mod report;
pub mod runner;
