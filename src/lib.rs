//! SDP8x6 analog sensor calibration under input uncertainty.
//!
//! Converts an uncertain ratiometric output voltage (`Aout`) and an uncertain
//! supply voltage (`Vdd`) into a calibrated differential pressure, either as
//! a whole distribution (particle ensembles) or as repeated scalar Monte Carlo
//! samples summarised by mean and variance.

pub mod calibration;
pub mod config;
pub mod driver;
pub mod output;
pub mod source;
pub mod stats;
pub mod timing;
pub mod value;

use thiserror::Error;

pub use calibration::{
    calculate, sign, CalibratedOutputSet, Formula, FormulaSelector, InputPair,
};
pub use config::RunConfig;
pub use driver::{run, ExecutionMode, RunOutcome, RunPlan};
pub use source::{
    DistributionSource, EnsembleSource, ScalarSampler, SensorInputBounds, UniformBounds,
};
pub use stats::{aggregate, MeanAndVariance, SampleSeries};
pub use value::{Ensemble, UncertainValue};

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to allocate a sample buffer for {requested} iterations")]
    Allocation { requested: usize },
}
