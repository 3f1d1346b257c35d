//! Run configuration: JSON file loading, defaults and validation.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::calibration::FormulaSelector;
use crate::driver::{ExecutionMode, RunPlan};
use crate::source::SensorInputBounds;
use crate::CalibrationError;

pub const DEFAULT_ENSEMBLE_SIZE: usize = 4096;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub mode: ExecutionMode,
    pub selector: FormulaSelector,
    pub inputs: SensorInputBounds,
    /// Particles per distributional value.
    pub ensemble_size: usize,
    /// Fixed RNG seed; drawn from entropy when absent.
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            selector: FormulaSelector::default(),
            inputs: SensorInputBounds::default(),
            ensemble_size: DEFAULT_ENSEMBLE_SIZE,
            seed: None,
        }
    }
}

impl RunConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, CalibrationError> {
        let raw = fs::read_to_string(path)?;
        let config: RunConfig = serde_json::from_str(&raw)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CalibrationError> {
        if let ExecutionMode::Sampling { iterations: 0 } = self.mode {
            return Err(CalibrationError::InvalidConfig(
                "monte carlo iteration count must be greater than zero".to_string(),
            ));
        }

        if self.ensemble_size == 0 {
            return Err(CalibrationError::InvalidConfig(
                "ensemble_size must be greater than zero".to_string(),
            ));
        }

        self.inputs.aout.validate("aout")?;
        self.inputs.vdd.validate("vdd")?;
        Ok(())
    }

    pub fn plan(&self) -> RunPlan {
        RunPlan {
            mode: self.mode,
            selector: self.selector,
            bounds: self.inputs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Formula;
    use crate::source::UniformBounds;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = RunConfig::default();
        config.validate().unwrap();
        assert_eq!(config.mode, ExecutionMode::Distributional);
        assert_eq!(config.selector, FormulaSelector::Single(Formula::Linear500Pa));
    }

    #[test]
    fn zero_iterations_are_rejected() {
        let config = RunConfig {
            mode: ExecutionMode::Sampling { iterations: 0 },
            ..RunConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CalibrationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn empty_ensembles_are_rejected() {
        let config = RunConfig {
            ensemble_size: 0,
            ..RunConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unrepresentable_input_span_is_rejected_before_running() {
        let config = RunConfig {
            mode: ExecutionMode::Sampling { iterations: 10 },
            inputs: SensorInputBounds {
                aout: UniformBounds::new(-1e308, 1e308),
                ..SensorInputBounds::default()
            },
            ..RunConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CalibrationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "mode": {{ "sampling": {{ "iterations": 2000 }} }},
                "selector": "all",
                "inputs": {{
                    "aout": {{ "low": 1.4, "high": 1.6 }},
                    "vdd": {{ "low": 3.5, "high": 3.9 }}
                }},
                "seed": 17
            }}"#
        )
        .unwrap();

        let config = RunConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.mode, ExecutionMode::Sampling { iterations: 2000 });
        assert_eq!(config.selector, FormulaSelector::All);
        assert_eq!(config.inputs.aout, UniformBounds::new(1.4, 1.6));
        assert_eq!(config.ensemble_size, DEFAULT_ENSEMBLE_SIZE);
        assert_eq!(config.seed, Some(17));
        config.validate().unwrap();
    }

    #[test]
    fn malformed_json_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            RunConfig::from_json_file(file.path()),
            Err(CalibrationError::Json(_))
        ));
    }
}
