//! Uniformly distributed inputs for `Aout` and `Vdd`.

use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::calibration::InputPair;
use crate::value::{Ensemble, UncertainValue};
use crate::CalibrationError;

pub const DEFAULT_AOUT_LOW: f64 = 1.3;
pub const DEFAULT_AOUT_HIGH: f64 = 1.7;
pub const DEFAULT_VDD_LOW: f64 = 3.5;
pub const DEFAULT_VDD_HIGH: f64 = 3.9;

/// Closed interval `[low, high]` in volts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UniformBounds {
    pub low: f64,
    pub high: f64,
}

impl UniformBounds {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn validate(&self, name: &str) -> Result<(), CalibrationError> {
        if !self.low.is_finite() || !self.high.is_finite() {
            return Err(CalibrationError::InvalidConfig(format!(
                "{name} bounds must be finite"
            )));
        }

        if self.low > self.high {
            return Err(CalibrationError::InvalidConfig(format!(
                "{name} low bound {} exceeds high bound {}",
                self.low, self.high
            )));
        }

        if !(self.high - self.low).is_finite() {
            return Err(CalibrationError::InvalidConfig(format!(
                "{name} bounds [{}, {}] span more than f64 can represent",
                self.low, self.high
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorInputBounds {
    pub aout: UniformBounds,
    pub vdd: UniformBounds,
}

impl Default for SensorInputBounds {
    fn default() -> Self {
        Self {
            aout: UniformBounds::new(DEFAULT_AOUT_LOW, DEFAULT_AOUT_HIGH),
            vdd: UniformBounds::new(DEFAULT_VDD_LOW, DEFAULT_VDD_HIGH),
        }
    }
}

/// Produces one value uniformly distributed over `[low, high]`.
///
/// In sampling mode the value is a concrete draw; in distributional mode it
/// is a handle to the whole distribution.
pub trait DistributionSource {
    type Value: UncertainValue;

    fn uniform(&mut self, bounds: UniformBounds) -> Self::Value;

    /// Fresh, independent draws for both inputs. `Aout` is drawn first.
    fn draw_inputs(&mut self, bounds: &SensorInputBounds) -> InputPair<Self::Value> {
        let aout = self.uniform(bounds.aout);
        let vdd = self.uniform(bounds.vdd);
        InputPair::new(aout, vdd)
    }
}

/// Scalar Monte Carlo draws.
pub struct ScalarSampler<R> {
    rng: R,
}

impl<R: Rng> ScalarSampler<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> DistributionSource for ScalarSampler<R> {
    type Value = f64;

    fn uniform(&mut self, bounds: UniformBounds) -> f64 {
        Uniform::new_inclusive(bounds.low, bounds.high).sample(&mut self.rng)
    }
}

/// Stratified particle ensembles.
///
/// Particle `i` is drawn inside the `i`-th of `size` equal-probability strata,
/// then the particles are shuffled so separately built ensembles pair up
/// independently.
pub struct EnsembleSource<R> {
    rng: R,
    size: usize,
}

impl<R: Rng> EnsembleSource<R> {
    pub fn new(rng: R, size: usize) -> Self {
        assert!(size > 0, "ensemble size must be positive");
        Self { rng, size }
    }
}

impl<R: Rng> DistributionSource for EnsembleSource<R> {
    type Value = Ensemble;

    fn uniform(&mut self, bounds: UniformBounds) -> Ensemble {
        let span = bounds.high - bounds.low;
        let n = self.size as f64;
        let mut particles: Vec<f64> = (0..self.size)
            .map(|i| {
                let u = (i as f64 + self.rng.gen::<f64>()) / n;
                bounds.low + span * u
            })
            .collect();
        particles.shuffle(&mut self.rng);
        Ensemble::from_particles(particles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn default_bounds_match_sensor_tolerances() {
        let bounds = SensorInputBounds::default();
        assert_eq!(bounds.aout, UniformBounds::new(1.3, 1.7));
        assert_eq!(bounds.vdd, UniformBounds::new(3.5, 3.9));
    }

    #[test]
    fn scalar_draws_stay_in_bounds() {
        let mut source = ScalarSampler::new(StdRng::seed_from_u64(7));
        let bounds = UniformBounds::new(3.5, 3.9);
        for _ in 0..1000 {
            let x = source.uniform(bounds);
            assert!((3.5..=3.9).contains(&x));
        }
    }

    #[test]
    fn degenerate_bounds_yield_the_point() {
        let mut source = ScalarSampler::new(StdRng::seed_from_u64(7));
        assert_eq!(source.uniform(UniformBounds::new(2.0, 2.0)), 2.0);
    }

    #[test]
    fn ensemble_covers_every_stratum() {
        let size = 64;
        let mut source = EnsembleSource::new(StdRng::seed_from_u64(11), size);
        let ensemble = source.uniform(UniformBounds::new(0.0, 1.0));
        assert_eq!(ensemble.len(), size);

        let mut hits = vec![0usize; size];
        for &p in ensemble.particles() {
            hits[((p * size as f64) as usize).min(size - 1)] += 1;
        }
        assert!(hits.iter().all(|&h| h == 1));
        assert_abs_diff_eq!(ensemble.expected(), 0.5, epsilon = 1.0 / size as f64);
    }

    #[test]
    fn inputs_are_drawn_independently() {
        let mut source = EnsembleSource::new(StdRng::seed_from_u64(3), 256);
        let bounds = SensorInputBounds {
            aout: UniformBounds::new(0.0, 1.0),
            vdd: UniformBounds::new(0.0, 1.0),
        };
        let inputs = source.draw_inputs(&bounds);
        assert_ne!(inputs.aout, inputs.vdd);
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let err = UniformBounds::new(3.9, 3.5).validate("vdd").unwrap_err();
        assert!(err.to_string().contains("vdd"));
        assert!(UniformBounds::new(f64::NAN, 1.0).validate("aout").is_err());
    }

    #[test]
    fn overflowing_span_is_rejected() {
        let bounds = UniformBounds::new(-1e308, 1e308);
        let err = bounds.validate("aout").unwrap_err();
        assert!(matches!(err, CalibrationError::InvalidConfig(_)));
        assert!(err.to_string().contains("aout"));
        assert!(UniformBounds::new(-1e307, 1e307).validate("aout").is_ok());
    }
}
