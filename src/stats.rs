//! Reduction of scalar samples to mean and population variance.

use serde::Serialize;

use crate::CalibrationError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeanAndVariance {
    pub mean: f64,
    pub variance: f64,
}

impl MeanAndVariance {
    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }
}

/// Mean and population variance (denominator `n`) in a single Welford pass.
///
/// Agrees with the two-pass formula up to double-precision rounding, and a
/// series of identical samples yields exactly zero variance. Returns `None`
/// for an empty slice. Non-finite samples are not filtered and propagate into
/// the result.
pub fn aggregate(samples: &[f64]) -> Option<MeanAndVariance> {
    if samples.is_empty() {
        return None;
    }

    let mut mean = 0.0;
    let mut m2 = 0.0;
    for (k, &x) in samples.iter().enumerate() {
        let delta = x - mean;
        mean += delta / (k + 1) as f64;
        m2 += delta * (x - mean);
    }

    Some(MeanAndVariance {
        mean,
        variance: m2 / samples.len() as f64,
    })
}

/// Append-only buffer of per-iteration scalar results.
///
/// The full capacity is reserved up front and never grows.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSeries {
    samples: Vec<f64>,
}

impl SampleSeries {
    pub fn with_capacity(iterations: usize) -> Result<Self, CalibrationError> {
        let mut samples = Vec::new();
        samples
            .try_reserve_exact(iterations)
            .map_err(|_| CalibrationError::Allocation {
                requested: iterations,
            })?;
        Ok(Self { samples })
    }

    pub fn push(&mut self, sample: f64) {
        debug_assert!(
            self.samples.len() < self.samples.capacity(),
            "sample series grew past its reserved capacity"
        );
        self.samples.push(sample);
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples that came out infinite or NaN, e.g. from a zero `Vdd` draw.
    pub fn non_finite_count(&self) -> usize {
        self.samples.iter().filter(|x| !x.is_finite()).count()
    }

    pub fn aggregate(&self) -> Option<MeanAndVariance> {
        aggregate(&self.samples)
    }
}
