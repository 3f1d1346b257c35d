//! Source → calibration pipeline, run once per distribution or N times as
//! scalar Monte Carlo.
//!
//! Both modes go through the same loop; distributional mode is simply a loop
//! of one iteration whose values are whole distributions.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::calibration::{calculate, CalibratedOutputSet, FormulaSelector};
use crate::source::{DistributionSource, SensorInputBounds};
use crate::stats::{MeanAndVariance, SampleSeries};
use crate::value::UncertainValue;
use crate::CalibrationError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// One pass over distributional values.
    #[default]
    Distributional,
    /// `iterations` independent scalar passes, summarised afterwards.
    Sampling { iterations: usize },
}

impl ExecutionMode {
    pub fn iterations(self) -> usize {
        match self {
            ExecutionMode::Distributional => 1,
            ExecutionMode::Sampling { iterations } => iterations,
        }
    }

    pub fn is_sampling(self) -> bool {
        matches!(self, ExecutionMode::Sampling { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunPlan {
    pub mode: ExecutionMode,
    pub selector: FormulaSelector,
    pub bounds: SensorInputBounds,
}

#[derive(Debug, Clone)]
pub struct RunOutcome<V> {
    pub mode: ExecutionMode,
    pub selector: FormulaSelector,
    /// Outputs of the final iteration. In distributional mode this is the
    /// only iteration.
    pub outputs: CalibratedOutputSet<V>,
    /// Tracked scalar of every iteration; sampling mode only.
    pub samples: Option<SampleSeries>,
    pub summary: Option<MeanAndVariance>,
}

impl<V: UncertainValue> RunOutcome<V> {
    /// Single reported number: the sample mean in sampling mode, otherwise
    /// the expected value of the tracked output distribution.
    pub fn tracked_scalar(&self) -> Option<f64> {
        match &self.summary {
            Some(summary) => Some(summary.mean),
            None => self
                .outputs
                .get(self.selector.tracked())
                .map(UncertainValue::expected),
        }
    }
}

/// Runs the pipeline. Each iteration draws fresh, independent `Aout` and
/// `Vdd` values before evaluating the selected formulas; nothing carries
/// over between iterations except the appended sample.
///
/// Sampling mode assumes `iterations >= 1`; the caller validates it.
pub fn run<S>(plan: &RunPlan, source: &mut S) -> Result<RunOutcome<S::Value>, CalibrationError>
where
    S: DistributionSource,
{
    let iterations = plan.mode.iterations();
    let tracked = plan.selector.tracked();
    debug!(
        iterations,
        mode = ?plan.mode,
        selector = ?plan.selector,
        "starting calibration run"
    );

    let mut samples = if plan.mode.is_sampling() {
        Some(SampleSeries::with_capacity(iterations)?)
    } else {
        None
    };

    let mut outputs = CalibratedOutputSet::default();
    for _ in 0..iterations {
        let inputs = source.draw_inputs(&plan.bounds);
        outputs = calculate(&inputs, plan.selector);

        if let Some(series) = samples.as_mut() {
            if let Some(value) = outputs.get(tracked) {
                series.push(value.expected());
            }
        }
    }

    let summary = samples.as_ref().and_then(SampleSeries::aggregate);
    if let Some(series) = &samples {
        let non_finite = series.non_finite_count();
        if non_finite > 0 {
            warn!(
                non_finite,
                total = series.len(),
                formula = ?tracked,
                "sampled outputs include infinite or NaN values"
            );
        }
    }

    debug!(?summary, "calibration run finished");
    Ok(RunOutcome {
        mode: plan.mode,
        selector: plan.selector,
        outputs,
        samples,
        summary,
    })
}
