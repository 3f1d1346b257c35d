//! Rendering and persistence of run results.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::Writer;
use serde::Serialize;

use crate::calibration::{CalibratedOutputSet, Formula, FormulaSelector};
use crate::driver::{ExecutionMode, RunOutcome};
use crate::stats::{aggregate, MeanAndVariance};
use crate::timing::ElapsedTime;
use crate::value::UncertainValue;
use crate::CalibrationError;

/// What a reported output summarises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputBasis {
    /// Particles of a distributional value.
    Particles,
    /// The Monte Carlo sample series.
    Samples,
    /// A single value from the final Monte Carlo iteration.
    FinalIteration,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Spread {
    pub variance: f64,
    pub min: f64,
    pub max: f64,
}

/// Summary of one calibrated output as it is shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportedOutput {
    pub name: &'static str,
    pub formula: Formula,
    pub basis: OutputBasis,
    /// Mean over the basis; the value itself for a final-iteration output.
    pub mean: f64,
    /// Absent for a final-iteration output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spread: Option<Spread>,
    pub count: usize,
}

impl ReportedOutput {
    fn from_values(formula: Formula, basis: OutputBasis, values: &[f64]) -> Self {
        let MeanAndVariance { mean, variance } = aggregate(values).unwrap_or(MeanAndVariance {
            mean: f64::NAN,
            variance: f64::NAN,
        });
        Self {
            name: formula.label(),
            formula,
            basis,
            mean,
            spread: Some(Spread {
                variance,
                min: values.iter().copied().fold(f64::INFINITY, f64::min),
                max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            }),
            count: values.len(),
        }
    }

    fn final_iteration(formula: Formula, value: f64) -> Self {
        Self {
            name: formula.label(),
            formula,
            basis: OutputBasis::FinalIteration,
            mean: value,
            spread: None,
            count: 1,
        }
    }
}

/// One entry per computed formula, in formula order.
///
/// In sampling mode the tracked formula is described by the whole sample
/// series; any other computed formula by its value in the final iteration.
pub fn reported_outputs<V: UncertainValue>(outcome: &RunOutcome<V>) -> Vec<ReportedOutput> {
    let tracked = outcome.selector.tracked();
    outcome
        .outputs
        .iter()
        .map(|(formula, value)| match &outcome.samples {
            Some(series) if formula == tracked => {
                ReportedOutput::from_values(formula, OutputBasis::Samples, series.as_slice())
            }
            Some(_) => ReportedOutput::final_iteration(formula, value.expected()),
            None => ReportedOutput::from_values(formula, OutputBasis::Particles, value.particles()),
        })
        .collect()
}

pub fn render_plain<V: UncertainValue>(outcome: &RunOutcome<V>) -> String {
    let mut text = String::new();
    for output in reported_outputs(outcome) {
        let line = match (output.basis, output.spread) {
            (OutputBasis::Particles, Some(spread)) => format!(
                "{}: {:.6} (variance {:.6}, support [{:.6}, {:.6}], {} particles)",
                output.name, output.mean, spread.variance, spread.min, spread.max, output.count
            ),
            (OutputBasis::Samples, Some(spread)) => format!(
                "{}: {:.6} (variance {:.6}, range [{:.6}, {:.6}], {} samples)",
                output.name, output.mean, spread.variance, spread.min, spread.max, output.count
            ),
            _ => format!("{}: {:.6} (final iteration)", output.name, output.mean),
        };
        text.push_str(&line);
        text.push('\n');
    }
    text
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    mode: &'static str,
    iterations: usize,
    selector: FormulaSelector,
    outputs: Vec<ReportedOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    samples: Option<&'a [f64]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<MeanAndVariance>,
}

/// Pretty-printed JSON. Non-finite numbers serialize as `null`.
pub fn render_json<V: UncertainValue>(outcome: &RunOutcome<V>) -> Result<String, CalibrationError> {
    let report = JsonReport {
        mode: match outcome.mode {
            ExecutionMode::Distributional => "distributional",
            ExecutionMode::Sampling { .. } => "sampling",
        },
        iterations: outcome.mode.iterations(),
        selector: outcome.selector,
        outputs: reported_outputs(outcome),
        samples: outcome.samples.as_ref().map(|s| s.as_slice()),
        summary: outcome.summary,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// `"<scalar-result> <elapsed-microseconds>"`
pub fn benchmark_line(result: f64, elapsed: ElapsedTime) -> String {
    format!("{result:.6} {}", elapsed.as_micros())
}

pub fn timing_line(elapsed: ElapsedTime) -> String {
    format!("Elapsed time: {:.6} seconds", elapsed.as_secs_f64())
}

#[derive(Debug, Serialize)]
struct DistributionRow<'a> {
    output: &'a str,
    particle: usize,
    value: f64,
}

/// Writes every particle of every computed output as `output,particle,value`.
pub fn write_distributions_csv<V: UncertainValue>(
    path: &Path,
    outputs: &CalibratedOutputSet<V>,
) -> Result<(), CalibrationError> {
    let mut writer = Writer::from_path(path)?;
    for (formula, value) in outputs.iter() {
        for (particle, &v) in value.particles().iter().enumerate() {
            writer.serialize(DistributionRow {
                output: formula.label(),
                particle,
                value: v,
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Elapsed microseconds on the first line, then one raw sample per line.
pub fn write_sample_data(
    path: &Path,
    samples: &[f64],
    elapsed: ElapsedTime,
) -> Result<(), CalibrationError> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "{}", elapsed.as_micros())?;
    for sample in samples {
        writeln!(writer, "{sample}")?;
    }
    writer.flush()?;
    Ok(())
}
