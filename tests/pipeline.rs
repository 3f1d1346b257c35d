use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

use sdp8x6_calibration::{
    calculate, run, EnsembleSource, ExecutionMode, Formula, FormulaSelector, InputPair, RunPlan,
    ScalarSampler, SensorInputBounds, UncertainValue,
};

const ENSEMBLE_SIZE: usize = 20_000;

fn plan(mode: ExecutionMode, formula: Formula) -> RunPlan {
    RunPlan {
        mode,
        selector: FormulaSelector::Single(formula),
        bounds: SensorInputBounds::default(),
    }
}

fn distributional_mean(formula: Formula, seed: u64) -> f64 {
    let mut source = EnsembleSource::new(StdRng::seed_from_u64(seed), ENSEMBLE_SIZE);
    let outcome = run(&plan(ExecutionMode::Distributional, formula), &mut source).unwrap();
    outcome.tracked_scalar().unwrap()
}

fn sampling_mean(formula: Formula, iterations: usize, seed: u64) -> f64 {
    let mut source = ScalarSampler::new(StdRng::seed_from_u64(seed));
    let outcome = run(
        &plan(ExecutionMode::Sampling { iterations }, formula),
        &mut source,
    )
    .unwrap();
    assert_eq!(outcome.samples.as_ref().unwrap().len(), iterations);
    outcome.summary.unwrap().mean
}

fn relative_gap(a: f64, b: f64) -> f64 {
    ((a - b) / b).abs()
}

#[test]
fn distributional_linear_mean_matches_closed_form() {
    // E[750 A / V - 150] with A ~ U(1.3, 1.7) and V ~ U(3.5, 3.9) independent.
    let expected = 750.0 * 1.5 * (3.9_f64 / 3.5).ln() / 0.4 - 150.0;
    let mean = distributional_mean(Formula::Linear500Pa, 2024);
    assert_relative_eq!(mean, expected, max_relative = 2e-3);
}

#[test]
fn sampling_converges_to_distributional_mean_for_linear_outputs() {
    for formula in [Formula::Linear500Pa, Formula::Linear125Pa] {
        let reference = distributional_mean(formula, 7);

        assert!(relative_gap(sampling_mean(formula, 1_000, 11), reference) < 0.05);
        for iterations in [10_000, 100_000, 1_000_000] {
            let gap = relative_gap(sampling_mean(formula, iterations, 11), reference);
            assert!(
                gap < 0.01,
                "{formula:?} with {iterations} iterations is {gap:.4} away"
            );
        }
    }
}

#[test]
fn sampling_converges_to_distributional_mean_for_root_outputs() {
    for formula in [Formula::Root500Pa, Formula::Root125Pa] {
        let reference = distributional_mean(formula, 7);
        assert!(reference < 0.0);

        for iterations in [100_000, 1_000_000] {
            let gap = relative_gap(sampling_mean(formula, iterations, 23), reference);
            assert!(
                gap < 0.01,
                "{formula:?} with {iterations} iterations is {gap:.4} away"
            );
        }
    }
}

#[test]
fn all_selection_matches_individual_formulas_on_one_pair() {
    let inputs = InputPair::new(1.61, 3.52);
    let all = calculate(&inputs, FormulaSelector::All);
    for formula in Formula::ALL {
        let single = calculate(&inputs, FormulaSelector::Single(formula));
        assert_eq!(all.get(formula), single.get(formula));
    }
}

#[test]
fn identical_seeds_reproduce_a_run() {
    let a = sampling_mean(Formula::Root125Pa, 5_000, 99);
    let b = sampling_mean(Formula::Root125Pa, 5_000, 99);
    assert_eq!(a, b);
}

#[test]
fn distributional_outputs_stay_within_physical_range() {
    let mut source = EnsembleSource::new(StdRng::seed_from_u64(3), 4096);
    let outcome = run(
        &RunPlan {
            mode: ExecutionMode::Distributional,
            selector: FormulaSelector::All,
            bounds: SensorInputBounds::default(),
        },
        &mut source,
    )
    .unwrap();

    // Aout / Vdd lies in [1.3 / 3.9, 1.7 / 3.5].
    let lo = 1.3 / 3.9;
    let hi = 1.7 / 3.5;
    let linear = outcome.outputs.get(Formula::Linear500Pa).unwrap();
    for &p in linear.particles() {
        assert!(p >= 750.0 * lo - 150.0 - 1e-9 && p <= 750.0 * hi - 150.0 + 1e-9);
    }
    let root = outcome.outputs.get(Formula::Root500Pa).unwrap();
    assert!(root.particles().iter().all(|&p| p <= 0.0));
}
