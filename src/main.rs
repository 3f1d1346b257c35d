//! Command-line entry point: resolves the run configuration, runs the
//! pipeline in the selected mode and reports the results.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use sdp8x6_calibration::output::{
    benchmark_line, render_json, render_plain, timing_line, write_distributions_csv,
    write_sample_data,
};
use sdp8x6_calibration::timing::{ElapsedTime, Stopwatch};
use sdp8x6_calibration::{
    run, DistributionSource, EnsembleSource, ExecutionMode, Formula, FormulaSelector, RunConfig,
    RunOutcome, ScalarSampler, UncertainValue,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputSelect {
    #[value(name = "linear-500pa", alias = "0")]
    Linear500Pa,
    #[value(name = "linear-125pa", alias = "1")]
    Linear125Pa,
    #[value(name = "root-500pa", alias = "2")]
    Root500Pa,
    #[value(name = "root-125pa", alias = "3")]
    Root125Pa,
    #[value(name = "all", alias = "4")]
    All,
}

impl From<OutputSelect> for FormulaSelector {
    fn from(select: OutputSelect) -> Self {
        match select {
            OutputSelect::Linear500Pa => FormulaSelector::Single(Formula::Linear500Pa),
            OutputSelect::Linear125Pa => FormulaSelector::Single(Formula::Linear125Pa),
            OutputSelect::Root500Pa => FormulaSelector::Single(Formula::Root500Pa),
            OutputSelect::Root125Pa => FormulaSelector::Single(Formula::Root125Pa),
            OutputSelect::All => FormulaSelector::All,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "sdp8x6-calibration")]
#[command(about = "Calibrated SDP8x6 differential pressure under uncertain Aout and Vdd")]
struct Cli {
    /// JSON run configuration; command-line flags take precedence.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run as scalar Monte Carlo with this many iterations instead of a
    /// single distributional pass.
    #[arg(short = 'M', long = "monte-carlo-iterations")]
    iterations: Option<usize>,

    #[arg(short = 'S', long = "output-select", value_enum)]
    output_select: Option<OutputSelect>,

    #[arg(short = 'j', long, default_value_t = false)]
    json: bool,

    /// Print only "<result> <elapsed-microseconds>".
    #[arg(short = 'b', long, default_value_t = false)]
    benchmark: bool,

    #[arg(short = 'T', long, default_value_t = false)]
    time: bool,

    /// Write calibrated output distributions to this CSV file.
    #[arg(short = 'o', long = "output")]
    output_csv: Option<PathBuf>,

    /// Write raw Monte Carlo samples and elapsed time to this file.
    #[arg(short = 'd', long = "data-out")]
    data_out: Option<PathBuf>,

    #[arg(long)]
    ensemble_size: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    config.validate()?;
    debug!(?config, "resolved run configuration");

    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match config.mode {
        ExecutionMode::Distributional => execute(
            &cli,
            &config,
            EnsembleSource::new(rng, config.ensemble_size),
            &mut out,
        ),
        ExecutionMode::Sampling { .. } => {
            execute(&cli, &config, ScalarSampler::new(rng), &mut out)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config(cli: &Cli) -> Result<RunConfig> {
    let mut config = match &cli.config {
        Some(path) => RunConfig::from_json_file(path)
            .with_context(|| format!("failed to load configuration: {}", path.display()))?,
        None => RunConfig::default(),
    };

    if let Some(iterations) = cli.iterations {
        config.mode = ExecutionMode::Sampling { iterations };
    }
    if let Some(select) = cli.output_select {
        config.selector = select.into();
    }
    if let Some(size) = cli.ensemble_size {
        config.ensemble_size = size;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    if cli.data_out.is_some() && !config.mode.is_sampling() {
        bail!("--data-out records Monte Carlo samples and needs -M/--monte-carlo-iterations");
    }

    Ok(config)
}

fn execute<S, W>(cli: &Cli, config: &RunConfig, mut source: S, out: &mut W) -> Result<()>
where
    S: DistributionSource,
    W: Write,
{
    let stopwatch = Stopwatch::start();
    let outcome = run(&config.plan(), &mut source)?;
    let elapsed = stopwatch.stop();

    if cli.benchmark {
        let result = outcome.tracked_scalar().unwrap_or(f64::NAN);
        writeln!(out, "{}", benchmark_line(result, elapsed))?;
    } else {
        report(cli, &outcome, elapsed, out)?;
    }

    if let (Some(path), Some(samples)) = (&cli.data_out, &outcome.samples) {
        write_sample_data(path, samples.as_slice(), elapsed)
            .with_context(|| format!("failed to write sample data: {}", path.display()))?;
    }

    Ok(())
}

fn report<V: UncertainValue>(
    cli: &Cli,
    outcome: &RunOutcome<V>,
    elapsed: ElapsedTime,
    out: &mut impl Write,
) -> Result<()> {
    if cli.json {
        writeln!(out, "{}", render_json(outcome)?)?;
    } else {
        write!(out, "{}", render_plain(outcome))?;
    }

    if cli.time {
        writeln!(out)?;
        writeln!(out, "{}", timing_line(elapsed))?;
    }

    if let Some(path) = &cli.output_csv {
        write_csv(path, outcome)?;
    }

    Ok(())
}

fn write_csv<V: UncertainValue>(path: &Path, outcome: &RunOutcome<V>) -> Result<()> {
    write_distributions_csv(path, &outcome.outputs)
        .with_context(|| format!("failed to write output CSV: {}", path.display()))
}
