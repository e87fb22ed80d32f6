//! Orchestrates the two streaming passes: read batch -> validate ->
//! dispatch -> reduce, finalizing after EOF, then runs the chi-square
//! pipeline and builds the report.

use crate::chisquare;
use crate::config::RunConfig;
use crate::distribution::DistributionClass;
use crate::error::{Result, SolverError};
use crate::farmer::Farmer;
use crate::input::InputStream;
use crate::interval::IntervalModel;
use crate::report::Report;
use crate::stats::DatasetStats;
use crate::watchdog::Watchdog;
use crate::worker::accelerator::AcceleratorWorker;
use crate::worker::cpu::CpuPoolWorker;
use crate::worker::{ComputeWorker, WorkItem};
use std::time::Duration;
use tracing::info;

const WATCHDOG_DEADLINE: Duration = Duration::from_secs(30);

fn build_farmer(config: &RunConfig) -> Farmer {
    let accelerators: Vec<Box<dyn ComputeWorker>> = config
        .accelerator_devices
        .iter()
        .map(|d| Box::new(AcceleratorWorker::new(d.clone())) as Box<dyn ComputeWorker>)
        .collect();
    Farmer::new(config.policy, accelerators, Box::new(CpuPoolWorker::new()))
}

/// Pass 1: streaming min/max/validity/sign/integrality scan.
fn run_pass1(config: &RunConfig, farmer: &mut Farmer) -> Result<crate::farmer::Pass1Result> {
    info!(file = %config.input_file.display(), "pass 1: starting min/max/validity scan");
    let mut input = InputStream::open(&config.input_file)?;
    let watchdog = Watchdog::start(WATCHDOG_DEADLINE, "pass1");
    let mut total_valid: u64 = 0;

    while let Some(batch) = input.next_batch(config.batch_size)? {
        if batch.is_empty() {
            continue;
        }
        total_valid += batch.len() as u64;
        farmer.dispatch_batch(batch, |b| WorkItem::ReduceScan { batch: b })?;
        watchdog.reset();
    }

    let result = farmer.finish_pass1(total_valid)?;
    info!(
        min = result.min,
        max = result.max,
        count = result.count,
        has_negative = result.has_negative,
        has_non_integer = result.has_non_integer,
        "pass 1: complete"
    );
    Ok(result)
}

/// Pass 2: streaming Welford mean/variance (scalar, stream order, driver
/// thread) alongside farmer-dispatched histogram binning.
fn run_pass2(
    config: &RunConfig,
    farmer: &mut Farmer,
    stats: &mut DatasetStats,
    model: &mut IntervalModel,
    min: f64,
) -> Result<()> {
    info!("pass 2: starting Welford mean/variance and histogram binning");
    let size = model.bin_size();
    let k = model.counter.len();
    let mut input = InputStream::open(&config.input_file)?;
    let watchdog = Watchdog::start(WATCHDOG_DEADLINE, "pass2");

    while let Some(batch) = input.next_batch(config.batch_size)? {
        if batch.is_empty() {
            continue;
        }
        for &x in &batch {
            stats.update_welford(x);
        }
        farmer.dispatch_batch(batch, move |b| WorkItem::Bin {
            batch: b,
            size,
            min,
            k,
        })?;
        watchdog.reset();
    }

    let delta = farmer.finish_pass2(k)?;
    model.add_delta(&delta);
    info!(bin_count = k, mean = stats.mean(), std_dev = stats.std_dev(), "pass 2: complete");
    Ok(())
}

/// Runs the full classification pipeline for one configured run, returning
/// the finished report. `EmptyDataset` is returned (not panicked) when
/// pass 1 finds zero valid values.
pub fn run(config: &RunConfig) -> Result<Report> {
    let mut farmer = build_farmer(config);
    farmer.warn_if_degraded();

    let pass1 = run_pass1(config, &mut farmer)?;
    if pass1.count == 0 {
        return Err(SolverError::EmptyDataset);
    }

    let mut stats = DatasetStats::new();
    stats.merge_pass1(
        pass1.min,
        pass1.max,
        pass1.count,
        pass1.has_negative,
        pass1.has_non_integer,
    );
    stats.finalize_pass1();

    let mut model = IntervalModel::build(pass1.min, pass1.max, pass1.count);

    // `finish_pass1` already joined every worker, so the same farmer's
    // workers are idle and ready to be reused for pass 2's bin dispatch.
    run_pass2(config, &mut farmer, &mut stats, &mut model, pass1.min)?;

    let merged = model.merge();
    let class = DistributionClass::classify(stats.has_negative, stats.has_non_integer);
    let chi = chisquare::evaluate(&merged, class, stats.mean(), stats.std_dev(), pass1.count);

    info!(winner = chi.winner().kind.name(), criterion = chi.winner().criterion, "chi-square pipeline: winner selected");

    Ok(Report::build(
        config,
        &pass1,
        &model,
        &merged,
        stats.mean(),
        stats.std_dev(),
        &chi,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatchPolicy;
    use rand::SeedableRng;
    use rand_distr::Distribution as _;
    use std::io::Write;

    fn write_doubles(path: &std::path::Path, values: &[f64]) {
        let mut f = std::fs::File::create(path).unwrap();
        for v in values {
            f.write_all(&v.to_le_bytes()).unwrap();
        }
    }

    fn cpu_only_config(path: std::path::PathBuf) -> RunConfig {
        RunConfig {
            input_file: path,
            policy: DispatchPolicy::CpuOnly,
            accelerator_devices: vec![],
            batch_size: 2000,
            json_output: false,
        }
    }

    #[test]
    fn uniform_dataset_is_classified_uniform() {
        let mut rng = rand_xoshiro::Xoshiro256PlusPlus::seed_from_u64(1);
        let dist = rand_distr::Uniform::new(0.0, 1000.0);
        let values: Vec<f64> = (0..10_000).map(|_| dist.sample(&mut rng)).collect();

        let tmp = tempfile::NamedTempFile::new().unwrap();
        write_doubles(tmp.path(), &values);

        let report = run(&cpu_only_config(tmp.path().to_path_buf())).unwrap();
        assert_eq!(report.winner, "UNIFORM");
    }

    #[test]
    fn normal_dataset_is_classified_normal_with_accurate_moments() {
        let mut rng = rand_xoshiro::Xoshiro256PlusPlus::seed_from_u64(2);
        let dist = rand_distr::Normal::new(50.0, 10.0).unwrap();
        let values: Vec<f64> = (0..10_000).map(|_| dist.sample(&mut rng)).collect();

        let tmp = tempfile::NamedTempFile::new().unwrap();
        write_doubles(tmp.path(), &values);

        let report = run(&cpu_only_config(tmp.path().to_path_buf())).unwrap();
        assert_eq!(report.winner, "NORMAL");
        assert!((report.pass2.mean - 50.0).abs() < 0.5);
        assert!((report.pass2.std_dev - 10.0).abs() < 0.3);
    }

    #[test]
    fn poisson_integer_dataset_is_classified_poisson() {
        let mut rng = rand_xoshiro::Xoshiro256PlusPlus::seed_from_u64(3);
        let dist = rand_distr::Poisson::new(5.0).unwrap();
        let values: Vec<f64> = (0..10_000).map(|_| dist.sample(&mut rng)).collect();

        let tmp = tempfile::NamedTempFile::new().unwrap();
        write_doubles(tmp.path(), &values);

        let report = run(&cpu_only_config(tmp.path().to_path_buf())).unwrap();
        assert_eq!(report.winner, "POISSON");
        assert!(!report.pass1.has_non_integer);
        assert!(!report.pass1.has_negative);
    }

    #[test]
    fn exponential_dataset_is_classified_exponential() {
        let mut rng = rand_xoshiro::Xoshiro256PlusPlus::seed_from_u64(4);
        let dist = rand_distr::Exp::new(2.0).unwrap();
        let values: Vec<f64> = (0..10_000).map(|_| dist.sample(&mut rng)).collect();

        let tmp = tempfile::NamedTempFile::new().unwrap();
        write_doubles(tmp.path(), &values);

        let report = run(&cpu_only_config(tmp.path().to_path_buf())).unwrap();
        assert_eq!(report.winner, "EXPONENTIAL");
        assert!(report.pass1.has_non_integer);
        assert!(!report.pass1.has_negative);
    }

    #[test]
    fn nan_and_infinite_values_are_dropped_before_counting() {
        let mut values = vec![1.0; 100];
        values.extend(std::iter::repeat(f64::NAN).take(10));
        values.extend(std::iter::repeat(f64::INFINITY).take(5));

        let tmp = tempfile::NamedTempFile::new().unwrap();
        write_doubles(tmp.path(), &values);

        let report = run(&cpu_only_config(tmp.path().to_path_buf())).unwrap();
        assert_eq!(report.pass1.valid_count, 100);
    }

    #[test]
    fn empty_file_yields_empty_dataset_error() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let result = run(&cpu_only_config(tmp.path().to_path_buf()));
        assert!(matches!(result, Err(SolverError::EmptyDataset)));
    }

    #[test]
    fn degenerate_all_identical_values_yields_single_bin_and_zero_std_dev() {
        let values = vec![42.0; 50];
        let tmp = tempfile::NamedTempFile::new().unwrap();
        write_doubles(tmp.path(), &values);

        let report = run(&cpu_only_config(tmp.path().to_path_buf())).unwrap();
        assert_eq!(report.pass2.std_dev, 0.0);
        assert_eq!(report.pass2.counts.iter().sum::<u64>(), 50);
    }
}
