//! From a (possibly merged) histogram, distribution parameters, and
//! per-interval CDF values, computes expected probabilities and
//! frequencies, the chi-square terms per bin, and the winning
//! distribution.

use crate::distribution::{
    exponential_cdf, normal_cdf, poisson_interval_probability, uniform_cdf, DistributionClass,
    DistributionKind,
};
use crate::interval::IntervalModel;

/// Per-bin intermediate arrays for one distribution, kept around so the
/// report can print every stage, not just the final criterion.
#[derive(Debug, Clone)]
pub struct DistributionEvaluation {
    pub kind: DistributionKind,
    pub probability: Vec<f64>,
    pub expected_frequency: Vec<f64>,
    pub chi_square_term: Vec<f64>,
    pub criterion: f64,
}

/// The full pipeline result: every participating distribution's
/// evaluation plus the index of the winner.
#[derive(Debug, Clone)]
pub struct ChiSquareReport {
    pub evaluations: Vec<DistributionEvaluation>,
    pub winner_index: usize,
}

impl ChiSquareReport {
    pub fn winner(&self) -> &DistributionEvaluation {
        &self.evaluations[self.winner_index]
    }
}

/// Runs the full pipeline: gates participants via `class`, computes
/// per-bin CDFs/probabilities/expected-frequencies/chi-square terms for
/// each, and selects the minimum-criterion distribution.
pub fn evaluate(
    model: &IntervalModel,
    class: DistributionClass,
    mean: f64,
    std_dev: f64,
    total_count: u64,
) -> ChiSquareReport {
    let n = total_count as f64;
    let min = *model.lower.first().unwrap_or(&0.0);
    let max = *model.upper.last().unwrap_or(&0.0);

    let mut evaluations = Vec::new();
    for &kind in class.participants() {
        let probability = match kind {
            DistributionKind::Uniform => {
                cdf_to_probability(model, |x| uniform_cdf(x, min, max))
            }
            DistributionKind::Normal => {
                cdf_to_probability(model, |x| normal_cdf(x, mean, std_dev))
            }
            DistributionKind::Exponential => {
                cdf_to_probability(model, |x| exponential_cdf(x, mean))
            }
            DistributionKind::Poisson => poisson_probability(model, mean),
        };
        let probability = smooth_degenerate_probabilities(probability);

        let expected_frequency: Vec<f64> = probability.iter().map(|&p| n * p).collect();
        let chi_square_term: Vec<f64> = model
            .counter
            .iter()
            .zip(expected_frequency.iter())
            .map(|(&o, &e)| {
                let diff = o as f64 - e;
                diff * diff / e
            })
            .collect();
        let criterion = chi_square_term.iter().sum();

        evaluations.push(DistributionEvaluation {
            kind,
            probability,
            expected_frequency,
            chi_square_term,
            criterion,
        });
    }

    // Find the minimum criterion, then prefer NORMAL among any exact ties
    // (e.g. fully degenerate single-bin input, where every distribution's
    // criterion is zero), matching the original's tie resolution order.
    let min_criterion = evaluations
        .iter()
        .map(|e| e.criterion)
        .fold(f64::INFINITY, f64::min);
    let winner_index = evaluations
        .iter()
        .position(|e| e.criterion == min_criterion && e.kind == DistributionKind::Normal)
        .or_else(|| evaluations.iter().position(|e| e.criterion == min_criterion))
        .unwrap_or(0);

    ChiSquareReport {
        evaluations,
        winner_index,
    }
}

/// `p[0] = F[0]`, `p[i] = F[i] - F[i-1]` for the three CDF-based
/// distributions.
fn cdf_to_probability(model: &IntervalModel, cdf: impl Fn(f64) -> f64) -> Vec<f64> {
    let f: Vec<f64> = model.upper.iter().map(|&u| cdf(u)).collect();
    let mut p = Vec::with_capacity(f.len());
    for i in 0..f.len() {
        p.push(if i == 0 { f[0] } else { f[i] - f[i - 1] });
    }
    p
}

/// Poisson's per-bin probability, computed directly as an interval sum
/// rather than as a CDF difference. Adjacent bins that share an integer
/// boundary have their shared point counted once: the lower bound of a
/// bin is bumped past a boundary already claimed by the previous bin's
/// upper bound.
fn poisson_probability(model: &IntervalModel, lambda: f64) -> Vec<f64> {
    let mut probability = Vec::with_capacity(model.lower.len());
    let mut prev_hi: Option<i64> = None;
    for (&lo_f, &hi_f) in model.lower.iter().zip(model.upper.iter()) {
        let mut lo = lo_f.ceil() as i64;
        let hi = hi_f.floor() as i64;
        if let Some(prev) = prev_hi {
            if lo == prev {
                lo += 1;
            }
        }
        if lo > hi || lo < 0 {
            probability.push(0.0);
            continue;
        }
        prev_hi = Some(hi);
        probability.push(poisson_interval_probability(lo as u64, hi as u64, lambda));
    }
    probability
}

/// Defensive handling of zero/negative expected probabilities: a
/// degenerate bin makes chi-square undefined, so its probability mass is
/// redistributed from the nearest positive neighbour.
fn smooth_degenerate_probabilities(mut p: Vec<f64>) -> Vec<f64> {
    let k = p.len();
    if k == 0 {
        return p;
    }

    if p[0] <= 0.0 {
        if let Some(first_positive) = p.iter().position(|&v| v > 0.0) {
            let share = p[first_positive] / (first_positive + 1) as f64;
            for slot in p.iter_mut().take(first_positive + 1) {
                *slot = share;
            }
        }
        // If every bin is non-positive there is nothing to redistribute;
        // leave as-is rather than divide by zero.
    }

    let mut last_positive: Option<usize> = if p[0] > 0.0 { Some(0) } else { None };
    let mut i = 1;
    while i < k {
        if p[i] <= 0.0 {
            if let Some(lp) = last_positive {
                let remaining = k - i + 1;
                let share = p[lp] / remaining as f64;
                for slot in p.iter_mut().skip(lp) {
                    *slot = share;
                }
                break;
            }
        } else {
            last_positive = Some(i);
        }
        i += 1;
    }

    p
}
