//! Pure, stateless probability math: CDFs and interval probabilities for the
//! four candidate distributions, plus the gating enums that decide which of
//! them are evaluated against a given dataset.

mod normal_table;

pub use normal_table::standard_normal_cdf;

/// One of the four candidate distributions the pipeline evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DistributionKind {
    Uniform,
    Normal,
    Exponential,
    Poisson,
}

impl DistributionKind {
    pub const ALL: [DistributionKind; 4] = [
        DistributionKind::Uniform,
        DistributionKind::Normal,
        DistributionKind::Exponential,
        DistributionKind::Poisson,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DistributionKind::Uniform => "UNIFORM",
            DistributionKind::Normal => "NORMAL",
            DistributionKind::Exponential => "EXPONENTIAL",
            DistributionKind::Poisson => "POISSON",
        }
    }
}

impl std::fmt::Display for DistributionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Gating tag derived from a dataset's sign/integrality, restricting which
/// distributions are allowed to participate in the chi-square pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionClass {
    /// Only non-negative integers were observed: all four apply.
    PositiveInteger,
    /// Non-negative, but at least one non-integer: uniform/normal/exponential.
    PositiveDecimal,
    /// At least one negative value: uniform/normal only.
    Negative,
}

impl DistributionClass {
    /// Selects the gating enum from `(has_negative, has_non_integer)`.
    pub fn classify(has_negative: bool, has_non_integer: bool) -> Self {
        if has_negative {
            DistributionClass::Negative
        } else if has_non_integer {
            DistributionClass::PositiveDecimal
        } else {
            DistributionClass::PositiveInteger
        }
    }

    /// The distributions permitted to participate under this class, in the
    /// fixed canonical order used throughout reporting.
    pub fn participants(self) -> &'static [DistributionKind] {
        match self {
            DistributionClass::PositiveInteger => &[
                DistributionKind::Uniform,
                DistributionKind::Normal,
                DistributionKind::Exponential,
                DistributionKind::Poisson,
            ],
            DistributionClass::PositiveDecimal => &[
                DistributionKind::Uniform,
                DistributionKind::Normal,
                DistributionKind::Exponential,
            ],
            DistributionClass::Negative => {
                &[DistributionKind::Uniform, DistributionKind::Normal]
            }
        }
    }
}

/// Uniform CDF `F(x) = (x - a) / (b - a)`, normalized by `|max|` to keep the
/// division well-conditioned when `|b|` is large.
pub fn uniform_cdf(x: f64, min: f64, max: f64) -> f64 {
    let scale = max.abs();
    if scale == 0.0 {
        // min == max == 0: every value is 0, CDF is a point mass at 0.
        return 1.0;
    }
    let a = min / scale;
    let b = max / scale;
    let xs = x / scale;
    if (b - a).abs() < f64::EPSILON {
        return 1.0;
    }
    (xs - a) / (b - a)
}

/// Exponential CDF `F(x) = 1 - exp(-x / lambda)`. Caller guards `lambda > 0`
/// via the `Positive*` gating; `lambda <= 0` is not dispatched here.
pub fn exponential_cdf(x: f64, lambda: f64) -> f64 {
    debug_assert!(lambda > 0.0, "exponential_cdf requires mean > 0");
    if x <= 0.0 {
        return 0.0;
    }
    1.0 - (-x / lambda).exp()
}

/// Normal CDF via standardization and the cached `Phi` table.
pub fn normal_cdf(x: f64, mean: f64, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        // Degenerate distribution: every mass sits at `mean`.
        return if x < mean { 0.0 } else { 1.0 };
    }
    let u = (x - mean) / std_dev;
    let phi_abs = standard_normal_cdf(u.abs());
    if u < 0.0 {
        1.0 - phi_abs
    } else {
        phi_abs
    }
}

/// `ln(k!)` via Ramanujan's approximation, used once `k` is large enough
/// that `lambda^k / k!` would overflow a direct evaluation.
fn ln_factorial_ramanujan(k: u64) -> f64 {
    if k <= 1 {
        return 0.0;
    }
    let kf = k as f64;
    kf * kf.ln() - kf
        + (1.0 / 6.0) * (kf * (1.0 + 4.0 * kf * (1.0 + 2.0 * kf))).ln()
        + 0.5 * std::f64::consts::PI.ln()
}

/// `P(X = k)` for `X ~ Poisson(lambda)`, switching to the log-space
/// Ramanujan approximation for `k > 20` to avoid overflow in `lambda^k`.
pub fn poisson_pmf(k: u64, lambda: f64) -> f64 {
    debug_assert!(lambda > 0.0, "poisson_pmf requires lambda > 0");
    if k <= 20 {
        let direct = (-lambda).exp() * lambda.powi(k as i32) / factorial(k);
        if direct.is_finite() {
            return direct;
        }
    }
    let log_p = (k as f64) * lambda.ln() - lambda - ln_factorial_ramanujan(k);
    log_p.exp()
}

fn factorial(k: u64) -> f64 {
    (1..=k).fold(1.0_f64, |acc, i| acc * i as f64)
}

/// `P(lo <= X <= hi)` for `X ~ Poisson(lambda)`, summing the PMF term by
/// term. `lo > hi` is a legitimate empty-interval call and returns 0.
pub fn poisson_interval_probability(lo: u64, hi: u64, lambda: f64) -> f64 {
    if lo > hi {
        return 0.0;
    }
    (lo..=hi).map(|k| poisson_pmf(k, lambda)).sum()
}
