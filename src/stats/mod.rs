//! Streaming dataset statistics: min/max/validity (pass 1) and Welford
//! mean/variance (pass 2), plus the sign/integrality flags that drive
//! distribution gating.

/// Mutable aggregate built across both passes. Pass 1 establishes
/// `min`/`max`/`count`/`has_negative`/`has_non_integer`; pass 2 runs the
/// Welford recurrence over the same valid values to get `mean`/`variance`.
#[derive(Debug, Clone)]
pub struct DatasetStats {
    pub min: f64,
    pub max: f64,
    pub count: u64,
    pub has_negative: bool,
    pub has_non_integer: bool,
    mean: f64,
    m2: f64,
    welford_n: u64,
    /// `|max|` from pass 1, used to normalize values before the Welford
    /// update when magnitudes are large; `None` until pass 1 completes.
    normalization_factor: Option<f64>,
}

impl Default for DatasetStats {
    fn default() -> Self {
        DatasetStats {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            count: 0,
            has_negative: false,
            has_non_integer: false,
            mean: 0.0,
            m2: 0.0,
            welford_n: 0,
            normalization_factor: None,
        }
    }
}

impl DatasetStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one pass-1 partial reduction (from a single worker/batch) in.
    pub fn merge_pass1(&mut self, min: f64, max: f64, count: u64, has_negative: bool, has_non_integer: bool) {
        if count == 0 {
            return;
        }
        self.min = self.min.min(min);
        self.max = self.max.max(max);
        self.count += count;
        self.has_negative |= has_negative;
        self.has_non_integer |= has_non_integer;
    }

    /// Call once pass 1 is finished and before any pass-2 Welford update:
    /// fixes the normalization factor used to keep the running mean/M2
    /// well-conditioned when `|max|` is large.
    pub fn finalize_pass1(&mut self) {
        let factor = self.max.abs();
        self.normalization_factor = Some(if factor > 0.0 { factor } else { 1.0 });
    }

    /// Single-value Welford update, executed value-at-a-time in stream
    /// order on the driver thread (see concurrency notes: this recurrence
    /// is intentionally not parallelized).
    pub fn update_welford(&mut self, x: f64) {
        let factor = self
            .normalization_factor
            .expect("finalize_pass1 must run before update_welford");
        let xn = x / factor;
        self.welford_n += 1;
        let delta = xn - self.mean;
        self.mean += delta / self.welford_n as f64;
        let delta2 = xn - self.mean;
        self.m2 += delta * delta2;
    }

    /// Merges another `DatasetStats`'s Welford state into this one using
    /// the parallel (Chan et al.) combine formula. Both must share the
    /// same `normalization_factor`; used when the farmer runs the
    /// optional parallel Welford combine instead of the scalar recurrence.
    pub fn merge_welford(&mut self, other: &DatasetStats) {
        if other.welford_n == 0 {
            return;
        }
        if self.welford_n == 0 {
            self.mean = other.mean;
            self.m2 = other.m2;
            self.welford_n = other.welford_n;
            return;
        }
        let na = self.welford_n as f64;
        let nb = other.welford_n as f64;
        let delta = other.mean - self.mean;
        let total = na + nb;
        self.mean += delta * nb / total;
        self.m2 += other.m2 + delta * delta * na * nb / total;
        self.welford_n += other.welford_n;
    }

    /// Final mean, de-normalized back to the original scale.
    pub fn mean(&self) -> f64 {
        self.mean * self.normalization_factor.unwrap_or(1.0)
    }

    /// Final population variance, de-normalized back to the original scale.
    pub fn variance(&self) -> f64 {
        if self.welford_n == 0 {
            return 0.0;
        }
        let factor = self.normalization_factor.unwrap_or(1.0);
        (self.m2 / self.welford_n as f64) * factor * factor
    }

    /// Final population standard deviation.
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats_over(values: &[f64]) -> DatasetStats {
        let mut s = DatasetStats::new();
        for &v in values {
            let neg = v < 0.0;
            let nonint = v - v.floor() != 0.0;
            s.merge_pass1(v, v, 1, neg, nonint);
        }
        s.finalize_pass1();
        for &v in values {
            s.update_welford(v);
        }
        s
    }

    #[test]
    fn mean_and_variance_match_textbook_formula() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let s = stats_over(&values);
        assert!((s.mean() - 5.0).abs() < 1e-9);
        assert!((s.variance() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn batch_boundary_independence() {
        let values: Vec<f64> = (1..=1000).map(|i| i as f64 * 0.37).collect();

        let mut single = DatasetStats::new();
        for &v in &values {
            single.merge_pass1(v, v, 1, v < 0.0, v - v.floor() != 0.0);
        }
        single.finalize_pass1();
        for &v in &values {
            single.update_welford(v);
        }

        let mut chunked = DatasetStats::new();
        for &v in &values {
            chunked.merge_pass1(v, v, 1, v < 0.0, v - v.floor() != 0.0);
        }
        chunked.finalize_pass1();
        for chunk in values.chunks(37) {
            for &v in chunk {
                chunked.update_welford(v);
            }
        }

        assert!((single.mean() - chunked.mean()).abs() < 1e-9);
        assert!((single.variance() - chunked.variance()).abs() < 1e-9);
    }

    #[test]
    fn degenerate_single_value_has_zero_variance() {
        let s = stats_over(&[42.0, 42.0, 42.0]);
        assert_eq!(s.variance(), 0.0);
        assert_eq!(s.std_dev(), 0.0);
    }

    #[test]
    fn flags_are_monotonic_or() {
        let s = stats_over(&[1.0, -2.0, 3.5]);
        assert!(s.has_negative);
        assert!(s.has_non_integer);
    }

    #[test]
    fn merge_welford_matches_single_pass() {
        let values: Vec<f64> = (1..=500).map(|i| i as f64).collect();
        let single = stats_over(&values);

        let mut a = DatasetStats::new();
        let mut b = DatasetStats::new();
        for &v in &values {
            a.merge_pass1(v, v, 1, false, false);
            b.merge_pass1(v, v, 1, false, false);
        }
        a.finalize_pass1();
        b.finalize_pass1();
        for &v in &values[..250] {
            a.update_welford(v);
        }
        for &v in &values[250..] {
            b.update_welford(v);
        }
        a.merge_welford(&b);
        assert!((a.mean() - single.mean()).abs() < 1e-6);
        assert!((a.variance() - single.variance()).abs() < 1e-6);
    }
}
