//! Histogram bin construction (Sturges' rule) and post-pass-2 merging to
//! satisfy the chi-square test's "expected count >= 5" assumption.

/// Bin boundaries and observed counts for the pass-2 histogram.
#[derive(Debug, Clone)]
pub struct IntervalModel {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub counter: Vec<u64>,
}

impl IntervalModel {
    /// Bin count by Sturges' rule: `k = round(1 + 3.32 * log10(count))`,
    /// clamped to at least 1.
    pub fn sturges_k(count: u64) -> usize {
        if count == 0 {
            return 1;
        }
        let k = 1.0 + 3.32 * (count as f64).log10();
        (k.round() as i64).max(1) as usize
    }

    /// Builds `k` equal-width bins spanning `[min, max]`. The span is
    /// normalized by `|max|` before dividing to keep precision when `|max|`
    /// is large, then boundaries are scaled back.
    pub fn build(min: f64, max: f64, count: u64) -> Self {
        let k = Self::sturges_k(count);
        let scale = max.abs();
        let (norm_min, norm_max) = if scale > 0.0 {
            (min / scale, max / scale)
        } else {
            (min, max)
        };
        let norm_size = (norm_max - norm_min) / k as f64;

        let mut lower = Vec::with_capacity(k);
        let mut upper = Vec::with_capacity(k);
        for i in 0..k {
            let lo = if i == 0 {
                min
            } else {
                (norm_min + norm_size * i as f64) * if scale > 0.0 { scale } else { 1.0 }
            };
            let hi = if i == k - 1 {
                max
            } else {
                (norm_min + norm_size * (i + 1) as f64) * if scale > 0.0 { scale } else { 1.0 }
            };
            lower.push(lo);
            upper.push(hi);
        }

        IntervalModel {
            lower,
            upper,
            counter: vec![0; k],
        }
    }

    /// Bin width in original units (constant across bins by construction).
    pub fn bin_size(&self) -> f64 {
        if self.lower.is_empty() {
            0.0
        } else {
            self.upper[0] - self.lower[0]
        }
    }

    /// `idx = floor((x - min) / size)`, clamped to `k - 1` so a value
    /// exactly equal to `max` lands in the last bin.
    pub fn bin_index(&self, x: f64, min: f64, size: f64) -> usize {
        let k = self.counter.len();
        if size <= 0.0 || k == 0 {
            return 0;
        }
        let idx = ((x - min) / size).floor();
        if idx < 0.0 {
            0
        } else if idx as usize >= k {
            k - 1
        } else {
            idx as usize
        }
    }

    pub fn add_delta(&mut self, delta: &[u64]) {
        for (c, d) in self.counter.iter_mut().zip(delta.iter()) {
            *c += d;
        }
    }

    pub fn total_count(&self) -> u64 {
        self.counter.iter().sum()
    }

    /// Walks bins left-to-right, absorbing successive right neighbours into
    /// any bin whose count is below 5 until the running count reaches 5,
    /// then continues past the absorbed run. A trailing run that never
    /// reaches 5 is folded into the previously emitted bin. If the dataset
    /// has fewer than 5 valid values total, the result collapses to a
    /// single bin spanning the whole range.
    pub fn merge(&self) -> IntervalModel {
        let total = self.total_count();
        if total < 5 {
            let lo = *self.lower.first().unwrap_or(&0.0);
            let hi = *self.upper.last().unwrap_or(&0.0);
            return IntervalModel {
                lower: vec![lo],
                upper: vec![hi],
                counter: vec![total],
            };
        }

        let k = self.counter.len();
        let mut merged_lower = Vec::new();
        let mut merged_upper = Vec::new();
        let mut merged_counter = Vec::new();

        let mut i = 0;
        while i < k {
            let run_lower = self.lower[i];
            let mut running = self.counter[i];
            let mut run_upper = self.upper[i];
            let mut j = i;
            while running < 5 && j + 1 < k {
                j += 1;
                running += self.counter[j];
                run_upper = self.upper[j];
            }
            merged_lower.push(run_lower);
            merged_upper.push(run_upper);
            merged_counter.push(running);
            i = j + 1;
        }

        // Trailing run still short: fold into the previously emitted bin.
        if merged_counter.len() > 1 {
            let last = merged_counter.len() - 1;
            if merged_counter[last] < 5 {
                merged_counter[last - 1] += merged_counter[last];
                merged_upper[last - 1] = merged_upper[last];
                merged_lower.pop();
                merged_upper.pop();
                merged_counter.pop();
            }
        }

        IntervalModel {
            lower: merged_lower,
            upper: merged_upper,
            counter: merged_counter,
        }
    }
}
