//! Robust statistics for stabilizing per-frame volume samples.

use serde::Deserialize;

/// Robust aggregate used to turn noisy samples into one stabilized volume.
///
/// All variants work on a sorted copy of the finite samples, so the result depends
/// only on the multiset of values and recomputing it is idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregationStatistic {
    #[default]
    Median,
    /// Mean after dropping `trim` of the samples from each end.
    TrimmedMean { trim: f64 },
    /// Mean of the samples within `k` scaled MADs of the median.
    MadFilteredMean { k: f64 },
}

/// Consistency constant making MAD comparable to a standard deviation.
const MAD_SCALE: f64 = 1.4826;

impl AggregationStatistic {
    /// Stabilized value, or `None` when there is no finite sample.
    pub fn stabilize(&self, samples: &[f64]) -> Option<f64> {
        let sorted = sorted_finite(samples);
        if sorted.is_empty() {
            return None;
        }
        let value = match *self {
            AggregationStatistic::Median => median_sorted(&sorted),
            AggregationStatistic::TrimmedMean { trim } => {
                let trim = if trim.is_finite() { trim.clamp(0.0, 0.49) } else { 0.0 };
                let cut = (sorted.len() as f64 * trim).floor() as usize;
                let kept = &sorted[cut..sorted.len() - cut];
                mean(kept)
            }
            AggregationStatistic::MadFilteredMean { k } => {
                let med = median_sorted(&sorted);
                let mut deviations: Vec<f64> = sorted.iter().map(|v| (v - med).abs()).collect();
                deviations.sort_by(f64::total_cmp);
                let limit = k.max(0.0) * MAD_SCALE * median_sorted(&deviations);
                let kept: Vec<f64> = sorted
                    .iter()
                    .copied()
                    .filter(|v| (v - med).abs() <= limit)
                    .collect();
                if kept.is_empty() { med } else { mean(&kept) }
            }
        };
        Some(value)
    }
}

fn sorted_finite(samples: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn median_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Linear-interpolated percentile (`p` in [0, 1]) of an ascending slice.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let p = p.clamp(0.0, 1.0);
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}
