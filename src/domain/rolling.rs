//! Rolling and whole-sample statistics.
//!
//! Sample standard deviation over n values:
//! STDDEV[i] = sqrt(sum((x[i-j] - MEAN[i])^2 for j in 0..n) / (n - 1))
//! Warmup: the first (n-1) positions carry no statistics. A window of one value
//! has a standard deviation of zero.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingStats {
    pub mean: f64,
    pub std_dev: f64,
}

/// Statistics for every trailing window of `window` values; `None` during warmup.
pub fn rolling_stats(values: &[f64], window: usize) -> Vec<Option<RollingStats>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    let warmup = window - 1;

    (0..values.len())
        .map(|i| {
            if i < warmup {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            let mean = mean(slice)?;
            Some(RollingStats {
                mean,
                std_dev: sample_std_dev(slice).unwrap_or(0.0),
            })
        })
        .collect()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// `None` for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance = values
        .iter()
        .map(|v| {
            let diff = v - m;
            diff * diff
        })
        .sum::<f64>()
        / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
