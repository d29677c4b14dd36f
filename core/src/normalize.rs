//! Batch-relative normalization.
//!
//! Both strategies are pure functions over the full batch of cells from a
//! single run. Normalization is never per-subset — the scales are defined
//! only relative to the whole batch, so every value must be in hand before
//! any one cell's normalized value exists.

/// Scale factor that makes the modified z-score comparable to a standard
/// z-score for normally distributed data.
const MAD_CONSISTENCY_FACTOR: f64 = 0.6745;

/// Min-max rescale onto [0, 1]. A degenerate batch (all values equal) maps
/// every element to 0.5 rather than 0, so an all-equal run is not read as
/// uniformly low risk. Feeds the composite scorer.
pub fn min_max(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range == 0.0 {
        return vec![0.5; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}

/// Modified z-score: 0.6745 × (x − median) / MAD, robust to the outliers it
/// exists to find. A zero MAD maps every element to 0. Feeds the anomaly
/// detector.
pub fn modified_z_scores(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let med = median(values);
    let deviations: Vec<f64> = values.iter().map(|v| (v - med).abs()).collect();
    let mad = median(&deviations);
    if mad == 0.0 {
        return vec![0.0; values.len()];
    }
    values
        .iter()
        .map(|v| MAD_CONSISTENCY_FACTOR * (v - med) / mad)
        .collect()
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
