// ============================================================
// Layer 5 - Threshold Search
// ============================================================
// The classifier outputs P(positive) per pair; turning that into
// a 0/1 label needs a cut-off. We scan a fixed grid
//
//   t_i = i / steps,  i = 0..=steps
//
// label each pair `p > t_i`, score F1 against the truth, and keep
// the first threshold reaching the best F1. Pearson correlation
// between probability and label is reported alongside.
//
// F1 = 2·TP / (2·TP + FP + FN), taken as 0 when nothing is
// predicted and nothing is positive.

use crate::domain::error::DataError;

pub const DEFAULT_GRID_STEPS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdSearch {
    /// Pearson r between y_pred and y_true (NaN if either is constant)
    pub correlation: f64,
    pub best_f1:     f64,
    pub threshold:   f64,
}

/// `y_true` is positive where it equals 1.
pub fn search_threshold(y_pred: &[f32], y_true: &[i64], steps: usize) -> Result<ThresholdSearch, DataError> {
    if y_pred.len() != y_true.len() {
        return Err(DataError::ShapeMismatch {
            what:  "predictions vs labels",
            left:  y_pred.len(),
            right: y_true.len(),
        });
    }

    let mut best_f1   = f64::NEG_INFINITY;
    let mut threshold = 0.0;
    for t in threshold_grid(steps) {
        let f1 = f1_at(y_pred, y_true, t);
        // strict: ties keep the lower threshold
        if f1 > best_f1 {
            best_f1   = f1;
            threshold = t;
        }
    }

    Ok(ThresholdSearch {
        correlation: pearson(y_pred, y_true),
        best_f1,
        threshold,
    })
}

/// `steps + 1` evenly spaced points covering [0, 1] exactly.
pub fn threshold_grid(steps: usize) -> Vec<f64> {
    if steps == 0 {
        return vec![0.0];
    }
    let delta = 1.0 / steps as f64;
    (0..=steps)
        .map(|i| if i == steps { 1.0 } else { i as f64 * delta })
        .collect()
}

/// F1 of the positive class for `y_pred > threshold`.
pub fn f1_at(y_pred: &[f32], y_true: &[i64], threshold: f64) -> f64 {
    let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
    for (&p, &y) in y_pred.iter().zip(y_true) {
        let predicted = f64::from(p) > threshold;
        let actual    = y == 1;
        match (predicted, actual) {
            (true, true)   => tp += 1,
            (true, false)  => fp += 1,
            (false, true)  => fn_ += 1,
            (false, false) => {}
        }
    }
    let denom = 2 * tp + fp + fn_;
    if denom == 0 {
        0.0
    } else {
        (2 * tp) as f64 / denom as f64
    }
}

pub fn pearson(y_pred: &[f32], y_true: &[i64]) -> f64 {
    let n = y_pred.len() as f64;
    if y_pred.is_empty() {
        return f64::NAN;
    }
    let mean_p = y_pred.iter().map(|&p| f64::from(p)).sum::<f64>() / n;
    let mean_t = y_true.iter().map(|&t| t as f64).sum::<f64>() / n;

    let (mut cov, mut var_p, mut var_t) = (0.0, 0.0, 0.0);
    for (&p, &t) in y_pred.iter().zip(y_true) {
        let dp = f64::from(p) - mean_p;
        let dt = t as f64 - mean_t;
        cov   += dp * dt;
        var_p += dp * dp;
        var_t += dt * dt;
    }
    if var_p == 0.0 || var_t == 0.0 {
        return f64::NAN;
    }
    cov / (var_p.sqrt() * var_t.sqrt())
}
