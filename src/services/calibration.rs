//! Pure statistical helpers over confusion-matrix counts.
//!
//! Consumed by the gatekeeper's calibration gates. All functions return
//! 0.0 when a denominator degenerates to zero.

use crate::domain::models::BenchmarkReport;

/// Confusion-matrix counts from replaying automation against a
/// reference corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    /// True positives.
    pub tp: u64,
    /// False positives.
    pub fp: u64,
    /// True negatives.
    pub tn: u64,
    /// False negatives.
    pub fn_: u64,
}

impl ConfusionMatrix {
    /// Builds a matrix from raw counts.
    pub fn new(tp: u64, fp: u64, tn: u64, fn_: u64) -> Self {
        Self { tp, fp, tn, fn_ }
    }

    /// Extracts counts from an external benchmark report.
    pub fn from_report(report: &BenchmarkReport) -> Self {
        Self {
            tp: report.true_positives,
            fp: report.false_positives,
            tn: report.true_negatives,
            fn_: report.false_negatives,
        }
    }

    /// Total observation count.
    pub fn total(&self) -> u64 {
        self.tp + self.fp + self.tn + self.fn_
    }
}

/// TP / (TP + FP).
pub fn precision(m: &ConfusionMatrix) -> f64 {
    ratio(m.tp, m.tp + m.fp)
}

/// TP / (TP + FN).
pub fn recall(m: &ConfusionMatrix) -> f64 {
    ratio(m.tp, m.tp + m.fn_)
}

/// Harmonic mean of precision and recall.
pub fn f1_score(m: &ConfusionMatrix) -> f64 {
    let p = precision(m);
    let r = recall(m);
    if p + r == 0.0 {
        return 0.0;
    }
    2.0 * p * r / (p + r)
}

/// (TP + TN) / total.
pub fn accuracy(m: &ConfusionMatrix) -> f64 {
    ratio(m.tp + m.tn, m.total())
}

/// Matthews correlation coefficient in [-1, 1]; 0.0 when any marginal
/// is empty.
pub fn matthews_correlation(m: &ConfusionMatrix) -> f64 {
    let tp = m.tp as f64;
    let fp = m.fp as f64;
    let tn = m.tn as f64;
    let fn_ = m.fn_ as f64;

    let denominator = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();
    if denominator == 0.0 {
        return 0.0;
    }
    (tp * tn - fp * fn_) / denominator
}

/// Rescales an MCC from [-1, 1] into [0, 1] so it is comparable with
/// the other gate thresholds.
pub fn rescale_mcc(mcc: f64) -> f64 {
    (mcc + 1.0) / 2.0
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
