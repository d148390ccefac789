//! Pair-confusion matrix and the precision/recall/F1 derived from it.

use std::collections::HashMap;

use crate::core::label_algebra::{n_choose_2, Label};

/// `TP/FP/FN/TN` counted over all `C(N, 2)` record pairs, plus the raw
/// same-predicted (`p`) and same-true (`t`) pair totals the derived metrics
/// are built from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfusionMatrix {
    pub tp: u64,
    pub fp: u64,
    pub fn_: u64,
    pub tn: u64,
    pub p: u64,
    pub t: u64,
}

/// Builds the pair-confusion matrix from two same-length label vectors.
/// Labels are the raw group ids; `-1` (noise) is treated as an ordinary
/// label here -- callers computing ARI must drop or relabel noise first,
/// but the confusion matrix itself has no such restriction.
pub fn confusion_matrix(pred_labels: &[Label], true_labels: &[Label]) -> ConfusionMatrix {
    assert_eq!(pred_labels.len(), true_labels.len(), "label vectors must be the same length");
    let n = pred_labels.len() as u64;

    let mut pred_counts: HashMap<Label, u64> = HashMap::new();
    let mut true_counts: HashMap<Label, u64> = HashMap::new();
    let mut joint_counts: HashMap<(Label, Label), u64> = HashMap::new();

    for (&p, &t) in pred_labels.iter().zip(true_labels.iter()) {
        *pred_counts.entry(p).or_insert(0) += 1;
        *true_counts.entry(t).or_insert(0) += 1;
        *joint_counts.entry((p, t)).or_insert(0) += 1;
    }

    let tp: u64 = joint_counts.values().map(|&c| n_choose_2(c)).sum();
    let p: u64 = pred_counts.values().map(|&c| n_choose_2(c)).sum();
    let t: u64 = true_counts.values().map(|&c| n_choose_2(c)).sum();
    let total = n_choose_2(n);

    let fp = p - tp;
    let fn_ = t - tp;
    let tn = total - p - fn_;

    ConfusionMatrix { tp, fp, fn_, tn, p, t }
}

impl ConfusionMatrix {
    /// `100 * TP / P`. Defined as `100.0` when `P = 0` (no predicted pairs at
    /// all), rather than propagating a `0/0`.
    pub fn precision(&self) -> f64 {
        if self.p == 0 {
            100.0
        } else {
            100.0 * self.tp as f64 / self.p as f64
        }
    }

    /// `100 * TP / T`. Defined as `100.0` when `T = 0`.
    pub fn recall(&self) -> f64 {
        if self.t == 0 {
            100.0
        } else {
            100.0 * self.tp as f64 / self.t as f64
        }
    }

    /// Harmonic mean of precision and recall, with a small epsilon guarding
    /// the degenerate `P = R = 0` case.
    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        const EPS: f64 = 1e-12;
        2.0 * p * r / (p + r + EPS)
    }

    /// `100 * (TP + TN) / Total`.
    pub fn rand_index(&self) -> f64 {
        let total = self.tp + self.fp + self.fn_ + self.tn;
        if total == 0 {
            return 100.0;
        }
        100.0 * (self.tp + self.tn) as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn identical_labelings_give_perfect_scores() {
        let labels = vec![0, 0, 1, 1, 2];
        let cm = confusion_matrix(&labels, &labels);
        assert_eq!(cm.fp, 0);
        assert_eq!(cm.fn_, 0);
        assert!(approx_eq!(f64, cm.precision(), 100.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, cm.recall(), 100.0, epsilon = 1e-9));
    }

    #[test]
    fn all_singletons_predicted_gives_zero_predicted_pairs_and_full_precision() {
        let pred = vec![0, 1, 2, 3];
        let truth = vec![0, 0, 1, 1];
        let cm = confusion_matrix(&pred, &truth);
        assert_eq!(cm.p, 0);
        assert_eq!(cm.precision(), 100.0);
        assert_eq!(cm.recall(), 0.0);
    }

    #[test]
    fn confusion_counts_match_hand_worked_example() {
        // Two true pairs of 2, predicted as one big cluster of 4.
        let pred = vec![0, 0, 0, 0];
        let truth = vec![0, 0, 1, 1];
        let cm = confusion_matrix(&pred, &truth);
        assert_eq!(cm.p, 6); // C(4,2)
        assert_eq!(cm.t, 2); // C(2,2) + C(2,2)
        assert_eq!(cm.tp, 2);
        assert_eq!(cm.fp, 4);
        assert_eq!(cm.fn_, 0);
    }

    #[test]
    fn rand_index_of_identical_labelings_is_100() {
        let labels = vec![0, 0, 1, 2, 2, 2];
        let cm = confusion_matrix(&labels, &labels);
        assert!(approx_eq!(f64, cm.rand_index(), 100.0, epsilon = 1e-9));
    }
}
