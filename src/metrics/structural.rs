//! Cluster-structural metrics: homogeneity, completeness, V-measure,
//! Rand index and Adjusted Rand Index.

use std::collections::HashMap;

use crate::core::label_algebra::{n_choose_2, Label};

fn entropy(counts: &HashMap<Label, u64>, n: u64) -> f64 {
    if n == 0 {
        return 0.0;
    }
    counts
        .values()
        .map(|&c| {
            if c == 0 {
                0.0
            } else {
                let p = c as f64 / n as f64;
                -p * p.ln()
            }
        })
        .sum()
}

fn conditional_entropy(joint: &HashMap<(Label, Label), u64>, given_counts: &HashMap<Label, u64>, n: u64) -> f64 {
    if n == 0 {
        return 0.0;
    }
    joint
        .iter()
        .map(|(&(_, given), &c)| {
            if c == 0 {
                0.0
            } else {
                let given_total = given_counts[&given];
                -(c as f64 / n as f64) * ((c as f64) / (given_total as f64)).ln()
            }
        })
        .sum()
}

/// Homogeneity, completeness, and their harmonic mean (V-measure, `beta=1`),
/// each scaled to a `[0, 100]` percentage. A clustering with only one class
/// or one cluster is trivially homogeneous/complete (defined as `100.0`),
/// matching the convention that there's nothing left to get wrong.
pub struct HomogeneityCompleteness {
    pub homogeneity: f64,
    pub completeness: f64,
    pub v_measure: f64,
}

pub fn homogeneity_completeness_v_measure(pred_labels: &[Label], true_labels: &[Label]) -> HomogeneityCompleteness {
    assert_eq!(pred_labels.len(), true_labels.len());
    let n = pred_labels.len() as u64;

    let mut pred_counts: HashMap<Label, u64> = HashMap::new();
    let mut true_counts: HashMap<Label, u64> = HashMap::new();
    let mut joint_counts: HashMap<(Label, Label), u64> = HashMap::new();

    for (&p, &t) in pred_labels.iter().zip(true_labels.iter()) {
        *pred_counts.entry(p).or_insert(0) += 1;
        *true_counts.entry(t).or_insert(0) += 1;
        *joint_counts.entry((p, t)).or_insert(0) += 1;
    }

    let h_true = entropy(&true_counts, n);
    let h_pred = entropy(&pred_counts, n);

    // H(true | pred): condition on the predicted label.
    let h_true_given_pred = conditional_entropy(&joint_counts, &pred_counts, n);
    // H(pred | true): condition on the true label; same joint table, swapped key order.
    let swapped: HashMap<(Label, Label), u64> = joint_counts.iter().map(|(&(p, t), &c)| ((t, p), c)).collect();
    let h_pred_given_true = conditional_entropy(&swapped, &true_counts, n);

    let homogeneity = if h_true == 0.0 { 1.0 } else { 1.0 - h_true_given_pred / h_true };
    let completeness = if h_pred == 0.0 { 1.0 } else { 1.0 - h_pred_given_true / h_pred };

    let v_measure = if homogeneity + completeness == 0.0 {
        0.0
    } else {
        2.0 * homogeneity * completeness / (homogeneity + completeness)
    };

    HomogeneityCompleteness {
        homogeneity: 100.0 * homogeneity,
        completeness: 100.0 * completeness,
        v_measure: 100.0 * v_measure,
    }
}

/// Adjusted Rand Index, scaled to `[−100, 100]`.
///
/// # Panics
/// If either label vector contains `-1` -- noise must be dropped or
/// relabeled by the caller before computing ARI, since it isn't a cluster.
pub fn adjusted_rand_index(pred_labels: &[Label], true_labels: &[Label]) -> f64 {
    assert_eq!(pred_labels.len(), true_labels.len());
    assert!(!pred_labels.contains(&-1), "ARI input must not contain noise (-1); drop or relabel first");
    assert!(!true_labels.contains(&-1), "ARI input must not contain noise (-1); drop or relabel first");

    let n = pred_labels.len() as u64;
    if n == 0 {
        return 100.0;
    }

    let mut pred_counts: HashMap<Label, u64> = HashMap::new();
    let mut true_counts: HashMap<Label, u64> = HashMap::new();
    let mut joint_counts: HashMap<(Label, Label), u64> = HashMap::new();

    for (&p, &t) in pred_labels.iter().zip(true_labels.iter()) {
        *pred_counts.entry(p).or_insert(0) += 1;
        *true_counts.entry(t).or_insert(0) += 1;
        *joint_counts.entry((p, t)).or_insert(0) += 1;
    }

    let sum_comb_joint: f64 = joint_counts.values().map(|&c| n_choose_2(c) as f64).sum();
    let sum_comb_pred: f64 = pred_counts.values().map(|&c| n_choose_2(c) as f64).sum();
    let sum_comb_true: f64 = true_counts.values().map(|&c| n_choose_2(c) as f64).sum();
    let total_comb = n_choose_2(n) as f64;

    if total_comb == 0.0 {
        return 100.0;
    }

    let expected_index = sum_comb_pred * sum_comb_true / total_comb;
    let max_index = 0.5 * (sum_comb_pred + sum_comb_true);

    let denom = max_index - expected_index;
    let ari = if denom == 0.0 {
        // Perfect agreement or both trivial (every point its own cluster
        // in both labelings) -- defined as perfect agreement.
        1.0
    } else {
        (sum_comb_joint - expected_index) / denom
    };

    100.0 * ari
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn identical_labelings_score_100_on_every_structural_metric() {
        let labels = vec![0, 0, 1, 1, 2];
        let hcv = homogeneity_completeness_v_measure(&labels, &labels);
        assert!(approx_eq!(f64, hcv.homogeneity, 100.0, epsilon = 1e-6));
        assert!(approx_eq!(f64, hcv.completeness, 100.0, epsilon = 1e-6));
        assert!(approx_eq!(f64, hcv.v_measure, 100.0, epsilon = 1e-6));
        assert!(approx_eq!(f64, adjusted_rand_index(&labels, &labels), 100.0, epsilon = 1e-6));
    }

    #[test]
    fn all_in_one_cluster_vs_all_distinct_is_homogeneous_but_not_complete() {
        let pred = vec![0, 0, 0, 0];
        let truth = vec![0, 1, 2, 3];
        let hcv = homogeneity_completeness_v_measure(&pred, &truth);
        // Every cluster (just one) contains a mix of classes -> not homogeneous.
        assert!(hcv.homogeneity < 100.0);
        // But every class is fully contained within the one cluster -> complete.
        assert!(approx_eq!(f64, hcv.completeness, 100.0, epsilon = 1e-6));
    }

    #[test]
    fn ari_of_random_like_split_is_below_identical_labeling() {
        let pred = vec![0, 1, 0, 1, 0, 1];
        let truth = vec![0, 0, 1, 1, 2, 2];
        let ari = adjusted_rand_index(&pred, &truth);
        assert!(ari < 100.0);
    }

    #[test]
    #[should_panic(expected = "noise")]
    fn ari_rejects_noise_labels() {
        adjusted_rand_index(&[0, -1], &[0, 0]);
    }
}
