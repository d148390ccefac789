//! Assembles a [`DedupReport`] from predicted/true label vectors (and,
//! optionally, blocking stats) in a single pass.

use serde::Serialize;

use crate::blocking::PipelineStats;
use crate::core::label_algebra::Label;
use crate::metrics::blocking::blocking_efficiency;
use crate::metrics::confusion::confusion_matrix;
use crate::metrics::structural::{adjusted_rand_index, homogeneity_completeness_v_measure};

/// The report's full key set, in the order it's assembled. `fn_` serializes
/// as `FN` since `fn` is a reserved word.
#[derive(Debug, Clone, Serialize)]
pub struct DedupReport {
    #[serde(rename = "AdjustedRandomIndex")]
    pub adjusted_rand_index: f64,
    #[serde(rename = "Precision")]
    pub precision: f64,
    #[serde(rename = "Recall")]
    pub recall: f64,
    #[serde(rename = "F1-measure")]
    pub f1_measure: f64,
    #[serde(rename = "Completeness")]
    pub completeness: f64,
    #[serde(rename = "Homogeneity")]
    pub homogeneity: f64,
    #[serde(rename = "V-measure")]
    pub v_measure: f64,
    #[serde(rename = "RandIndex")]
    pub rand_index: f64,
    #[serde(rename = "TP")]
    pub tp: u64,
    #[serde(rename = "FP")]
    pub fp: u64,
    #[serde(rename = "FN")]
    pub fn_: u64,
    #[serde(rename = "TN")]
    pub tn: u64,
    #[serde(rename = "NumPredictedPairs")]
    pub num_predicted_pairs: u64,
    #[serde(rename = "NumTruePairs")]
    pub num_true_pairs: u64,
    #[serde(rename = "NumPredictedNonSingletonClusters")]
    pub num_predicted_non_singleton_clusters: usize,
    #[serde(rename = "NumTrueNonSingletonClusters")]
    pub num_true_non_singleton_clusters: usize,
    #[serde(flatten)]
    pub blocking: Option<BlockingReportFields>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockingReportFields {
    #[serde(rename = "BlockingReductionRatio")]
    pub reduction_ratio: f64,
    #[serde(rename = "BlockingComparisonEfficiency")]
    pub comparison_efficiency: f64,
    #[serde(rename = "BlockingOperationsBeforeBlocking")]
    pub operations_before_blocking: u64,
    #[serde(rename = "BlockingOperationsAfterBlocking")]
    pub operations_after_blocking: u64,
}

/// Counts clusters with two or more members (`-1`/noise never counts).
fn non_singleton_cluster_count(labels: &[Label]) -> usize {
    use std::collections::HashMap;
    let mut counts: HashMap<Label, usize> = HashMap::new();
    for &l in labels {
        if l >= 0 {
            *counts.entry(l).or_insert(0) += 1;
        }
    }
    counts.values().filter(|&&c| c >= 2).count()
}

/// Gives every noise point (`-1`) its own fresh label so it can be fed to
/// ARI, which has no notion of noise -- only clusters.
fn relabel_noise_as_singletons(labels: &[Label]) -> Vec<Label> {
    let mut next = labels.iter().cloned().filter(|&l| l >= 0).max().map_or(0, |m| m + 1);
    labels
        .iter()
        .map(|&l| {
            if l < 0 {
                let fresh = next;
                next += 1;
                fresh
            } else {
                l
            }
        })
        .collect()
}

/// Builds the full report in one pass. `block_labels` is accepted as a
/// distinct parameter from `pred_labels` per the spec's key set (blocking
/// metrics are computed from the pre-scoring block assignment, not the
/// final clustering) but, for this engine, blocking metrics only ever need
/// `block_stats` -- `block_labels` is reserved for future per-block report
/// breakdowns and is currently unused beyond presence-checking.
pub fn build_report(
    pred_labels: &[Label],
    true_labels: &[Label],
    block_labels: Option<&[Label]>,
    block_stats: Option<&PipelineStats>,
) -> DedupReport {
    let cm = confusion_matrix(pred_labels, true_labels);
    let hcv = homogeneity_completeness_v_measure(pred_labels, true_labels);

    let pred_for_ari = relabel_noise_as_singletons(pred_labels);
    let true_for_ari = relabel_noise_as_singletons(true_labels);
    let ari = adjusted_rand_index(&pred_for_ari, &true_for_ari);

    let blocking = match (block_labels, block_stats) {
        (Some(_), Some(stats)) => {
            let eff = blocking_efficiency(stats);
            Some(BlockingReportFields {
                reduction_ratio: eff.reduction_ratio,
                comparison_efficiency: eff.comparison_efficiency,
                operations_before_blocking: stats.operations_before_blocking,
                operations_after_blocking: stats.operations_after_blocking,
            })
        }
        _ => None,
    };

    log::info!(
        "report assembled: precision={:.2} recall={:.2} f1={:.2} ari={:.2}",
        cm.precision(),
        cm.recall(),
        cm.f1(),
        ari
    );

    DedupReport {
        adjusted_rand_index: ari,
        precision: cm.precision(),
        recall: cm.recall(),
        f1_measure: cm.f1(),
        completeness: hcv.completeness,
        homogeneity: hcv.homogeneity,
        v_measure: hcv.v_measure,
        rand_index: cm.rand_index(),
        tp: cm.tp,
        fp: cm.fp,
        fn_: cm.fn_,
        tn: cm.tn,
        num_predicted_pairs: cm.p,
        num_true_pairs: cm.t,
        num_predicted_non_singleton_clusters: non_singleton_cluster_count(pred_labels),
        num_true_non_singleton_clusters: non_singleton_cluster_count(true_labels),
        blocking,
    }
}
