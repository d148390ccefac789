//! `DedupEngine` -- wires the blocking pipeline, the work pool, and the
//! metrics engine together into a single `deduplicate()` call.

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::blocking::{Block, BlockingPipeline, PipelineStats};
use crate::clusterer::Clusterer;
use crate::config::DedupConfig;
use crate::core::label_algebra::{canonical_pair, pairs_to_labels, Label, LinkedPair};
use crate::core::record::Record;
use crate::error::DedupResult;
use crate::metrics::{build_report, DedupReport};
use crate::scoring::PairScorer;
use crate::work_pool::{default_num_threads, BlockFailure, BlockWorkPool};

/// A finished run: the emitted clusters (singletons already dropped), the
/// dense global label vector those clusters correspond to (`-1` for any
/// mention that ended up in none of them), the blocking stats, and any
/// blocks that failed and were skipped.
pub struct DedupOutput {
    pub clusters: Vec<(String, Vec<Record>)>,
    pub labels: Vec<Label>,
    pub stats: PipelineStats,
    pub failures: Vec<BlockFailure>,
}

/// The top-level entry point: owns a validated [`DedupConfig`] and drives
/// one `deduplicate()` run against it. The blocking rule memoizes its fit
/// in place, and the splitter/filters are consumed on first use, so a given
/// engine is meant to run once per input batch.
pub struct DedupEngine {
    config: DedupConfig,
}

impl DedupEngine {
    pub fn new(config: DedupConfig) -> Self {
        DedupEngine { config }
    }

    /// Runs the full pipeline once against `records`: block, score + cluster
    /// each block in parallel, then merge any cross-block agreement (two
    /// mentions that landed in the same local cluster in more than one
    /// overlapping block) via union-find over the combined pair set.
    pub fn deduplicate(&mut self, records: &[Record]) -> DedupResult<DedupOutput> {
        let mut pipeline = BlockingPipeline::new();
        if let Some(splitter) = self.config.blocking_splitter.take() {
            pipeline = pipeline.with_splitter(Box::new(splitter));
        }
        for filter in std::mem::take(&mut self.config.blocking_filters) {
            pipeline = pipeline.with_filter(filter);
        }

        let (blocks, stats): (Vec<Block>, PipelineStats) = pipeline.run(records, &mut self.config.blocking_rule)?;

        let num_threads = self.config.num_threads.unwrap_or_else(|| default_num_threads(blocks.len()));
        let work_pool = BlockWorkPool::new(num_threads);
        let scorer = Arc::new(PairScorer::new(
            self.config.comparators.clone(),
            self.config.aggregation_strategy,
            self.config.similarity_threshold,
        ));
        let clusterer = Clusterer::new(self.config.cluster.eps, self.config.cluster.min_samples);

        log::info!("dispatching {} blocks across {} worker threads", blocks.len(), num_threads);
        let (rx, failures) = work_pool.run(blocks, scorer, clusterer);

        let mut global_pairs: HashSet<LinkedPair> = HashSet::new();
        for result in rx.iter() {
            let mut by_label: std::collections::HashMap<Label, Vec<usize>> = std::collections::HashMap::new();
            for (local_idx, &label) in result.labels.iter().enumerate() {
                if label >= 0 {
                    by_label.entry(label).or_default().push(result.mentions[local_idx]);
                }
            }
            for members in by_label.values() {
                for i in 0..members.len() {
                    for j in (i + 1)..members.len() {
                        global_pairs.insert(canonical_pair(members[i], members[j]));
                    }
                }
            }
        }

        let pairs: Vec<LinkedPair> = global_pairs.into_iter().collect();
        let labels = pairs_to_labels(&pairs, records.len(), true);

        let mut groups: std::collections::HashMap<Label, Vec<usize>> = std::collections::HashMap::new();
        for (i, &label) in labels.iter().enumerate() {
            if label >= 0 {
                groups.entry(label).or_default().push(i);
            }
        }

        let clusters: Vec<(String, Vec<Record>)> = groups
            .into_values()
            .map(|members| {
                let id = Uuid::new_v4().to_string();
                let records = members.into_iter().map(|i| records[i].clone()).collect();
                (id, records)
            })
            .collect();

        log::info!(
            "deduplicate: {} records -> {} non-singleton clusters ({} blocks failed)",
            records.len(),
            clusters.len(),
            failures.len()
        );

        Ok(DedupOutput {
            clusters,
            labels,
            stats,
            failures,
        })
    }

    /// Evaluates a predicted label vector against ground truth, optionally
    /// folding in blocking efficiency when both `block_labels` and
    /// `block_stats` are supplied.
    pub fn evaluate(
        pred_labels: &[Label],
        true_labels: &[Label],
        block_labels: Option<&[Label]>,
        block_stats: Option<&PipelineStats>,
    ) -> DedupReport {
        build_report(pred_labels, true_labels, block_labels, block_stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DedupConfigBuilder;
    use crate::core::record::Value;
    use std::collections::BTreeMap;

    fn rec(n: &str) -> Record {
        Record::new(BTreeMap::from([("n".to_string(), Value::from(n))]))
    }

    fn exact() -> crate::scoring::Comparator {
        Arc::new(|a: &str, b: &str| if a == b { 1.0 } else { 0.0 })
    }

    #[test]
    fn s1_exact_duplicates_land_in_one_cluster_and_singletons_are_dropped() {
        let config = DedupConfigBuilder::new()
            .with_comparator("n", exact())
            .with_blocking_attributes(vec!["n".to_string()])
            .with_cluster_params(0.3, 2)
            .with_similarity_threshold(0.5)
            .build()
            .unwrap();
        let mut engine = DedupEngine::new(config);

        let records = vec![rec("a"), rec("a"), rec("b")];
        let output = engine.deduplicate(&records).unwrap();

        assert_eq!(output.clusters.len(), 1);
        assert_eq!(output.clusters[0].1.len(), 2);
        assert!(output.failures.is_empty());
    }

    #[test]
    fn empty_input_surfaces_as_dedup_error() {
        let config = DedupConfigBuilder::new()
            .with_comparator("n", exact())
            .with_blocking_attributes(vec!["n".to_string()])
            .build()
            .unwrap();
        let mut engine = DedupEngine::new(config);
        assert!(engine.deduplicate(&[]).is_err());
    }
}
