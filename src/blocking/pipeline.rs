//! `BlockingPipeline` -- applies a rule to records, splits and filters the
//! resulting groups, and reports before/after comparison counts.

use std::collections::HashMap;

use crate::blocking::filter::BlockFilter;
use crate::blocking::rule::BlockingRule;
use crate::blocking::splitter::BlockSplitter;
use crate::core::label_algebra::n_choose_2;
use crate::core::record::{flatten_records, Record};
use crate::error::DedupError;

/// A block of records emitted by the pipeline: a `block_id` shared by every
/// sub-block split from the same rule-produced group, plus the
/// `(mention_id, record)` pairs it contains.
#[derive(Debug, Clone)]
pub struct Block {
    pub block_id: usize,
    pub members: Vec<(usize, Record)>,
}

/// Comparison-count bookkeeping the pipeline is required to expose.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineStats {
    pub num_blocks: usize,
    pub operations_before_blocking: u64,
    pub operations_after_blocking: u64,
}

/// Applies a [`BlockingRule`] to a record batch, then optionally splits and
/// filters the resulting groups.
pub struct BlockingPipeline {
    separator: String,
    splitter: Option<Box<dyn BlockSplitter>>,
    filters: Vec<Box<dyn BlockFilter>>,
}

impl Default for BlockingPipeline {
    fn default() -> Self {
        BlockingPipeline {
            separator: ".".to_string(),
            splitter: None,
            filters: Vec::new(),
        }
    }
}

impl BlockingPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_splitter(mut self, splitter: Box<dyn BlockSplitter>) -> Self {
        self.splitter = Some(splitter);
        self
    }

    pub fn with_filter(mut self, filter: Box<dyn BlockFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Runs the full pipeline: flatten -> fit rule -> group -> split ->
    /// filter. Returns the emitted blocks plus the stats the spec requires
    /// (`num_blocks`, `operations_before_blocking`,
    /// `operations_after_blocking`).
    pub fn run(&self, records: &[Record], rule: &mut BlockingRule) -> Result<(Vec<Block>, PipelineStats), DedupError> {
        if records.is_empty() {
            return Err(DedupError::EmptyInput);
        }

        let flattened = flatten_records(records, &self.separator);
        rule.fit(&flattened);
        let labels = rule.labels().clone();

        let mut groups: HashMap<i64, Vec<usize>> = HashMap::new();
        let mut first_seen_order: Vec<i64> = Vec::new();
        for (i, &label) in labels.iter().enumerate() {
            if !groups.contains_key(&label) {
                first_seen_order.push(label);
            }
            groups.entry(label).or_default().push(i);
        }

        let mut blocks = Vec::new();
        for (block_id, label) in first_seen_order.into_iter().enumerate() {
            let indices = &groups[&label];
            let members: Vec<(usize, Record)> = indices.iter().map(|&i| (i, records[i].clone())).collect();

            let sub_blocks = match &self.splitter {
                Some(splitter) => splitter.split(members),
                None => vec![members],
            };

            for sub in sub_blocks {
                if self.filters.iter().all(|f| f.keep(&sub)) {
                    blocks.push(Block { block_id, members: sub });
                }
            }
        }

        let n = records.len() as u64;
        let operations_before_blocking = n_choose_2(n);
        let operations_after_blocking = blocks
            .iter()
            .map(|b| n_choose_2(b.members.len() as u64))
            .sum();

        let stats = PipelineStats {
            num_blocks: blocks.len(),
            operations_before_blocking,
            operations_after_blocking,
        };

        log::debug!(
            "blocking pipeline emitted {} blocks from {} records ({} -> {} comparisons)",
            stats.num_blocks,
            records.len(),
            stats.operations_before_blocking,
            stats.operations_after_blocking,
        );

        Ok((blocks, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocking::filter::CardinalityFilter;
    use crate::core::record::Value;
    use std::collections::BTreeMap;

    fn rec(n: &str) -> Record {
        Record::new(BTreeMap::from([("n".to_string(), Value::from(n))]))
    }

    #[test]
    fn s1_trivial_exact_match_groups_equal_values() {
        let records = vec![rec("a"), rec("a"), rec("b")];
        let mut rule = BlockingRule::column("n");
        let pipeline = BlockingPipeline::new();
        let (blocks, stats) = pipeline.run(&records, &mut rule).unwrap();

        assert_eq!(stats.num_blocks, 2);
        let ab_block = blocks.iter().find(|b| b.members.len() == 2).unwrap();
        let ids: Vec<usize> = ab_block.members.iter().map(|(i, _)| *i).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn empty_input_is_an_error() {
        let mut rule = BlockingRule::column("n");
        let pipeline = BlockingPipeline::new();
        assert!(matches!(pipeline.run(&[], &mut rule), Err(DedupError::EmptyInput)));
    }

    #[test]
    fn operations_before_and_after_blocking_match_closed_form() {
        let records = vec![rec("a"), rec("a"), rec("b"), rec("b"), rec("c")];
        let mut rule = BlockingRule::column("n");
        let pipeline = BlockingPipeline::new();
        let (_, stats) = pipeline.run(&records, &mut rule).unwrap();

        assert_eq!(stats.operations_before_blocking, n_choose_2(5));
        // Two blocks of size 2 (C(2,2)=1 each) and one singleton (C(1,2)=0).
        assert_eq!(stats.operations_after_blocking, 2);
    }

    #[test]
    fn cardinality_filter_drops_singleton_blocks() {
        let records = vec![rec("a"), rec("a"), rec("b")];
        let mut rule = BlockingRule::column("n");
        let pipeline = BlockingPipeline::new().with_filter(Box::new(CardinalityFilter::new(2, None)));
        let (blocks, _) = pipeline.run(&records, &mut rule).unwrap();

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].members.len(), 2);
    }

    #[test]
    fn cartesian_blocking_emits_a_single_block_with_every_record() {
        let records = vec![rec("a"), rec("b"), rec("c")];
        let mut rule = BlockingRule::cartesian();
        let pipeline = BlockingPipeline::new();
        let (blocks, stats) = pipeline.run(&records, &mut rule).unwrap();

        assert_eq!(stats.num_blocks, 1);
        assert_eq!(blocks[0].members.len(), 3);
        assert_eq!(stats.operations_before_blocking, stats.operations_after_blocking);
    }
}
