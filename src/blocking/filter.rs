//! Block post-filters: drop sub-blocks that don't meet a cardinality
//! constraint after splitting.

use crate::core::record::Record;

/// A predicate over a finished (block_id, records) group. Filters run after
/// the splitter, so they see sub-blocks rather than the raw rule-produced
/// groups.
pub trait BlockFilter: Send + Sync {
    fn keep(&self, members: &[(usize, Record)]) -> bool;
}

/// Drops a block if it's smaller than `min_size` or larger than `max_size`.
/// `max_size = None` means unbounded.
#[derive(Debug, Clone)]
pub struct CardinalityFilter {
    min_size: usize,
    max_size: Option<usize>,
}

impl CardinalityFilter {
    pub fn new(min_size: usize, max_size: Option<usize>) -> Self {
        CardinalityFilter { min_size, max_size }
    }
}

impl BlockFilter for CardinalityFilter {
    fn keep(&self, members: &[(usize, Record)]) -> bool {
        let n = members.len();
        n >= self.min_size && self.max_size.map_or(true, |max| n <= max)
    }
}
