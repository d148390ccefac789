//! Block pruning via sorted-neighborhood splitting.

use crate::core::record::Record;

/// Splits an over-large block into (possibly overlapping) sub-blocks that
/// share the parent's `block_id`.
pub trait BlockSplitter: Send + Sync {
    fn split(&self, members: Vec<(usize, Record)>) -> Vec<Vec<(usize, Record)>>;
}

/// Sorts a block by a key built from designated fields, then slides a
/// window of size `window` with step `step` over the sorted sequence,
/// emitting each window as its own sub-block.
///
/// If the block is already no larger than `max_block_size`, it's emitted
/// unchanged. The last window may be short when the block length doesn't
/// divide evenly by `step`; windows overlap whenever `step < window`.
#[derive(Debug, Clone)]
pub struct SortedNeighborhoodSplitter {
    key_fields: Vec<String>,
    window: usize,
    step: usize,
    max_block_size: usize,
}

impl SortedNeighborhoodSplitter {
    pub fn new(key_fields: Vec<String>, window: usize, step: usize, max_block_size: usize) -> Self {
        assert!(window > 0, "window must be positive");
        assert!(step > 0, "step must be positive");
        SortedNeighborhoodSplitter {
            key_fields,
            window,
            step,
            max_block_size,
        }
    }

    fn key(&self, record: &Record) -> Vec<String> {
        self.key_fields.iter().map(|f| record.get_str(f)).collect()
    }
}

impl BlockSplitter for SortedNeighborhoodSplitter {
    fn split(&self, mut members: Vec<(usize, Record)>) -> Vec<Vec<(usize, Record)>> {
        if members.len() <= self.max_block_size {
            return vec![members];
        }

        members.sort_by(|(_, a), (_, b)| self.key(a).cmp(&self.key(b)));

        let mut windows = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.window).min(members.len());
            windows.push(members[start..end].to_vec());
            if end == members.len() {
                break;
            }
            start += self.step;
        }
        windows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::Value;
    use std::collections::BTreeMap;

    fn block_of(n: usize) -> Vec<(usize, Record)> {
        (0..n)
            .map(|i| {
                let mut attrs = BTreeMap::new();
                attrs.insert("dob".to_string(), Value::from(format!("{i:02}")));
                (i, Record::new(attrs))
            })
            .collect()
    }

    #[test]
    fn small_block_passes_through_unsplit() {
        let splitter = SortedNeighborhoodSplitter::new(vec!["dob".to_string()], 3, 1, 20);
        let result = splitter.split(block_of(5));
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].len(), 5);
    }

    #[test]
    fn s5_ten_records_window_3_step_1_yields_8_overlapping_windows_of_3() {
        let splitter = SortedNeighborhoodSplitter::new(vec!["dob".to_string()], 3, 1, 5);
        let result = splitter.split(block_of(10));
        assert_eq!(result.len(), 8);
        assert!(result.iter().all(|w| w.len() == 3));
        // Windows overlap: window i and i+1 share two members.
        let ids_0: Vec<usize> = result[0].iter().map(|(i, _)| *i).collect();
        let ids_1: Vec<usize> = result[1].iter().map(|(i, _)| *i).collect();
        let shared = ids_0.iter().filter(|id| ids_1.contains(id)).count();
        assert_eq!(shared, 2);
    }

    #[test]
    fn last_window_is_short_when_length_does_not_divide_evenly() {
        let splitter = SortedNeighborhoodSplitter::new(vec!["dob".to_string()], 5, 3, 5);
        let result = splitter.split(block_of(12));
        assert_eq!(result.last().unwrap().len(), 3);
    }
}
