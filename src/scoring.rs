//! `PairScorer` -- turns a block of records into an `n x n` similarity
//! matrix via per-attribute comparators and a configured aggregation.

use std::sync::Arc;

use crate::core::record::Record;

/// A `(string, string) -> [0,1]` similarity function. The engine treats
/// these as opaque; it never inspects how a comparator computes its score.
pub type Comparator = Arc<dyn Fn(&str, &str) -> f64 + Send + Sync>;

/// How a pair's per-attribute score vector is reduced to a single scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationStrategy {
    Mean,
    Median,
    Max,
    Min,
}

impl AggregationStrategy {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "mean" => Some(AggregationStrategy::Mean),
            "median" => Some(AggregationStrategy::Median),
            "max" => Some(AggregationStrategy::Max),
            "min" => Some(AggregationStrategy::Min),
            _ => None,
        }
    }

    fn reduce(self, mut scores: Vec<f64>) -> f64 {
        debug_assert!(!scores.is_empty(), "a pair always has at least one comparator score");
        match self {
            AggregationStrategy::Mean => scores.iter().sum::<f64>() / scores.len() as f64,
            AggregationStrategy::Max => scores.iter().cloned().fold(f64::MIN, f64::max),
            AggregationStrategy::Min => scores.iter().cloned().fold(f64::MAX, f64::min),
            AggregationStrategy::Median => {
                scores.sort_by(|a, b| a.partial_cmp(b).unwrap());
                let mid = scores.len() / 2;
                if scores.len() % 2 == 0 {
                    (scores[mid - 1] + scores[mid]) / 2.0
                } else {
                    scores[mid]
                }
            }
        }
    }
}

/// An ordered list of `(attribute_name, comparator)` pairs applied to every
/// candidate pair in a block.
pub struct PairScorer {
    comparators: Vec<(String, Comparator)>,
    aggregation: AggregationStrategy,
    similarity_threshold: f64,
}

/// A dense, symmetric `n x n` similarity matrix with `1.0` on the diagonal.
/// Stored row-major as a flat `Vec<f64>`.
#[derive(Debug, Clone)]
pub struct SimilarityMatrix {
    n: usize,
    values: Vec<f64>,
}

impl SimilarityMatrix {
    fn identity(n: usize) -> Self {
        let mut values = vec![0.0; n * n];
        for i in 0..n {
            values[i * n + i] = 1.0;
        }
        SimilarityMatrix { n, values }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.n + j]
    }

    fn set(&mut self, i: usize, j: usize, value: f64) {
        self.values[i * self.n + j] = value;
        self.values[j * self.n + i] = value;
    }
}

impl PairScorer {
    pub fn new(comparators: Vec<(String, Comparator)>, aggregation: AggregationStrategy, similarity_threshold: f64) -> Self {
        assert!(!comparators.is_empty(), "PairScorer requires at least one comparator");
        PairScorer {
            comparators,
            aggregation,
            similarity_threshold,
        }
    }

    /// Scores every `C(n, 2)` unordered pair in `records`, in lexicographic
    /// `(i < j)` order, so reductions are bit-reproducible regardless of
    /// which worker thread ran them.
    ///
    /// `n=0` returns an empty matrix; `n=1` returns a `1x1` matrix (a
    /// singleton, trivially its own cluster).
    pub fn score_block(&self, records: &[Record]) -> SimilarityMatrix {
        let n = records.len();
        let mut matrix = SimilarityMatrix::identity(n);

        for i in 0..n {
            for j in (i + 1)..n {
                let scores: Vec<f64> = self
                    .comparators
                    .iter()
                    .map(|(attr, cmp)| cmp(&records[i].get_str(attr), &records[j].get_str(attr)))
                    .collect();
                let reduced = self.aggregation.reduce(scores);
                let value = if reduced < self.similarity_threshold { 0.0 } else { reduced };
                matrix.set(i, j, value);
            }
        }

        matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::Value;
    use std::collections::BTreeMap;

    fn rec(n: &str) -> Record {
        Record::new(BTreeMap::from([("n".to_string(), Value::from(n))]))
    }

    fn exact() -> Comparator {
        Arc::new(|a: &str, b: &str| if a == b { 1.0 } else { 0.0 })
    }

    #[test]
    fn empty_block_gives_empty_matrix() {
        let scorer = PairScorer::new(vec![("n".to_string(), exact())], AggregationStrategy::Mean, 0.8);
        let m = scorer.score_block(&[]);
        assert_eq!(m.n(), 0);
    }

    #[test]
    fn singleton_block_gives_one_by_one_identity_matrix() {
        let scorer = PairScorer::new(vec![("n".to_string(), exact())], AggregationStrategy::Mean, 0.8);
        let m = scorer.score_block(&[rec("a")]);
        assert_eq!(m.n(), 1);
        assert_eq!(m.get(0, 0), 1.0);
    }

    #[test]
    fn diagonal_is_always_one() {
        let scorer = PairScorer::new(vec![("n".to_string(), exact())], AggregationStrategy::Mean, 0.8);
        let m = scorer.score_block(&[rec("a"), rec("b"), rec("c")]);
        for i in 0..3 {
            assert_eq!(m.get(i, i), 1.0);
        }
    }

    #[test]
    fn below_threshold_scores_are_zeroed() {
        let half: Comparator = Arc::new(|_, _| 0.5);
        let scorer = PairScorer::new(vec![("n".to_string(), half)], AggregationStrategy::Mean, 0.8);
        let m = scorer.score_block(&[rec("a"), rec("b")]);
        assert_eq!(m.get(0, 1), 0.0);
    }

    #[test]
    fn matrix_is_symmetric() {
        let scorer = PairScorer::new(vec![("n".to_string(), exact())], AggregationStrategy::Mean, 0.8);
        let m = scorer.score_block(&[rec("a"), rec("a")]);
        assert_eq!(m.get(0, 1), m.get(1, 0));
    }

    #[test]
    fn mean_aggregation_averages_comparator_scores() {
        let always_one: Comparator = Arc::new(|_, _| 1.0);
        let always_zero: Comparator = Arc::new(|_, _| 0.0);
        let scorer = PairScorer::new(
            vec![("a".to_string(), always_one), ("b".to_string(), always_zero)],
            AggregationStrategy::Mean,
            0.0,
        );
        let m = scorer.score_block(&[rec("x"), rec("y")]);
        assert!((m.get(0, 1) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn aggregation_parse_is_case_insensitive_and_rejects_unknown_names() {
        assert_eq!(AggregationStrategy::parse("MAX"), Some(AggregationStrategy::Max));
        assert_eq!(AggregationStrategy::parse("nonsense"), None);
    }
}
