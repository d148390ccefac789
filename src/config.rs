//! `DedupConfig` / `DedupConfigBuilder` -- validates and assembles the
//! pieces of a [`crate::engine::DedupEngine`] before it runs.

use crate::blocking::{BlockFilter, BlockingRule, SortedNeighborhoodSplitter};
use crate::error::ConfigError;
use crate::scoring::{AggregationStrategy, Comparator};

/// DBSCAN parameters. Defaults mirror the spec: `eps=0.5`, `min_samples=2`.
#[derive(Debug, Clone, Copy)]
pub struct ClusterParams {
    pub eps: f64,
    pub min_samples: usize,
}

impl Default for ClusterParams {
    fn default() -> Self {
        ClusterParams { eps: 0.5, min_samples: 2 }
    }
}

/// A fully validated engine configuration. Construct via
/// [`DedupConfigBuilder`]; there is no public constructor on this type
/// itself, since every field has already been checked for consistency by
/// the time one exists.
pub struct DedupConfig {
    pub comparators: Vec<(String, Comparator)>,
    pub aggregation_strategy: AggregationStrategy,
    pub blocking_rule: BlockingRule,
    pub blocking_splitter: Option<SortedNeighborhoodSplitter>,
    pub blocking_filters: Vec<Box<dyn BlockFilter>>,
    pub cluster: ClusterParams,
    pub similarity_threshold: f64,
    pub num_threads: Option<usize>,
}

/// Builds a [`DedupConfig`], following the teacher's chained-setter style
/// except validation is deferred to a terminal [`DedupConfigBuilder::build`]
/// rather than panicking per-setter.
#[derive(Default)]
pub struct DedupConfigBuilder {
    comparators: Vec<(String, Comparator)>,
    aggregation_strategy: Option<AggregationStrategy>,
    blocking_attributes: Option<Vec<String>>,
    blocking_rule: Option<BlockingRule>,
    blocking_splitter: Option<SortedNeighborhoodSplitter>,
    blocking_filters: Vec<Box<dyn BlockFilter>>,
    cluster: ClusterParams,
    similarity_threshold: Option<f64>,
    num_threads: Option<usize>,
    unknown_aggregation: Option<String>,
}

impl DedupConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_comparator(mut self, attribute: impl Into<String>, comparator: Comparator) -> Self {
        self.comparators.push((attribute.into(), comparator));
        self
    }

    pub fn with_aggregation_strategy(mut self, strategy: AggregationStrategy) -> Self {
        self.aggregation_strategy = Some(strategy);
        self.unknown_aggregation = None;
        self
    }

    /// Parses a strategy name; stores the parse failure for `build()` to
    /// surface as a proper `ConfigError` rather than panicking here.
    pub fn with_aggregation_strategy_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        match AggregationStrategy::parse(&name) {
            Some(strategy) => self.aggregation_strategy = Some(strategy),
            None => self.aggregation_strategy = None,
        }
        self.unknown_aggregation = if self.aggregation_strategy.is_none() { Some(name) } else { None };
        self
    }

    pub fn with_blocking_attributes(mut self, attributes: Vec<String>) -> Self {
        self.blocking_attributes = Some(attributes);
        self
    }

    pub fn with_blocking_rule(mut self, rule: BlockingRule) -> Self {
        self.blocking_rule = Some(rule);
        self
    }

    pub fn with_blocking_splitter(mut self, splitter: SortedNeighborhoodSplitter) -> Self {
        self.blocking_splitter = Some(splitter);
        self
    }

    pub fn with_blocking_filter(mut self, filter: Box<dyn BlockFilter>) -> Self {
        self.blocking_filters.push(filter);
        self
    }

    pub fn with_cluster_params(mut self, eps: f64, min_samples: usize) -> Self {
        self.cluster = ClusterParams { eps, min_samples };
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = Some(threshold);
        self
    }

    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    pub fn build(self) -> Result<DedupConfig, ConfigError> {
        if self.comparators.is_empty() {
            return Err(ConfigError::EmptyComparators);
        }

        if let Some(bad_name) = &self.unknown_aggregation {
            return Err(ConfigError::UnknownAggregation(bad_name.clone()));
        }
        let aggregation_strategy = self.aggregation_strategy.unwrap_or(AggregationStrategy::Mean);

        let blocking_rule = match (self.blocking_rule, self.blocking_attributes) {
            (Some(rule), _) => rule,
            (None, Some(attrs)) => BlockingRule::from_attributes(&attrs)?,
            (None, None) => return Err(ConfigError::MissingBlockingSpec),
        };

        let similarity_threshold = self.similarity_threshold.unwrap_or(0.8);
        if !(0.0..=1.0).contains(&similarity_threshold) || similarity_threshold == 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "similarity_threshold",
                value: similarity_threshold,
            });
        }

        if self.cluster.min_samples < 2 {
            return Err(ConfigError::MinSamplesTooSmall(self.cluster.min_samples));
        }
        if !(0.0..=1.0).contains(&self.cluster.eps) || self.cluster.eps == 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "cluster.eps",
                value: self.cluster.eps,
            });
        }

        Ok(DedupConfig {
            comparators: self.comparators,
            aggregation_strategy,
            blocking_rule,
            blocking_splitter: self.blocking_splitter,
            blocking_filters: self.blocking_filters,
            cluster: self.cluster,
            similarity_threshold,
            num_threads: self.num_threads,
        })
    }
}
