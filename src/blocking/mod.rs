//! Everything involved in turning a record batch into candidate blocks:
//! the rule tree ([`rule`]), the pipeline that drives it ([`pipeline`]),
//! and the optional post-processing steps ([`splitter`], [`filter`]).

pub mod filter;
pub mod pipeline;
pub mod rule;
pub mod splitter;

pub use filter::{BlockFilter, CardinalityFilter};
pub use pipeline::{Block, BlockingPipeline, PipelineStats};
pub use rule::{BlockingRule, Encoder, RuleLevel};
pub use splitter::{BlockSplitter, SortedNeighborhoodSplitter};
