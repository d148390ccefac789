//! Error types for the deduplication engine.
//!
//! Configuration errors are surfaced eagerly, at construction time, and are
//! fatal. Runtime errors inside a single block are isolated by the
//! `BlockWorkPool` (see [`crate::work_pool`]) and never poison the rest of a
//! run; they are folded into [`DedupError::BlockTask`] only when a caller
//! explicitly asks the pool to fail instead of skip.

use thiserror::Error;

/// Errors raised while validating a [`crate::config::DedupConfig`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// `comparators` was empty; the engine has nothing to score pairs with.
    #[error("at least one comparator is required")]
    EmptyComparators,

    /// The aggregation strategy name did not match a known variant.
    #[error("unknown aggregation strategy: {0}")]
    UnknownAggregation(String),

    /// Neither `blocking_attributes` nor `blocking_rule` was supplied.
    #[error("one of `blocking_attributes` or `blocking_rule` is required")]
    MissingBlockingSpec,

    /// An encoder name referenced in a rule tree has no known implementation.
    #[error("unknown encoder: {0}")]
    UnknownEncoder(String),

    /// `cluster.eps` or `similarity_threshold` fell outside `(0, 1]`.
    #[error("{field} must be in (0, 1], got {value}")]
    OutOfRange { field: &'static str, value: f64 },

    /// `cluster.min_samples` was below the minimum of 2.
    #[error("min_samples must be >= 2, got {0}")]
    MinSamplesTooSmall(usize),
}

/// Top-level error type for the engine.
#[derive(Error, Debug)]
pub enum DedupError {
    /// A configuration error, detected at construction time.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// `fit` was called with zero records.
    #[error("cannot fit on an empty record sequence")]
    EmptyInput,

    /// A MentionId appeared in more than one ground-truth cluster.
    #[error("mention {mention} appears in multiple clusters ({first} and {second})")]
    DuplicateMembership {
        mention: usize,
        first: i64,
        second: i64,
    },

    /// A block task failed and the caller asked for hard failure rather than
    /// isolation (the default is to skip and record the failure instead).
    #[error("block {block_id} failed: {reason}")]
    BlockTask { block_id: usize, reason: String },

    /// A pluggable encoder or comparator needs a backend that isn't
    /// available in this build.
    #[error("backend unavailable for `{name}`: {hint}")]
    BackendUnavailable { name: String, hint: String },
}

pub type DedupResult<T> = Result<T, DedupError>;
