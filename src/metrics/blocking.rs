//! Blocking efficiency metrics, derived from a [`PipelineStats`].

use crate::blocking::PipelineStats;

/// `reduction_ratio` and `comparison_efficiency` for a blocking pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockingEfficiency {
    pub reduction_ratio: f64,
    pub comparison_efficiency: f64,
}

/// `reduction_ratio = (1 - after/before) * 100`, clamped to `[0, 100]`;
/// `0` when `before = 0`. `comparison_efficiency = before/after`; `inf` when
/// `after = 0` (blocking eliminated every comparison); `1.0` when `before = 0`.
pub fn blocking_efficiency(stats: &PipelineStats) -> BlockingEfficiency {
    let before = stats.operations_before_blocking as f64;
    let after = stats.operations_after_blocking as f64;

    let reduction_ratio = if before == 0.0 {
        0.0
    } else {
        ((1.0 - after / before) * 100.0).clamp(0.0, 100.0)
    };

    let comparison_efficiency = if before == 0.0 {
        1.0
    } else if after == 0.0 {
        f64::INFINITY
    } else {
        before / after
    };

    BlockingEfficiency {
        reduction_ratio,
        comparison_efficiency,
    }
}
