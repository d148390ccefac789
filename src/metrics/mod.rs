//! Evaluation: pair-confusion metrics, cluster-structural metrics, blocking
//! efficiency, and the combined [`report::DedupReport`].

pub mod blocking;
pub mod confusion;
pub mod report;
pub mod structural;

pub use blocking::{blocking_efficiency, BlockingEfficiency};
pub use confusion::{confusion_matrix, ConfusionMatrix};
pub use report::{build_report, BlockingReportFields, DedupReport};
pub use structural::{adjusted_rand_index, homogeneity_completeness_v_measure, HomogeneityCompleteness};
