//! `BlockWorkPool` -- runs one independent scoring+clustering task per
//! block across a bounded rayon thread pool, with cooperative cancellation
//! and per-block failure isolation.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::blocking::Block;
use crate::clusterer::Clusterer;
use crate::core::label_algebra::Label;
use crate::scoring::PairScorer;

/// A finished cluster: members carry both their mention id (position in the
/// original input) and their label within the block, so a caller can later
/// re-key them into a crate-wide identifier.
#[derive(Debug, Clone)]
pub struct BlockResult {
    pub block_id: usize,
    pub mentions: Vec<usize>,
    pub labels: Vec<Label>,
}

/// A block that panicked or otherwise failed; the rest of the run continues
/// without it.
#[derive(Debug, Clone)]
pub struct BlockFailure {
    pub block_id: usize,
    pub reason: String,
}

/// Picks the default worker count: `max(1, min(cores/2, n_blocks))`. Named
/// as its own function since the original source's `num_threads = cores`
/// default starved the scoring step of cache; see the design notes on why
/// this engine halves it instead.
pub fn default_num_threads(n_blocks: usize) -> usize {
    let half_cores = (num_cpus::get() / 2).max(1);
    half_cores.min(n_blocks).max(1)
}

/// Drives a bounded rayon pool over a sequence of blocks, scoring and
/// clustering each independently. Call [`BlockWorkPool::cancel`] from
/// another thread to stop dispatching new blocks; blocks already running
/// finish but their results are discarded.
pub struct BlockWorkPool {
    pool: ThreadPool,
    cancelled: Arc<AtomicBool>,
}

impl BlockWorkPool {
    pub fn new(num_threads: usize) -> Self {
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads.max(1))
            .build()
            .expect("failed to build block work pool");
        BlockWorkPool {
            pool,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A handle callers can use to cancel the run from another thread.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Scores and clusters every block, returning a channel of finished
    /// results and the list of blocks that failed. The channel is bounded
    /// so a slow consumer applies backpressure to the producers rather than
    /// letting results pile up unbounded in memory.
    pub fn run(&self, blocks: Vec<Block>, scorer: Arc<PairScorer>, clusterer: Clusterer) -> (Receiver<BlockResult>, Vec<BlockFailure>) {
        let (tx, rx) = bounded(num_cpus::get().max(1) * 2);
        let cancelled = Arc::clone(&self.cancelled);
        let failures: Arc<std::sync::Mutex<Vec<BlockFailure>>> = Arc::new(std::sync::Mutex::new(Vec::new()));

        self.pool.scope(|scope| {
            for block in blocks {
                if cancelled.load(Ordering::SeqCst) {
                    log::info!("block dispatch cancelled before block {}", block.block_id);
                    break;
                }

                let tx = tx.clone();
                let scorer = Arc::clone(&scorer);
                let cancelled = Arc::clone(&cancelled);
                let failures = Arc::clone(&failures);

                scope.spawn(move |_| {
                    if cancelled.load(Ordering::SeqCst) {
                        return;
                    }

                    let block_id = block.block_id;
                    let result = catch_unwind(AssertUnwindSafe(|| {
                        let records: Vec<_> = block.members.iter().map(|(_, r)| r.clone()).collect();
                        let matrix = scorer.score_block(&records);
                        let labels = clusterer.cluster(&matrix);
                        let mentions: Vec<usize> = block.members.iter().map(|(i, _)| *i).collect();
                        (mentions, labels)
                    }));

                    match result {
                        Ok((mentions, labels)) => {
                            if cancelled.load(Ordering::SeqCst) {
                                return;
                            }
                            let _ = tx.send(BlockResult { block_id, mentions, labels });
                        }
                        Err(panic) => {
                            let reason = panic
                                .downcast_ref::<&str>()
                                .map(|s| s.to_string())
                                .or_else(|| panic.downcast_ref::<String>().cloned())
                                .unwrap_or_else(|| "unknown panic".to_string());
                            log::warn!("block {block_id} failed: {reason}");
                            failures.lock().unwrap().push(BlockFailure { block_id, reason });
                        }
                    }
                });
            }
        });

        drop(tx);
        let failures = Arc::try_unwrap(failures).map(|m| m.into_inner().unwrap()).unwrap_or_default();
        (rx, failures)
    }
}
