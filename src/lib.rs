

//! A rust implementation of the classic split-count smart pointer pair.
//!
//! [Shared](pointers::Shared) owns, [Weak](pointers::Weak) observes. The two
//! kinds meet only in a heap-allocated control block of two plain counters:
//! the pointee is freed by whichever owner releases strong interest last, and
//! the block by whichever handle of either kind releases the last unit of
//! combined interest. An observer can always answer "is the pointee still
//! alive?" without dangling, and can be locked back into an owner.
//!
//! Counting is non-atomic, so handles never leave the thread that made them.
//! A per-thread ledger keeps accounts of live values, blocks, and handles
//! ([thread_local_stats]); with the default `global` feature, whatever a
//! thread failed to release is tallied process-wide when the thread exits.

pub(crate) mod control;
pub(crate) mod ledger;
pub mod pointers;

#[cfg(test)]
mod tests;

#[cfg(feature = "global")]
pub use ledger::global_stats;
pub use ledger::{thread_local_stats, Stats};
pub use pointers::{Shared, Weak};
