use std::cell::Cell;

#[cfg(feature = "global")]
use lazy_static::lazy_static;
#[cfg(feature = "global")]
use parking_lot::Mutex;

/// Snapshot of the accounting counters.
///
/// Every allocation and free of values and control blocks, and every handle
/// construction and drop, passes through this module. A thread that has
/// released everything reports all-zero, which is how the exactly-once
/// deallocation properties of the handle protocol become observable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats
{
    pub live_values: usize,
    pub live_blocks: usize,
    pub strong_handles: usize,
    pub weak_handles: usize,
}

#[allow(dead_code)]
impl Stats
{
    /// Live handles across both kinds.
    pub fn handles(&self) -> usize { self.strong_handles + self.weak_handles }

    /// True when nothing is live and nothing leaked.
    pub fn is_clean(&self) -> bool { *self == Stats::default() }
}

#[derive(Default)]
struct Ledger
{
    live_values: Cell<usize>,
    live_blocks: Cell<usize>,
    strong_handles: Cell<usize>,
    weak_handles: Cell<usize>,
}

thread_local! {
    static LEDGER: Ledger = Ledger::default();
}

#[cfg(feature = "global")]
lazy_static! {
    static ref ORPHANED: Mutex<Stats> = Mutex::new(Stats::default());
}

impl Ledger
{
    fn bump(cell: &Cell<usize>) { cell.set(cell.get() + 1) }

    fn lower(cell: &Cell<usize>) { cell.set(cell.get() - 1) }

    fn snapshot(&self) -> Stats
    {
        Stats {
            live_values: self.live_values.get(),
            live_blocks: self.live_blocks.get(),
            strong_handles: self.strong_handles.get(),
            weak_handles: self.weak_handles.get(),
        }
    }
}

#[cfg(feature = "global")]
impl Drop for Ledger
{
    fn drop(&mut self)
    {
        let left_over = self.snapshot();
        if !left_over.is_clean() {
            let mut orphaned = ORPHANED.lock();
            orphaned.live_values += left_over.live_values;
            orphaned.live_blocks += left_over.live_blocks;
            orphaned.strong_handles += left_over.strong_handles;
            orphaned.weak_handles += left_over.weak_handles;
        }
    }
}

pub(crate) fn value_allocated() { LEDGER.with(|l| Ledger::bump(&l.live_values)) }
pub(crate) fn value_freed() { LEDGER.with(|l| Ledger::lower(&l.live_values)) }
pub(crate) fn block_allocated() { LEDGER.with(|l| Ledger::bump(&l.live_blocks)) }
pub(crate) fn block_freed() { LEDGER.with(|l| Ledger::lower(&l.live_blocks)) }
pub(crate) fn strong_opened() { LEDGER.with(|l| Ledger::bump(&l.strong_handles)) }
pub(crate) fn strong_closed() { LEDGER.with(|l| Ledger::lower(&l.strong_handles)) }
pub(crate) fn weak_opened() { LEDGER.with(|l| Ledger::bump(&l.weak_handles)) }
pub(crate) fn weak_closed() { LEDGER.with(|l| Ledger::lower(&l.weak_handles)) }

/// Accounting snapshot for the calling thread.
pub fn thread_local_stats() -> Stats { LEDGER.with(Ledger::snapshot) }

/// Counters abandoned by threads that exited with handles or allocations
/// still live.
///
/// A program that released everything before its threads finished reads
/// all-zero here. Best-effort: the main thread's ledger may never be flushed,
/// since its thread-local destructors are not guaranteed to run.
#[cfg(feature = "global")]
pub fn global_stats() -> Stats { ORPHANED.lock().clone() }
