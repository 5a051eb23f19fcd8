use std::{cell::Cell, fmt, ptr::NonNull};

use super::ledger;

/// Out-of-band counting record shared by every handle of one ownership
/// domain.
///
/// Two plain non-atomic counters behind `Cell`. The block is live while
/// `strong + weak > 0`; the decrement that observes the sum reach zero frees
/// it. Only the handle protocol in `pointers` ever touches the counters.
pub(crate) struct Control
{
    strong: Cell<usize>,
    weak: Cell<usize>,
}

/// Which counter a handle participates in.
#[derive(Clone, Copy)]
pub(crate) enum Interest
{
    Strong,
    Weak,
}

impl Control
{
    fn new(strong: usize, weak: usize) -> Self
    {
        Control {
            strong: Cell::new(strong),
            weak: Cell::new(weak),
        }
    }

    pub(crate) fn strong(&self) -> usize { self.strong.get() }

    pub(crate) fn weak(&self) -> usize { self.weak.get() }

    fn counter(&self, interest: Interest) -> &Cell<usize>
    {
        match interest {
            Interest::Strong => &self.strong,
            Interest::Weak => &self.weak,
        }
    }

    fn other(&self, interest: Interest) -> &Cell<usize>
    {
        match interest {
            Interest::Strong => &self.weak,
            Interest::Weak => &self.strong,
        }
    }

    pub(crate) fn acquire(&self, interest: Interest)
    {
        let mine = self.counter(interest);
        mine.set(mine.get() + 1);
    }
}

impl fmt::Debug for Control
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Control")
            .field("strong", &self.strong.get())
            .field("weak", &self.weak.get())
            .finish()
    }
}

/// Allocate a fresh block with explicit initial counts.
pub(crate) fn alloc_block(strong: usize, weak: usize) -> NonNull<Control>
{
    ledger::block_allocated();
    unsafe { NonNull::new_unchecked(Box::into_raw(Box::new(Control::new(strong, weak)))) }
}

unsafe fn free_block(ctrl: NonNull<Control>)
{
    ledger::block_freed();
    drop(Box::from_raw(ctrl.as_ptr()));
}

/// Give up one unit of `interest` in the block behind `ctrl`.
///
/// The one release path both handle kinds share: decrement my counter, and
/// if my kind just died while the other kind holds nothing, free the block.
/// Returns whether the caller was the last handle of its kind, after which
/// `ctrl` must not be touched again.
pub(crate) unsafe fn release(ctrl: NonNull<Control>, interest: Interest) -> bool
{
    let block = ctrl.as_ref();
    let mine = block.counter(interest);
    mine.set(mine.get() - 1);
    let last_of_kind = mine.get() == 0;
    if last_of_kind && block.other(interest).get() == 0 {
        free_block(ctrl);
    }
    last_of_kind
}

/// Move `value` onto the heap, outside the block that will count it.
pub(crate) fn alloc_value<T>(value: T) -> NonNull<T>
{
    ledger::value_allocated();
    unsafe { NonNull::new_unchecked(Box::into_raw(Box::new(value))) }
}

/// Free a value previously produced by [alloc_value].
pub(crate) unsafe fn free_value<T>(value: NonNull<T>)
{
    ledger::value_freed();
    drop(Box::from_raw(value.as_ptr()));
}
