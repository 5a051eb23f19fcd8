use std::{fmt, ops::Deref, ptr::NonNull};

use super::{
    control::{self, Control, Interest},
    ledger,
};

/// Owning handle.
///
/// Every `Shared` of one domain co-owns the same heap value; the handle whose
/// release drops strong interest to zero frees it. A `Shared` can also be
/// empty yet still counted (the state produced by [Shared::default] and by
/// locking an expired [Weak]), so callers that may hold such a handle check
/// with [Shared::get] before dereferencing.
///
/// Counting is non-atomic. The raw-pointer fields keep the type off `Send`
/// and `Sync`, so a domain never leaves the thread that made it.
pub struct Shared<T>
{
    value: Option<NonNull<T>>,
    ctrl: NonNull<Control>,
}

impl<T> Shared<T>
{
    /// Move `value` to the heap and become the sole owner of a fresh
    /// counting domain.
    pub fn new(value: T) -> Self
    {
        ledger::strong_opened();
        Shared {
            value: Some(control::alloc_value(value)),
            ctrl: control::alloc_block(1, 0),
        }
    }

    /// Adopt a counted position in an existing domain.
    ///
    /// Increments strong interest. `value` must be the domain's own value,
    /// or `None`.
    pub(crate) fn from_parts(value: Option<NonNull<T>>, ctrl: NonNull<Control>) -> Self
    {
        ledger::strong_opened();
        unsafe { ctrl.as_ref() }.acquire(Interest::Strong);
        Shared { value, ctrl }
    }

    /// The owned value, or `None` if this handle is empty.
    pub fn get(&self) -> Option<&T> { self.value.map(|p| unsafe { p.as_ref() }) }

    /// True if this handle holds no value. The counters are unaffected by
    /// emptiness.
    pub fn is_empty(&self) -> bool { self.value.is_none() }

    /// Produce a non-owning observer of this handle's domain.
    pub fn downgrade(&self) -> Weak<T>
    {
        ledger::weak_opened();
        unsafe { self.ctrl.as_ref() }.acquire(Interest::Weak);
        Weak {
            value: self.value,
            ctrl: self.ctrl,
        }
    }

    /// Number of owning handles in this domain.
    pub fn strong_count(&self) -> usize { unsafe { self.ctrl.as_ref() }.strong() }

    /// Number of observing handles in this domain.
    pub fn weak_count(&self) -> usize { unsafe { self.ctrl.as_ref() }.weak() }

    /// Give up current ownership and become the sole owner of a brand-new
    /// domain around `value`.
    ///
    /// Co-owners and observers of the old domain are unaffected; this handle
    /// alone is detached into the fresh domain.
    pub fn reset(&mut self, value: T)
    {
        self.release();
        self.value = Some(control::alloc_value(value));
        self.ctrl = control::alloc_block(1, 0);
    }

    fn release(&mut self)
    {
        if unsafe { control::release(self.ctrl, Interest::Strong) } {
            if let Some(value) = self.value.take() {
                unsafe { control::free_value(value) };
            }
        }
    }
}

impl<T> Default for Shared<T>
{
    /// An empty but valid owner: no value, fresh domain with one unit of
    /// strong interest.
    fn default() -> Self
    {
        ledger::strong_opened();
        Shared {
            value: None,
            ctrl: control::alloc_block(1, 0),
        }
    }
}

impl<T> Clone for Shared<T>
{
    fn clone(&self) -> Self { Self::from_parts(self.value, self.ctrl) }
}

impl<T> From<&Weak<T>> for Shared<T>
{
    /// Equivalent to [Weak::lock].
    fn from(observer: &Weak<T>) -> Self { observer.lock() }
}

impl<T> Deref for Shared<T>
{
    type Target = T;

    /// Panics on an empty handle; [Shared::get] is the checked access.
    fn deref(&self) -> &T
    {
        match self.value {
            Some(p) => unsafe { p.as_ref() },
            None => panic!("dereferenced an empty Shared"),
        }
    }
}

impl<T> Drop for Shared<T>
{
    fn drop(&mut self)
    {
        ledger::strong_closed();
        self.release();
    }
}

impl<T> fmt::Debug for Shared<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Shared")
            .field("value", &self.value)
            .field("strong", &self.strong_count())
            .field("weak", &self.weak_count())
            .finish()
    }
}

/// Observing handle.
///
/// Holds weak interest in a domain: the value's lifetime is untouched, only
/// the control block's. The stored value pointer may go stale the moment the
/// last owner releases; [Weak::expired] is the sole authoritative liveness
/// check, and every read routes through it.
pub struct Weak<T>
{
    value: Option<NonNull<T>>,
    ctrl: NonNull<Control>,
}

impl<T> Weak<T>
{
    /// True once no owning handle holds the domain.
    pub fn expired(&self) -> bool { unsafe { self.ctrl.as_ref() }.strong() == 0 }

    /// Convert into an owning handle.
    ///
    /// On a live domain the result co-owns the observed value. On an expired
    /// domain the result is empty but fully counted: strong interest is
    /// resurrected, the value is not. Either way the caller gets an
    /// independently releasable handle.
    pub fn lock(&self) -> Shared<T>
    {
        if self.expired() {
            Shared::from_parts(None, self.ctrl)
        } else {
            Shared::from_parts(self.value, self.ctrl)
        }
    }

    /// The observed raw value pointer, or `None` once expired.
    ///
    /// Never yields a pointer whose pointee is already freed at the time of
    /// the call. Weak interest does not keep the pointee alive, so
    /// dereferencing the result is `unsafe` and on the caller.
    pub fn get(&self) -> Option<NonNull<T>>
    {
        if self.expired() {
            None
        } else {
            self.value
        }
    }

    /// Number of owning handles in the observed domain.
    pub fn strong_count(&self) -> usize { unsafe { self.ctrl.as_ref() }.strong() }

    /// Number of observing handles in the observed domain.
    pub fn weak_count(&self) -> usize { unsafe { self.ctrl.as_ref() }.weak() }
}

impl<T> Default for Weak<T>
{
    /// Observer of a fresh, already-dead domain: no value, one unit of weak
    /// interest.
    fn default() -> Self
    {
        ledger::weak_opened();
        Weak {
            value: None,
            ctrl: control::alloc_block(0, 1),
        }
    }
}

impl<T> Clone for Weak<T>
{
    fn clone(&self) -> Self
    {
        ledger::weak_opened();
        unsafe { self.ctrl.as_ref() }.acquire(Interest::Weak);
        Weak {
            // a stale pointer is not propagated further than it has to be
            value: if self.expired() { None } else { self.value },
            ctrl: self.ctrl,
        }
    }
}

impl<T> From<&Shared<T>> for Weak<T>
{
    /// Equivalent to [Shared::downgrade].
    fn from(owner: &Shared<T>) -> Self { owner.downgrade() }
}

impl<T> Drop for Weak<T>
{
    fn drop(&mut self)
    {
        ledger::weak_closed();
        unsafe { control::release(self.ctrl, Interest::Weak) };
    }
}

impl<T> fmt::Debug for Weak<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Weak")
            .field("value", &self.value)
            .field("expired", &self.expired())
            .field("strong", &self.strong_count())
            .field("weak", &self.weak_count())
            .finish()
    }
}
