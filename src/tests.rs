use std::cell::Cell;

use crate::ledger::*;
use crate::pointers::*;

#[test]
fn user_story()
{
    assert!(thread_local_stats().is_clean());

    let x = Shared::new(Cell::new(2i32));

    assert_eq!(x.strong_count(), 1);

    let y = x.downgrade();

    assert!(!y.expired());

    let z = y.lock();

    assert_eq!(x.strong_count(), 2);
    assert_eq!(z.get().map(Cell::get), Some(2));

    z.set(3);

    assert_eq!(x.get().map(Cell::get), Some(3));

    std::mem::drop(x);

    assert!(!y.expired());

    std::mem::drop(z);

    assert!(y.expired());
    assert_eq!(thread_local_stats().live_values, 0);
    assert_eq!(thread_local_stats().live_blocks, 1);

    std::mem::drop(y);

    assert!(thread_local_stats().is_clean());
}

#[test]
fn last_owner_frees_the_value()
{
    struct DropTally(&'static Cell<i32>);
    impl Drop for DropTally
    {
        fn drop(&mut self) { self.0.set(self.0.get() + 1); }
    }

    let cell: &'static Cell<i32> = Box::leak(Box::new(Cell::new(0)));

    let a = Shared::new(DropTally(cell));
    let b = a.clone();

    assert_eq!(a.strong_count(), 2);

    std::mem::drop(a);

    assert_eq!(cell.get(), 0);
    assert_eq!(b.strong_count(), 1);

    std::mem::drop(b);

    assert_eq!(cell.get(), 1);
    assert!(thread_local_stats().is_clean());
}

#[test]
fn weak_observes_expiry()
{
    let a = Shared::new(String::from("y"));
    let w = a.downgrade();

    assert_eq!(w.strong_count(), 1);
    assert_eq!(w.weak_count(), 1);
    assert!(!w.expired());
    assert!(w.get().is_some());

    std::mem::drop(a);

    assert!(w.expired());
    assert!(w.get().is_none());
    assert_eq!(thread_local_stats().live_values, 0);
    assert_eq!(thread_local_stats().live_blocks, 1);

    std::mem::drop(w);

    assert!(thread_local_stats().is_clean());
}

#[test]
fn lock_expired_resurrects_interest_not_value()
{
    let w = {
        let a = Shared::new(5u32);
        a.downgrade()
    };

    assert!(w.expired());

    let s = w.lock();

    assert!(s.is_empty());
    assert!(s.get().is_none());
    assert_eq!(s.strong_count(), 1);
    assert!(!w.expired());

    std::mem::drop(s);

    assert!(w.expired());
    assert_eq!(thread_local_stats().live_blocks, 1);

    std::mem::drop(w);

    assert!(thread_local_stats().is_clean());
}

#[test]
fn release_order_is_immaterial()
{
    let a = Shared::new(1i32);
    let w = a.downgrade();
    std::mem::drop(a);
    std::mem::drop(w);

    assert!(thread_local_stats().is_clean());

    let b = Shared::new(2i32);
    let v = b.downgrade();
    std::mem::drop(v);
    std::mem::drop(b);

    assert!(thread_local_stats().is_clean());
}

#[test]
fn reset_detaches_into_a_fresh_domain()
{
    let a = Shared::new(String::from("old"));
    let mut b = a.clone();
    let w = a.downgrade();

    b.reset(String::from("new"));

    assert_eq!(a.get().map(String::as_str), Some("old"));
    assert_eq!(b.get().map(String::as_str), Some("new"));
    assert_eq!(a.strong_count(), 1);
    assert_eq!(b.strong_count(), 1);
    assert_eq!(b.weak_count(), 0);
    assert_eq!(w.weak_count(), 1);
    assert_eq!(thread_local_stats().live_values, 2);
    assert_eq!(thread_local_stats().live_blocks, 2);

    std::mem::drop(a);

    assert!(w.expired());
    assert_eq!(b.get().map(String::as_str), Some("new"));

    std::mem::drop(w);
    std::mem::drop(b);

    assert!(thread_local_stats().is_clean());
}

#[test]
fn empty_owners_are_counted()
{
    let a = Shared::<i32>::default();

    assert!(a.is_empty());
    assert_eq!(a.strong_count(), 1);
    assert_eq!(thread_local_stats().live_values, 0);
    assert_eq!(thread_local_stats().live_blocks, 1);

    let b = a.clone();

    assert!(b.is_empty());
    assert_eq!(a.strong_count(), 2);

    std::mem::drop(a);
    std::mem::drop(b);

    assert!(thread_local_stats().is_clean());

    let w = Weak::<i32>::default();

    assert!(w.expired());
    assert!(w.get().is_none());

    let s = w.lock();

    assert!(s.is_empty());
    assert_eq!(s.strong_count(), 1);

    std::mem::drop(s);
    std::mem::drop(w);

    assert!(thread_local_stats().is_clean());
}

#[test]
fn expired_clone_forgets_the_stale_pointer()
{
    let w = {
        let a = Shared::new(7i32);
        a.downgrade()
    };
    let stale = w.clone();

    assert_eq!(w.weak_count(), 2);

    // resurrect strong interest; neither observer gets the value back, but
    // only the pre-expiry original still remembers where it was
    let s = w.lock();

    assert!(stale.get().is_none());
    assert!(w.get().is_some());
    assert!(s.is_empty());

    std::mem::drop(s);
    std::mem::drop(stale);
    std::mem::drop(w);

    assert!(thread_local_stats().is_clean());
}

#[test]
fn conversions_count_like_the_methods()
{
    let a = Shared::new(4i32);
    let w = Weak::from(&a);

    assert_eq!(a.weak_count(), 1);

    let b = Shared::from(&w);

    assert_eq!(a.strong_count(), 2);
    assert!(std::ptr::eq(a.get().unwrap(), b.get().unwrap()));

    std::mem::drop(b);
    std::mem::drop(w);
    std::mem::drop(a);

    assert!(thread_local_stats().is_clean());
}

#[test]
#[should_panic(expected = "empty Shared")]
fn deref_of_empty_owner_panics()
{
    let a = Shared::<i32>::default();
    let _ = *a;
}

#[test]
fn stress_test()
{
    let n = 500;
    for i in 0..n {
        let x = Shared::new(vec![i; 16]);
        let mut owners = Vec::new();
        for _ in 0..8 {
            owners.push(x.clone());
            owners.push(x.downgrade().lock());
        }
        let observers: Vec<_> = (0..8).map(|_| x.downgrade()).collect();

        assert_eq!(x.strong_count(), 17);
        assert_eq!(x.weak_count(), 8);

        std::mem::drop(owners);
        std::mem::drop(x);

        assert!(observers.iter().all(Weak::expired));
    }
    assert!(thread_local_stats().is_clean());
}

#[cfg(feature = "global")]
#[test]
fn exited_threads_surrender_their_leaks()
{
    std::thread::spawn(|| {
        let kept = Shared::new(11i32);
        let _ = kept.downgrade().lock();
        std::mem::forget(kept);
    })
    .join()
    .unwrap();

    let orphaned = global_stats();
    assert!(orphaned.live_values >= 1);
    assert!(orphaned.live_blocks >= 1);
    assert!(orphaned.strong_handles >= 1);
}
