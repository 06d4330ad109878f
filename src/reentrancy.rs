//! Debug-only reentrancy guard.
//!
//! `FlexSet` calls into user code (`Eq`/`Hash` on ids, `PartialEq` on
//! elements, retain predicates) while a bucket may be half-updated. In debug
//! builds, entering a guarded operation while another one is active on the
//! same set panics and names both. In release builds this is a no-op.

#[cfg(debug_assertions)]
use core::cell::Cell;
#[cfg(not(debug_assertions))]
use core::marker::PhantomData;

/// Per-set tracker; guard entry points with `let _g = self.guard.enter("op");`.
#[derive(Debug)]
pub struct DebugReentrancy {
    #[cfg(debug_assertions)]
    active: Cell<Option<&'static str>>,
}

impl DebugReentrancy {
    pub const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Cell::new(None),
        }
    }

    /// Marks `op` as running until the returned guard drops.
    #[inline]
    pub fn enter(&self, op: &'static str) -> ReentrancyGuard<'_> {
        #[cfg(debug_assertions)]
        {
            if let Some(outer) = self.active.get() {
                panic!("reentrancy detected: `{op}` called while `{outer}` is running on the same set");
            }
            self.active.set(Some(op));
            return ReentrancyGuard { owner: self };
        }

        #[cfg(not(debug_assertions))]
        {
            let _ = op;
            return ReentrancyGuard { _z: PhantomData };
        }
    }

    /// Name of the operation currently holding the guard, if any.
    #[cfg(all(test, debug_assertions))]
    pub fn active(&self) -> Option<&'static str> {
        self.active.get()
    }
}

impl Default for DebugReentrancy {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard returned by `DebugReentrancy::enter`.
pub struct ReentrancyGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<&'a ()>,
}

impl<'a> Drop for ReentrancyGuard<'a> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            debug_assert!(self.owner.active.get().is_some());
            self.owner.active.set(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DebugReentrancy;

    #[test]
    fn enter_and_exit_is_ok() {
        let r = DebugReentrancy::new();
        {
            let _g = r.enter("insert");
        }
        let _g = r.enter("remove");
    }

    #[cfg(debug_assertions)]
    #[test]
    fn tracks_active_operation() {
        let r = DebugReentrancy::new();
        assert_eq!(r.active(), None);
        let g = r.enter("get");
        assert_eq!(r.active(), Some("get"));
        drop(g);
        assert_eq!(r.active(), None);
    }

    #[cfg(debug_assertions)]
    #[test]
    fn reentrancy_panics_in_debug() {
        let r = DebugReentrancy::new();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _g1 = r.enter("insert");
            let _g2 = r.enter("contains");
        }));
        let err = res.expect_err("expected reentrancy to panic in debug builds");
        let msg = err.downcast_ref::<String>().cloned().unwrap_or_default();
        assert!(msg.contains("`contains` called while `insert`"), "message: {msg}");
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn reentrancy_noop_in_release() {
        let r = DebugReentrancy::new();
        let _g1 = r.enter("insert");
        let _g2 = r.enter("contains");
    }
}
