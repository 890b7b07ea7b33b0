//! Call-scoped paging context.
//!
//! The interceptor publishes the resolved [`Paging`] right before the wrapped
//! call runs, and the call target's own body reads it back with
//! [`current_paging`]. Publication is tied to a [`ContextGuard`]: dropping the
//! guard restores whatever was published before, on every exit path
//! including unwinding.
//!
//! The slot is thread-local, so concurrent invocations on different threads
//! never observe each other's values. Nested paged invocations on one thread
//! stack: the inner call's value is visible only while the inner call runs.
//!
//! # Examples
//!
//! ```
//! use paging_core::{context, Paging, PagingValue};
//!
//! assert!(context::current_paging().is_err());
//!
//! {
//!     let _guard = context::publish(Paging::from(PagingValue::new(10, 2, "")));
//!     assert_eq!(context::current_paging().unwrap().page_num(), 2);
//! }
//!
//! assert!(context::current_paging().is_err());
//! ```

use std::cell::RefCell;
use std::marker::PhantomData;

use crate::error::ContextError;
use crate::pageable::Paging;

thread_local! {
    static CURRENT: RefCell<Option<Paging>> = const { RefCell::new(None) };
}

/// Publishes `paging` for the current call scope.
///
/// The value stays visible until the returned guard is dropped.
pub fn publish(paging: Paging) -> ContextGuard {
    let previous = CURRENT.with(|slot| slot.borrow_mut().replace(paging));
    ContextGuard {
        previous,
        _not_send: PhantomData,
    }
}

/// Returns a copy of the paging value published for the current call.
///
/// # Errors
///
/// Returns [`ContextError::NotPublished`] outside a paged invocation.
pub fn current_paging() -> Result<Paging, ContextError> {
    CURRENT
        .with(|slot| slot.borrow().clone())
        .ok_or(ContextError::NotPublished)
}

/// Returns `true` when a paging value is published for the current call.
pub fn has_current_paging() -> bool {
    CURRENT.with(|slot| slot.borrow().is_some())
}

/// Runs `f` on the published paging value and keeps its changes.
///
/// `f` works on a copy that is written back once it returns, so reading the
/// context from inside `f` sees the value as it was before the call. If `f`
/// panics the published value is left unchanged.
///
/// # Errors
///
/// Returns [`ContextError::NotPublished`] outside a paged invocation.
pub fn with_current_paging<R>(f: impl FnOnce(&mut Paging) -> R) -> Result<R, ContextError> {
    let mut paging = current_paging()?;
    let result = f(&mut paging);
    CURRENT.with(|slot| *slot.borrow_mut() = Some(paging));
    Ok(result)
}

/// Keeps a published paging value visible; restores the previous one on drop.
///
/// The guard is bound to the thread that published the value.
#[must_use = "the paging value is unpublished as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ContextGuard {
    previous: Option<Paging>,
    // Thread-local state must be restored on the publishing thread.
    _not_send: PhantomData<*const ()>,
}

impl ContextGuard {
    /// Returns a copy of the value currently published in this scope.
    pub fn current(&self) -> Option<Paging> {
        CURRENT.with(|slot| slot.borrow().clone())
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        // The slot may already be gone if the thread is shutting down.
        let _ = CURRENT.try_with(|slot| *slot.borrow_mut() = previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pageable::{PageableMut, PagingValue};
    use std::panic::{catch_unwind, AssertUnwindSafe};

    fn paging(page_num: u32) -> Paging {
        Paging::from(PagingValue::new(10, page_num, ""))
    }

    #[test]
    fn nothing_is_published_by_default() {
        assert_eq!(current_paging(), Err(ContextError::NotPublished));
        assert!(!has_current_paging());
        assert!(with_current_paging(|_| ()).is_err());
    }

    #[test]
    fn guard_clears_on_drop() {
        let guard = publish(paging(1));
        assert!(has_current_paging());
        assert_eq!(guard.current(), Some(paging(1)));

        drop(guard);
        assert!(!has_current_paging());
    }

    #[test]
    fn nested_publication_restores_outer_value() {
        let _outer = publish(paging(1));
        {
            let _inner = publish(paging(2));
            assert_eq!(current_paging().map(|p| p.page_num()), Ok(2));
        }
        assert_eq!(current_paging().map(|p| p.page_num()), Ok(1));
    }

    #[test]
    fn guard_clears_on_panic() {
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _guard = publish(paging(5));
            panic!("wrapped call panicked");
        }));

        assert!(result.is_err());
        assert!(!has_current_paging());
    }

    #[test]
    fn mutations_are_kept() {
        let _guard = publish(paging(1));

        with_current_paging(|p| p.set_page_num(9)).expect("published");

        assert_eq!(current_paging().map(|p| p.page_num()), Ok(9));
    }

    #[test]
    fn values_do_not_cross_threads() {
        let _guard = publish(paging(3));

        let seen = std::thread::spawn(has_current_paging)
            .join()
            .expect("thread completes");

        assert!(!seen);
        assert!(has_current_paging());
    }
}
