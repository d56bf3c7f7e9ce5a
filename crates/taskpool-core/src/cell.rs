//! Cache-line sized, move-erased task storage.
//!
//! A [`TaskCell`] is a 64-byte, 64-byte aligned slot holding a type-erased
//! callable plus a single `action` function pointer that knows how to move,
//! invoke, or destroy the payload it was constructed with. Submitting a task
//! chooses the action function at construction time (generic monomorphization
//! stands in for the trait-selector cascade of the original C++), so no
//! dynamic dispatch or heap allocation is needed afterwards.

use std::mem::{self, MaybeUninit};

/// Cache-line alignment shared by every task cell and the ring queue arena.
pub const TASK_ALIGN: usize = 64;

/// Bytes available to the callable after the `action` function pointer.
pub const TASK_PAYLOAD_SIZE: usize = TASK_ALIGN - mem::size_of::<RawAction>();

type RawAction = unsafe fn(&mut TaskCell, Action<'_>);

/// The tagged argument passed to a task cell's `action` function.
pub enum Action<'a> {
    /// Re-home the payload into `dest`, which must be uninitialized, then
    /// copy this cell's action pointer into `dest`.
    Move(&'a mut TaskCell),
    /// Invoke the stored callable with the given worker index, consuming it.
    Invoke(usize),
    /// Run the payload's destructor (a no-op if it's trivially destructible).
    Destroy,
}

/// A 64-byte, 64-byte aligned slot holding a type-erased, nothrow callable.
///
/// Trivially relocatable (as a sequence of bytes) iff the stored callable is;
/// callers never rely on that though, they always go through [`TaskCell::move_into`].
#[repr(C, align(64))]
pub struct TaskCell {
    payload: [MaybeUninit<u8>; TASK_PAYLOAD_SIZE],
    action: RawAction,
}

const _: () = assert!(mem::size_of::<TaskCell>() == TASK_ALIGN);
const _: () = assert!(mem::align_of::<TaskCell>() == TASK_ALIGN);

impl TaskCell {
    /// Construct a cell by storing `f` inline.
    ///
    /// Fails to compile if `F` doesn't fit the 64-byte cell (size or
    /// alignment) — this is the reject-at-compile-time branch of the
    /// original trait selector. Function items and non-capturing closures
    /// are zero-sized in Rust and always fit; this is the same special
    /// case the original gives function pointers, arrived at for free.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(usize) + Send + 'static,
    {
        const {
            assert!(
                mem::size_of::<F>() <= TASK_PAYLOAD_SIZE,
                "task callable is too large to store inline in a 64-byte cell; \
                 submit it by reference with enqueue_ref instead"
            );
            assert!(mem::align_of::<F>() <= TASK_ALIGN, "task callable over-aligned for a task cell");
        }

        let mut cell = TaskCell {
            payload: [MaybeUninit::uninit(); TASK_PAYLOAD_SIZE],
            action: invoke_owned::<F>,
        };
        unsafe {
            (cell.payload.as_mut_ptr() as *mut F).write(f);
        }
        cell
    }

    /// Construct a cell that stores a pointer to an externally-owned
    /// callable rather than the callable itself.
    ///
    /// # Safety
    ///
    /// The caller must guarantee `callable` remains valid until the task
    /// cell is either invoked or destroyed, whichever happens first — i.e.
    /// until the enclosing pool's `wait()` (or the pool's destruction, for
    /// tasks discarded during teardown) has observed this task complete.
    pub unsafe fn new_ref<T>(callable: &T) -> Self
    where
        T: Fn(usize) + Sync,
    {
        const {
            assert!(mem::size_of::<*const T>() <= TASK_PAYLOAD_SIZE);
        }
        let mut cell = TaskCell {
            payload: [MaybeUninit::uninit(); TASK_PAYLOAD_SIZE],
            action: invoke_ref::<T>,
        };
        let ptr: *const T = callable;
        unsafe {
            (cell.payload.as_mut_ptr() as *mut *const T).write(ptr);
        }
        cell
    }

    /// Move this cell's payload into `dest`, which must not itself hold a
    /// live payload (it is about to be overwritten unconditionally).
    #[inline]
    pub fn move_into(&mut self, dest: &mut TaskCell) {
        unsafe {
            (self.action)(self, Action::Move(dest));
        }
    }

    /// Invoke the stored callable, consuming it, with the given worker index.
    #[inline]
    pub fn invoke(&mut self, worker_index: usize) {
        unsafe {
            (self.action)(self, Action::Invoke(worker_index));
        }
    }

    /// Run the payload's destructor without invoking it. Used when draining
    /// a terminated queue's outstanding cells during pool teardown.
    #[inline]
    pub fn destroy(&mut self) {
        unsafe {
            (self.action)(self, Action::Destroy);
        }
    }

    /// An uninitialized cell, suitable as scratch storage for `try_pop`/`pop`.
    ///
    /// # Safety
    ///
    /// The returned cell's `action` pointer is a dummy no-op; callers must
    /// overwrite the whole cell (via `move_into`) before calling `invoke` or
    /// `destroy` on it.
    pub fn scratch() -> Self {
        TaskCell {
            payload: [MaybeUninit::uninit(); TASK_PAYLOAD_SIZE],
            action: noop_action,
        }
    }
}

unsafe fn noop_action(_cell: &mut TaskCell, _action: Action<'_>) {}

unsafe fn invoke_owned<F>(cell: &mut TaskCell, action: Action<'_>)
where
    F: FnOnce(usize) + Send + 'static,
{
    let payload = cell.payload.as_mut_ptr() as *mut F;
    match action {
        Action::Move(dest) => unsafe {
            let value = payload.read();
            (dest.payload.as_mut_ptr() as *mut F).write(value);
            dest.action = invoke_owned::<F>;
        },
        Action::Invoke(worker_index) => unsafe {
            let f = payload.read();
            f(worker_index);
        },
        Action::Destroy => {
            if mem::needs_drop::<F>() {
                unsafe { payload.drop_in_place() };
            }
        }
    }
}

unsafe fn invoke_ref<T>(cell: &mut TaskCell, action: Action<'_>)
where
    T: Fn(usize) + Sync,
{
    let payload = cell.payload.as_mut_ptr() as *mut *const T;
    match action {
        Action::Move(dest) => unsafe {
            let ptr = payload.read();
            (dest.payload.as_mut_ptr() as *mut *const T).write(ptr);
            dest.action = invoke_ref::<T>;
        },
        Action::Invoke(worker_index) => unsafe {
            let ptr = payload.read();
            (*ptr)(worker_index);
        },
        // Borrowed payload: nothing to drop, the pointee is owned elsewhere.
        Action::Destroy => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn size_and_align() {
        assert_eq!(mem::size_of::<TaskCell>(), 64);
        assert_eq!(mem::align_of::<TaskCell>(), 64);
    }

    #[test]
    fn invoke_owned_closure_runs_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let mut cell = TaskCell::new(move |_idx: usize| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        cell.invoke(0);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn move_into_preserves_action() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let mut src = TaskCell::new(move |_idx: usize| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        let mut dst = TaskCell::scratch();
        src.move_into(&mut dst);
        dst.invoke(7);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn destroy_runs_drop_without_invoking() {
        struct DropBomb(Arc<AtomicUsize>);
        impl Drop for DropBomb {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let drops = Arc::new(AtomicUsize::new(0));
        let invokes = Arc::new(AtomicUsize::new(0));
        let bomb = DropBomb(drops.clone());
        let inv = invokes.clone();
        let mut cell = TaskCell::new(move |_idx: usize| {
            let _keep_alive = &bomb;
            inv.fetch_add(1, Ordering::SeqCst);
        });
        cell.destroy();
        assert_eq!(invokes.load(Ordering::SeqCst), 0);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reference_task_invokes_through_pointer() {
        struct Big {
            counter: AtomicUsize,
            _pad: [u8; 256],
        }
        let big = Big { counter: AtomicUsize::new(0), _pad: [0; 256] };
        let callable = |idx: usize| {
            big.counter.fetch_add(idx + 1, Ordering::SeqCst);
        };
        let mut cell = unsafe { TaskCell::new_ref(&callable) };
        cell.invoke(4);
        assert_eq!(big.counter.load(Ordering::SeqCst), 5);
    }
}
