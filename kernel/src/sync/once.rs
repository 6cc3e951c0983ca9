use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU8, Ordering};

use crate::hal;

const UNINIT: u8 = 0;
const RUNNING: u8 = 1;
const READY: u8 = 2;

/// One-shot initialization cell for bindings written exactly once during
/// bring-up (lock backend, scheduler, logger sink).
///
/// Built directly on an atomic state word because it has to work before
/// the lock facade itself is configured.
pub struct Once<T> {
    state: AtomicU8,
    value: UnsafeCell<Option<T>>,
}

unsafe impl<T: Send + Sync> Sync for Once<T> {}
unsafe impl<T: Send> Send for Once<T> {}

impl<T> Once<T> {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(UNINIT),
            value: UnsafeCell::new(None),
        }
    }

    /// Runs `init` and stores its value. The first caller wins; concurrent
    /// and repeated calls return once the stored value is visible, leaving
    /// it untouched.
    pub fn call_once<F>(&self, init: F)
    where
        F: FnOnce() -> T,
    {
        match self.state.compare_exchange(UNINIT, RUNNING, Ordering::Acquire, Ordering::Relaxed) {
            Ok(_) => {
                unsafe {
                    *self.value.get() = Some(init());
                }
                self.state.store(READY, Ordering::Release);
            }
            Err(_) => {
                while self.state.load(Ordering::Acquire) == RUNNING {
                    hal::cpu_relax();
                }
            }
        }
    }

    pub fn get(&self) -> Option<&T> {
        if self.state.load(Ordering::Acquire) == READY {
            unsafe { (*self.value.get()).as_ref() }
        } else {
            None
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state.load(Ordering::Acquire) == READY
    }
}
