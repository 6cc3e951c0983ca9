use core::cell::RefCell;
use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use kernel_intf::ThreadId;
use log::debug;

use crate::ds::WaitQueue;
use crate::hal;
use crate::sched;
use super::KLock;

const MAX_RECURSION_DEPTH: u8 = u8::MAX;
const NO_HOLDER: usize = usize::MAX;

/// Blocking mutual-exclusion primitive with optional recursive acquire.
///
/// Unlike the raw lock, contended callers go to sleep through the
/// scheduler instead of spinning; the embedded [`KLock`] only guards the
/// short critical section that inspects and updates holder/queue state.
pub struct Mutex {
    lock: KLock,
    holder: AtomicUsize,
    depth: AtomicU8,
    max_depth: u8,
    waiters: RefCell<WaitQueue>,
}

// `waiters` is only touched while `lock` is held; `holder` and `depth`
// are atomics whose access rules are documented on `acquire`.
unsafe impl Sync for Mutex {}
unsafe impl Send for Mutex {}

impl Mutex {
    pub fn new(recursive: bool) -> Self {
        Self {
            lock: KLock::new(),
            holder: AtomicUsize::new(NO_HOLDER),
            depth: AtomicU8::new(0),
            max_depth: if recursive { MAX_RECURSION_DEPTH } else { 1 },
            waiters: RefCell::new(WaitQueue::new()),
        }
    }

    fn holder(&self) -> Option<ThreadId> {
        match self.holder.load(Ordering::Acquire) {
            NO_HOLDER => None,
            raw => Some(ThreadId::new(raw)),
        }
    }

    /// Acquires the mutex, blocking until ownership is granted.
    ///
    /// Re-acquiring as the current holder is allowed up to the recursion
    /// budget chosen at construction; a nested acquire only bumps the
    /// depth counter and generates no lock traffic. `depth` is moved
    /// exclusively by the owning thread, which is what makes the
    /// holder-only fast path safe without taking the raw lock.
    pub fn acquire(&self) {
        let me = sched::current_thread();

        if self.holder() == Some(me) {
            let depth = self.depth.load(Ordering::Relaxed);
            assert!(
                depth < self.max_depth,
                "mutex recursion depth exhausted ({})",
                self.max_depth
            );
            self.depth.store(depth + 1, Ordering::Relaxed);
            return;
        }

        let outer = hal::disable_interrupts();
        let mut intr = self.lock.acquire();

        if self.holder().is_none() {
            self.depth.store(1, Ordering::Relaxed);
            self.holder.store(me.as_raw(), Ordering::Release);
        }

        // Guarded wait: a resumed thread re-validates ownership, since
        // wakeups and fresh claimants can race.
        while self.holder() != Some(me) {
            debug!("Placing thread id:{} into mutex wait queue", me);
            self.waiters
                .borrow_mut()
                .push(me)
                .expect("mutex wait queue exhausted");

            sched::prepare_block();
            self.lock.release(intr);
            sched::block_current();
            intr = self.lock.acquire();
        }

        self.lock.release(intr);
        hal::restore_interrupts(outer);
    }

    /// Claims the mutex only if that requires no waiting. Returns whether
    /// ownership was granted; on contention nothing changes.
    pub fn try_acquire(&self) -> bool {
        let me = sched::current_thread();

        if self.holder() == Some(me) {
            let depth = self.depth.load(Ordering::Relaxed);
            assert!(
                depth < self.max_depth,
                "mutex recursion depth exhausted ({})",
                self.max_depth
            );
            self.depth.store(depth + 1, Ordering::Relaxed);
            return true;
        }

        let intr = self.lock.acquire();

        let granted = self.holder().is_none();
        if granted {
            self.depth.store(1, Ordering::Relaxed);
            self.holder.store(me.as_raw(), Ordering::Release);
        }

        self.lock.release(intr);

        granted
    }

    /// Releases one level of ownership. On the last release, ownership
    /// moves straight to the longest waiter; clearing the holder instead
    /// would let a late claimant jump the queue.
    pub fn release(&self) {
        let me = sched::current_thread();
        assert!(
            self.holder() == Some(me),
            "mutex released by non-holder thread {}",
            me
        );

        let depth = self.depth.load(Ordering::Relaxed);
        if depth > 1 {
            self.depth.store(depth - 1, Ordering::Relaxed);
            return;
        }

        let intr = self.lock.acquire();

        match self.waiters.borrow_mut().pop() {
            Some(next) => {
                debug!("Mutex handed off to thread id:{}", next);
                self.depth.store(1, Ordering::Relaxed);
                self.holder.store(next.as_raw(), Ordering::Release);
                sched::unblock(next);
            }
            None => {
                self.depth.store(0, Ordering::Relaxed);
                self.holder.store(NO_HOLDER, Ordering::Release);
            }
        }

        self.lock.release(intr);
    }

    /// True when the calling thread currently owns the mutex.
    pub fn is_owner(&self) -> bool {
        self.holder() == Some(sched::current_thread())
    }

    #[cfg(test)]
    pub(crate) fn waiter_count(&self) -> usize {
        let intr = self.lock.acquire();
        let count = self.waiters.borrow().len();
        self.lock.release(intr);

        count
    }
}
