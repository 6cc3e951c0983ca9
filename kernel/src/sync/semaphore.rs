use core::cell::RefCell;

use log::debug;

use crate::ds::WaitQueue;
use crate::hal;
use crate::sched;
use super::KLock;

struct SemInner {
    value: u64,
    waiters: WaitQueue,
}

/// Counting semaphore with a FIFO wait queue.
///
/// Threads that cannot be satisfied immediately are put to sleep through
/// the scheduler rather than spinning; `up` counts units, not specific
/// waiters, so resumed threads re-validate before consuming.
pub struct Semaphore {
    lock: KLock,
    inner: RefCell<SemInner>,
}

// `inner` is only touched while `lock` is held.
unsafe impl Sync for Semaphore {}
unsafe impl Send for Semaphore {}

impl Semaphore {
    pub fn new(initial: u64) -> Self {
        Self {
            lock: KLock::new(),
            inner: RefCell::new(SemInner {
                value: initial,
                waiters: WaitQueue::new(),
            }),
        }
    }

    /// Claims `count` units, blocking until the value covers the request.
    ///
    /// A wakeup is a hint, not a grant: by the time a resumed thread
    /// re-takes the internal lock, another thread may already have
    /// consumed the value, and a single wakeup need not mean enough has
    /// accumulated. The condition is therefore re-checked on every resume.
    pub fn down(&self, count: u64) {
        assert!(count != 0, "semaphore down of zero units");

        let me = sched::current_thread();
        let outer = hal::disable_interrupts();
        let mut intr = self.lock.acquire();

        loop {
            let mut inner = self.inner.borrow_mut();
            if inner.value >= count {
                inner.value -= count;
                break;
            }

            debug!("Placing thread id:{} into semaphore wait queue ({} of {} units available)",
                me, inner.value, count);
            inner
                .waiters
                .push(me)
                .expect("semaphore wait queue exhausted");
            drop(inner);

            sched::prepare_block();
            self.lock.release(intr);
            sched::block_current();
            intr = self.lock.acquire();
        }

        self.lock.release(intr);
        hal::restore_interrupts(outer);
    }

    /// Returns `count` units and resumes up to `count` waiters from the
    /// head of the queue.
    ///
    /// The full amount is added back even when waiters are resumed: each
    /// resumed thread subtracts its own request once it re-validates, so
    /// pre-deducting here would double-count.
    pub fn up(&self, count: u64) {
        assert!(count != 0, "semaphore up of zero units");

        let intr = self.lock.acquire();

        {
            let mut inner = self.inner.borrow_mut();

            let mut resumed = 0;
            while resumed < count {
                match inner.waiters.pop() {
                    Some(thread) => sched::unblock(thread),
                    None => break,
                }
                resumed += 1;
            }

            inner.value = inner
                .value
                .checked_add(count)
                .expect("semaphore value overflow");
        }

        self.lock.release(intr);
    }

    /// Current value. Diagnostic only: stale as soon as it is read.
    pub fn value(&self) -> u64 {
        let intr = self.lock.acquire();
        let value = self.inner.borrow().value;
        self.lock.release(intr);

        value
    }

    #[cfg(test)]
    pub(crate) fn waiter_count(&self) -> usize {
        let intr = self.lock.acquire();
        let count = self.inner.borrow().waiters.len();
        self.lock.release(intr);

        count
    }
}
