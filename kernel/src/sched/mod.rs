
use kernel_intf::{Scheduler, ThreadId};

use crate::sync::Once;

static SCHEDULER: Once<&'static dyn Scheduler> = Once::new();

/// Binds the scheduler implementation consumed by the blocking
/// primitives. The kernel proper calls this during bring-up, before the
/// first mutex or semaphore is touched.
pub fn register(scheduler: &'static dyn Scheduler) {
    SCHEDULER.call_once(|| scheduler);
}

fn scheduler() -> &'static dyn Scheduler {
    *SCHEDULER
        .get()
        .expect("blocking primitive used before sched::register bound a scheduler")
}

pub fn current_thread() -> ThreadId {
    scheduler().current_thread()
}

/// See [`kernel_intf::Scheduler::prepare_block`]: call while still holding
/// the wait object's internal lock, or a resume issued between queueing
/// and suspension is lost.
pub fn prepare_block() {
    scheduler().prepare_block();
}

pub fn block_current() {
    scheduler().block_current();
}

pub fn unblock(thread: ThreadId) {
    scheduler().unblock(thread);
}
