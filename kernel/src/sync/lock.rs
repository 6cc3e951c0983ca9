use core::panic::Location;
use core::ptr;
use core::sync::atomic::{AtomicPtr, AtomicU8, AtomicUsize, Ordering};

use crate::hal::{self, IntrState};
use super::Once;

pub const LOCK_FREE: u8 = 0;
pub const LOCK_TAKEN: u8 = 1;

const NO_OWNER: usize = usize::MAX;

/// Raw mutual-exclusion word shared by both backends.
///
/// `state` is the only field with behavioral meaning. `owner` and
/// `taken_at` exist so a misuse panics with the offending call site
/// instead of turning into a silent deadlock; `taken_at` records where the
/// current holder acquired from.
pub struct RawLock {
    state: AtomicU8,
    owner: AtomicUsize,
    taken_at: AtomicPtr<Location<'static>>,
}

impl RawLock {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(LOCK_FREE),
            owner: AtomicUsize::new(NO_OWNER),
            taken_at: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Single Free -> Taken attempt. Needed even with interrupts masked:
    /// another core can race for the same word.
    fn try_take(&self) -> bool {
        self.state
            .compare_exchange(LOCK_FREE, LOCK_TAKEN, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    fn mark_owned(&self, core: usize, caller: &'static Location<'static>) {
        self.owner.store(core, Ordering::Relaxed);
        self.taken_at
            .store(caller as *const Location<'static> as *mut _, Ordering::Relaxed);
    }

    fn clear_owner(&self) {
        self.taken_at.store(ptr::null_mut(), Ordering::Relaxed);
        self.owner.store(NO_OWNER, Ordering::Relaxed);
    }

    fn owner(&self) -> usize {
        self.owner.load(Ordering::Relaxed)
    }

    fn taken_at(&self) -> Option<&'static Location<'static>> {
        unsafe { self.taken_at.load(Ordering::Relaxed).as_ref() }
    }

    pub(crate) fn state_word(&self) -> &AtomicU8 {
        &self.state
    }
}

/// Backend strategy for the raw lock.
///
/// The five facade operations share one state machine, provided here;
/// implementations differ only in how a core waits for a contended word.
pub trait LockBackend: Sync {
    /// Wait hint issued between failed take attempts.
    fn relax(&self, lock: &RawLock);

    fn init(&self, lock: &RawLock) {
        lock.clear_owner();
        lock.state.store(LOCK_FREE, Ordering::Release);
    }

    /// Masks interrupts on the calling core and spins until the word is
    /// taken. Returns the pre-acquire interrupt state; the matching
    /// `release` consumes it.
    ///
    /// Interrupts stay masked for the whole held duration: a handler
    /// delivered on this core could otherwise re-enter and spin on a word
    /// its own core already holds, which never makes progress.
    fn acquire(&self, lock: &RawLock, caller: &'static Location<'static>) -> IntrState {
        let intr = hal::disable_interrupts();
        let core = hal::core_id();

        if lock.owner() == core {
            match lock.taken_at() {
                Some(at) => panic!("core {core} re-acquiring lock it took at {at}, now from {caller}"),
                None => panic!("core {core} re-acquiring a lock it already holds, from {caller}"),
            }
        }

        while !lock.try_take() {
            self.relax(lock);
        }

        lock.mark_owned(core, caller);

        intr
    }

    /// Single take attempt. On contention the interrupt state is restored
    /// and `None` returned, with no other side effects.
    fn try_acquire(&self, lock: &RawLock, caller: &'static Location<'static>) -> Option<IntrState> {
        let intr = hal::disable_interrupts();

        if lock.try_take() {
            lock.mark_owned(hal::core_id(), caller);
            Some(intr)
        } else {
            hal::restore_interrupts(intr);
            None
        }
    }

    fn release(&self, lock: &RawLock, intr: IntrState) {
        let core = hal::core_id();
        let owner = lock.owner();

        if owner != core {
            match lock.taken_at() {
                Some(at) => panic!("lock taken by core {owner} at {at} released by core {core}"),
                None => panic!("core {core} releasing a lock nobody holds"),
            }
        }

        // A timer or IPI delivered past this point could re-enter and spin
        // on this same word on this core.
        assert!(!hal::interrupts_enabled(), "lock released with interrupts enabled");

        lock.clear_owner();
        lock.state.store(LOCK_FREE, Ordering::Release);

        hal::restore_interrupts(intr);
    }

    fn is_owner(&self, lock: &RawLock) -> bool {
        lock.owner() == hal::core_id()
    }
}

/// Classic busy-wait backend: burns cycles on the word with a pause hint
/// between attempts. Works on every core.
pub struct SpinlockBackend;

impl LockBackend for SpinlockBackend {
    fn relax(&self, _lock: &RawLock) {
        hal::cpu_relax();
    }
}

/// MONITOR/MWAIT backend: arms the hardware monitor on the lock word and
/// dozes until the holder's release dirties the line. Same observable
/// behavior as [`SpinlockBackend`], better energy and bus traffic under
/// contention.
pub struct MonitorBackend;

impl LockBackend for MonitorBackend {
    fn relax(&self, lock: &RawLock) {
        hal::monitor_wait(lock.state_word(), LOCK_TAKEN);
    }
}

static SPINLOCK_BACKEND: SpinlockBackend = SpinlockBackend;
static MONITOR_BACKEND: MonitorBackend = MonitorBackend;

static BACKEND: Once<&'static dyn LockBackend> = Once::new();

pub(super) fn bind_backend(monitor_support: bool) {
    BACKEND.call_once(|| -> &'static dyn LockBackend {
        if monitor_support {
            // we have monitor support
            &MONITOR_BACKEND
        } else {
            // use classic spinlock
            &SPINLOCK_BACKEND
        }
    });
}

fn selected_backend() -> &'static dyn LockBackend {
    *BACKEND
        .get()
        .expect("lock object constructed before sync::init selected a backend")
}

/// Facade over [`RawLock`]: the mutual-exclusion primitive the rest of the
/// kernel programs against.
///
/// Each instance captures the backend chosen at bring-up, so every
/// operation is a single dispatch with no rebinding or per-call selection.
pub struct KLock {
    raw: RawLock,
    backend: &'static dyn LockBackend,
}

impl KLock {
    pub fn new() -> Self {
        let backend = selected_backend();
        let lock = Self { raw: RawLock::new(), backend };

        backend.init(&lock.raw);

        lock
    }

    #[track_caller]
    pub fn acquire(&self) -> IntrState {
        self.backend.acquire(&self.raw, Location::caller())
    }

    #[track_caller]
    pub fn try_acquire(&self) -> Option<IntrState> {
        self.backend.try_acquire(&self.raw, Location::caller())
    }

    pub fn release(&self, intr: IntrState) {
        self.backend.release(&self.raw, intr);
    }

    pub fn is_owner(&self) -> bool {
        self.backend.is_owner(&self.raw)
    }
}

impl Default for KLock {
    fn default() -> Self {
        Self::new()
    }
}
