use core::sync::atomic::{AtomicU8, Ordering};

mod asm;
mod features;

pub use features::monitor_supported;

/// Saved interrupt-delivery state of one core.
///
/// Produced when interrupts are masked, consumed exactly once by
/// [`restore_interrupts`]. Deliberately neither `Copy` nor `Clone`: every
/// disable has one matching restore on every exit path, checked by the
/// compiler instead of by convention.
#[must_use = "the saved interrupt state must be restored"]
pub struct IntrState {
    enabled: bool
}

impl IntrState {
    pub fn was_enabled(&self) -> bool {
        self.enabled
    }
}

pub fn disable_interrupts() -> IntrState {
    // RFLAGS register bit 9 is IF -> 1 is enabled
    let enabled = (unsafe { asm::cli() } & (1 << 9)) != 0;

    IntrState { enabled }
}

pub fn restore_interrupts(state: IntrState) {
    // If interrupts were disabled previously, then don't enable them here
    if !state.enabled {
        return;
    }

    unsafe {
        asm::sti();
    }
}

pub fn interrupts_enabled() -> bool {
    (asm::read_rflags() & (1 << 9)) != 0
}

/// Hardware identity of the calling core, used for lock ownership
/// bookkeeping. Stable for the lifetime of the core.
pub fn core_id() -> usize {
    asm::core_id()
}

/// Spin-loop hint issued between failed lock attempts.
pub fn cpu_relax() {
    unsafe {
        asm::pause();
    }
}

/// Parks the core until the cache line holding `word` is written, or until
/// another wake event fires. The caller re-validates the word afterwards;
/// this is a latency/power hint, not a synchronization primitive.
pub fn monitor_wait(word: &AtomicU8, expected: u8) {
    let addr = word as *const AtomicU8 as *const u8;

    unsafe {
        asm::monitor(addr);

        // The release store may land between arming the monitor and the
        // wait; only sleep if the word still carries the waited-on value.
        if word.load(Ordering::Relaxed) == expected {
            asm::mwait();
        }
    }
}
