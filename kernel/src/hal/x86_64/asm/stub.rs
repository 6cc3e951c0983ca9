// Hosted stand-ins for the privileged instruction layer. Each test thread
// models one core: the interrupt flag lives in a thread local and core ids
// are handed out on first use, so interrupt save/restore discipline and
// cross-"core" ownership checks behave exactly as on hardware.

use core::sync::atomic::{AtomicUsize, Ordering};
use std::cell::Cell;

static NEXT_CORE_ID: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static INTR_FLAG: Cell<bool> = const { Cell::new(true) };
    static CORE_ID: Cell<Option<usize>> = const { Cell::new(None) };
}

pub unsafe fn cli() -> u64 {
    INTR_FLAG.with(|flag| {
        let prev = flag.get();
        flag.set(false);

        if prev { 1 << 9 } else { 0 }
    })
}

pub unsafe fn sti() {
    INTR_FLAG.with(|flag| flag.set(true));
}

pub fn read_rflags() -> u64 {
    INTR_FLAG.with(|flag| if flag.get() { 1 << 9 } else { 0 })
}

pub unsafe fn pause() {
    std::thread::yield_now();
}

pub unsafe fn monitor(_addr: *const u8) {}

pub unsafe fn mwait() {
    std::thread::yield_now();
}

pub unsafe fn cpuid(fn_number: u32, _opt_fn_number: u32) -> [u32; 4] {
    // Advertise MONITOR/MWAIT (leaf 1 ECX bit 3) so the monitor backend is
    // selectable under test.
    if fn_number == 0x1 {
        [0, 0, 1 << 3, 0]
    } else {
        [0; 4]
    }
}

pub fn core_id() -> usize {
    CORE_ID.with(|cell| match cell.get() {
        Some(id) => id,
        None => {
            let id = NEXT_CORE_ID.fetch_add(1, Ordering::Relaxed);
            cell.set(Some(id));
            id
        }
    })
}
