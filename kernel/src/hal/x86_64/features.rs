use super::asm;

const CPUID_FEATURE_FN: u32 = 0x1;
const ECX_MONITOR_BIT: u32 = 3;

fn check_bit(bit: u32, data: u32) -> bool {
    ((1 << bit) & data) != 0
}

fn cpuid(fn_number: u32, opt_fn_number: u32) -> [u32; 4] {
    unsafe { asm::cpuid(fn_number, opt_fn_number) }
}

/// Whether the CPU implements MONITOR/MWAIT. Bring-up feeds this into the
/// lock backend selection; cores without it fall back to the classic
/// pause-loop spinlock.
pub fn monitor_supported() -> bool {
    check_bit(ECX_MONITOR_BIT, cpuid(CPUID_FEATURE_FN, 0)[2])
}
