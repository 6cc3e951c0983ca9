use core::cell::RefCell;
use core::fmt::Write;

use log::{LevelFilter, Log, Metadata, Record};

use crate::hal;
use crate::sync::{KLock, Once};

struct Sink {
    lock: KLock,
    writer: RefCell<&'static mut dyn Write>,
}

// `writer` is only touched while `lock` is held.
unsafe impl Sync for Sink {}
unsafe impl Send for Sink {}

static SINK: Once<Sink> = Once::new();

struct KernelLogger;

static LOGGER: KernelLogger = KernelLogger;

impl Log for KernelLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        SINK.is_completed()
    }

    fn log(&self, record: &Record) {
        let Some(sink) = SINK.get() else {
            return;
        };

        // Cores share one sink; serialize whole lines through the facade.
        let intr = sink.lock.acquire();
        let _ = writeln!(
            sink.writer.borrow_mut(),
            "[{}]-[core {}]: {}",
            record.level(),
            hal::core_id(),
            record.args()
        );
        sink.lock.release(intr);
    }

    fn flush(&self) {}
}

/// Binds the output sink (typically the serial writer owned by the kernel
/// proper) and installs the kernel logger behind the `log` facade. Called
/// once during bring-up, after `sync::init`. Registration is skipped when
/// another logger already owns the facade, as env_logger does under test.
pub fn init(writer: &'static mut dyn Write) {
    SINK.call_once(|| Sink {
        lock: KLock::new(),
        writer: RefCell::new(writer),
    });

    if log::set_logger(&LOGGER).is_ok() {
        let level = if cfg!(debug_assertions) {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };
        log::set_max_level(level);
    }
}
