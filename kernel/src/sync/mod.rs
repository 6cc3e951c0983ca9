mod lock;
mod mutex;
mod once;
mod semaphore;

pub use lock::*;
pub use mutex::*;
pub use once::*;
pub use semaphore::*;

/// Binds the lock backend for the lifetime of the system. Must be the
/// first action of bring-up: constructing any lock object beforehand is a
/// configuration bug and panics.
pub fn init(monitor_support: bool) {
    lock::bind_backend(monitor_support);
}
