#![no_std]

// Call this macro once per crate that runs host-side unit tests. The
// kernel crates swap their privileged-instruction layer for hosted stubs
// under cfg(test); this wires the log facade to env_logger so their
// debug!/info! traffic lands on the test output.

#[macro_export]
macro_rules! init_test_logger {
    ($mod_name:ident) => {
        $crate::init_test_logger!($mod_name, "debug");
    };
    ($mod_name:ident, $filter:literal) => {
        #[cfg(test)]
        extern crate std;

        #[ctor::ctor]
        fn init_test_logging() {
            let _ = env_logger::Builder::from_env(
                env_logger::Env::default().default_filter_or($filter)
            )
            .is_test(true)
            .try_init();

            std::println!("Starting tests for module {}", stringify!($mod_name));
        }
    };
}
