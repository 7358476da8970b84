// Shared helpers for the integration test crates.
#![allow(dead_code)]

pub mod fixtures;

/// Install `env_logger` once; later calls are no-ops.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
