#![allow(dead_code)]

pub mod manual_manager;
pub mod workers;

#[allow(unused_imports)]
pub use manual_manager::*;
#[allow(unused_imports)]
pub use workers::*;

use std::thread;
use std::time::{Duration, Instant};

/// Poll `condition` until it holds or `timeout` elapses
pub fn wait_for<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);
