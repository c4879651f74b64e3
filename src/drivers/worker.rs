//! Named worker thread spawning.
//!
//! Every long-lived thread in the crate (the monitor executor, the sysfs
//! edge watchers) goes through here so it shows up named in `ps -L` and
//! `top -H`, with an explicit stack size.

use std::io;
use std::thread::{Builder, JoinHandle};

/// Spawn a named thread with a `stack_kb` KiB stack.
///
/// Thread creation failure is returned, not panicked on; callers map it
/// into their own error type.
pub fn spawn_named<T, F>(name: &str, stack_kb: usize, f: F) -> io::Result<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    log::debug!("Spawning '{}' (stack={}KB)", name, stack_kb);

    Builder::new()
        .name(name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
}
