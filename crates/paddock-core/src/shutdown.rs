//! Cooperative shutdown.
//!
//! The first SIGINT/SIGTERM raises a process-wide flag: discovery stops
//! creating tasks while queued work still drains. A second signal exits at
//! once with [`FORCED_EXIT_CODE`].

use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::{SIGINT, SIGTERM};

pub const FORCED_EXIT_CODE: i32 = 130;

static REQUESTED: AtomicBool = AtomicBool::new(false);

pub fn is_shutdown_requested() -> bool {
    REQUESTED.load(Ordering::Relaxed)
}

pub fn request_shutdown() {
    REQUESTED.store(true, Ordering::Relaxed);
}

/// Raise the flag; `true` if it was already raised.
fn escalate() -> bool {
    REQUESTED.swap(true, Ordering::Relaxed)
}

pub fn install_signal_handlers() -> std::io::Result<()> {
    for signal in [SIGINT, SIGTERM] {
        // SAFETY: the handler only does an atomic swap and `process::exit`
        unsafe {
            signal_hook::low_level::register(signal, || {
                if escalate() {
                    std::process::exit(FORCED_EXIT_CODE);
                }
            })?;
        }
    }
    Ok(())
}
