//! Process-wide interrupt flag for demo loops.
//!
//! The handler only stores into an `AtomicBool`, which is
//! async-signal-safe. Loops poll [`shutdown_requested`] once per iteration.

use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn on_signal(_sig: libc::c_int) {
    SHUTDOWN.store(true, Ordering::Relaxed);
}

/// Route SIGINT and SIGTERM to the shutdown flag.
///
/// On non-unix targets this is a no-op and the default handling applies.
pub fn install_shutdown_handler() {
    // SAFETY: `on_signal` only performs an atomic store.
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGINT, on_signal as *const () as libc::sighandler_t);
        libc::signal(libc::SIGTERM, on_signal as *const () as libc::sighandler_t);
    }
}

pub fn shutdown_requested() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

/// Set the flag by hand, as a signal would.
pub fn request_shutdown() {
    SHUTDOWN.store(true, Ordering::Relaxed);
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn sigterm_sets_the_flag() {
        install_shutdown_handler();
        // SAFETY: raising a signal whose handler was just installed.
        unsafe {
            libc::raise(libc::SIGTERM);
        }
        assert!(shutdown_requested());
    }

    #[test]
    fn request_sets_the_flag() {
        request_shutdown();
        assert!(shutdown_requested());
    }
}
