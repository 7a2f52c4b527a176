//! Ctrl-C handling
//!
//! The first SIGINT asks the running batch to stop: waits return within a
//! poll slice, the current stack is marked cancelled and the rest skipped.
//! A second SIGINT restores the default handler's behaviour and exits.

use runbook::CancelToken;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

static CANCEL_FLAG: OnceLock<CancelToken> = OnceLock::new();
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Install the SIGINT handler and return the token it cancels.
///
/// Calling this more than once returns the same token.
pub fn install() -> CancelToken {
    let token = CANCEL_FLAG.get_or_init(CancelToken::new).clone();

    #[cfg(unix)]
    {
        let handler = on_sigint as extern "C" fn(libc::c_int);
        // SAFETY: the handler only performs atomic loads/stores and _exit,
        // all async-signal-safe
        let previous = unsafe { libc::signal(libc::SIGINT, handler as libc::sighandler_t) };
        if previous == libc::SIG_ERR {
            log::warn!("could not install SIGINT handler; Ctrl-C will abort immediately");
        }
    }

    token
}

#[cfg(unix)]
extern "C" fn on_sigint(_signal: libc::c_int) {
    if INTERRUPTED.swap(true, Ordering::SeqCst) {
        // SAFETY: _exit is async-signal-safe
        unsafe { libc::_exit(130) };
    }
    if let Some(token) = CANCEL_FLAG.get() {
        token.flag().store(true, Ordering::SeqCst);
    }
}

/// Whether the operator pressed Ctrl-C during this run
pub fn was_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}
