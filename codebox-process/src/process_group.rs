//! Process-group signalling helpers.
//!
//! Children are spawned as the leader of a new process group (see
//! [`ProcessRunner`](crate::ProcessRunner)), so the group id equals the
//! child's pid and a signal sent to the group also reaches any
//! grandchildren the guest code started.
//!
//! On non-Unix platforms there is no graceful stage: both signals map to
//! an immediate termination of the child.

use std::io;

use tokio::process::Child;

/// Signal to deliver to a child's process group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillSignal {
    /// SIGTERM - allows graceful shutdown
    Term,
    /// SIGKILL - immediate termination
    Kill,
}

#[cfg(unix)]
impl KillSignal {
    fn as_libc_signal(self) -> libc::c_int {
        match self {
            Self::Term => libc::SIGTERM,
            Self::Kill => libc::SIGKILL,
        }
    }
}

/// Send `signal` to the process group led by `child`.
///
/// A child that has already been reaped is treated as success.
#[cfg(unix)]
pub fn signal_child_group(child: &mut Child, signal: KillSignal) -> io::Result<()> {
    let Some(pid) = child.id() else {
        return Ok(());
    };
    signal_process_group(pid, signal)
}

/// Send `signal` to the process group `pgid` (best-effort).
#[cfg(unix)]
pub fn signal_process_group(pgid: u32, signal: KillSignal) -> io::Result<()> {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("process group id {pgid} out of range"),
        ));
    };

    let result = unsafe { libc::killpg(pgid, signal.as_libc_signal()) };
    if result == -1 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            return Err(err);
        }
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn signal_child_group(child: &mut Child, _signal: KillSignal) -> io::Result<()> {
    match child.start_kill() {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::InvalidInput => Ok(()),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn signalling_a_missing_group_is_not_an_error() {
        assert!(signal_process_group(2_000_000_000, KillSignal::Term).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn signal_mapping() {
        assert_eq!(KillSignal::Term.as_libc_signal(), libc::SIGTERM);
        assert_eq!(KillSignal::Kill.as_libc_signal(), libc::SIGKILL);
    }
}
