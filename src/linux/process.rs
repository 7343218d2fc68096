//! Fork/exec plumbing for invoking the system compiler as a subprocess.
//!
//! Adapted from the fork-then-`execvp` pattern `samply` uses to launch a
//! profiled command in a suspended state; we don't need the suspend/resume
//! pipes here (the compile driver has nothing to set up before the child
//! execs), just a minimal exec-error channel so a failed `execvp` (e.g. the
//! compiler binary is missing) is reported to the parent instead of being
//! silently swallowed by a child that falls through to `_exit`.

use std::ffi::{CString, OsStr, OsString};
use std::os::fd::{AsFd, AsRawFd, IntoRawFd, OwnedFd};
use std::os::raw::c_char;
use std::os::unix::prelude::OsStrExt;
use std::process::ExitStatus;
use std::os::unix::process::ExitStatusExt;

use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;

/// Runs `command` with `args`, waiting for it to finish.
///
/// Returns the child's exit status on success. An `execvp` failure (the
/// executable could not be found or run) surfaces as an `io::Error` built
/// from the child's reported errno, not as a misleading non-zero exit code.
pub fn run_and_wait(command: &OsStr, args: &[OsString]) -> std::io::Result<ExitStatus> {
    let argv: Vec<CString> = std::iter::once(command)
        .chain(args.iter().map(|s| s.as_os_str()))
        .map(|s: &OsStr| CString::new(s.as_bytes().to_vec()).unwrap())
        .collect();
    let argv_ptrs: Vec<*const c_char> = argv
        .iter()
        .map(|c| c.as_ptr())
        .chain(std::iter::once(std::ptr::null()))
        .collect();

    let (execerr_rp, execerr_sp) = nix::unistd::pipe2(nix::fcntl::OFlag::O_CLOEXEC)
        .map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;

    match unsafe { nix::unistd::fork() }.expect("fork failed") {
        nix::unistd::ForkResult::Child => {
            nix::unistd::close(execerr_rp.into_raw_fd()).ok();
            run_child(execerr_sp, &argv_ptrs)
        }
        nix::unistd::ForkResult::Parent { child } => {
            nix::unistd::close(execerr_sp.into_raw_fd())?;
            wait_for_child(child, execerr_rp)
        }
    }
}

const EXECERR_FOOTER: [u8; 4] = *b"NOEX";

fn wait_for_child(pid: Pid, recv_execerr: OwnedFd) -> std::io::Result<ExitStatus> {
    loop {
        let mut bytes = [0u8; 8];
        match nix::unistd::read(recv_execerr.as_raw_fd(), &mut bytes) {
            Ok(0) => break, // pipe closed on successful execve; fall through to waitpid
            Ok(8) => {
                let (errno, footer) = bytes.split_at(4);
                debug_assert_eq!(EXECERR_FOOTER, footer);
                let errno = i32::from_be_bytes([errno[0], errno[1], errno[2], errno[3]]);
                let _ = nix::sys::wait::waitpid(pid, None);
                return Err(std::io::Error::from_raw_os_error(errno));
            }
            Ok(_) => {
                let _ = nix::sys::wait::waitpid(pid, None);
                return Err(std::io::Error::other("short read on compiler execerr pipe"));
            }
            Err(nix::errno::Errno::EINTR) => continue,
            Err(e) => return Err(std::io::Error::from_raw_os_error(e as i32)),
        }
    }

    match nix::sys::wait::waitpid(pid, None) {
        // `ExitStatus::from_raw` expects a raw `wait(2)` wstatus, not a bare
        // exit code: the exit code occupies bits 8-15 of that word (the
        // low byte is 0 for normal exit), and the signal number occupies
        // bits 0-6 for a signal death. Passing the code/signal directly
        // misencodes the status, e.g. a nonzero exit code would decode back
        // as a signal death.
        Ok(WaitStatus::Exited(_, code)) => Ok(ExitStatus::from_raw(code << 8)),
        Ok(WaitStatus::Signaled(_, signal, _)) => Ok(ExitStatus::from_raw(signal as i32)),
        Ok(other) => Err(std::io::Error::other(format!(
            "unexpected waitpid result: {other:?}"
        ))),
        Err(e) => Err(std::io::Error::from_raw_os_error(e as i32)),
    }
}

/// Runs in the forked child. Never returns.
fn run_child(send_execerr: OwnedFd, argv: &[*const c_char]) -> ! {
    unsafe { libc::execvp(argv[0], argv.as_ptr()) };

    // Only reached if execvp failed.
    let errno = nix::errno::Errno::last_raw().to_be_bytes();
    let bytes = [
        errno[0],
        errno[1],
        errno[2],
        errno[3],
        EXECERR_FOOTER[0],
        EXECERR_FOOTER[1],
        EXECERR_FOOTER[2],
        EXECERR_FOOTER[3],
    ];
    let _ = nix::unistd::write(send_execerr.as_fd(), &bytes);
    unsafe { libc::_exit(1) }
}
