//! Layer A: the kernel-level seccomp-BPF syscall allowlist (spec.md §4.6).
//!
//! A default-kill policy admitting only the fixed set of syscalls a UDF
//! legitimately needs: process/memory management, stream-socket use and
//! name resolution, and read-only name-resolution file access. Anything else
//! gets the child killed by the kernel, not by us — seccomp's `Kill`
//! mismatch action is unconditional and cannot be bypassed by the child.

use std::collections::BTreeMap;
use std::convert::TryInto;

use seccompiler::{
    BpfProgram, SeccompAction, SeccompCmpArgLen as ArgLen, SeccompCmpOp as Op,
    SeccompCondition as Cond, SeccompFilter, SeccompRule,
};

use crate::error::{Result, UdfError};

/// Builds and installs the layer-A seccomp-BPF filter in the calling
/// (child) process.
pub fn install() -> Result<()> {
    let program = build_filter()?;
    seccompiler::apply_filter(&program)
        .map_err(|e| UdfError::Sandbox(format!("failed to apply seccomp filter: {e}")))
}

fn build_filter() -> Result<BpfProgram> {
    let mut rules: BTreeMap<i64, Vec<SeccompRule>> = BTreeMap::new();

    // (i) process termination and memory management.
    for syscall in [
        libc::SYS_brk,
        libc::SYS_exit_group,
        libc::SYS_mmap,
        libc::SYS_munmap,
        libc::SYS_mprotect,
        libc::SYS_lseek,
        libc::SYS_futex,
        libc::SYS_uname,
    ] {
        rules.insert(syscall, vec![]);
    }

    // (ii) stream socket use and name resolution.
    for syscall in [
        libc::SYS_socket,
        libc::SYS_setsockopt,
        libc::SYS_connect,
        libc::SYS_select,
        libc::SYS_poll,
        libc::SYS_read,
        libc::SYS_recvfrom, // also covers plain recv on this ABI
        libc::SYS_write,
        libc::SYS_sendto, // also covers plain send on this ABI
        libc::SYS_sendmsg,
        libc::SYS_close,
    ] {
        rules.insert(syscall, vec![]);
    }

    // `ioctl` restricted to the byte-count query (FIONREAD).
    rules.insert(
        libc::SYS_ioctl,
        vec![SeccompRule::new(vec![Cond::new(
            1,
            ArgLen::Dword,
            Op::Eq,
            libc::FIONREAD as u64,
        )
        .map_err(cond_err)?])
        .map_err(rule_err)?],
    );

    // (iii) name-resolution file access: stat family unconditionally, `open`
    // and `openat` restricted to read-only.
    for syscall in [libc::SYS_stat, libc::SYS_lstat, libc::SYS_fstat] {
        rules.insert(syscall, vec![]);
    }
    rules.insert(
        libc::SYS_open,
        vec![SeccompRule::new(vec![Cond::new(
            1,
            ArgLen::Dword,
            Op::MaskedEq(libc::O_ACCMODE as u64),
            libc::O_RDONLY as u64,
        )
        .map_err(cond_err)?])
        .map_err(rule_err)?],
    );
    rules.insert(
        libc::SYS_openat,
        vec![SeccompRule::new(vec![Cond::new(
            2,
            ArgLen::Dword,
            Op::MaskedEq(libc::O_ACCMODE as u64),
            libc::O_RDONLY as u64,
        )
        .map_err(cond_err)?])
        .map_err(rule_err)?],
    );

    let filter = SeccompFilter::new(
        rules,
        SeccompAction::KillProcess, // mismatch default: immediate kernel kill, no child cleanup
        SeccompAction::Allow,
        std::env::consts::ARCH.try_into().map_err(|_| {
            UdfError::Sandbox(format!("unsupported seccomp target arch {}", std::env::consts::ARCH))
        })?,
    )
    .map_err(|e| UdfError::Sandbox(format!("invalid seccomp filter: {e}")))?;

    filter
        .try_into()
        .map_err(|e| UdfError::Sandbox(format!("failed to compile seccomp BPF program: {e}")))
}

fn cond_err<E: std::fmt::Display>(e: E) -> UdfError {
    UdfError::Sandbox(format!("invalid seccomp condition: {e}"))
}

fn rule_err<E: std::fmt::Display>(e: E) -> UdfError {
    UdfError::Sandbox(format!("invalid seccomp rule: {e}"))
}
