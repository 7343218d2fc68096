//! Two-layer confinement applied to the UDF worker process (spec.md §4.6):
//! a kernel seccomp-BPF allowlist (layer A), installed in-process by
//! [`init`], and an `LD_PRELOAD`-resident path-validating interceptor
//! (layer B), which is already active by the time this process's `main` is
//! reached — it has no installation step here at all. See `crate::worker`
//! for how the executor arranges that by re-exec'ing with `LD_PRELOAD` set,
//! rather than `dlopen`ing the shim into an already-running process (see
//! `interceptor`'s module docs for why the latter cannot work).

mod interceptor;
mod policy;
mod seccomp;

pub use interceptor::materialize as materialize_interceptor;
pub(crate) use interceptor::ALLOWED_PATHS_ENV;
pub use policy::SandboxPolicy;

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::Result;

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Installs layer A (the seccomp-BPF allowlist) in the calling process.
/// Idempotent: a second call in the same process is a no-op, since seccomp
/// filters stack (reinstalling would only make the policy stricter, never
/// looser).
///
/// On failure this returns `Err`; the worker must treat that as a fatal
/// pre-run condition and must not proceed to call the UDF's entry point.
pub fn init() -> Result<()> {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }
    seccomp::install()
}
