//! Layer B: materializes the pointer-aware path interceptor shim to disk so
//! it can be named by `LD_PRELOAD` ahead of the UDF's own shared object
//! (spec.md §4.6, §9 "Pointer-aware syscall interception").
//!
//! A library already `dlopen`ed with `RTLD_GLOBAL` into a running process
//! is appended to the *end* of that process's global symbol scope — libc,
//! resolved once at process startup, is always searched first, so a
//! runtime `dlopen` can never interpose libc's own `open`/`openat`/`stat`/
//! `lstat`. `LD_PRELOAD` instead inserts a library at the *head* of the
//! scope before the dynamic linker processes the main executable's own
//! relocations, which is the only way to interpose those symbols, and that
//! only happens at a fresh `execve`. So this module only ever hands back a
//! path for `crate::worker` to set as `LD_PRELOAD` ahead of a re-exec,
//! rather than loading the shim itself.

use std::path::PathBuf;

use crate::error::{Result, UdfError};

/// Environment variable the shim's own constructor reads its colon-joined
/// path allowlist from (see `interceptor_shim.c`).
pub(crate) const ALLOWED_PATHS_ENV: &str = "HDF5_UDF_SANDBOX_ALLOWED_PATHS";

/// The compiled interceptor shared object, embedded at build time.
static INTERCEPTOR_SO_BYTES: &[u8] = include_bytes!(env!("HDF5_UDF_INTERCEPTOR_SO"));

/// Writes the embedded interceptor shim to a fresh temporary `.so` file and
/// returns its path, suitable for `LD_PRELOAD`.
pub fn materialize() -> Result<PathBuf> {
    let mut tmp = tempfile::Builder::new()
        .prefix("hdf5-udf-interceptor-")
        .suffix(".so")
        .tempfile()
        .map_err(|e| UdfError::Sandbox(format!("could not create interceptor temp file: {e}")))?;
    std::io::Write::write_all(&mut tmp, INTERCEPTOR_SO_BYTES)
        .map_err(|e| UdfError::Sandbox(format!("could not write interceptor shim: {e}")))?;
    let (_, path) = tmp
        .keep()
        .map_err(|e| UdfError::Sandbox(format!("could not persist interceptor shim: {e}")))?;
    Ok(path)
}
